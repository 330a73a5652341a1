// SPDX-License-Identifier: MIT
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod common;
pub mod domain;
pub mod services;

pub use domain::descriptor::{DexCallDescriptor, NativeWrapInfo};
pub use domain::error::{AdapterError, ApprovalCheckError, BuildError, PayloadError};
pub use domain::plan::{Route, Side, Swap, SwapExchange, SwapPlan};
pub use services::{BuiltPayload, ExecutorChoice, ExecutorVariant, PayloadBuilder};
