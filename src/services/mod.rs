// SPDX-License-Identifier: MIT

pub mod approvals;
pub mod assembler;
pub mod builder;
pub mod compiler;
pub mod flags;
pub mod predicates;
pub mod selector;
pub mod wrap;

pub use builder::{BuiltPayload, PayloadBuilder};
pub use selector::{ExecutorChoice, ExecutorVariant};
