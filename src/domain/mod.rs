// SPDX-License-Identifier: MIT

pub mod constants;
pub mod descriptor;
pub mod error;
pub mod plan;
