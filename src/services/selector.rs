// SPDX-License-Identifier: MIT

//! Picks which deployed executor variant interprets the payload. The choice
//! is an explicit value made once per build from plan shape and passed down;
//! assembly code never consults globals.

use crate::domain::plan::SwapPlan;
use crate::services::assembler::merged::shared_affixes;
use alloy::primitives::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorVariant {
    Legacy,
    MergedMultiRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorChoice {
    pub variant: ExecutorVariant,
    pub address: Address,
}

/// The merged executor only pays off when several routes actually share hop
/// structure; everything else goes to the legacy executor.
pub fn select_executor(
    plan: &SwapPlan,
    legacy_address: Address,
    merged_address: Address,
) -> ExecutorChoice {
    if plan.routes.len() > 1 {
        let (prefix, suffix) = shared_affixes(plan);
        if prefix > 0 || suffix > 0 {
            return ExecutorChoice {
                variant: ExecutorVariant::MergedMultiRoute,
                address: merged_address,
            };
        }
    }
    ExecutorChoice {
        variant: ExecutorVariant::Legacy,
        address: legacy_address,
    }
}
