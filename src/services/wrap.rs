// SPDX-License-Identifier: MIT

//! Decides, once per build, whether native wrap/unwrap is hoisted to the root
//! of the output or stays local to specific call sites.

use crate::domain::constants::is_native;
use crate::services::predicates::PlanPredicates;

/// The hoisting decision for one build. Local insertion bookkeeping (to avoid
/// duplicates among siblings) lives in the assembler's `BuildContext`; this
/// type only answers "where".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPlan {
    /// One deposit record at the very front of the payload.
    pub root_wrap: bool,
    /// One withdraw record at the very end of the payload.
    pub root_unwrap: bool,
}

impl WrapPlan {
    /// Root wrap needs unanimity across every route's first hop: a wrap
    /// cannot be un-split once routes fan the amount out. Root unwrap only
    /// needs one taker: withdrawing a shared amount speculatively and
    /// re-splitting afterwards is safe.
    pub fn decide(predicates: &PlanPredicates<'_>) -> Self {
        let plan = predicates.plan();
        WrapPlan {
            root_wrap: is_native(plan.src_token) && predicates.every_first_hop_needs_wrap(),
            root_unwrap: is_native(plan.dest_token) && predicates.any_last_hop_needs_unwrap(),
        }
    }

    /// A wrap must be inserted at this exact site iff the site needs wrapped
    /// input and the root deposit does not already cover it.
    pub fn local_wrap(
        &self,
        predicates: &PlanPredicates<'_>,
        route: usize,
        swap: usize,
        exchange: usize,
    ) -> bool {
        if self.root_wrap && predicates.is_first_hop(swap) {
            return false;
        }
        predicates.needs_wrap(route, swap, exchange)
    }

    /// An unwrap must follow this exact site iff it emits wrapped output the
    /// root withdraw does not already cover.
    pub fn local_unwrap(
        &self,
        predicates: &PlanPredicates<'_>,
        route: usize,
        swap: usize,
        exchange: usize,
    ) -> bool {
        if self.root_unwrap && predicates.is_last_hop(route, swap) {
            return false;
        }
        predicates.needs_unwrap(route, swap, exchange)
    }

}
