// SPDX-License-Identifier: MIT

//! Sibling/shape predicates over the immutable plan tree. Both assembler
//! variants ask the same "does any/every sibling need X" questions, so the
//! answers are memoized here; the plan never mutates during a build, so the
//! cache has no invalidation.

use crate::domain::constants::is_native;
use crate::domain::descriptor::ResolvedDexCall;
use crate::domain::plan::SwapPlan;
use dashmap::DashMap;

/// Resolved dex calls addressed the same way as the plan tree:
/// `calls[route][swap][exchange]`.
pub type CallGrid = Vec<Vec<Vec<ResolvedDexCall>>>;

pub struct PlanPredicates<'a> {
    plan: &'a SwapPlan,
    calls: &'a CallGrid,
    sibling_wrap: DashMap<(usize, usize), (bool, bool)>,
}

impl<'a> PlanPredicates<'a> {
    pub fn new(plan: &'a SwapPlan, calls: &'a CallGrid) -> Self {
        Self {
            plan,
            calls,
            sibling_wrap: DashMap::new(),
        }
    }

    pub fn plan(&self) -> &'a SwapPlan {
        self.plan
    }

    pub fn call(&self, route: usize, swap: usize, exchange: usize) -> &'a ResolvedDexCall {
        &self.calls[route][swap][exchange]
    }

    pub fn is_simple(&self) -> bool {
        self.plan.is_simple()
    }

    pub fn is_first_hop(&self, swap: usize) -> bool {
        swap == 0
    }

    pub fn is_last_hop(&self, route: usize, swap: usize) -> bool {
        swap + 1 == self.plan.routes[route].swaps.len()
    }

    /// Whether this hop requires vertical branching.
    pub fn hop_branched(&self, route: usize, swap: usize) -> bool {
        self.plan.routes[route].swaps[swap].exchanges.len() > 1
    }

    /// Exchange needs a wrap: plan says native in, pool wants wrapped.
    pub fn needs_wrap(&self, route: usize, swap: usize, exchange: usize) -> bool {
        is_native(self.plan.routes[route].swaps[swap].src_token)
            && self.calls[route][swap][exchange].need_wrap_native
    }

    /// Exchange needs an unwrap: pool emits wrapped, plan says native out.
    pub fn needs_unwrap(&self, route: usize, swap: usize, exchange: usize) -> bool {
        is_native(self.plan.routes[route].swaps[swap].dest_token)
            && self.calls[route][swap][exchange].need_wrap_native
    }

    /// (any, every) sibling on this hop needing wrap handling.
    pub fn sibling_wrap(&self, route: usize, swap: usize) -> (bool, bool) {
        if let Some(cached) = self.sibling_wrap.get(&(route, swap)) {
            return *cached;
        }
        let n = self.plan.routes[route].swaps[swap].exchanges.len();
        let mut any = false;
        let mut every = n > 0;
        for e in 0..n {
            let wrap = self.needs_wrap(route, swap, e) || self.needs_unwrap(route, swap, e);
            any |= wrap;
            every &= wrap;
        }
        self.sibling_wrap.insert((route, swap), (any, every));
        (any, every)
    }

    /// Root wrap is valid only when every first-hop call of every route
    /// agrees on needing wrapped-native input.
    pub fn every_first_hop_needs_wrap(&self) -> bool {
        let mut saw_any = false;
        for (r, route) in self.plan.routes.iter().enumerate() {
            if route.swaps.is_empty() {
                return false;
            }
            for e in 0..route.swaps[0].exchanges.len() {
                saw_any = true;
                if !self.needs_wrap(r, 0, e) {
                    return false;
                }
            }
        }
        saw_any
    }

    /// Root unwrap is valid when at least one last-hop call of some route
    /// needs wrapped-native output. Asymmetric on purpose: a shared amount
    /// can be unwrapped speculatively and re-split, but a wrap cannot be
    /// un-split.
    pub fn any_last_hop_needs_unwrap(&self) -> bool {
        self.plan.routes.iter().enumerate().any(|(r, route)| {
            let last = match route.swaps.len().checked_sub(1) {
                Some(last) => last,
                None => return false,
            };
            (0..route.swaps[last].exchanges.len()).any(|e| self.needs_unwrap(r, last, e))
        })
    }

    /// Any last-hop exchange lacking a recipient parameter, which makes the
    /// executor hold the output and need a tail record to pass it on.
    pub fn any_last_hop_without_recipient(&self) -> bool {
        self.plan.routes.iter().enumerate().any(|(r, route)| {
            let last = match route.swaps.len().checked_sub(1) {
                Some(last) => last,
                None => return false,
            };
            (0..route.swaps[last].exchanges.len())
                .any(|e| !self.calls[r][last][e].descriptor.dex_has_recipient)
        })
    }
}
