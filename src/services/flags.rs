// SPDX-License-Identifier: MIT

//! Per-exchange flag resolution. A flag multiplexes two small state machines
//! into one integer: amount handling (mod 4) and post-call balance checking
//! (mod 3). The representative values are fixed by the deployed executor; see
//! `domain::constants`.

use crate::domain::constants::{
    FLAG_DONT_INSERT_CHECK_NATIVE, FLAG_DONT_INSERT_CHECK_SRC_BALANCE,
    FLAG_DONT_INSERT_DONT_CHECK, FLAG_INSERT_CHECK_NATIVE, FLAG_INSERT_CHECK_SRC_BALANCE,
    FLAG_INSERT_DONT_CHECK, FLAG_SEND_NATIVE_CHECK_SRC_BALANCE, FLAG_SEND_NATIVE_DONT_CHECK,
    FLAG_SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE, FLAG_SEND_NATIVE_PLUS_INSERT_DONT_CHECK,
};

/// Flag mod 4: what the executor does with the amount before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AmountMode {
    /// Leave the payload amount untouched.
    Leave = 0,
    /// Attach native value equal to the computed amount; don't touch payload.
    SendNative = 1,
    /// Attach native value and patch the amount into the payload.
    SendNativeAndInsert = 2,
    /// Patch the amount into the payload only.
    Insert = 3,
}

/// Flag mod 3: what the executor reads after the call and feeds forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BalanceMode {
    None = 0,
    CheckNative = 1,
    CheckDestToken = 2,
}

/// The wire flag carried in each `AssembledCallRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag(pub u16);

impl Flag {
    pub const DONT_INSERT_DONT_CHECK: Flag = Flag(FLAG_DONT_INSERT_DONT_CHECK);
    pub const INSERT_DONT_CHECK: Flag = Flag(FLAG_INSERT_DONT_CHECK);
    pub const DONT_INSERT_CHECK_NATIVE: Flag = Flag(FLAG_DONT_INSERT_CHECK_NATIVE);
    pub const SEND_NATIVE_CHECK_SRC_BALANCE: Flag = Flag(FLAG_SEND_NATIVE_CHECK_SRC_BALANCE);
    pub const INSERT_CHECK_NATIVE: Flag = Flag(FLAG_INSERT_CHECK_NATIVE);
    pub const DONT_INSERT_CHECK_SRC_BALANCE: Flag = Flag(FLAG_DONT_INSERT_CHECK_SRC_BALANCE);
    pub const SEND_NATIVE_DONT_CHECK: Flag = Flag(FLAG_SEND_NATIVE_DONT_CHECK);
    pub const INSERT_CHECK_SRC_BALANCE: Flag = Flag(FLAG_INSERT_CHECK_SRC_BALANCE);
    pub const SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE: Flag =
        Flag(FLAG_SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE);
    pub const SEND_NATIVE_PLUS_INSERT_DONT_CHECK: Flag =
        Flag(FLAG_SEND_NATIVE_PLUS_INSERT_DONT_CHECK);

    pub fn amount_mode(self) -> AmountMode {
        match self.0 % 4 {
            0 => AmountMode::Leave,
            1 => AmountMode::SendNative,
            2 => AmountMode::SendNativeAndInsert,
            _ => AmountMode::Insert,
        }
    }

    pub fn balance_mode(self) -> BalanceMode {
        match self.0 % 3 {
            0 => BalanceMode::None,
            1 => BalanceMode::CheckNative,
            _ => BalanceMode::CheckDestToken,
        }
    }

    /// Canonical representative for a mode pair. Ten combinations have fixed
    /// wire values; the remaining two fall back to the smallest residue
    /// satisfying both moduli.
    pub fn from_modes(amount: AmountMode, balance: BalanceMode) -> Flag {
        use AmountMode::*;
        use BalanceMode::*;
        match (amount, balance) {
            (Leave, None) => Flag::DONT_INSERT_DONT_CHECK,
            (Insert, None) => Flag::INSERT_DONT_CHECK,
            (Leave, CheckNative) => Flag::DONT_INSERT_CHECK_NATIVE,
            (SendNative, CheckDestToken) => Flag::SEND_NATIVE_CHECK_SRC_BALANCE,
            (Insert, CheckNative) => Flag::INSERT_CHECK_NATIVE,
            (Leave, CheckDestToken) => Flag::DONT_INSERT_CHECK_SRC_BALANCE,
            (SendNative, None) => Flag::SEND_NATIVE_DONT_CHECK,
            (Insert, CheckDestToken) => Flag::INSERT_CHECK_SRC_BALANCE,
            (SendNativeAndInsert, CheckDestToken) => {
                Flag::SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE
            }
            (SendNativeAndInsert, None) => Flag::SEND_NATIVE_PLUS_INSERT_DONT_CHECK,
            (SendNativeAndInsert, CheckNative) => Flag(10),
            (SendNative, CheckNative) => Flag(13),
        }
    }

    pub fn inserts_amount(self) -> bool {
        matches!(
            self.amount_mode(),
            AmountMode::Insert | AmountMode::SendNativeAndInsert
        )
    }

    pub fn sends_native(self) -> bool {
        matches!(
            self.amount_mode(),
            AmountMode::SendNative | AmountMode::SendNativeAndInsert
        )
    }
}

/// Everything the resolver needs to know about one call site. Built once per
/// exchange after wrap/unwrap decisions are final; the resulting flag is
/// immutable thereafter.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    /// Whole plan is one route, one hop, one exchange at 100%.
    pub simple: bool,
    pub is_native_src: bool,
    pub is_native_dest: bool,
    pub dex_has_recipient: bool,
    /// Pool wants wrapped-native input where the plan says native. The
    /// planner guarantees a deposit upstream, so the call sees a token input.
    pub needs_wrap: bool,
    pub needs_unwrap: bool,
    pub force_prevent_insert: bool,
    pub has_pre_swap_unwrap: bool,
    pub is_first_hop: bool,
    pub is_last_hop: bool,
    /// The hop fans out across more than one exchange.
    pub hop_branched: bool,
    pub any_sibling_wrap: bool,
    pub every_sibling_wrap: bool,
}

impl CallSite {
    /// Resolves the wire flag for this site.
    ///
    /// A pre-swap unwrap overrides everything: the nominal input token
    /// differs from the true input, so the executor must send native and
    /// verify the received balance regardless of any other property.
    pub fn resolve(&self) -> Flag {
        if self.has_pre_swap_unwrap {
            return Flag::SEND_NATIVE_CHECK_SRC_BALANCE;
        }
        Flag::from_modes(self.amount_mode(), self.balance_mode())
    }

    fn amount_mode(&self) -> AmountMode {
        // Raw native input: the executor attaches value to the call.
        if self.is_native_src && !self.needs_wrap {
            if self.force_prevent_insert {
                return AmountMode::SendNative;
            }
            return AmountMode::SendNativeAndInsert;
        }
        if self.force_prevent_insert {
            return AmountMode::Leave;
        }
        // Beyond the first hop the real amount is only known at runtime; a
        // dex without a recipient parameter is fed by balance transfer
        // instead of payload patching.
        if !self.simple && !self.is_first_hop && !self.dex_has_recipient {
            return AmountMode::Leave;
        }
        AmountMode::Insert
    }

    fn balance_mode(&self) -> BalanceMode {
        if !self.simple && !self.is_last_hop {
            // The output feeds the next hop and must be measured.
            if self.is_native_dest && !self.needs_unwrap {
                return BalanceMode::CheckNative;
            }
            return BalanceMode::CheckDestToken;
        }
        // Siblings that disagree on wrap handling produce outputs on
        // different tokens; a dest-token check lets the executor sum them.
        if self.hop_branched && self.any_sibling_wrap && !self.every_sibling_wrap {
            return BalanceMode::CheckDestToken;
        }
        if self.needs_unwrap {
            // The wrapped output balance must be known before withdrawing.
            return BalanceMode::CheckDestToken;
        }
        if self.is_native_dest && !self.dex_has_recipient {
            return BalanceMode::CheckNative;
        }
        BalanceMode::None
    }
}

/// Flags addressed like the plan tree: `flags[route][swap][exchange]`.
pub type FlagGrid = Vec<Vec<Vec<Flag>>>;

/// Resolves the flag for every exchange. Runs strictly after the wrap/unwrap
/// decisions are final; flags are immutable afterwards.
pub fn resolve_plan_flags(
    predicates: &crate::services::predicates::PlanPredicates<'_>,
    wrap: &crate::services::wrap::WrapPlan,
) -> FlagGrid {
    use crate::domain::constants::is_native;

    let plan = predicates.plan();
    let simple = predicates.is_simple();
    plan.routes
        .iter()
        .enumerate()
        .map(|(r, route)| {
            route
                .swaps
                .iter()
                .enumerate()
                .map(|(s, swap)| {
                    let (any_wrap, every_wrap) = predicates.sibling_wrap(r, s);
                    (0..swap.exchanges.len())
                        .map(|e| {
                            let call = predicates.call(r, s, e);
                            CallSite {
                                simple,
                                is_native_src: is_native(swap.src_token),
                                is_native_dest: is_native(swap.dest_token),
                                dex_has_recipient: call.descriptor.dex_has_recipient,
                                needs_wrap: predicates.needs_wrap(r, s, e),
                                needs_unwrap: wrap.local_unwrap(predicates, r, s, e),
                                force_prevent_insert: call.force_prevent_insert(),
                                has_pre_swap_unwrap: call
                                    .descriptor
                                    .pre_swap_unwrap_calldata
                                    .is_some(),
                                is_first_hop: predicates.is_first_hop(s),
                                is_last_hop: predicates.is_last_hop(r, s),
                                hop_branched: predicates.hop_branched(r, s),
                                any_sibling_wrap: any_wrap,
                                every_sibling_wrap: every_wrap,
                            }
                            .resolve()
                        })
                        .collect()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_site() -> CallSite {
        CallSite {
            simple: true,
            is_native_src: false,
            is_native_dest: false,
            dex_has_recipient: true,
            needs_wrap: false,
            needs_unwrap: false,
            force_prevent_insert: false,
            has_pre_swap_unwrap: false,
            is_first_hop: true,
            is_last_hop: true,
            hop_branched: false,
            any_sibling_wrap: false,
            every_sibling_wrap: false,
        }
    }

    #[test]
    fn plain_token_to_token_inserts_without_check() {
        assert_eq!(simple_site().resolve(), Flag::INSERT_DONT_CHECK);
    }

    #[test]
    fn raw_native_input_sends_value() {
        let mut site = simple_site();
        site.is_native_src = true;
        assert_eq!(site.resolve(), Flag::SEND_NATIVE_PLUS_INSERT_DONT_CHECK);

        site.force_prevent_insert = true;
        assert_eq!(site.resolve(), Flag::SEND_NATIVE_DONT_CHECK);
    }

    #[test]
    fn wrapped_native_input_behaves_like_token() {
        let mut site = simple_site();
        site.is_native_src = true;
        site.needs_wrap = true;
        assert_eq!(site.resolve(), Flag::INSERT_DONT_CHECK);
    }

    #[test]
    fn native_dest_without_recipient_checks_native() {
        let mut site = simple_site();
        site.is_native_dest = true;
        site.dex_has_recipient = false;
        assert_eq!(site.resolve(), Flag::INSERT_CHECK_NATIVE);
    }

    #[test]
    fn unwrap_requires_dest_token_check() {
        let mut site = simple_site();
        site.is_native_dest = true;
        site.needs_unwrap = true;
        assert_eq!(site.resolve(), Flag::INSERT_CHECK_SRC_BALANCE);
    }

    #[test]
    fn intermediate_hop_checks_dest_token() {
        let mut site = simple_site();
        site.simple = false;
        site.is_last_hop = false;
        assert_eq!(site.resolve(), Flag::INSERT_CHECK_SRC_BALANCE);
    }

    #[test]
    fn later_hop_without_recipient_leaves_payload() {
        let mut site = simple_site();
        site.simple = false;
        site.is_first_hop = false;
        site.dex_has_recipient = false;
        assert_eq!(site.resolve(), Flag::DONT_INSERT_DONT_CHECK);
    }

    #[test]
    fn asymmetric_sibling_wrap_forces_dest_check() {
        let mut site = simple_site();
        site.simple = false;
        site.hop_branched = true;
        site.any_sibling_wrap = true;
        site.every_sibling_wrap = false;
        assert_eq!(site.resolve(), Flag::INSERT_CHECK_SRC_BALANCE);

        // Unanimous siblings do not.
        site.every_sibling_wrap = true;
        assert_eq!(site.resolve(), Flag::INSERT_DONT_CHECK);
    }

    #[test]
    fn pre_swap_unwrap_overrides_everything() {
        let mut site = simple_site();
        site.has_pre_swap_unwrap = true;
        site.force_prevent_insert = true;
        site.is_native_src = true;
        assert_eq!(site.resolve(), Flag::SEND_NATIVE_CHECK_SRC_BALANCE);
    }

    #[test]
    fn mode_pair_round_trips_through_representative() {
        for amount in [
            AmountMode::Leave,
            AmountMode::SendNative,
            AmountMode::SendNativeAndInsert,
            AmountMode::Insert,
        ] {
            for balance in [
                BalanceMode::None,
                BalanceMode::CheckNative,
                BalanceMode::CheckDestToken,
            ] {
                let flag = Flag::from_modes(amount, balance);
                assert_eq!(flag.amount_mode(), amount);
                assert_eq!(flag.balance_mode(), balance);
            }
        }
    }
}
