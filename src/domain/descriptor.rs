// SPDX-License-Identifier: MIT

use crate::domain::plan::{Swap, SwapExchange, SwapPlan};
use alloy::primitives::{Address, Bytes, U256};
use std::fmt;
use std::sync::Arc;

/// Marks calldata the executor must treat specially instead of as a plain
/// low-level call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpecialFlag {
    SwapOnUniswapFork = 1,
    BuyOnUniswapFork = 2,
    SwapOnBalancerV2 = 3,
}

impl SpecialFlag {
    pub fn wire_value(self) -> u8 {
        self as u8
    }
}

/// A descriptor field that is either a constant or derived from the call-site
/// context. Computed fields are resolved exactly once, before flag resolution.
#[derive(Clone)]
pub enum DescriptorField<T> {
    Constant(T),
    Computed(Arc<dyn Fn(&SwapPlan, &Swap, &SwapExchange) -> T + Send + Sync>),
}

impl<T: Clone> DescriptorField<T> {
    pub fn resolve(&self, plan: &SwapPlan, swap: &Swap, exchange: &SwapExchange) -> T {
        match self {
            DescriptorField::Constant(v) => v.clone(),
            DescriptorField::Computed(f) => f(plan, swap, exchange),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DescriptorField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorField::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            DescriptorField::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T> From<T> for DescriptorField<T> {
    fn from(v: T) -> Self {
        DescriptorField::Constant(v)
    }
}

/// What a pool adapter produces for one `SwapExchange`. Opaque to the core
/// apart from the fields the flag resolver and assembler read.
#[derive(Debug, Clone)]
pub struct DexCallDescriptor {
    pub target_address: Address,
    pub calldata: Bytes,
    /// Whether the pool call takes an explicit recipient parameter.
    pub dex_has_recipient: bool,
    /// Whether the pool expects wrapped-native input/output where the plan
    /// says native. Sometimes context-dependent, hence a field.
    pub need_wrap_native: DescriptorField<bool>,
    pub special_flag: Option<SpecialFlag>,
    pub supports_insert_from_amount: bool,
    /// True when the traded amount does not appear in `calldata` at all.
    pub amount_not_encoded_in_calldata: bool,
    pub return_amount_pos: Option<u8>,
    /// Explicit override for where the from-amount sits in `calldata`;
    /// when absent the assembler locates the amount bytes itself.
    pub insert_from_amount_pos: Option<u16>,
    pub approval: Option<ApprovalRequirement>,
    /// Calldata to run before the swap when the nominal input token differs
    /// from the true input (forces a balance-checked native send).
    pub pre_swap_unwrap_calldata: Option<Bytes>,
    /// Pull src tokens into this address before the swap instead of approving.
    pub transfer_src_token_before_swap: Option<Address>,
    pub weth_address_override: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApprovalRequirement {
    pub token: Address,
    pub spender: Address,
}

impl DexCallDescriptor {
    /// Minimal descriptor for a plain pool call; tests and adapters fill in
    /// the rest as needed.
    pub fn plain(target_address: Address, calldata: Bytes) -> Self {
        Self {
            target_address,
            calldata,
            dex_has_recipient: true,
            need_wrap_native: DescriptorField::Constant(false),
            special_flag: None,
            supports_insert_from_amount: true,
            amount_not_encoded_in_calldata: false,
            return_amount_pos: None,
            insert_from_amount_pos: None,
            approval: None,
            pre_swap_unwrap_calldata: None,
            transfer_src_token_before_swap: None,
            weth_address_override: None,
        }
    }
}

/// Descriptor with every context-dependent field collapsed to a value, plus
/// the amounts the compiler settled on for its exchange.
#[derive(Debug, Clone)]
pub struct ResolvedDexCall {
    pub descriptor: DexCallDescriptor,
    pub need_wrap_native: bool,
    pub src_amount: U256,
    pub dest_amount: U256,
}

impl ResolvedDexCall {
    pub fn force_prevent_insert(&self) -> bool {
        self.descriptor.amount_not_encoded_in_calldata
            || (self.descriptor.special_flag.is_some()
                && !self.descriptor.supports_insert_from_amount)
    }
}

/// Precomputed wrap/unwrap material from the native-asset wrapper
/// collaborator: calldata for deposit/withdraw against the wrapped token.
#[derive(Debug, Clone)]
pub struct NativeWrapInfo {
    pub wrapped_token: Address,
    pub deposit_amount: U256,
    pub deposit_calldata: Bytes,
    pub withdraw_amount: U256,
    pub withdraw_calldata: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::BPS_FULL;
    use crate::domain::plan::Side;
    use alloy::primitives::address;

    #[test]
    fn computed_field_sees_call_site() {
        let plan = SwapPlan {
            src_token: address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            dest_token: address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            side: Side::Sell,
            amount: U256::from(1u64),
            bound: U256::ZERO,
            routes: vec![],
        };
        let swap = Swap {
            src_token: plan.src_token,
            dest_token: plan.dest_token,
            exchanges: vec![],
        };
        let exchange = SwapExchange {
            exchange: "curve".to_string(),
            pool_addresses: vec![],
            percent_bps: BPS_FULL,
            src_amount: U256::from(5u64),
            dest_amount: U256::ZERO,
            pricing_payload: Bytes::new(),
        };

        let field: DescriptorField<bool> =
            DescriptorField::Computed(Arc::new(|_, _, e| e.src_amount > U256::from(1u64)));
        assert!(field.resolve(&plan, &swap, &exchange));

        let constant: DescriptorField<bool> = false.into();
        assert!(!constant.resolve(&plan, &swap, &exchange));
    }

    #[test]
    fn force_prevent_insert_rules() {
        let base = DexCallDescriptor::plain(
            address!("1111111111111111111111111111111111111111"),
            Bytes::from(vec![0u8; 8]),
        );

        let mut resolved = ResolvedDexCall {
            descriptor: base.clone(),
            need_wrap_native: false,
            src_amount: U256::ZERO,
            dest_amount: U256::ZERO,
        };
        assert!(!resolved.force_prevent_insert());

        resolved.descriptor.amount_not_encoded_in_calldata = true;
        assert!(resolved.force_prevent_insert());

        resolved.descriptor.amount_not_encoded_in_calldata = false;
        resolved.descriptor.special_flag = Some(SpecialFlag::SwapOnUniswapFork);
        resolved.descriptor.supports_insert_from_amount = false;
        assert!(resolved.force_prevent_insert());

        // Special flag alone does not prevent insertion.
        resolved.descriptor.supports_insert_from_amount = true;
        assert!(!resolved.force_prevent_insert());
    }
}
