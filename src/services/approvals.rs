// SPDX-License-Identifier: MIT

//! Batches allowance checks for every distinct (token, spender) pair the plan
//! implies and marks the exchanges whose records need a prepended approve.

use crate::domain::constants::is_native;
use crate::domain::descriptor::ApprovalRequirement;
use crate::domain::error::ApprovalCheckError;
use crate::services::predicates::PlanPredicates;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// External collaborator performing the batched on-chain allowance read.
/// One collective call for all pairs; any failure aborts the build.
#[async_trait]
pub trait AllowanceSource: Send + Sync {
    async fn allowances(
        &self,
        owner: Address,
        pairs: &[ApprovalRequirement],
    ) -> Result<Vec<U256>, ApprovalCheckError>;
}

/// Exchanges (by route/swap/exchange index) that need an approve record.
pub type ApprovalSet = HashSet<(usize, usize, usize)>;

/// The (token, spender) pair one exchange needs approved, if any. Exchanges
/// that pull tokens via transfer-before-swap or spend raw native need none.
pub fn approval_pair(
    predicates: &PlanPredicates<'_>,
    wrapped_native: Address,
    route: usize,
    swap: usize,
    exchange: usize,
) -> Option<ApprovalRequirement> {
    let call = predicates.call(route, swap, exchange);
    if call.descriptor.transfer_src_token_before_swap.is_some() {
        return None;
    }
    if let Some(explicit) = call.descriptor.approval {
        return Some(explicit);
    }
    let src = predicates.plan().routes[route].swaps[swap].src_token;
    let token = if is_native(src) {
        if !call.need_wrap_native {
            return None;
        }
        call.descriptor.weth_address_override.unwrap_or(wrapped_native)
    } else {
        src
    };
    Some(ApprovalRequirement {
        token,
        spender: call.descriptor.target_address,
    })
}

/// Checks allowances in one batched read and returns the exchanges whose
/// current allowance does not cover the summed requirement of their pair.
pub async fn resolve_approvals(
    source: &dyn AllowanceSource,
    owner: Address,
    wrapped_native: Address,
    predicates: &PlanPredicates<'_>,
) -> Result<ApprovalSet, ApprovalCheckError> {
    let plan = predicates.plan();
    let mut pairs: Vec<ApprovalRequirement> = Vec::new();
    let mut required: HashMap<ApprovalRequirement, U256> = HashMap::new();
    let mut sites: HashMap<ApprovalRequirement, Vec<(usize, usize, usize)>> = HashMap::new();

    for (r, route) in plan.routes.iter().enumerate() {
        for (s, swap) in route.swaps.iter().enumerate() {
            for e in 0..swap.exchanges.len() {
                if let Some(pair) = approval_pair(predicates, wrapped_native, r, s, e) {
                    let amount = predicates.call(r, s, e).src_amount;
                    let entry = required.entry(pair).or_insert(U256::ZERO);
                    *entry = entry.saturating_add(amount);
                    if !sites.contains_key(&pair) {
                        pairs.push(pair);
                    }
                    sites.entry(pair).or_default().push((r, s, e));
                }
            }
        }
    }

    if pairs.is_empty() {
        return Ok(ApprovalSet::new());
    }

    let allowances = source.allowances(owner, &pairs).await?;
    if allowances.len() != pairs.len() {
        return Err(ApprovalCheckError::LengthMismatch {
            got: allowances.len(),
            expected: pairs.len(),
        });
    }

    let mut needing = ApprovalSet::new();
    for (pair, allowance) in pairs.iter().zip(allowances) {
        if allowance < required[pair] {
            needing.extend(sites[pair].iter().copied());
        }
    }
    debug!(
        pairs = pairs.len(),
        missing = needing.len(),
        "approval batch resolved"
    );
    Ok(needing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{BPS_FULL, WETH_MAINNET};
    use crate::domain::descriptor::{DexCallDescriptor, ResolvedDexCall};
    use crate::domain::plan::{Route, Side, Swap, SwapExchange, SwapPlan};
    use crate::services::predicates::CallGrid;
    use alloy::primitives::{address, Bytes};

    struct StaticAllowances(Vec<U256>);

    #[async_trait]
    impl AllowanceSource for StaticAllowances {
        async fn allowances(
            &self,
            _owner: Address,
            pairs: &[ApprovalRequirement],
        ) -> Result<Vec<U256>, ApprovalCheckError> {
            assert!(!pairs.is_empty());
            Ok(self.0.clone())
        }
    }

    fn plan_and_calls(transfer_before: bool) -> (SwapPlan, CallGrid) {
        let a = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let b = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let pool = address!("1111111111111111111111111111111111111111");
        let plan = SwapPlan {
            src_token: a,
            dest_token: b,
            side: Side::Sell,
            amount: U256::from(1_000u64),
            bound: U256::ZERO,
            routes: vec![Route {
                percent_bps: BPS_FULL,
                swaps: vec![Swap {
                    src_token: a,
                    dest_token: b,
                    exchanges: vec![
                        SwapExchange {
                            exchange: "x".to_string(),
                            pool_addresses: vec![pool],
                            percent_bps: 5_000,
                            src_amount: U256::from(500u64),
                            dest_amount: U256::from(1u64),
                            pricing_payload: Bytes::new(),
                        },
                        SwapExchange {
                            exchange: "x".to_string(),
                            pool_addresses: vec![pool],
                            percent_bps: 5_000,
                            src_amount: U256::from(500u64),
                            dest_amount: U256::from(1u64),
                            pricing_payload: Bytes::new(),
                        },
                    ],
                }],
            }],
        };
        let mut descriptor = DexCallDescriptor::plain(pool, Bytes::from(vec![0u8; 4]));
        if transfer_before {
            descriptor.transfer_src_token_before_swap = Some(pool);
        }
        let call = ResolvedDexCall {
            descriptor,
            need_wrap_native: false,
            src_amount: U256::from(500u64),
            dest_amount: U256::from(1u64),
        };
        let calls = vec![vec![vec![call.clone(), call]]];
        (plan, calls)
    }

    #[tokio::test]
    async fn pair_requirement_is_summed_across_exchanges() {
        let (plan, calls) = plan_and_calls(false);
        let predicates = PlanPredicates::new(&plan, &calls);
        // 999 < 500 + 500, so both exchanges get marked.
        let source = StaticAllowances(vec![U256::from(999u64)]);
        let needing = resolve_approvals(&source, Address::ZERO, WETH_MAINNET, &predicates)
            .await
            .unwrap();
        assert_eq!(needing.len(), 2);

        let source = StaticAllowances(vec![U256::from(1_000u64)]);
        let needing = resolve_approvals(&source, Address::ZERO, WETH_MAINNET, &predicates)
            .await
            .unwrap();
        assert!(needing.is_empty());
    }

    #[tokio::test]
    async fn transfer_before_swap_skips_approval() {
        let (plan, calls) = plan_and_calls(true);
        let predicates = PlanPredicates::new(&plan, &calls);
        // The source would panic on an empty batch; it must not be called.
        let source = StaticAllowances(vec![]);
        let needing = resolve_approvals(&source, Address::ZERO, WETH_MAINNET, &predicates)
            .await
            .unwrap();
        assert!(needing.is_empty());
    }

    #[tokio::test]
    async fn short_response_is_an_error() {
        let (plan, calls) = plan_and_calls(false);
        let predicates = PlanPredicates::new(&plan, &calls);
        let source = StaticAllowances(vec![]);
        let err = resolve_approvals(&source, Address::ZERO, WETH_MAINNET, &predicates)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalCheckError::LengthMismatch { .. }));
    }
}
