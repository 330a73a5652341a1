// SPDX-License-Identifier: MIT

use crate::domain::constants::BPS_FULL;
use crate::domain::error::BuildError;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Which side of the pair the plan's fixed amount sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Sell,
    Buy,
}

/// One pool call inside a hop's fan-out. `pricing_payload` is opaque to the
/// core and consumed only by the adapter that priced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExchange {
    pub exchange: String,
    pub pool_addresses: Vec<Address>,
    pub percent_bps: u64,
    pub src_amount: U256,
    pub dest_amount: U256,
    #[serde(default)]
    pub pricing_payload: Bytes,
}

/// One hop: a src→dest token transition, possibly split across pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub src_token: Address,
    pub dest_token: Address,
    pub exchanges: Vec<SwapExchange>,
}

/// An ordered hop sequence carrying `percent_bps` of the plan's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub percent_bps: u64,
    pub swaps: Vec<Swap>,
}

/// The full swap plan, produced once per build request by the optimizer and
/// read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub src_token: Address,
    pub dest_token: Address,
    pub side: Side,
    /// Total amount on the fixed side (src for SELL, dest for BUY).
    pub amount: U256,
    /// Global slippage bound: minimum out for SELL, maximum in for BUY.
    pub bound: U256,
    pub routes: Vec<Route>,
}

impl SwapPlan {
    /// A plan is "simple" iff it is one route, one hop, one exchange at 100%.
    pub fn is_simple(&self) -> bool {
        self.routes.len() == 1
            && self.routes[0].swaps.len() == 1
            && self.routes[0].swaps[0].exchanges.len() == 1
            && self.routes[0].swaps[0].exchanges[0].percent_bps == BPS_FULL
    }

    /// Validates that percentages sum to 100% at every fan-out level.
    pub fn validate_percents(&self, tolerance_bps: u64) -> Result<(), BuildError> {
        check_sum(
            "routes",
            self.routes.iter().map(|r| r.percent_bps),
            tolerance_bps,
        )?;
        for (r, route) in self.routes.iter().enumerate() {
            for (s, swap) in route.swaps.iter().enumerate() {
                check_sum(
                    &format!("route {r} swap {s}"),
                    swap.exchanges.iter().map(|e| e.percent_bps),
                    tolerance_bps,
                )?;
            }
        }
        Ok(())
    }

    /// Sum of first-hop src amounts across all routes, the denominator for
    /// BUY-side pro-rating.
    pub fn expected_src_total(&self) -> U256 {
        self.routes
            .iter()
            .filter_map(|r| r.swaps.first())
            .flat_map(|s| s.exchanges.iter())
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.src_amount))
    }
}

fn check_sum(
    level: &str,
    percents: impl Iterator<Item = u64>,
    tolerance_bps: u64,
) -> Result<(), BuildError> {
    let sum: u64 = percents.sum();
    if sum.abs_diff(BPS_FULL) > tolerance_bps {
        return Err(BuildError::PercentMismatch {
            level: level.to_string(),
            sum_bps: sum,
            expected_bps: BPS_FULL,
        });
    }
    Ok(())
}
