// SPDX-License-Identifier: MIT

//! Turns each `SwapExchange` into a `DexCallDescriptor` by invoking the
//! external pool adapter registered for its exchange id. Compilation fans out
//! concurrently across exchanges (each writes only its own slot) and joins
//! before anything downstream runs; results are returned in plan order.

use crate::domain::descriptor::{DexCallDescriptor, ResolvedDexCall};
use crate::domain::error::AdapterError;
use crate::domain::plan::{Side, Swap, SwapExchange, SwapPlan};
use crate::services::predicates::CallGrid;
use alloy::primitives::U256;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-exchange compile input. Amount fixing is already applied: for SELL the
/// src amount is final and the dest amount a minimal placeholder; for BUY the
/// dest amount is final and `src_amount` may be pro-rated by the global bound.
pub struct CompileRequest<'a> {
    pub plan: &'a SwapPlan,
    pub swap: &'a Swap,
    pub exchange: &'a SwapExchange,
    pub side: Side,
    pub global_bound: U256,
    pub src_amount: U256,
    pub dest_amount: U256,
}

/// One of the ~150 external pool adapters. Implementations price off-core;
/// this crate only consumes the descriptor.
#[async_trait]
pub trait DexAdapter: Send + Sync {
    fn exchange_id(&self) -> &str;

    async fn compile(&self, request: CompileRequest<'_>)
        -> Result<DexCallDescriptor, AdapterError>;
}

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn DexAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn DexAdapter>) {
        self.adapters
            .insert(adapter.exchange_id().to_string(), adapter);
    }

    pub fn get(&self, exchange_id: &str) -> Result<&Arc<dyn DexAdapter>, AdapterError> {
        self.adapters
            .get(exchange_id)
            .ok_or_else(|| AdapterError::UnknownExchange(exchange_id.to_string()))
    }
}

/// Dest placeholder for SELL compiles; actual minimum-out enforcement happens
/// in the executor against the plan bound.
const MIN_DEST_PLACEHOLDER: u64 = 1;

/// Amounts the compiler fixes for one exchange before calling its adapter.
fn fixed_amounts(plan: &SwapPlan, exchange: &SwapExchange, is_very_first: bool) -> (U256, U256) {
    match plan.side {
        Side::Sell => (exchange.src_amount, U256::from(MIN_DEST_PLACEHOLDER)),
        Side::Buy => {
            // Only the very first exchange of the very first swap absorbs the
            // global slippage headroom; every later hop keeps its priced
            // amounts.
            let src = if is_very_first {
                let total = plan.expected_src_total();
                if total.is_zero() {
                    exchange.src_amount
                } else {
                    exchange
                        .src_amount
                        .saturating_mul(plan.bound)
                        .checked_div(total)
                        .unwrap_or(exchange.src_amount)
                }
            } else {
                exchange.src_amount
            };
            (src, exchange.dest_amount)
        }
    }
}

/// Compiles every exchange of the plan, concurrently up to `concurrency`,
/// and returns resolved calls addressed as `grid[route][swap][exchange]`.
/// Any adapter failure aborts the whole build; nothing is retried here.
pub async fn compile_plan(
    registry: &AdapterRegistry,
    plan: &SwapPlan,
    concurrency: usize,
) -> Result<CallGrid, AdapterError> {
    struct Job<'a> {
        route: usize,
        swap_idx: usize,
        exchange_idx: usize,
        swap: &'a Swap,
        exchange: &'a SwapExchange,
        adapter: Arc<dyn DexAdapter>,
        src_amount: U256,
        dest_amount: U256,
    }

    let mut jobs = Vec::new();
    for (r, route) in plan.routes.iter().enumerate() {
        for (s, swap) in route.swaps.iter().enumerate() {
            for (e, exchange) in swap.exchanges.iter().enumerate() {
                let adapter = registry.get(&exchange.exchange)?.clone();
                let is_very_first = r == 0 && s == 0 && e == 0;
                let (src_amount, dest_amount) = fixed_amounts(plan, exchange, is_very_first);
                jobs.push(Job {
                    route: r,
                    swap_idx: s,
                    exchange_idx: e,
                    swap,
                    exchange,
                    adapter,
                    src_amount,
                    dest_amount,
                });
            }
        }
    }
    debug!(exchanges = jobs.len(), "compiling dex calls");

    let mut results: Vec<((usize, usize, usize), ResolvedDexCall)> = stream::iter(jobs)
        .map(|job| async move {
            let request = CompileRequest {
                plan,
                swap: job.swap,
                exchange: job.exchange,
                side: plan.side,
                global_bound: plan.bound,
                src_amount: job.src_amount,
                dest_amount: job.dest_amount,
            };
            let descriptor = job.adapter.compile(request).await?;
            // Context-dependent fields collapse here, once, before flags.
            let need_wrap_native =
                descriptor
                    .need_wrap_native
                    .resolve(plan, job.swap, job.exchange);
            Ok::<_, AdapterError>((
                (job.route, job.swap_idx, job.exchange_idx),
                ResolvedDexCall {
                    descriptor,
                    need_wrap_native,
                    src_amount: job.src_amount,
                    dest_amount: job.dest_amount,
                },
            ))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    // Join point: re-establish plan order before aggregation.
    results.sort_by_key(|(idx, _)| *idx);
    let mut grid: CallGrid = plan
        .routes
        .iter()
        .map(|route| route.swaps.iter().map(|_| Vec::new()).collect())
        .collect();
    for ((r, s, _), call) in results {
        grid[r][s].push(call);
    }
    Ok(grid)
}
