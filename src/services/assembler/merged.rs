// SPDX-License-Identifier: MIT

//! The merged multi-route arrangement: when several routes share an identical
//! hop prefix or suffix, the shared hops are assembled once (pool splits
//! inside a shared hop merged by summing per-pool percentages) and only the
//! diverging middle section fans out. This removes duplicate calldata and
//! balance re-checks compared to the legacy arrangement.

use super::records::encode_vertical_branch;
use super::BuildContext;
use crate::domain::constants::BPS_FULL;
use crate::domain::error::BuildError;
use crate::domain::plan::SwapPlan;
use alloy::primitives::Address;
use std::collections::HashMap;

/// Lengths of the hop prefix and suffix shared by every route. Divergence is
/// detected hop-by-hop on (srcToken, destToken) equality only; pool sets
/// inside a shared hop may differ.
pub fn shared_affixes(plan: &SwapPlan) -> (usize, usize) {
    let n = plan.routes.len();
    if n < 2 {
        return (0, 0);
    }
    let min_len = plan
        .routes
        .iter()
        .map(|r| r.swaps.len())
        .min()
        .unwrap_or(0);
    let pair = |r: usize, s: usize| {
        let swap = &plan.routes[r].swaps[s];
        (swap.src_token, swap.dest_token)
    };

    let mut prefix = 0;
    'forward: while prefix < min_len {
        let first = pair(0, prefix);
        for r in 1..n {
            if pair(r, prefix) != first {
                break 'forward;
            }
        }
        prefix += 1;
    }

    // Fully identical hop structures collapse entirely into the prefix.
    let all_same_len = plan.routes.iter().all(|r| r.swaps.len() == min_len);
    if prefix == min_len && all_same_len {
        return (prefix, 0);
    }

    let mut suffix = 0;
    while suffix < min_len - prefix {
        let tail0 = plan.routes[0].swaps.len() - 1 - suffix;
        let first = pair(0, tail0);
        let agree = (1..n).all(|r| {
            let tail = plan.routes[r].swaps.len() - 1 - suffix;
            pair(r, tail) == first
        });
        if !agree {
            break;
        }
        suffix += 1;
    }
    (prefix, suffix)
}

/// One pool call of a merged shared hop: the representative call site of the
/// first route contributing it, at the summed plan-wide percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedMember {
    pub route: usize,
    pub swap: usize,
    pub exchange: usize,
    pub percent_bps: u64,
}

/// Merges one shared hop across `sites` (a (route, swap-index) per route).
/// Identical (exchange, pool set) entries collapse by summing their
/// route-weighted percentages; entry order follows first appearance.
pub fn merge_hop(plan: &SwapPlan, sites: &[(usize, usize)]) -> Vec<MergedMember> {
    let mut order: Vec<(String, Vec<Address>)> = Vec::new();
    let mut merged: HashMap<(String, Vec<Address>), MergedMember> = HashMap::new();

    for &(r, s) in sites {
        let route_bps = plan.routes[r].percent_bps;
        for (e, exchange) in plan.routes[r].swaps[s].exchanges.iter().enumerate() {
            let key = (exchange.exchange.clone(), exchange.pool_addresses.clone());
            let scaled = route_bps * exchange.percent_bps / BPS_FULL;
            match merged.get_mut(&key) {
                Some(member) => member.percent_bps += scaled,
                None => {
                    order.push(key.clone());
                    merged.insert(
                        key,
                        MergedMember {
                            route: r,
                            swap: s,
                            exchange: e,
                            percent_bps: scaled,
                        },
                    );
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}

fn merged_hop_bytes(
    ctx: &mut BuildContext<'_>,
    members: &[MergedMember],
    src_token: Address,
    first_hop: bool,
) -> Result<Vec<u8>, BuildError> {
    let mut out = Vec::new();

    // A merged-hop-level deposit converts the whole hop input, valid only
    // when every contributing member takes wrapped input; a mixed hop wraps
    // each needing member's share inside its own branch payload. Same rule
    // for the withdraw on the output side.
    let wrap_sites: Vec<bool> = members
        .iter()
        .map(|m| ctx.wrap.local_wrap(ctx.predicates, m.route, m.swap, m.exchange))
        .collect();
    let unwrap_sites: Vec<bool> = members
        .iter()
        .map(|m| ctx.wrap.local_unwrap(ctx.predicates, m.route, m.swap, m.exchange))
        .collect();
    let every_wrap = !members.is_empty() && wrap_sites.iter().all(|w| *w);
    let every_unwrap = !members.is_empty() && unwrap_sites.iter().all(|w| *w);
    let hop_key = (members[0].route, members[0].swap);

    if every_wrap && ctx.wrap_done.insert(hop_key) {
        out.extend_from_slice(&ctx.deposit_record()?.encode()?);
    }

    let single_full = matches!(members, [only] if only.percent_bps >= BPS_FULL);
    if single_full {
        let only = &members[0];
        let records = ctx.exchange_records(only.route, only.swap, only.exchange)?;
        out.extend_from_slice(&BuildContext::encode_records(&records)?);
    } else {
        let member_src = ctx.branch_src_token(src_token, first_hop);
        let mut group = Vec::new();
        for (i, member) in members.iter().enumerate() {
            let mut records = ctx.exchange_records(member.route, member.swap, member.exchange)?;
            if !every_wrap && wrap_sites[i] {
                records.insert(0, ctx.deposit_record()?);
            }
            if !every_unwrap && unwrap_sites[i] {
                records.push(ctx.withdraw_record()?);
            }
            let payload = BuildContext::encode_records(&records)?;
            group.extend_from_slice(&encode_vertical_branch(
                member.percent_bps,
                member_src,
                &payload,
            )?);
        }
        out.extend_from_slice(&encode_vertical_branch(BPS_FULL, None, &group)?);
    }

    if every_unwrap && ctx.unwrap_done.insert(hop_key) {
        out.extend_from_slice(&ctx.withdraw_record()?.encode()?);
    }

    Ok(out)
}

pub(super) fn assemble(ctx: &mut BuildContext<'_>) -> Result<Vec<u8>, BuildError> {
    let plan = ctx.predicates.plan();
    if plan.routes.len() < 2 {
        return super::legacy::assemble(ctx);
    }
    let (prefix, suffix) = shared_affixes(plan);
    let mut out = Vec::new();

    for h in 0..prefix {
        let sites: Vec<(usize, usize)> = (0..plan.routes.len()).map(|r| (r, h)).collect();
        let members = merge_hop(plan, &sites);
        let src_token = plan.routes[0].swaps[h].src_token;
        out.extend_from_slice(&merged_hop_bytes(ctx, &members, src_token, h == 0)?);
    }

    // Diverging middle: one branch member per route covering its hops between
    // the shared affixes. A route fully consumed by the affixes contributes an
    // empty member so its share still passes through.
    let fully_merged = plan
        .routes
        .iter()
        .all(|route| route.swaps.len() == prefix + suffix);
    if !fully_merged {
        let middle_src = if prefix == 0 {
            plan.src_token
        } else {
            plan.routes[0].swaps[prefix - 1].dest_token
        };
        let mut group = Vec::new();
        for r in 0..plan.routes.len() {
            let hops = plan.routes[r].swaps.len();
            let mut member = Vec::new();
            for s in prefix..hops - suffix {
                member.extend_from_slice(&ctx.swap_bytes(r, s)?);
            }
            let src = ctx.branch_src_token(middle_src, prefix == 0);
            group.extend_from_slice(&encode_vertical_branch(
                plan.routes[r].percent_bps,
                if member.is_empty() { None } else { src },
                &member,
            )?);
        }
        out.extend_from_slice(&encode_vertical_branch(BPS_FULL, None, &group)?);
    }

    for k in (0..suffix).rev() {
        let sites: Vec<(usize, usize)> = (0..plan.routes.len())
            .map(|r| (r, plan.routes[r].swaps.len() - 1 - k))
            .collect();
        let members = merge_hop(plan, &sites);
        let (r0, s0) = sites[0];
        let src_token = plan.routes[r0].swaps[s0].src_token;
        out.extend_from_slice(&merged_hop_bytes(ctx, &members, src_token, false)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{Route, Side, Swap, SwapExchange};
    use alloy::primitives::{address, Bytes, U256};

    fn hop(src: Address, dest: Address, exchanges: Vec<SwapExchange>) -> Swap {
        Swap {
            src_token: src,
            dest_token: dest,
            exchanges,
        }
    }

    fn exchange(id: &str, pool: Address, percent_bps: u64) -> SwapExchange {
        SwapExchange {
            exchange: id.to_string(),
            pool_addresses: vec![pool],
            percent_bps,
            src_amount: U256::from(100u64),
            dest_amount: U256::from(100u64),
            pricing_payload: Bytes::new(),
        }
    }

    fn tokens() -> (Address, Address, Address, Address) {
        (
            address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            address!("cccccccccccccccccccccccccccccccccccccccc"),
            address!("dddddddddddddddddddddddddddddddddddddddd"),
        )
    }

    fn plan(routes: Vec<Route>) -> SwapPlan {
        let (a, _, _, d) = tokens();
        SwapPlan {
            src_token: a,
            dest_token: d,
            side: Side::Sell,
            amount: U256::from(100u64),
            bound: U256::ZERO,
            routes,
        }
    }

    #[test]
    fn affixes_detected_by_token_pairs_only() {
        let (a, b, c, d) = tokens();
        let pool = address!("1111111111111111111111111111111111111111");
        let pool2 = address!("2222222222222222222222222222222222222222");
        // Shared A→B prefix (different pools), diverging middles, shared C→D
        // suffix.
        let plan = plan(vec![
            Route {
                percent_bps: 5_000,
                swaps: vec![
                    hop(a, b, vec![exchange("uni", pool, BPS_FULL)]),
                    hop(b, c, vec![exchange("uni", pool, BPS_FULL)]),
                    hop(c, d, vec![exchange("uni", pool, BPS_FULL)]),
                ],
            },
            Route {
                percent_bps: 5_000,
                swaps: vec![
                    hop(a, b, vec![exchange("sushi", pool2, BPS_FULL)]),
                    hop(b, d, vec![exchange("sushi", pool2, BPS_FULL)]),
                    hop(c, d, vec![exchange("sushi", pool2, BPS_FULL)]),
                ],
            },
        ]);
        assert_eq!(shared_affixes(&plan), (1, 1));
    }

    #[test]
    fn identical_routes_collapse_entirely() {
        let (a, b, _, _) = tokens();
        let pool = address!("1111111111111111111111111111111111111111");
        let route = Route {
            percent_bps: 5_000,
            swaps: vec![hop(a, b, vec![exchange("uni", pool, BPS_FULL)])],
        };
        let plan = plan(vec![route.clone(), route]);
        assert_eq!(shared_affixes(&plan), (1, 0));
    }

    #[test]
    fn merge_hop_sums_route_weighted_percents() {
        let (a, b, _, _) = tokens();
        let pool = address!("1111111111111111111111111111111111111111");
        let pool2 = address!("2222222222222222222222222222222222222222");
        let plan = plan(vec![
            Route {
                percent_bps: 6_000,
                swaps: vec![hop(
                    a,
                    b,
                    vec![exchange("uni", pool, BPS_FULL)],
                )],
            },
            Route {
                percent_bps: 4_000,
                swaps: vec![hop(
                    a,
                    b,
                    vec![
                        exchange("uni", pool, 5_000),
                        exchange("sushi", pool2, 5_000),
                    ],
                )],
            },
        ]);
        let members = merge_hop(&plan, &[(0, 0), (1, 0)]);
        assert_eq!(members.len(), 2);
        // uni pool: 60% + 40%*50% = 80%; sushi: 40%*50% = 20%.
        assert_eq!(members[0].percent_bps, 8_000);
        assert_eq!(members[0].route, 0);
        assert_eq!(members[1].percent_bps, 2_000);
        assert_eq!(members[1].route, 1);
        assert_eq!(
            members.iter().map(|m| m.percent_bps).sum::<u64>(),
            BPS_FULL
        );
    }
}
