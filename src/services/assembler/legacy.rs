// SPDX-License-Identifier: MIT

//! The legacy arrangement: each route assembled independently, multi-route
//! plans fanned out through one outer vertical branch keyed by route percents.

use super::records::encode_vertical_branch;
use super::BuildContext;
use crate::domain::constants::BPS_FULL;
use crate::domain::error::BuildError;

pub(super) fn assemble(ctx: &mut BuildContext<'_>) -> Result<Vec<u8>, BuildError> {
    let plan = ctx.predicates.plan();
    match plan.routes.len() {
        0 => Err(BuildError::InvalidPlan("plan has no routes".to_string())),
        1 => ctx.route_bytes(0),
        n => {
            let mut group = Vec::new();
            for r in 0..n {
                let member = ctx.route_bytes(r)?;
                let src = ctx.branch_src_token(plan.src_token, true);
                group.extend_from_slice(&encode_vertical_branch(
                    plan.routes[r].percent_bps,
                    src,
                    &member,
                )?);
            }
            encode_vertical_branch(BPS_FULL, None, &group)
        }
    }
}
