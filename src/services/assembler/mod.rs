// SPDX-License-Identifier: MIT

//! Bottom-up assembly of the executor payload. `BuildContext` owns the
//! per-build bookkeeping (wrap/unwrap dedup, approvals, resolved flags) and is
//! discarded with the build; the two assembly variants share its record
//! builders and differ only in how they arrange routes.

pub mod legacy;
pub mod merged;
pub mod records;

use crate::common::encode::{approve_calldata, find_amount, transfer_calldata, ABI_CALL_AMOUNT_POS};
use crate::domain::constants::{is_native, BPS_FULL, ENVELOPE_PREFIX_LEN};
use crate::domain::descriptor::NativeWrapInfo;
use crate::domain::error::BuildError;
use crate::services::approvals::{approval_pair, ApprovalSet};
use crate::services::flags::{Flag, FlagGrid};
use crate::services::predicates::PlanPredicates;
use crate::services::selector::ExecutorVariant;
use crate::services::wrap::WrapPlan;
use alloy::primitives::{Address, U256};
use records::{encode_vertical_branch, AssembledCallRecord};
use std::collections::HashSet;
use tracing::debug;

pub struct BuildContext<'a> {
    pub predicates: &'a PlanPredicates<'a>,
    pub wrap: WrapPlan,
    pub flags: FlagGrid,
    pub approvals: ApprovalSet,
    pub wrap_info: Option<&'a NativeWrapInfo>,
    pub wrapped_native: Address,
    wrap_done: HashSet<(usize, usize)>,
    unwrap_done: HashSet<(usize, usize)>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        predicates: &'a PlanPredicates<'a>,
        wrap: WrapPlan,
        flags: FlagGrid,
        approvals: ApprovalSet,
        wrap_info: Option<&'a NativeWrapInfo>,
        wrapped_native: Address,
    ) -> Self {
        Self {
            predicates,
            wrap,
            flags,
            approvals,
            wrap_info,
            wrapped_native,
            wrap_done: HashSet::new(),
            unwrap_done: HashSet::new(),
        }
    }

    /// Runs the selected assembly variant to completion and wraps the result
    /// in the outermost envelope.
    pub fn assemble(mut self, variant: ExecutorVariant) -> Result<Vec<u8>, BuildError> {
        let body = match variant {
            ExecutorVariant::Legacy => legacy::assemble(&mut self)?,
            ExecutorVariant::MergedMultiRoute => merged::assemble(&mut self)?,
        };
        let body = self.with_root_records(body)?;
        debug!(bytes = body.len(), ?variant, "payload assembled");
        envelope(&body)
    }

    fn wrap_material(&self) -> Result<&NativeWrapInfo, BuildError> {
        self.wrap_info.ok_or_else(|| {
            BuildError::InvalidPlan(
                "native wrap/unwrap required but no wrap descriptor supplied".to_string(),
            )
        })
    }

    /// Deposit record: executor attaches the native value, wrapped token
    /// mints to it.
    fn deposit_record(&self) -> Result<AssembledCallRecord, BuildError> {
        let info = self.wrap_material()?;
        Ok(AssembledCallRecord::simple(
            info.wrapped_token,
            info.deposit_calldata.to_vec(),
            Flag::SEND_NATIVE_DONT_CHECK,
        ))
    }

    /// Withdraw record. When the precomputed calldata carries a locatable
    /// amount the executor patches the actual wrapped balance over it;
    /// otherwise the calldata runs as-is.
    fn withdraw_record(&self) -> Result<AssembledCallRecord, BuildError> {
        let info = self.wrap_material()?;
        let calldata = info.withdraw_calldata.to_vec();
        let mut record = AssembledCallRecord::simple(
            info.wrapped_token,
            calldata,
            Flag::DONT_INSERT_DONT_CHECK,
        );
        if let Some(pos) = find_amount(&record.calldata, info.withdraw_amount) {
            if let Ok(pos) = u16::try_from(pos) {
                record.from_amount_pos = pos;
                record.flag = Flag::INSERT_DONT_CHECK;
            }
        }
        Ok(record)
    }

    /// Token whose balance the executor reads for a dest-token check at this
    /// site. A native plan token is measured through its wrapped form.
    fn balance_token(&self, route: usize, swap: usize, exchange: usize) -> Address {
        let plan = self.predicates.plan();
        let dest = plan.routes[route].swaps[swap].dest_token;
        if is_native(dest) {
            let call = self.predicates.call(route, swap, exchange);
            call.descriptor
                .weth_address_override
                .unwrap_or(self.wrapped_native)
        } else {
            dest
        }
    }

    /// Token identifying a branch member's share of the input, or None when
    /// the input is raw native (split by attached value).
    fn branch_src_token(&self, src_token: Address, first_hop: bool) -> Option<Address> {
        if is_native(src_token) {
            if self.wrap.root_wrap && first_hop {
                Some(self.wrapped_native)
            } else {
                None
            }
        } else {
            Some(src_token)
        }
    }

    /// All records for one exchange call site, in executor order: approval,
    /// transfer-before-swap, pre-swap unwrap, the dex call itself, then a
    /// residual transfer-out when the plan ends here without a recipient.
    fn exchange_records(
        &mut self,
        route: usize,
        swap: usize,
        exchange: usize,
    ) -> Result<Vec<AssembledCallRecord>, BuildError> {
        let predicates = self.predicates;
        let plan = predicates.plan();
        let swap_node = &plan.routes[route].swaps[swap];
        let call = predicates.call(route, swap, exchange);
        let flag = self.flags[route][swap][exchange];
        let mut out = Vec::new();

        if self.approvals.contains(&(route, swap, exchange)) {
            if let Some(pair) = approval_pair(predicates, self.wrapped_native, route, swap, exchange)
            {
                out.push(AssembledCallRecord::simple(
                    pair.token,
                    approve_calldata(pair.spender, U256::MAX),
                    Flag::DONT_INSERT_DONT_CHECK,
                ));
            }
        }

        if let Some(to) = call.descriptor.transfer_src_token_before_swap {
            let token = if is_native(swap_node.src_token) {
                call.descriptor
                    .weth_address_override
                    .unwrap_or(self.wrapped_native)
            } else {
                swap_node.src_token
            };
            let mut transfer = AssembledCallRecord::simple(
                token,
                transfer_calldata(to, call.src_amount),
                Flag::INSERT_DONT_CHECK,
            );
            transfer.from_amount_pos = ABI_CALL_AMOUNT_POS;
            out.push(transfer);
        }

        if let Some(pre) = &call.descriptor.pre_swap_unwrap_calldata {
            out.push(AssembledCallRecord::simple(
                call.descriptor
                    .weth_address_override
                    .unwrap_or(self.wrapped_native),
                pre.to_vec(),
                Flag::DONT_INSERT_DONT_CHECK,
            ));
        }

        let balance_token = self.balance_token(route, swap, exchange);
        out.push(AssembledCallRecord::from_dex_call(call, flag, balance_token)?);

        let is_plan_tail = predicates.is_last_hop(route, swap);
        if is_plan_tail
            && !call.descriptor.dex_has_recipient
            && !is_native(swap_node.dest_token)
        {
            // The executor holds the output; forward the residual balance to
            // the caller (zero address is the executor's caller sentinel).
            let mut residual = AssembledCallRecord::simple(
                swap_node.dest_token,
                transfer_calldata(Address::ZERO, U256::ZERO),
                Flag::INSERT_DONT_CHECK,
            );
            residual.from_amount_pos = ABI_CALL_AMOUNT_POS;
            out.push(residual);
        }

        Ok(out)
    }

    fn encode_records(records: &[AssembledCallRecord]) -> Result<Vec<u8>, BuildError> {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&record.encode()?);
        }
        Ok(out)
    }

    /// One hop's bytes: a bare record sequence when the hop has a single
    /// exchange, otherwise per-sibling branch members wrapped into a single
    /// enclosing vertical-branch record.
    ///
    /// A hop-level deposit converts the hop's entire input, so it is only
    /// valid when every sibling takes wrapped input; a mixed fan-out wraps
    /// each needing sibling's share inside its own branch member instead,
    /// leaving raw native for the siblings that spend it directly. Same rule
    /// for the withdraw on the output side.
    pub fn swap_bytes(&mut self, route: usize, swap: usize) -> Result<Vec<u8>, BuildError> {
        let predicates = self.predicates;
        let plan = predicates.plan();
        let swap_node = &plan.routes[route].swaps[swap];
        let n = swap_node.exchanges.len();

        let wrap_sites: Vec<bool> = (0..n)
            .map(|e| self.wrap.local_wrap(predicates, route, swap, e))
            .collect();
        let unwrap_sites: Vec<bool> = (0..n)
            .map(|e| self.wrap.local_unwrap(predicates, route, swap, e))
            .collect();
        let every_wrap = n > 0 && wrap_sites.iter().all(|w| *w);
        let every_unwrap = n > 0 && unwrap_sites.iter().all(|w| *w);

        let mut out = Vec::new();

        if every_wrap && self.wrap_done.insert((route, swap)) {
            out.extend_from_slice(&self.deposit_record()?.encode()?);
        }

        if n == 1 {
            out.extend_from_slice(&Self::encode_records(&self.exchange_records(route, swap, 0)?)?);
        } else {
            let mut group = Vec::new();
            let member_src =
                self.branch_src_token(swap_node.src_token, predicates.is_first_hop(swap));
            for e in 0..n {
                let mut records = self.exchange_records(route, swap, e)?;
                if !every_wrap && wrap_sites[e] {
                    records.insert(0, self.deposit_record()?);
                }
                if !every_unwrap && unwrap_sites[e] {
                    records.push(self.withdraw_record()?);
                }
                let member = Self::encode_records(&records)?;
                let percent = plan.routes[route].swaps[swap].exchanges[e].percent_bps;
                group.extend_from_slice(&encode_vertical_branch(percent, member_src, &member)?);
            }
            out.extend_from_slice(&encode_vertical_branch(BPS_FULL, None, &group)?);
        }

        if every_unwrap && self.unwrap_done.insert((route, swap)) {
            out.extend_from_slice(&self.withdraw_record()?.encode()?);
        }

        Ok(out)
    }

    /// Horizontal sequencing: a route is its hops concatenated in order.
    pub fn route_bytes(&mut self, route: usize) -> Result<Vec<u8>, BuildError> {
        let hops = self.predicates.plan().routes[route].swaps.len();
        let mut out = Vec::new();
        for s in 0..hops {
            out.extend_from_slice(&self.swap_bytes(route, s)?);
        }
        Ok(out)
    }

    /// Root-level wrap/unwrap/send-native records around the assembled body.
    fn with_root_records(&self, body: Vec<u8>) -> Result<Vec<u8>, BuildError> {
        let plan = self.predicates.plan();
        let mut out = Vec::new();
        if self.wrap.root_wrap {
            out.extend_from_slice(&self.deposit_record()?.encode()?);
        }
        out.extend_from_slice(&body);
        if self.wrap.root_unwrap {
            out.extend_from_slice(&self.withdraw_record()?.encode()?);
        }
        if is_native(plan.dest_token)
            && (self.wrap.root_unwrap || self.predicates.any_last_hop_without_recipient())
        {
            // Executor ends up holding native output; hand it to the caller.
            out.extend_from_slice(
                &AssembledCallRecord::simple(
                    Address::ZERO,
                    Vec::new(),
                    Flag::SEND_NATIVE_DONT_CHECK,
                )
                .encode()?,
            );
        }
        Ok(out)
    }
}

/// The outermost length-prefixed envelope the executor entry point expects.
pub fn envelope(body: &[u8]) -> Result<Vec<u8>, BuildError> {
    let len = u32::try_from(body.len())
        .map_err(|_| BuildError::FieldOverflow("payload exceeds u32 length".to_string()))?;
    let mut out = Vec::with_capacity(ENVELOPE_PREFIX_LEN + body.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(out)
}
