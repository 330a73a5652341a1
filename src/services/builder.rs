// SPDX-License-Identifier: MIT

//! One `PayloadBuilder` per deployment wires the adapter registry and the
//! allowance source together and runs the full pipeline: compile dex calls,
//! decide wrap hoisting, resolve flags, resolve approvals, assemble. No stage
//! retries; any failure aborts the build and the caller may rebuild.

use crate::app::config::BuildSettings;
use crate::domain::descriptor::NativeWrapInfo;
use crate::domain::error::PayloadError;
use crate::domain::plan::SwapPlan;
use crate::services::approvals::{resolve_approvals, AllowanceSource};
use crate::services::assembler::BuildContext;
use crate::services::compiler::{compile_plan, AdapterRegistry};
use crate::services::flags::resolve_plan_flags;
use crate::services::predicates::PlanPredicates;
use crate::services::selector::{select_executor, ExecutorChoice};
use crate::services::wrap::WrapPlan;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PayloadBuilder {
    registry: AdapterRegistry,
    allowance_source: Arc<dyn AllowanceSource>,
    settings: BuildSettings,
}

/// The finished build: the exact argument bytes for the selected executor's
/// fixed entry point, plus which executor to call.
#[derive(Debug, Clone)]
pub struct BuiltPayload {
    pub executor: ExecutorChoice,
    pub payload: Vec<u8>,
}

impl PayloadBuilder {
    pub fn new(
        registry: AdapterRegistry,
        allowance_source: Arc<dyn AllowanceSource>,
        settings: BuildSettings,
    ) -> Self {
        Self {
            registry,
            allowance_source,
            settings,
        }
    }

    pub async fn build(
        &self,
        plan: &SwapPlan,
        wrap_info: Option<&NativeWrapInfo>,
    ) -> Result<BuiltPayload, PayloadError> {
        plan.validate_percents(self.settings.percent_tolerance_bps)
            .map_err(PayloadError::Build)?;
        let wrapped_native = self.settings.wrapped_native().map_err(PayloadError::Build)?;

        let choice = select_executor(
            plan,
            self.settings.legacy_executor,
            self.settings.merged_executor,
        );
        debug!(variant = ?choice.variant, routes = plan.routes.len(), "executor selected");

        let calls = compile_plan(&self.registry, plan, self.settings.adapter_concurrency).await?;
        let predicates = PlanPredicates::new(plan, &calls);

        let wrap = WrapPlan::decide(&predicates);
        let flags = resolve_plan_flags(&predicates, &wrap);
        let approvals = resolve_approvals(
            self.allowance_source.as_ref(),
            choice.address,
            wrapped_native,
            &predicates,
        )
        .await?;

        let context = BuildContext::new(
            &predicates,
            wrap,
            flags,
            approvals,
            wrap_info,
            wrapped_native,
        );
        let payload = context.assemble(choice.variant)?;
        debug!(payload = %hex::encode(&payload), "assembled bytes");
        info!(
            bytes = payload.len(),
            variant = ?choice.variant,
            side = ?plan.side,
            "swap payload built"
        );
        Ok(BuiltPayload {
            executor: choice,
            payload,
        })
    }
}
