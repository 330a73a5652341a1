// SPDX-License-Identifier: MIT

use crate::domain::constants::{self, DEFAULT_PERCENT_TOLERANCE_BPS};
use crate::domain::error::BuildError;
use alloy::primitives::Address;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct BuildSettings {
    #[serde(default = "default_chain")]
    pub chain_id: u64,
    /// Overrides the per-chain wrapped-native registry when set.
    pub wrapped_native: Option<Address>,
    pub legacy_executor: Address,
    pub merged_executor: Address,
    #[serde(default = "default_percent_tolerance")]
    pub percent_tolerance_bps: u64,
    #[serde(default = "default_adapter_concurrency")]
    pub adapter_concurrency: usize,
}

fn default_chain() -> u64 {
    constants::CHAIN_ETHEREUM
}

fn default_percent_tolerance() -> u64 {
    DEFAULT_PERCENT_TOLERANCE_BPS
}

fn default_adapter_concurrency() -> usize {
    16
}

impl BuildSettings {
    /// Loads from an optional file plus `SWAPFORGE_*` environment overrides.
    pub fn load(config_path: Option<&str>) -> Result<Self, BuildError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        builder = builder.add_source(Environment::with_prefix("SWAPFORGE").separator("__"));
        let settings: BuildSettings = builder.build()?.try_deserialize().map_err(BuildError::from)?;
        settings.wrapped_native()?;
        Ok(settings)
    }

    /// Effective wrapped-native token for this deployment.
    pub fn wrapped_native(&self) -> Result<Address, BuildError> {
        self.wrapped_native
            .or_else(|| constants::wrapped_native_for_chain(self.chain_id))
            .ok_or_else(|| {
                BuildError::Config(format!(
                    "no wrapped-native token known for chain {} and none configured",
                    self.chain_id
                ))
            })
    }
}
