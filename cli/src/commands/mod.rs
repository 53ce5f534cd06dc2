// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the YKP CLI

pub mod app;
pub mod config;
pub mod kernel;

pub use self::app::AppCommand;
pub use self::config::ConfigCommand;
pub use self::kernel::KernelCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;

use yarn_provider_core::domain::config::{KernelLifecycleConfig, ProviderConfig};
use yarn_provider_core::infrastructure::ResourceManagerClient;

/// Load and validate the effective configuration.
pub(crate) fn load_config(config_path: Option<PathBuf>) -> Result<ProviderConfig> {
    load_kernel_config(config_path, &KernelLifecycleConfig::default())
}

/// Load the configuration with a kernel's endpoint overrides merged in, then
/// validate the merged result.
pub(crate) fn load_kernel_config(
    config_path: Option<PathBuf>,
    overrides: &KernelLifecycleConfig,
) -> Result<ProviderConfig> {
    let config = ProviderConfig::load_or_default(config_path)
        .context("Failed to load configuration")?
        .for_kernel(overrides);
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub(crate) fn client_for(config: &ProviderConfig) -> Result<ResourceManagerClient> {
    ResourceManagerClient::from_config(config).context("Failed to create ResourceManager client")
}
