// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use yarn_provider_core::domain::config::ProviderConfig;

const ANNOTATED_TEMPLATE: &str = include_str!("../../templates/ykp-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./ykp-config.yaml)
        #[arg(short, long, default_value = "./ykp-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ProviderConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. YKP_CONFIG_PATH: {}",
            std::env::var("YKP_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./ykp-config.yaml");
        println!("  4. ~/.ykp/config.yaml");
        println!("  5. /etc/ykp/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    print!("{}", redacted(config).to_yaml_string()?);

    Ok(())
}

/// Hide literal SPNEGO tokens; `env:` references are shown as is.
fn redacted(mut config: ProviderConfig) -> ProviderConfig {
    if let Some(token) = &config.spnego_token {
        if !token.starts_with("env:") {
            config.spnego_token = Some("********".to_string());
        }
    }
    config
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ProviderConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    match config.configured_endpoints() {
        Some(endpoints) => println!("  ResourceManager endpoints: {}", endpoints.join(", ")),
        None => println!("  ResourceManager endpoints: {}", "(discovered from Hadoop configuration)".dimmed()),
    }
    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        ANNOTATED_TEMPLATE.to_string()
    } else {
        ProviderConfig::default().to_yaml_string()?
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
