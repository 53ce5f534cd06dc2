// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kernel lifecycle commands
//!
//! Commands: launch, status, kill

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use yarn_provider_core::domain::application::KernelId;
use yarn_provider_core::domain::config::{KernelLifecycleConfig, ProviderConfig};
use yarn_provider_core::domain::events::LifecycleEvent;
use yarn_provider_core::domain::lifecycle::{LifecycleInfo, Liveness, RemoteProcessLifecycle};
use yarn_provider_core::domain::process::LaunchCommand;
use yarn_provider_core::infrastructure::{ConnectionFileReceiver, EventBus, TokioProcessLauncher};
use yarn_provider_core::{LifecycleCollaborators, SessionSettings, YarnLifecycleManager};

use super::{client_for, load_kernel_config};

/// ResourceManager settings for this kernel only
#[derive(Args, Debug, Clone, Default)]
pub struct EndpointOverrides {
    /// Primary ResourceManager URL
    #[arg(long, value_name = "URL")]
    pub yarn_endpoint: Option<String>,

    /// Alternate ResourceManager URL for HA setups
    #[arg(long, value_name = "URL")]
    pub alt_yarn_endpoint: Option<String>,

    /// Use SPNEGO against the ResourceManager
    #[arg(long, value_name = "BOOL")]
    pub yarn_endpoint_security_enabled: Option<bool>,
}

impl From<EndpointOverrides> for KernelLifecycleConfig {
    fn from(overrides: EndpointOverrides) -> Self {
        Self {
            yarn_endpoint: overrides.yarn_endpoint,
            alt_yarn_endpoint: overrides.alt_yarn_endpoint,
            yarn_endpoint_security_enabled: overrides.yarn_endpoint_security_enabled,
        }
    }
}

#[derive(Subcommand)]
pub enum KernelCommand {
    /// Submit a kernel and follow it until it ends or Ctrl-C
    Launch {
        /// Kernel id (default: random UUID). Exported to the command as KERNEL_ID.
        #[arg(long, value_name = "KERNEL_ID")]
        kernel_id: Option<String>,

        /// Persist lifecycle info to this file once running
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,

        /// Print lifecycle events as they happen
        #[arg(long)]
        events: bool,

        #[command(flatten)]
        overrides: EndpointOverrides,

        /// Submission command, e.g. `spark-submit --deploy-mode cluster ...`
        #[arg(last = true, required = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Report liveness of a persisted kernel
    Status {
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        #[command(flatten)]
        overrides: EndpointOverrides,
    },

    /// Kill a persisted kernel
    Kill {
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        #[command(flatten)]
        overrides: EndpointOverrides,
    },
}

pub async fn handle_command(command: KernelCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        KernelCommand::Launch {
            kernel_id,
            save,
            events,
            overrides,
            command,
        } => {
            let config = load_kernel_config(config_path, &overrides.into())?;
            let kernel_id = KernelId::new(kernel_id.unwrap_or_else(|| Uuid::new_v4().to_string()));
            launch(config, kernel_id, command, save, events).await
        }
        KernelCommand::Status { state, overrides } => {
            status(load_kernel_config(config_path, &overrides.into())?, &state).await
        }
        KernelCommand::Kill { state, overrides } => {
            kill(load_kernel_config(config_path, &overrides.into())?, &state).await
        }
    }
}

/// Persisted form written by `launch --save`.
fn read_state(path: &Path) -> Result<(KernelId, LifecycleInfo)> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))?;

    let kernel_id = value
        .get("kernel_id")
        .and_then(|v| v.as_str())
        .map(KernelId::new)
        .with_context(|| format!("{:?} has no kernel_id", path))?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("kernel_id");
    }

    let info = LifecycleInfo::from_json(value).with_context(|| format!("Invalid lifecycle info in {:?}", path))?;
    Ok((kernel_id, info))
}

fn write_state(path: &Path, kernel_id: &KernelId, info: &LifecycleInfo) -> Result<()> {
    let mut value = info.to_json();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("kernel_id".to_string(), serde_json::Value::String(kernel_id.to_string()));
    }
    std::fs::write(path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("Failed to write {:?}", path))
}

fn build_manager(config: &ProviderConfig, kernel_id: KernelId, events: EventBus) -> Result<YarnLifecycleManager> {
    let client = client_for(config)?;
    std::fs::create_dir_all(&config.connection_dir)
        .with_context(|| format!("Failed to create connection dir {:?}", config.connection_dir))?;

    let collaborators = LifecycleCollaborators {
        cluster: Arc::new(client),
        launcher: Arc::new(TokioProcessLauncher::new()),
        connection: Arc::new(ConnectionFileReceiver::new(&config.connection_dir)),
        events,
    };
    let settings = SessionSettings::new(kernel_id).with_launch_timeout(config.lifecycle.launch_timeout);
    Ok(YarnLifecycleManager::new(settings, config.lifecycle.clone(), collaborators))
}

async fn launch(
    config: ProviderConfig,
    kernel_id: KernelId,
    argv: Vec<String>,
    save: Option<PathBuf>,
    show_events: bool,
) -> Result<()> {
    let bus = EventBus::with_default_capacity();
    if show_events {
        spawn_event_printer(&bus, kernel_id.clone());
    }

    let mut manager = build_manager(&config, kernel_id.clone(), bus)?;
    let command = LaunchCommand::new(argv)
        .env("KERNEL_ID", kernel_id.as_str())
        .env("KERNEL_CONNECTION_FILE", connection_file(&config, &kernel_id).display().to_string());

    println!("Launching kernel {}...", kernel_id.to_string().bold());
    if let Err(e) = manager.launch(command).await {
        manager.cleanup().await;
        let status = e.http_status_code();
        return Err(anyhow::Error::new(e)).context(format!("Launch failed (status {})", status));
    }

    println!(
        "{}",
        format!(
            "✓ Kernel {} running as {} on {}",
            kernel_id,
            manager.application_id().map(|id| id.as_str()).unwrap_or("?"),
            manager.assigned_host().map(|a| a.host.as_str()).unwrap_or("?")
        )
        .green()
    );

    if let Some(path) = &save {
        write_state(path, &kernel_id, &manager.save())?;
        println!("  Lifecycle info saved to {}", path.display());
    }

    println!("{}", "Press Ctrl-C to kill the kernel.".dimmed());
    let mut ticker = tokio::time::interval(config.lifecycle.poll_interval.max(std::time::Duration::from_secs(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, killing kernel {}", kernel_id);
                let result = manager.kill().await;
                report_kill(&kernel_id, result);
                break;
            }
            _ = ticker.tick() => {
                if manager.poll().await == Liveness::Dead {
                    println!("{}", format!("Kernel {} is no longer running", kernel_id).yellow());
                    break;
                }
            }
        }
    }

    manager.cleanup().await;
    Ok(())
}

fn connection_file(config: &ProviderConfig, kernel_id: &KernelId) -> PathBuf {
    ConnectionFileReceiver::new(&config.connection_dir).connection_file(kernel_id)
}

fn spawn_event_printer(bus: &EventBus, kernel_id: KernelId) {
    let mut receiver = bus.subscribe_kernel(kernel_id);
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            eprintln!("{} {}", "event".cyan(), describe(&event).dimmed());
        }
    });
}

fn describe(event: &LifecycleEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event))
}

async fn status(config: ProviderConfig, state: &Path) -> Result<()> {
    let (kernel_id, info) = read_state(state)?;
    let mut manager = build_manager(&config, kernel_id.clone(), EventBus::default())?;
    manager.restore(info).context("Failed to restore kernel")?;

    match manager.poll().await {
        Liveness::Alive => println!("{}", format!("Kernel {} is alive", kernel_id).green()),
        Liveness::Dead => println!("{}", format!("Kernel {} is dead", kernel_id).red()),
    }
    Ok(())
}

async fn kill(config: ProviderConfig, state: &Path) -> Result<()> {
    let (kernel_id, info) = read_state(state)?;
    let mut manager = build_manager(&config, kernel_id.clone(), EventBus::default())?;
    manager.restore(info).context("Failed to restore kernel")?;

    let result = manager.kill().await;
    report_kill(&kernel_id, result);
    manager.cleanup().await;

    if result.is_alive() {
        anyhow::bail!("Termination of kernel {} was not confirmed", kernel_id);
    }
    Ok(())
}

fn report_kill(kernel_id: &KernelId, result: Liveness) {
    match result {
        Liveness::Dead => println!("{}", format!("✓ Kernel {} terminated", kernel_id).green()),
        Liveness::Alive => println!(
            "{}",
            format!("⚠ Termination of kernel {} not confirmed", kernel_id).yellow()
        ),
    }
}
