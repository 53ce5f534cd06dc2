// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ResourceManager application commands
//!
//! Commands: list, status, kill

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use yarn_provider_core::application::locator::select_latest;
use yarn_provider_core::application::ApplicationLocator;
use yarn_provider_core::domain::application::{ApplicationId, ApplicationRecord, ApplicationState, KernelId};
use yarn_provider_core::domain::cluster::ClusterApi;

use super::{client_for, load_config};

#[derive(Subcommand)]
pub enum AppCommand {
    /// List applications started recently
    List {
        /// Only applications whose name contains this kernel id
        #[arg(long, value_name = "KERNEL_ID")]
        kernel_id: Option<String>,

        /// Look-back window in minutes
        #[arg(long, default_value = "60")]
        since_minutes: i64,

        /// Hide applications in a final state
        #[arg(long)]
        active: bool,
    },

    /// Show an application and its current state
    Status {
        #[arg(value_name = "APP_ID")]
        app_id: String,
    },

    /// Kill an application and wait for it to terminate
    Kill {
        #[arg(value_name = "APP_ID")]
        app_id: String,
    },
}

pub async fn handle_command(command: AppCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let cluster: Arc<dyn ClusterApi> = Arc::new(client_for(&config)?);

    match command {
        AppCommand::List {
            kernel_id,
            since_minutes,
            active,
        } => list(cluster, kernel_id, since_minutes, active).await,
        AppCommand::Status { app_id } => status(cluster, ApplicationId::new(app_id)).await,
        AppCommand::Kill { app_id } => {
            kill(
                cluster,
                ApplicationId::new(app_id),
                config.lifecycle.max_poll_attempts,
                config.lifecycle.poll_interval,
            )
            .await
        }
    }
}

async fn list(
    cluster: Arc<dyn ClusterApi>,
    kernel_id: Option<String>,
    since_minutes: i64,
    active_only: bool,
) -> Result<()> {
    let since = Utc::now() - ChronoDuration::minutes(since_minutes.max(0));
    let apps = cluster
        .list_applications(since)
        .await
        .context("Failed to list applications")?;

    let kernel_id = kernel_id.map(KernelId::new);
    let apps = filter_apps(apps, kernel_id.as_ref(), active_only);
    let resolved = kernel_id
        .as_ref()
        .and_then(|k| select_latest(apps.clone(), k, active_only))
        .map(|app| app.id);

    if apps.is_empty() {
        println!("{}", "No applications found.".yellow());
        return Ok(());
    }

    println!("{:<36} {:<12} {:<24} {}", "ID".bold(), "STATE".bold(), "AM HOST".bold(), "NAME".bold());
    for app in &apps {
        let marker = if resolved.as_deref() == Some(app.id.as_str()) { " *" } else { "" };
        println!(
            "{:<36} {:<12} {:<24} {}{}",
            app.id,
            colored_state(app.state),
            app.am_host_http_address.as_deref().unwrap_or("-"),
            app.name,
            marker.green()
        );
    }
    if resolved.is_some() {
        println!();
        println!("{}", "* application the kernel id resolves to".dimmed());
    }

    Ok(())
}

pub(crate) fn filter_apps(
    apps: Vec<ApplicationRecord>,
    kernel_id: Option<&KernelId>,
    active_only: bool,
) -> Vec<ApplicationRecord> {
    let mut apps: Vec<_> = apps
        .into_iter()
        .filter(|app| kernel_id.is_none_or(|k| app.name.contains(k.as_str())))
        .filter(|app| !(active_only && app.state.is_final()))
        .collect();
    apps.sort_by(|a, b| b.id.cmp(&a.id));
    apps
}

async fn status(cluster: Arc<dyn ClusterApi>, app_id: ApplicationId) -> Result<()> {
    let app = cluster
        .get_application(&app_id)
        .await
        .with_context(|| format!("Failed to get application '{}'", app_id))?;

    println!("{}", "Application:".bold());
    println!("  ID:      {}", app.id);
    println!("  Name:    {}", app.name);
    println!("  State:   {}", colored_state(app.state));
    println!("  AM Host: {}", app.am_host_http_address.as_deref().unwrap_or("(not assigned)"));

    Ok(())
}

async fn kill(
    cluster: Arc<dyn ClusterApi>,
    app_id: ApplicationId,
    max_poll_attempts: u32,
    poll_interval: std::time::Duration,
) -> Result<()> {
    let locator = ApplicationLocator::new(cluster);
    if locator.kill(&app_id).await.is_none() {
        anyhow::bail!("Kill request for application '{}' failed", app_id);
    }

    let mut state = locator.state_of(&app_id).await;
    let mut attempts = 1;
    while !state.is_some_and(|s| s.is_final()) && attempts <= max_poll_attempts {
        tokio::time::sleep(poll_interval).await;
        state = locator.state_of(&app_id).await;
        attempts += 1;
    }

    match state {
        Some(s) if s.is_final() => {
            println!("{}", format!("✓ Application {} terminated ({})", app_id, s).green());
            Ok(())
        }
        other => {
            let shown = other.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
            anyhow::bail!("Application {} not confirmed terminated (state: {})", app_id, shown)
        }
    }
}

fn colored_state(state: ApplicationState) -> colored::ColoredString {
    let s = state.as_str();
    match state {
        ApplicationState::Running => s.green(),
        ApplicationState::Finished | ApplicationState::Killed => s.dimmed(),
        ApplicationState::Failed => s.red(),
        ApplicationState::Unknown => s.yellow(),
        _ => s.cyan(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: &str, state: ApplicationState) -> ApplicationRecord {
        ApplicationRecord {
            id: id.to_string(),
            name: name.to_string(),
            state,
            am_host_http_address: None,
        }
    }

    #[test]
    fn test_filter_apps_by_kernel_and_state() {
        let apps = vec![
            app("application_1_0001", "kernel-a", ApplicationState::Killed),
            app("application_1_0002", "kernel-a", ApplicationState::Running),
            app("application_1_0003", "kernel-b", ApplicationState::Running),
        ];

        let kernel = KernelId::new("kernel-a");
        let filtered = filter_apps(apps.clone(), Some(&kernel), false);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].id, "application_1_0002");

        let active = filter_apps(apps.clone(), Some(&kernel), true);
        assert_eq!(active.len(), 1);

        let all = filter_apps(apps, None, false);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "application_1_0003");
    }
}
