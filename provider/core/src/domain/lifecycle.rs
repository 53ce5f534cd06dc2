// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle contract for kernels whose unit of work runs remotely.
//!
//! `poll`, `signal` and `kill` mirror a local-process model: callers ask
//! whether the kernel is alive and get an answer, never a transport error.
//! Only launch and restore can fail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

use crate::domain::application::{ApplicationId, ApplicationState, KernelId};
use crate::domain::process::{LaunchCommand, ProcessError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Launching,
    Confirming,
    Running,
    Killing,
    Terminated,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Launching => "launching",
            Self::Confirming => "confirming",
            Self::Running => "running",
            Self::Killing => "killing",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Alive,
    Dead,
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("KernelID: '{kernel_id}' launch timeout due to: {reason}")]
    LaunchTimeout {
        kernel_id: KernelId,
        status: u16,
        reason: String,
    },
    #[error("KernelID: '{kernel_id}', ApplicationID: '{application_id}' unexpectedly found in state '{state}' during kernel startup!")]
    PrematureTermination {
        kernel_id: KernelId,
        application_id: ApplicationId,
        state: ApplicationState,
    },
    #[error("Error occurred during launch of KernelID: '{kernel_id}'. Submission process exited with code {exit_code}.")]
    SubmissionExited { kernel_id: KernelId, exit_code: i32 },
    #[error("Failed to start submission process: {0}")]
    Process(#[from] ProcessError),
    #[error("Persisted lifecycle info for KernelID: '{kernel_id}' has no application_id")]
    MissingApplicationId { kernel_id: KernelId },
}

impl LifecycleError {
    /// HTTP-equivalent status the host should surface to its client.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::LaunchTimeout { status, .. } => *status,
            _ => 500,
        }
    }
}

/// Generic, cluster-agnostic fields of a persisted session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_ip: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

/// What must survive a host restart to reattach to a submitted application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleInfo {
    #[serde(flatten)]
    pub session: SessionInfo,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
}

impl LifecycleInfo {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Operations a host performs on a kernel that runs somewhere other than
/// its own process.
#[async_trait]
pub trait RemoteProcessLifecycle: Send {
    /// Start the local submission process and block until the kernel is
    /// connectable or launch fails.
    async fn launch(&mut self, command: LaunchCommand) -> Result<(), LifecycleError>;

    async fn poll(&mut self) -> Liveness;

    /// `0` probes liveness; SIGKILL kills; anything else goes to the local
    /// process, best effort.
    async fn signal(&mut self, signum: i32) -> Liveness;

    /// `Dead` once termination is confirmed, `Alive` otherwise.
    async fn kill(&mut self) -> Liveness;

    /// Idempotent teardown.
    async fn cleanup(&mut self);

    fn save(&self) -> LifecycleInfo;

    fn restore(&mut self, info: LifecycleInfo) -> Result<(), LifecycleError>;
}
