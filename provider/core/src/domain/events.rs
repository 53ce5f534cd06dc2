// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::domain::application::{ApplicationId, ApplicationState, KernelId};
use crate::domain::lifecycle::Liveness;

/// Diagnostic events emitted by a kernel session over its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    SubmissionStarted {
        kernel_id: KernelId,
        pid: Option<u32>,
        command: String,
        started_at: DateTime<Utc>,
    },
    ApplicationIdAssigned {
        kernel_id: KernelId,
        application_id: ApplicationId,
        state: ApplicationState,
        elapsed_secs: f64,
        assigned_at: DateTime<Utc>,
    },
    StartupStateObserved {
        kernel_id: KernelId,
        application_id: ApplicationId,
        iteration: u32,
        state: Option<ApplicationState>,
        observed_at: DateTime<Utc>,
    },
    HostAssigned {
        kernel_id: KernelId,
        application_id: ApplicationId,
        host: String,
        ip: IpAddr,
        assigned_at: DateTime<Utc>,
    },
    KernelConnectable {
        kernel_id: KernelId,
        application_id: ApplicationId,
        elapsed_secs: f64,
        connected_at: DateTime<Utc>,
    },
    LaunchFailed {
        kernel_id: KernelId,
        application_id: Option<ApplicationId>,
        status: u16,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    KillCompleted {
        kernel_id: KernelId,
        application_id: Option<ApplicationId>,
        state: Option<ApplicationState>,
        result: Liveness,
        completed_at: DateTime<Utc>,
    },
    SessionCleanedUp {
        kernel_id: KernelId,
        cleaned_at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn kernel_id(&self) -> &KernelId {
        match self {
            Self::SubmissionStarted { kernel_id, .. }
            | Self::ApplicationIdAssigned { kernel_id, .. }
            | Self::StartupStateObserved { kernel_id, .. }
            | Self::HostAssigned { kernel_id, .. }
            | Self::KernelConnectable { kernel_id, .. }
            | Self::LaunchFailed { kernel_id, .. }
            | Self::KillCompleted { kernel_id, .. }
            | Self::SessionCleanedUp { kernel_id, .. } => kernel_id,
        }
    }
}
