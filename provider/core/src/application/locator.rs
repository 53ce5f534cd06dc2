// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Application Locator
//!
//! Maps a kernel identity to its YARN application and answers state
//! questions about it.
//!
//! Every lookup degrades to `None` on transport failure. Connection refusals
//! and timeouts are the normal state of affairs while the cluster is still
//! scheduling a submission, so the caller's polling loop, not error
//! propagation, is what handles them.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::domain::application::{ApplicationId, ApplicationRecord, ApplicationState, KernelId};
use crate::domain::cluster::{ClusterApi, ClusterApiError, KillResponse};

#[derive(Clone)]
pub struct ApplicationLocator {
    cluster: Arc<dyn ClusterApi>,
}

impl ApplicationLocator {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    pub fn active_endpoint(&self) -> Option<String> {
        self.cluster.active_endpoint()
    }

    /// Latest application started since `since` whose name contains the
    /// kernel id. With `ignore_final_states`, FINISHED/KILLED candidates are
    /// dropped before picking, so a stale terminated run never shadows a
    /// fresh resubmission.
    pub async fn find_by_name(
        &self,
        kernel_id: &KernelId,
        since: DateTime<Utc>,
        ignore_final_states: bool,
    ) -> Option<ApplicationRecord> {
        match self.cluster.list_applications(since).await {
            Ok(apps) => select_latest(apps, kernel_id, ignore_final_states),
            Err(e) => {
                self.log_failure(&format!("Query for kernel ID '{}'", kernel_id), &e);
                None
            }
        }
    }

    pub async fn find_by_id(&self, id: &ApplicationId) -> Option<ApplicationRecord> {
        self.cluster
            .get_application(id)
            .await
            .map_err(|e| self.log_failure(&format!("Query for application ID '{}'", id), &e))
            .ok()
    }

    pub async fn state_of(&self, id: &ApplicationId) -> Option<ApplicationState> {
        self.cluster
            .get_application_state(id)
            .await
            .map_err(|e| self.log_failure(&format!("Query for application '{}' state", id), &e))
            .ok()
    }

    /// Request termination. The outcome must be verified by polling state.
    pub async fn kill(&self, id: &ApplicationId) -> Option<KillResponse> {
        self.cluster
            .kill_application(id)
            .await
            .map_err(|e| self.log_failure(&format!("Termination of application '{}'", id), &e))
            .ok()
    }

    fn log_failure(&self, what: &str, e: &ClusterApiError) {
        match e {
            ClusterApiError::ConnectionRefused { endpoint } => warn!(
                "YARN RM address: '{}' refused the connection.  Is the resource manager running?",
                endpoint
            ),
            other => warn!("{} failed with exception: '{}'.  Continuing...", what, other),
        }
    }
}

/// Application ids grow monotonically, so the greatest id among name
/// matches is the most recent submission.
pub fn select_latest(
    apps: Vec<ApplicationRecord>,
    kernel_id: &KernelId,
    ignore_final_states: bool,
) -> Option<ApplicationRecord> {
    apps.into_iter()
        .filter(|app| !app.id.is_empty() && app.name.contains(kernel_id.as_str()))
        .filter(|app| !(ignore_final_states && app.state.is_final()))
        .max_by(|a, b| a.id.cmp(&b.id))
}
