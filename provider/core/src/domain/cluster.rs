// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::application::{ApplicationId, ApplicationRecord, ApplicationState};

const CLUSTER_API_SUFFIX: &str = "/ws/v1/cluster";

/// Credentials for SPNEGO negotiated authentication against the ResourceManager.
///
/// Ticket acquisition happens outside this crate; the client only forwards
/// the negotiated token as an `Authorization: Negotiate` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KerberosCredentials {
    pub negotiate_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStrategy {
    #[default]
    None,
    Kerberos(KerberosCredentials),
}

/// Candidate ResourceManager base URLs (primary first) plus authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    urls: Vec<String>,
    auth: AuthStrategy,
}

impl ClusterEndpoint {
    pub fn new(urls: Vec<String>, auth: AuthStrategy) -> Self {
        let urls = urls
            .iter()
            .map(|u| normalize_endpoint(u))
            .filter(|u| !u.is_empty())
            .collect();
        Self { urls, auth }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn auth(&self) -> &AuthStrategy {
        &self.auth
    }
}

/// Strips a trailing `/` and a trailing `/ws/v1/cluster`, so both the bare
/// host URL and the full cluster API URL are accepted.
pub fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix(CLUSTER_API_SUFFIX)
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

/// Response body of a kill request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillResponse {
    #[serde(default)]
    pub state: Option<ApplicationState>,
}

#[derive(Debug, Error)]
pub enum ClusterApiError {
    #[error("ResourceManager at '{endpoint}' refused the connection")]
    ConnectionRefused { endpoint: String },
    #[error("Request to ResourceManager failed: {0}")]
    Transport(String),
    #[error("ResourceManager returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode ResourceManager response: {0}")]
    Decode(String),
    #[error("No active ResourceManager endpoint among {0:?}")]
    NoActiveEndpoint(Vec<String>),
}

/// REST operations against the cluster resource manager.
///
/// Implementations are shared across kernel sessions and must be safe for
/// concurrent use.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Applications started at or after `started_since`.
    async fn list_applications(
        &self,
        started_since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationRecord>, ClusterApiError>;

    async fn get_application(&self, id: &ApplicationId) -> Result<ApplicationRecord, ClusterApiError>;

    async fn get_application_state(&self, id: &ApplicationId) -> Result<ApplicationState, ClusterApiError>;

    async fn kill_application(&self, id: &ApplicationId) -> Result<KillResponse, ClusterApiError>;

    /// Address of the endpoint currently believed active, for diagnostics.
    fn active_endpoint(&self) -> Option<String>;
}
