// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! YARN application identity and state.
//!
//! Application ids are assigned by the ResourceManager and increase
//! monotonically (`application_<cluster-ts>_<seq>`), so the greatest id among
//! duplicates is the most recent submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical kernel identity. Doubles as the YARN application name filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelId(pub String);

impl KernelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cluster-assigned application id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application states as reported by the ResourceManager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    New,
    NewSaving,
    Submitted,
    Accepted,
    Running,
    Finished,
    Failed,
    Killed,
    #[serde(other)]
    Unknown,
}

impl ApplicationState {
    /// States in which the application counts as alive: NEW, SUBMITTED,
    /// ACCEPTED, RUNNING.
    pub fn is_initial(&self) -> bool {
        matches!(
            self,
            Self::New | Self::Submitted | Self::Accepted | Self::Running
        )
    }

    /// FINISHED and KILLED only; FAILED is not final.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Finished | Self::Killed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::NewSaving => "NEW_SAVING",
            Self::Submitted => "SUBMITTED",
            Self::Accepted => "ACCEPTED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single application entry from the ResourceManager (`AppJSON`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "unknown_state")]
    pub state: ApplicationState,

    /// `"host:port"` of the ApplicationMaster, once scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub am_host_http_address: Option<String>,
}

fn unknown_state() -> ApplicationState {
    ApplicationState::Unknown
}

impl ApplicationRecord {
    /// The application id, if the record carries a non-empty one.
    pub fn application_id(&self) -> Option<ApplicationId> {
        if self.id.is_empty() {
            None
        } else {
            Some(ApplicationId::new(self.id.clone()))
        }
    }

    /// Host portion of `amHostHttpAddress`.
    pub fn am_host(&self) -> Option<&str> {
        self.am_host_http_address
            .as_deref()
            .and_then(|addr| addr.split(':').next())
            .filter(|host| !host.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_sets() {
        for state in [
            ApplicationState::New,
            ApplicationState::Submitted,
            ApplicationState::Accepted,
            ApplicationState::Running,
        ] {
            assert!(state.is_initial());
            assert!(!state.is_final());
        }

        assert!(ApplicationState::Finished.is_final());
        assert!(ApplicationState::Killed.is_final());

        // FAILED and NEW_SAVING sit in neither set
        assert!(!ApplicationState::Failed.is_final());
        assert!(!ApplicationState::Failed.is_initial());
        assert!(!ApplicationState::NewSaving.is_initial());
    }

    #[test]
    fn test_record_from_yarn_json() {
        let json = r#"{
            "id": "application_1700000000000_0042",
            "name": "kernel-abc",
            "state": "RUNNING",
            "amHostHttpAddress": "worker-3.cluster:8042",
            "queue": "default"
        }"#;

        let record: ApplicationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.state, ApplicationState::Running);
        assert_eq!(record.am_host(), Some("worker-3.cluster"));
        assert_eq!(
            record.application_id(),
            Some(ApplicationId::new("application_1700000000000_0042"))
        );
    }

    #[test]
    fn test_unrecognized_state_and_missing_fields() {
        let record: ApplicationRecord =
            serde_json::from_str(r#"{"name": "k", "state": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(record.state, ApplicationState::Unknown);
        assert_eq!(record.application_id(), None);
        assert_eq!(record.am_host(), None);
    }
}
