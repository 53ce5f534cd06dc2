// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::application::KernelId;
use crate::domain::connection::{AssignedHost, ConnectionInfoReceiver};

/// Reports connection info as available once the kernel's launcher has
/// written `kernel-<id>.json` into the watched directory.
#[derive(Debug, Clone)]
pub struct ConnectionFileReceiver {
    dir: PathBuf,
}

impl ConnectionFileReceiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn connection_file(&self, kernel_id: &KernelId) -> PathBuf {
        self.dir.join(format!("kernel-{}.json", kernel_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ConnectionInfoReceiver for ConnectionFileReceiver {
    async fn receive_connection_info(&self, kernel_id: &KernelId, assigned: &AssignedHost) -> bool {
        let path = self.connection_file(kernel_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => return false,
        };

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) if value.is_object() => {
                debug!(
                    "Connection file {:?} available for kernel {} on {} ({})",
                    path, kernel_id, assigned.host, assigned.ip
                );
                true
            }
            // partially written
            _ => false,
        }
    }
}
