// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Signal number that `signal()` treats as a kill request.
pub const SIGKILL: i32 = 9;

/// Command line that submits the kernel's application to the cluster
/// (typically a `spark-submit` wrapper configured for cluster mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub argv: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl LaunchCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Default::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Launch command is empty")]
    EmptyCommand,
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },
    #[error("Process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the local submission process. Exclusively owned by one session.
#[async_trait]
pub trait ProcessHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// `None` while running, `Some(code)` once exited (`-1` when killed by a
    /// signal).
    fn poll(&mut self) -> Result<Option<i32>, ProcessError>;

    fn signal(&mut self, signum: i32) -> Result<(), ProcessError>;

    fn kill(&mut self) -> Result<(), ProcessError>;

    async fn wait(&mut self) -> Result<i32, ProcessError>;
}

pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &LaunchCommand) -> Result<Box<dyn ProcessHandle>, ProcessError>;
}
