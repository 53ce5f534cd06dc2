// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Remote Session
//!
//! Cluster-agnostic half of a remote kernel: owns the local submission
//! process, remembers where the kernel landed, and carries the timing
//! settings shared by every remote lifecycle.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::application::KernelId;
use crate::domain::connection::AssignedHost;
use crate::domain::lifecycle::{Liveness, SessionInfo};
use crate::domain::process::{LaunchCommand, ProcessError, ProcessHandle, ProcessLauncher};

const DEFAULT_SHUTDOWN_WAIT: Duration = Duration::from_secs(5);
const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub kernel_id: KernelId,
    pub launch_timeout: Duration,
    pub shutdown_wait_time: Duration,
    /// Address recorded as the session's local ip. Defaults to the hostname.
    pub local_ip: Option<String>,
}

impl SessionSettings {
    pub fn new(kernel_id: KernelId) -> Self {
        Self {
            kernel_id,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            shutdown_wait_time: DEFAULT_SHUTDOWN_WAIT,
            local_ip: None,
        }
    }

    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    pub fn with_shutdown_wait_time(mut self, wait: Duration) -> Self {
        self.shutdown_wait_time = wait;
        self
    }
}

pub struct RemoteSession {
    kernel_id: KernelId,
    launcher: Arc<dyn ProcessLauncher>,
    local_process: Option<Box<dyn ProcessHandle>>,
    pid: Option<u32>,
    ip: Option<String>,
    assigned: Option<AssignedHost>,
    start_time: Option<DateTime<Utc>>,
    started: Option<Instant>,
    launch_timeout: Duration,
    shutdown_wait_time: Duration,
}

impl RemoteSession {
    pub fn new(settings: SessionSettings, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            kernel_id: settings.kernel_id,
            launcher,
            local_process: None,
            pid: None,
            ip: settings.local_ip.or_else(local_hostname),
            assigned: None,
            start_time: None,
            started: None,
            launch_timeout: settings.launch_timeout,
            shutdown_wait_time: settings.shutdown_wait_time,
        }
    }

    pub fn kernel_id(&self) -> &KernelId {
        &self.kernel_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn launch_timeout(&self) -> Duration {
        self.launch_timeout
    }

    pub fn shutdown_wait_time(&self) -> Duration {
        self.shutdown_wait_time
    }

    /// Raise the shutdown wait to at least `minimum`. Returns whether it changed.
    pub fn ensure_shutdown_wait_at_least(&mut self, minimum: Duration) -> bool {
        if self.shutdown_wait_time < minimum {
            self.shutdown_wait_time = minimum;
            return true;
        }
        false
    }

    /// Stamp the launch start. Elapsed time and the name query window are
    /// measured from here.
    pub fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
        self.started = Some(Instant::now());
    }

    /// Time since launch started; zero before any launch.
    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn spawn(&mut self, command: &LaunchCommand) -> Result<Option<u32>, ProcessError> {
        let handle = self.launcher.launch(command)?;
        self.pid = handle.pid();
        self.local_process = Some(handle);
        Ok(self.pid)
    }

    pub fn has_local_process(&self) -> bool {
        self.local_process.is_some()
    }

    /// Exit code of the local process, if it has exited.
    pub fn local_exit_code(&mut self) -> Option<i32> {
        let process = self.local_process.as_mut()?;
        match process.poll() {
            Ok(code) => code,
            Err(e) => {
                warn!("Unable to poll local process for KernelID: '{}': {}", self.kernel_id, e);
                None
            }
        }
    }

    pub fn signal_local(&mut self, signum: i32) -> Result<(), ProcessError> {
        match self.local_process.as_mut() {
            Some(process) => process.signal(signum),
            None => Err(ProcessError::SignalFailed {
                pid: self.pid.unwrap_or_default(),
                reason: "no local process".to_string(),
            }),
        }
    }

    /// Kill the local process. `Dead` only when a running process was
    /// actually killed.
    pub fn kill_local(&mut self) -> Liveness {
        if self.local_exit_code().is_some() {
            return Liveness::Alive;
        }
        let Some(process) = self.local_process.as_mut() else {
            return Liveness::Alive;
        };
        match process.kill() {
            Ok(()) => {
                debug!("Killed local process pid={:?} for KernelID: '{}'", self.pid, self.kernel_id);
                Liveness::Dead
            }
            Err(e) => {
                warn!("Failed to kill local process for KernelID: '{}': {}", self.kernel_id, e);
                Liveness::Alive
            }
        }
    }

    /// Kill the local process if it is still running, wait up to the
    /// shutdown wait for it to exit, and drop the handle.
    pub async fn reap_local(&mut self) {
        let Some(mut process) = self.local_process.take() else {
            return;
        };
        if matches!(process.poll(), Ok(None)) {
            if let Err(e) = process.kill() {
                warn!("Failed to kill local process for KernelID: '{}': {}", self.kernel_id, e);
            }
        }
        match tokio::time::timeout(self.shutdown_wait_time, process.wait()).await {
            Ok(Ok(code)) => debug!("Local process pid={:?} exited with {}", self.pid, code),
            Ok(Err(e)) => warn!("Waiting on local process pid={:?} failed: {}", self.pid, e),
            Err(_) => warn!(
                "Local process pid={:?} did not exit within {:?}",
                self.pid, self.shutdown_wait_time
            ),
        }
    }

    pub fn assigned(&self) -> Option<&AssignedHost> {
        self.assigned.as_ref()
    }

    pub fn set_assigned(&mut self, assigned: AssignedHost) {
        self.assigned = Some(assigned);
    }

    /// Forget per-launch state. The session can be launched again afterwards.
    pub fn reset(&mut self) {
        self.local_process = None;
        self.pid = None;
        self.assigned = None;
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            pid: self.pid,
            ip: self.ip.clone(),
            assigned_host: self.assigned.as_ref().map(|a| a.host.clone()),
            assigned_ip: self.assigned.as_ref().map(|a| a.ip),
            start_time: self.start_time,
        }
    }

    pub fn load_info(&mut self, info: SessionInfo) {
        self.pid = info.pid;
        if info.ip.is_some() {
            self.ip = info.ip;
        }
        self.assigned = match (info.assigned_host, info.assigned_ip) {
            (Some(host), Some(ip)) => Some(AssignedHost { host, ip }),
            _ => None,
        };
        self.start_time = info.start_time;
    }
}

fn local_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}
