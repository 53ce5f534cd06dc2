// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hand-rolled collaborators for lifecycle tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::domain::application::{ApplicationId, ApplicationRecord, ApplicationState, KernelId};
use crate::domain::cluster::{ClusterApi, ClusterApiError, KillResponse};
use crate::domain::connection::{AssignedHost, ConnectionInfoReceiver};
use crate::domain::process::{LaunchCommand, ProcessError, ProcessHandle, ProcessLauncher};

pub fn record(id: &str, name: &str, state: ApplicationState) -> ApplicationRecord {
    ApplicationRecord {
        id: id.to_string(),
        name: name.to_string(),
        state,
        am_host_http_address: None,
    }
}

pub fn scheduled(id: &str, name: &str, state: ApplicationState) -> ApplicationRecord {
    ApplicationRecord {
        am_host_http_address: Some("127.0.0.1:8042".to_string()),
        ..record(id, name, state)
    }
}

#[derive(Default)]
pub struct MockCluster {
    pub apps: Mutex<Vec<ApplicationRecord>>,
    /// Applied one per `get_application` call, to the first app.
    pub state_script: Mutex<VecDeque<ApplicationState>>,
    /// State every app moves to when killed; `None` leaves it unchanged.
    pub state_after_kill: Mutex<Option<ApplicationState>>,
    /// `list_applications` returns nothing until this many calls were made.
    pub hidden_for_list_calls: AtomicU32,
    pub failures_remaining: AtomicU32,
    pub list_calls: AtomicU32,
    /// Every `started_since` passed to `list_applications`, in order.
    pub list_windows: Mutex<Vec<DateTime<Utc>>>,
    pub state_calls: AtomicU32,
    pub kill_calls: Mutex<Vec<ApplicationId>>,
}

impl MockCluster {
    pub fn with_apps(apps: Vec<ApplicationRecord>) -> Self {
        Self {
            apps: Mutex::new(apps),
            ..Default::default()
        }
    }

    pub fn fail_next_calls(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn set_state(&self, id: &str, state: ApplicationState) {
        for app in self.apps.lock().iter_mut().filter(|a| a.id == id) {
            app.state = state;
        }
    }

    fn check_failure(&self) -> Result<(), ClusterApiError> {
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ClusterApiError::ConnectionRefused {
                endpoint: "http://mock-rm:8088".to_string(),
            });
        }
        Ok(())
    }

    fn find(&self, id: &ApplicationId) -> Result<ApplicationRecord, ClusterApiError> {
        self.apps
            .lock()
            .iter()
            .find(|a| a.id == id.as_str())
            .cloned()
            .ok_or_else(|| ClusterApiError::Status {
                status: 404,
                body: format!("application {} not found", id),
            })
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_applications(
        &self,
        started_since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationRecord>, ClusterApiError> {
        self.check_failure()?;
        self.list_windows.lock().push(started_since);
        let calls = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if calls <= self.hidden_for_list_calls.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(self.apps.lock().clone())
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<ApplicationRecord, ClusterApiError> {
        self.check_failure()?;
        if let Some(next) = self.state_script.lock().pop_front() {
            if let Some(app) = self.apps.lock().first_mut() {
                app.state = next;
            }
        }
        self.find(id)
    }

    async fn get_application_state(&self, id: &ApplicationId) -> Result<ApplicationState, ClusterApiError> {
        self.check_failure()?;
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        self.find(id).map(|app| app.state)
    }

    async fn kill_application(&self, id: &ApplicationId) -> Result<KillResponse, ClusterApiError> {
        self.check_failure()?;
        self.kill_calls.lock().push(id.clone());
        if let Some(state) = *self.state_after_kill.lock() {
            self.set_state(id.as_str(), state);
        }
        Ok(KillResponse { state: self.find(id).ok().map(|a| a.state) })
    }

    fn active_endpoint(&self) -> Option<String> {
        Some("http://mock-rm:8088".to_string())
    }
}

#[derive(Default)]
pub struct MockProcessState {
    pub exit_code: Mutex<Option<i32>>,
    pub signals: Mutex<Vec<i32>>,
    pub kills: AtomicU32,
    pub waits: AtomicU32,
}

pub struct MockProcess {
    state: Arc<MockProcessState>,
}

#[async_trait]
impl ProcessHandle for MockProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn poll(&mut self) -> Result<Option<i32>, ProcessError> {
        Ok(*self.state.exit_code.lock())
    }

    fn signal(&mut self, signum: i32) -> Result<(), ProcessError> {
        self.state.signals.lock().push(signum);
        Ok(())
    }

    fn kill(&mut self) -> Result<(), ProcessError> {
        self.state.kills.fetch_add(1, Ordering::SeqCst);
        self.state.exit_code.lock().get_or_insert(-1);
        Ok(())
    }

    async fn wait(&mut self) -> Result<i32, ProcessError> {
        self.state.waits.fetch_add(1, Ordering::SeqCst);
        Ok(*self.state.exit_code.lock().get_or_insert(0))
    }
}

#[derive(Default)]
pub struct MockLauncher {
    pub process: Arc<MockProcessState>,
    pub launched: Mutex<Vec<LaunchCommand>>,
}

impl ProcessLauncher for MockLauncher {
    fn launch(&self, command: &LaunchCommand) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        if command.argv.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        self.launched.lock().push(command.clone());
        Ok(Box::new(MockProcess {
            state: self.process.clone(),
        }))
    }
}

/// Reports connection info available from the `ready_on_call`-th query on.
/// `0` never reports it.
pub struct MockConnection {
    pub ready_on_call: u32,
    pub calls: AtomicU32,
}

impl MockConnection {
    pub fn ready_on(call: u32) -> Self {
        Self {
            ready_on_call: call,
            calls: AtomicU32::new(0),
        }
    }

    pub fn never() -> Self {
        Self::ready_on(0)
    }
}

#[async_trait]
impl ConnectionInfoReceiver for MockConnection {
    async fn receive_connection_info(&self, _kernel_id: &KernelId, _assigned: &AssignedHost) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.ready_on_call != 0 && call >= self.ready_on_call
    }
}
