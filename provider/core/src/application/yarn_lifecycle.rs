// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # YARN Lifecycle Manager
//!
//! Drives a kernel submitted to YARN in cluster mode through its lifecycle:
//!
//! ```text
//! Launching → Confirming → Running → Killing → Terminated
//! ```
//!
//! `launch` spawns the local submission process and then polls the
//! ResourceManager until the kernel's application has an id, an assigned
//! host, and connection info, or until the launch timeout classifies the
//! failure. Afterwards `poll`, `signal` and `kill` answer liveness questions
//! against the cluster with the same shape a local process would.
//!
//! The application id is sticky: once resolved it is never re-derived from
//! the name query until `cleanup` or the next `launch` resets it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::locator::ApplicationLocator;
use crate::application::session::{RemoteSession, SessionSettings};
use crate::domain::application::{ApplicationId, ApplicationState, KernelId};
use crate::domain::cluster::ClusterApi;
use crate::domain::config::LifecycleTimings;
use crate::domain::connection::{AssignedHost, ConnectionInfoReceiver};
use crate::domain::events::LifecycleEvent;
use crate::domain::lifecycle::{
    LifecycleError, LifecycleInfo, LifecyclePhase, Liveness, RemoteProcessLifecycle,
};
use crate::domain::process::{LaunchCommand, ProcessLauncher, SIGKILL};
use crate::infrastructure::event_bus::EventBus;

/// Shared handles a host hands to every kernel session it creates.
#[derive(Clone)]
pub struct LifecycleCollaborators {
    pub cluster: Arc<dyn ClusterApi>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub connection: Arc<dyn ConnectionInfoReceiver>,
    pub events: EventBus,
}

pub struct YarnLifecycleManager {
    session: RemoteSession,
    locator: ApplicationLocator,
    connection: Arc<dyn ConnectionInfoReceiver>,
    events: EventBus,
    timings: LifecycleTimings,
    application_id: Option<ApplicationId>,
    phase: LifecyclePhase,
    rm_addr: Option<String>,
}

impl YarnLifecycleManager {
    pub fn new(
        settings: SessionSettings,
        timings: LifecycleTimings,
        collaborators: LifecycleCollaborators,
    ) -> Self {
        let mut session = RemoteSession::new(settings, collaborators.launcher);
        if session.ensure_shutdown_wait_at_least(timings.shutdown_wait_time) {
            debug!(
                "{} shutdown wait time adjusted to {:?} seconds.",
                session.kernel_id(),
                timings.shutdown_wait_time
            );
        }

        let locator = ApplicationLocator::new(collaborators.cluster);
        let rm_addr = locator.active_endpoint();

        Self {
            session,
            locator,
            connection: collaborators.connection,
            events: collaborators.events,
            timings,
            application_id: None,
            phase: LifecyclePhase::Terminated,
            rm_addr,
        }
    }

    pub fn kernel_id(&self) -> &KernelId {
        self.session.kernel_id()
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn assigned_host(&self) -> Option<&AssignedHost> {
        self.session.assigned()
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    /// Resolve the application id, querying by name until one is found.
    async fn resolve_application_id(&mut self, ignore_final_states: bool) -> Option<ApplicationId> {
        if self.application_id.is_some() {
            return self.application_id.clone();
        }

        let since = self.session.start_time().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let found = self
            .locator
            .find_by_name(self.session.kernel_id(), since, ignore_final_states)
            .await;

        match found.as_ref().and_then(|app| app.application_id().map(|id| (id, app.state))) {
            Some((id, state)) => {
                let elapsed = self.session.elapsed().as_secs_f64();
                info!(
                    "ApplicationID: '{}' assigned for KernelID: '{}', state: {}, {:.3} seconds after starting.",
                    id,
                    self.kernel_id(),
                    state,
                    elapsed
                );
                self.events.publish(LifecycleEvent::ApplicationIdAssigned {
                    kernel_id: self.kernel_id().clone(),
                    application_id: id.clone(),
                    state,
                    elapsed_secs: elapsed,
                    assigned_at: Utc::now(),
                });
                self.application_id = Some(id);
            }
            None => debug!(
                "ApplicationID not yet assigned for KernelID: '{}' - retrying...",
                self.kernel_id()
            ),
        }

        self.application_id.clone()
    }

    /// Poll until the kernel is connectable or launch has failed.
    async fn confirm_startup(&mut self) -> Result<(), LifecycleError> {
        self.phase = LifecyclePhase::Confirming;
        let mut iteration: u32 = 0;

        loop {
            iteration += 1;
            self.handle_timeout().await?;

            let Some(app_id) = self.resolve_application_id(true).await else {
                self.detect_launch_failure()?;
                continue;
            };

            let state = self.refresh_application(&app_id).await;
            if let Some(state) = state.filter(ApplicationState::is_final) {
                let err = LifecycleError::PrematureTermination {
                    kernel_id: self.kernel_id().clone(),
                    application_id: app_id,
                    state,
                };
                return Err(self.launch_failed(err));
            }

            debug!(
                "{}: State: '{}', Host: '{}', KernelID: '{}', ApplicationID: '{}'",
                iteration,
                state.map(|s| s.as_str()).unwrap_or("None"),
                self.assigned_host().map(|a| a.host.as_str()).unwrap_or(""),
                self.kernel_id(),
                app_id
            );
            self.events.publish(LifecycleEvent::StartupStateObserved {
                kernel_id: self.kernel_id().clone(),
                application_id: app_id.clone(),
                iteration,
                state,
                observed_at: Utc::now(),
            });

            let Some(assigned) = self.session.assigned().cloned() else {
                continue;
            };
            if self
                .connection
                .receive_connection_info(self.session.kernel_id(), &assigned)
                .await
            {
                let elapsed = self.session.elapsed().as_secs_f64();
                info!(
                    "KernelID: '{}' connectable on {} ({}), ApplicationID: '{}', {:.3} seconds after starting.",
                    self.kernel_id(),
                    assigned.host,
                    assigned.ip,
                    app_id,
                    elapsed
                );
                self.events.publish(LifecycleEvent::KernelConnectable {
                    kernel_id: self.kernel_id().clone(),
                    application_id: app_id,
                    elapsed_secs: elapsed,
                    connected_at: Utc::now(),
                });
                self.phase = LifecyclePhase::Running;
                return Ok(());
            }
        }
    }

    /// Fetch the application record, recording the assigned host the first
    /// time one is reported.
    async fn refresh_application(&mut self, app_id: &ApplicationId) -> Option<ApplicationState> {
        let app = self.locator.find_by_id(app_id).await?;

        if self.session.assigned().is_none() {
            if let Some(host) = app.am_host() {
                match resolve_host(host).await {
                    Ok(ip) => {
                        info!(
                            "KernelID: '{}' assigned to host '{}' ({}), ApplicationID: '{}'",
                            self.kernel_id(),
                            host,
                            ip,
                            app_id
                        );
                        self.events.publish(LifecycleEvent::HostAssigned {
                            kernel_id: self.kernel_id().clone(),
                            application_id: app_id.clone(),
                            host: host.to_string(),
                            ip,
                            assigned_at: Utc::now(),
                        });
                        self.session.set_assigned(AssignedHost {
                            host: host.to_string(),
                            ip,
                        });
                    }
                    Err(e) => warn!(
                        "Unable to resolve host '{}' for KernelID: '{}': {}.  Retrying...",
                        host,
                        self.kernel_id(),
                        e
                    ),
                }
            }
        }

        Some(app.state)
    }

    /// Sleep one poll interval, then fail the launch if it has run past the
    /// launch timeout.
    async fn handle_timeout(&mut self) -> Result<(), LifecycleError> {
        tokio::time::sleep(self.timings.poll_interval).await;

        let elapsed = self.session.elapsed();
        let timeout = self.session.launch_timeout();
        if elapsed <= timeout {
            return Ok(());
        }

        let timeout_secs = timeout.as_secs_f64();
        let (status, reason) = match self.resolve_application_id(true).await {
            None => (
                500,
                format!(
                    "Application ID is None. Failed to submit a new application to YARN within {} seconds.  Check server log for more information.",
                    timeout_secs
                ),
            ),
            Some(app_id) => {
                if self.locator.state_of(&app_id).await != Some(ApplicationState::Running) {
                    (
                        503,
                        format!(
                            "YARN resources unavailable after {:.3} seconds for app {}, launch timeout: {}!  Check YARN configuration.",
                            elapsed.as_secs_f64(),
                            app_id,
                            timeout_secs
                        ),
                    )
                } else {
                    (
                        500,
                        format!(
                            "App {} is RUNNING, but waited too long ({} secs) to get connection file.  Check YARN logs for more information.",
                            app_id, timeout_secs
                        ),
                    )
                }
            }
        };

        self.kill().await;
        let err = LifecycleError::LaunchTimeout {
            kernel_id: self.kernel_id().clone(),
            status,
            reason,
        };
        Err(self.launch_failed(err))
    }

    /// A submission process that exited non-zero before the application was
    /// ever seen will never produce one.
    fn detect_launch_failure(&mut self) -> Result<(), LifecycleError> {
        match self.session.local_exit_code() {
            Some(code) if code != 0 => {
                let err = LifecycleError::SubmissionExited {
                    kernel_id: self.kernel_id().clone(),
                    exit_code: code,
                };
                Err(self.launch_failed(err))
            }
            _ => Ok(()),
        }
    }

    fn launch_failed(&mut self, err: LifecycleError) -> LifecycleError {
        error!("{}", err);
        self.events.publish(LifecycleEvent::LaunchFailed {
            kernel_id: self.kernel_id().clone(),
            application_id: self.application_id.clone(),
            status: err.http_status_code(),
            reason: err.to_string(),
            failed_at: Utc::now(),
        });
        self.phase = LifecyclePhase::Terminated;
        err
    }

    /// Wait for a final state after a kill request, at most
    /// `max_poll_attempts` intervals.
    async fn await_final_state(&mut self, app_id: &ApplicationId) -> Option<ApplicationState> {
        let mut state = self.locator.state_of(app_id).await;
        let mut attempts = 1;
        while !state.is_some_and(|s| s.is_final()) && attempts <= self.timings.max_poll_attempts {
            tokio::time::sleep(self.timings.poll_interval).await;
            state = self.locator.state_of(app_id).await;
            attempts += 1;
        }
        state
    }
}

async fn resolve_host(host: &str) -> std::io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    tokio::net::lookup_host((host, 0))
        .await?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no address for '{}'", host))
        })
}

#[async_trait]
impl RemoteProcessLifecycle for YarnLifecycleManager {
    async fn launch(&mut self, command: LaunchCommand) -> Result<(), LifecycleError> {
        self.phase = LifecyclePhase::Launching;
        // A poll after cleanup may have pinned the previous run's id.
        self.application_id = None;
        self.session.reset();
        self.session.mark_started();

        let pid = match self.session.spawn(&command) {
            Ok(pid) => pid,
            Err(e) => return Err(self.launch_failed(e.into())),
        };

        debug!(
            "Yarn cluster kernel launched using YARN RM address: {}, pid: {:?}, Kernel ID: {}, cmd: '{}'",
            self.rm_addr.as_deref().unwrap_or("<unresolved>"),
            pid,
            self.kernel_id(),
            command.display()
        );
        self.events.publish(LifecycleEvent::SubmissionStarted {
            kernel_id: self.kernel_id().clone(),
            pid,
            command: command.display(),
            started_at: self.session.start_time().unwrap_or_else(Utc::now),
        });

        self.confirm_startup().await
    }

    async fn poll(&mut self) -> Liveness {
        let Some(app_id) = self.resolve_application_id(false).await else {
            return Liveness::Dead;
        };
        match self.locator.state_of(&app_id).await {
            Some(state) if state.is_initial() => Liveness::Alive,
            _ => Liveness::Dead,
        }
    }

    async fn signal(&mut self, signum: i32) -> Liveness {
        match signum {
            0 => self.poll().await,
            SIGKILL => self.kill().await,
            _ => {
                if let Err(e) = self.session.signal_local(signum) {
                    debug!(
                        "Signal {} not delivered to local process of KernelID: '{}': {}",
                        signum,
                        self.kernel_id(),
                        e
                    );
                }
                self.poll().await
            }
        }
    }

    async fn kill(&mut self) -> Liveness {
        let prior = self.phase;
        self.phase = LifecyclePhase::Killing;

        let app_id = self.resolve_application_id(false).await;
        let mut state = None;
        let mut result = Liveness::Alive;

        if let Some(id) = &app_id {
            self.locator.kill(id).await;
            state = self.await_final_state(id).await;
            if state.is_some_and(|s| s.is_final()) {
                result = Liveness::Dead;
            }
        }

        if result.is_alive() {
            warn!(
                "Termination of application '{}' for KernelID: '{}' not confirmed (state: {}).  Killing local process.",
                app_id.as_ref().map(|id| id.as_str()).unwrap_or("None"),
                self.kernel_id(),
                state.map(|s| s.as_str()).unwrap_or("None")
            );
            result = self.session.kill_local();
        }

        debug!(
            "YarnLifecycleManager.kill, application ID: {:?}, kernel ID: {}, state: {:?}, result: {:?}",
            app_id.as_ref().map(|id| id.as_str()),
            self.kernel_id(),
            state,
            result
        );
        self.events.publish(LifecycleEvent::KillCompleted {
            kernel_id: self.kernel_id().clone(),
            application_id: app_id,
            state,
            result,
            completed_at: Utc::now(),
        });

        self.phase = match result {
            Liveness::Dead => LifecyclePhase::Terminated,
            Liveness::Alive => prior,
        };
        result
    }

    async fn cleanup(&mut self) {
        if self.session.has_local_process() {
            debug!(
                "Clearing possible defunct process, pid={:?}, KernelID: '{}'",
                self.session.pid(),
                self.kernel_id()
            );
            self.session.reap_local().await;
        }

        self.application_id = None;
        self.session.reset();
        self.phase = LifecyclePhase::Terminated;
        self.events.publish(LifecycleEvent::SessionCleanedUp {
            kernel_id: self.kernel_id().clone(),
            cleaned_at: Utc::now(),
        });
    }

    fn save(&self) -> LifecycleInfo {
        LifecycleInfo {
            session: self.session.info(),
            application_id: self.application_id.clone(),
        }
    }

    fn restore(&mut self, info: LifecycleInfo) -> Result<(), LifecycleError> {
        let application_id = info
            .application_id
            .ok_or_else(|| LifecycleError::MissingApplicationId {
                kernel_id: self.kernel_id().clone(),
            })?;

        self.session.load_info(info.session);
        info!(
            "Restored KernelID: '{}' with ApplicationID: '{}'",
            self.kernel_id(),
            application_id
        );
        self.application_id = Some(application_id);
        self.phase = LifecyclePhase::Running;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        record, scheduled, MockCluster, MockConnection, MockLauncher,
    };
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const KERNEL: &str = "kernel-7f3a";

    struct Harness {
        cluster: Arc<MockCluster>,
        launcher: Arc<MockLauncher>,
        connection: Arc<MockConnection>,
        events: EventBus,
    }

    impl Harness {
        fn new(apps: Vec<crate::domain::application::ApplicationRecord>, connection: MockConnection) -> Self {
            Self {
                cluster: Arc::new(MockCluster::with_apps(apps)),
                launcher: Arc::new(MockLauncher::default()),
                connection: Arc::new(connection),
                events: EventBus::new(64),
            }
        }

        fn manager(&self, launch_timeout: Duration) -> YarnLifecycleManager {
            let settings = SessionSettings::new(KernelId::new(KERNEL))
                .with_launch_timeout(launch_timeout);
            YarnLifecycleManager::new(settings, fast_timings(), self.collaborators())
        }

        fn collaborators(&self) -> LifecycleCollaborators {
            LifecycleCollaborators {
                cluster: self.cluster.clone(),
                launcher: self.launcher.clone(),
                connection: self.connection.clone(),
                events: self.events.clone(),
            }
        }
    }

    fn fast_timings() -> LifecycleTimings {
        LifecycleTimings {
            poll_interval: Duration::from_millis(5),
            max_poll_attempts: 3,
            shutdown_wait_time: Duration::from_secs(15),
            launch_timeout: Duration::from_millis(200),
        }
    }

    fn submit() -> LaunchCommand {
        LaunchCommand::new(vec!["spark-submit".to_string(), "--deploy-mode".to_string(), "cluster".to_string()])
    }

    #[tokio::test]
    async fn test_launch_reaches_running() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Accepted)],
            MockConnection::ready_on(2),
        );
        let mut events = harness.events.subscribe_kernel(KernelId::new(KERNEL));
        let mut manager = harness.manager(Duration::from_secs(5));

        manager.launch(submit()).await.unwrap();

        assert_eq!(manager.phase(), LifecyclePhase::Running);
        assert_eq!(manager.application_id().unwrap().as_str(), "application_1_0001");
        let assigned = manager.assigned_host().unwrap();
        assert_eq!(assigned.host, "127.0.0.1");
        assert_eq!(assigned.ip, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(harness.launcher.launched.lock().len(), 1);

        let first = events.try_recv().unwrap();
        assert!(matches!(first, LifecycleEvent::SubmissionStarted { pid: Some(4242), .. }));
        let second = events.try_recv().unwrap();
        assert!(matches!(second, LifecycleEvent::ApplicationIdAssigned { .. }));
    }

    #[tokio::test]
    async fn test_application_id_is_sticky() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        harness
            .cluster
            .apps
            .lock()
            .push(record("application_1_0002", KERNEL, ApplicationState::Running));
        let list_calls = harness.cluster.list_calls.load(Ordering::SeqCst);

        assert_eq!(manager.poll().await, Liveness::Alive);
        assert_eq!(manager.application_id().unwrap().as_str(), "application_1_0001");
        assert_eq!(harness.cluster.list_calls.load(Ordering::SeqCst), list_calls);
    }

    #[tokio::test]
    async fn test_poll_semantics() {
        let harness = Harness::new(
            vec![record("application_1_0001", KERNEL, ApplicationState::Accepted)],
            MockConnection::never(),
        );
        let mut manager = harness.manager(Duration::from_secs(5));

        assert_eq!(manager.poll().await, Liveness::Alive);

        harness.cluster.set_state("application_1_0001", ApplicationState::Failed);
        assert_eq!(manager.poll().await, Liveness::Dead);

        harness.cluster.set_state("application_1_0001", ApplicationState::Finished);
        assert_eq!(manager.poll().await, Liveness::Dead);

        harness.cluster.set_state("application_1_0001", ApplicationState::Unknown);
        assert_eq!(manager.poll().await, Liveness::Dead);
    }

    #[tokio::test]
    async fn test_poll_without_application_is_dead() {
        let harness = Harness::new(vec![], MockConnection::never());
        let mut manager = harness.manager(Duration::from_secs(5));
        assert_eq!(manager.poll().await, Liveness::Dead);
        assert_eq!(manager.signal(0).await, Liveness::Dead);
    }

    #[tokio::test]
    async fn test_timeout_without_application_id() {
        let harness = Harness::new(vec![], MockConnection::never());
        let mut manager = harness.manager(Duration::from_millis(50));

        let err = manager.launch(submit()).await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
        assert!(err.to_string().contains("Application ID is None"));
        assert!(err.to_string().starts_with("KernelID: 'kernel-7f3a' launch timeout due to:"));
        assert_eq!(manager.phase(), LifecyclePhase::Terminated);
    }

    #[tokio::test]
    async fn test_timeout_while_resources_unavailable() {
        let harness = Harness::new(
            vec![record("application_1_0001", KERNEL, ApplicationState::Accepted)],
            MockConnection::never(),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_millis(50));

        let err = manager.launch(submit()).await.unwrap_err();
        assert_eq!(err.http_status_code(), 503);
        assert!(err.to_string().contains("YARN resources unavailable"));
        assert!(err.to_string().contains("application_1_0001"));
        assert_eq!(harness.cluster.kill_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_while_running_without_connection_info() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::never(),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_millis(50));

        let err = manager.launch(submit()).await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
        assert!(err.to_string().contains("is RUNNING, but waited too long"));
    }

    #[tokio::test]
    async fn test_premature_termination_during_startup() {
        let harness = Harness::new(
            vec![record("application_1_0001", KERNEL, ApplicationState::Accepted)],
            MockConnection::never(),
        );
        harness
            .cluster
            .state_script
            .lock()
            .extend([ApplicationState::Accepted, ApplicationState::Killed]);
        let mut manager = harness.manager(Duration::from_secs(5));

        let err = manager.launch(submit()).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PrematureTermination { state: ApplicationState::Killed, .. }
        ));
        assert_eq!(err.http_status_code(), 500);
    }

    #[tokio::test]
    async fn test_failed_application_does_not_end_startup() {
        let harness = Harness::new(
            vec![record("application_1_0001", KERNEL, ApplicationState::Failed)],
            MockConnection::never(),
        );
        let mut manager = harness.manager(Duration::from_millis(50));

        let err = manager.launch(submit()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::LaunchTimeout { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_submission_process_failure() {
        let harness = Harness::new(vec![], MockConnection::never());
        *harness.launcher.process.exit_code.lock() = Some(1);
        let mut manager = harness.manager(Duration::from_secs(5));

        let err = manager.launch(submit()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::SubmissionExited { exit_code: 1, .. }));
    }

    #[tokio::test]
    async fn test_clean_submission_exit_keeps_polling() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        harness.cluster.hidden_for_list_calls.store(3, Ordering::SeqCst);
        *harness.launcher.process.exit_code.lock() = Some(0);
        let mut manager = harness.manager(Duration::from_secs(5));

        manager.launch(submit()).await.unwrap();
        assert_eq!(manager.phase(), LifecyclePhase::Running);
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        harness.cluster.fail_next_calls(5);
        let mut manager = harness.manager(Duration::from_secs(5));

        manager.launch(submit()).await.unwrap();
        assert_eq!(manager.application_id().unwrap().as_str(), "application_1_0001");
    }

    #[tokio::test]
    async fn test_kill_confirmed_by_final_state() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        assert_eq!(manager.kill().await, Liveness::Dead);
        assert_eq!(manager.phase(), LifecyclePhase::Terminated);
        assert_eq!(harness.launcher.process.kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_kill_retry_bound_falls_back_to_local_process() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();
        let state_calls = harness.cluster.state_calls.load(Ordering::SeqCst);

        assert_eq!(manager.kill().await, Liveness::Dead);
        assert_eq!(harness.cluster.kill_calls.lock().len(), 1);
        // one query after the request plus max_poll_attempts retries
        assert_eq!(harness.cluster.state_calls.load(Ordering::SeqCst) - state_calls, 4);
        assert_eq!(harness.launcher.process.kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_application_is_never_confirmed_killed() {
        let harness = Harness::new(
            vec![record("application_1_0001", KERNEL, ApplicationState::Failed)],
            MockConnection::never(),
        );
        let mut manager = harness.manager(Duration::from_secs(5));

        // no local process to fall back on
        assert_eq!(manager.kill().await, Liveness::Alive);
        assert_eq!(harness.cluster.kill_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_signal_dispatch() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        assert_eq!(manager.signal(0).await, Liveness::Alive);
        assert_eq!(manager.signal(15).await, Liveness::Alive);
        assert_eq!(*harness.launcher.process.signals.lock(), vec![15]);

        assert_eq!(manager.signal(SIGKILL).await, Liveness::Dead);
        assert_eq!(harness.cluster.kill_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        manager.cleanup().await;
        assert!(manager.application_id().is_none());
        assert!(!manager.session().has_local_process());
        assert_eq!(harness.launcher.process.waits.load(Ordering::SeqCst), 1);

        manager.cleanup().await;
        assert!(manager.application_id().is_none());
        assert_eq!(manager.phase(), LifecyclePhase::Terminated);
        assert_eq!(harness.launcher.process.waits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relaunch_after_cleanup_and_poll_resolves_new_application() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();
        assert_eq!(manager.kill().await, Liveness::Dead);
        manager.cleanup().await;

        // the host keeps polling the old kernel after cleanup
        assert_eq!(manager.poll().await, Liveness::Dead);
        assert_eq!(manager.application_id().unwrap().as_str(), "application_1_0001");

        harness
            .cluster
            .apps
            .lock()
            .push(scheduled("application_1_0002", KERNEL, ApplicationState::Running));
        *harness.launcher.process.exit_code.lock() = None;

        manager.launch(submit()).await.unwrap();
        assert_eq!(manager.application_id().unwrap().as_str(), "application_1_0002");
        assert_eq!(manager.phase(), LifecyclePhase::Running);
        assert_eq!(harness.launcher.launched.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_name_query_is_bounded_by_launch_start() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        harness.cluster.hidden_for_list_calls.store(2, Ordering::SeqCst);
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        let start_time = manager.session().start_time().unwrap();
        let windows = harness.cluster.list_windows.lock().clone();
        assert_eq!(windows.len(), 3);
        assert!(windows.iter().all(|since| *since == start_time));

        manager.cleanup().await;
        manager.launch(submit()).await.unwrap();
        let relaunched_at = manager.session().start_time().unwrap();
        assert!(relaunched_at >= start_time);
        assert_eq!(harness.cluster.list_windows.lock().last(), Some(&relaunched_at));
    }

    #[tokio::test]
    async fn test_kill_runs_on_spawned_task() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        *harness.cluster.state_after_kill.lock() = Some(ApplicationState::Killed);
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        let result = tokio::spawn(async move { manager.kill().await }).await.unwrap();
        assert_eq!(result, Liveness::Dead);
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let harness = Harness::new(
            vec![scheduled("application_1_0001", KERNEL, ApplicationState::Running)],
            MockConnection::ready_on(1),
        );
        let mut manager = harness.manager(Duration::from_secs(5));
        manager.launch(submit()).await.unwrap();

        let saved = manager.save();
        assert_eq!(saved.application_id.as_ref().unwrap().as_str(), "application_1_0001");
        assert_eq!(saved.session.pid, Some(4242));
        assert_eq!(saved.session.assigned_host.as_deref(), Some("127.0.0.1"));

        let mut restored = harness.manager(Duration::from_secs(5));
        restored.restore(saved).unwrap();
        assert_eq!(restored.phase(), LifecyclePhase::Running);

        harness.cluster.apps.lock().clear();
        harness
            .cluster
            .apps
            .lock()
            .push(record("application_1_0001", "renamed", ApplicationState::Running));
        assert_eq!(restored.poll().await, Liveness::Alive);
    }

    #[tokio::test]
    async fn test_restore_rejects_missing_application_id() {
        let harness = Harness::new(vec![], MockConnection::never());
        let mut manager = harness.manager(Duration::from_secs(5));

        let err = manager.restore(LifecycleInfo::default()).unwrap_err();
        assert!(matches!(err, LifecycleError::MissingApplicationId { .. }));
        assert!(manager.application_id().is_none());
    }

    #[test]
    fn test_shutdown_wait_raised_to_yarn_minimum() {
        let harness = Harness::new(vec![], MockConnection::never());
        let manager = harness.manager(Duration::from_secs(5));
        assert_eq!(manager.session().shutdown_wait_time(), Duration::from_secs(15));

        let settings = SessionSettings::new(KernelId::new(KERNEL))
            .with_shutdown_wait_time(Duration::from_secs(20));
        let manager = YarnLifecycleManager::new(settings, fast_timings(), harness.collaborators());
        assert_eq!(manager.session().shutdown_wait_time(), Duration::from_secs(20));
    }
}
