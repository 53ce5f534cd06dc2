// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::domain::process::{LaunchCommand, ProcessError, ProcessHandle, ProcessLauncher};

/// Launches the submission process as a local child process.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for TokioProcessLauncher {
    fn launch(&self, command: &LaunchCommand) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let (program, args) = command.argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            command: command.display(),
            source,
        })?;

        debug!("Spawned submission process pid={:?}: {}", child.id(), command.display());
        Ok(Box::new(TokioProcessHandle {
            pid: child.id(),
            child,
            exit_code: None,
        }))
    }
}

pub struct TokioProcessHandle {
    child: Child,
    pid: Option<u32>,
    exit_code: Option<i32>,
}

fn exit_code_of(status: ExitStatus) -> i32 {
    // killed by a signal
    status.code().unwrap_or(-1)
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn poll(&mut self) -> Result<Option<i32>, ProcessError> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }
        if let Some(status) = self.child.try_wait()? {
            self.exit_code = Some(exit_code_of(status));
        }
        Ok(self.exit_code)
    }

    fn signal(&mut self, signum: i32) -> Result<(), ProcessError> {
        let pid = self.pid.ok_or(ProcessError::SignalFailed {
            pid: 0,
            reason: "process has no pid".to_string(),
        })?;
        if self.poll()?.is_some() {
            return Err(ProcessError::SignalFailed {
                pid,
                reason: "process has already exited".to_string(),
            });
        }

        #[cfg(unix)]
        {
            if unsafe { libc::kill(pid as i32, signum) } != 0 {
                return Err(ProcessError::SignalFailed {
                    pid,
                    reason: std::io::Error::last_os_error().to_string(),
                });
            }
            Ok(())
        }

        #[cfg(not(unix))]
        {
            let _ = signum;
            self.kill()
        }
    }

    fn kill(&mut self) -> Result<(), ProcessError> {
        if self.poll()?.is_some() {
            return Ok(());
        }
        self.child.start_kill()?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<i32, ProcessError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child.wait().await?;
        let code = exit_code_of(status);
        self.exit_code = Some(code);
        Ok(code)
    }
}
