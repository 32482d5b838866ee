// src/process/supervisor.rs

use std::collections::HashMap;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::process::signal::Signal;

/// Spawns supervised children.
///
/// Every command goes through the operator's shell (`$SHELL -c <joined>`,
/// falling back to `/bin/sh`) and starts its own session via `setsid`, so
/// the child's pid doubles as its process-group id and group-wide signal
/// delivery reaches every descendant.
#[derive(Debug, Clone)]
pub struct ChildSupervisor {
    shell: String,
    signal: Signal,
    timeout: Duration,
}

impl ChildSupervisor {
    pub fn new(signal: Signal, timeout: Duration) -> Self {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        Self {
            shell,
            signal,
            timeout,
        }
    }

    /// Spawn `command` with `extra_env` merged over the inherited
    /// environment. The handle's timeout deadline starts now.
    pub fn spawn(
        &self,
        command: &[String],
        extra_env: &HashMap<String, String>,
    ) -> Result<ChildHandle> {
        let joined = command.join(" ");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&joined);
        cmd.envs(extra_env);
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning `{} -c {}`", self.shell, joined))?;
        let pgid = child
            .id()
            .map(|id| id as i32)
            .context("spawned child has no pid")?;

        info!(pid = pgid, cmd = %joined, "command started");
        Ok(ChildHandle {
            child,
            pgid,
            state: ChildState::Spawned,
            deadline: Instant::now() + self.timeout,
            signal: self.signal,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildState {
    Spawned,
    Killing,
    Exited,
}

/// A running (or just-reaped) child and its process group.
pub struct ChildHandle {
    child: Child,
    pgid: i32,
    state: ChildState,
    deadline: Instant,
    signal: Signal,
}

impl ChildHandle {
    pub fn pid(&self) -> i32 {
        self.pgid
    }

    /// Non-blocking reap. Never blocks, observable once.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        match self.child.try_wait().context("polling child status")? {
            Some(status) => {
                self.state = ChildState::Exited;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Blocking reap.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await.context("waiting for child")?;
        self.state = ChildState::Exited;
        Ok(status)
    }

    /// True once the wall-clock timeout has elapsed without an exit.
    pub fn timed_out(&self) -> bool {
        self.state == ChildState::Spawned && Instant::now() >= self.deadline
    }

    /// Deliver `signal` to the whole group. ESRCH (group already gone) is
    /// not an error.
    pub fn kill_group(&mut self, signal: Signal) {
        if self.state == ChildState::Spawned {
            self.state = ChildState::Killing;
        }
        debug!(pgid = self.pgid, signal = %signal, "signalling process group");
        let rc = unsafe { libc::killpg(self.pgid, signal.as_raw()) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pgid = self.pgid, error = %err, "killpg failed");
            }
        }
    }

    /// Kill with the configured signal and reap: the restart and timeout
    /// path. Guarantees the group is gone before returning.
    pub async fn terminate(&mut self) -> Result<ExitStatus> {
        self.kill_group(self.signal);
        let status = self.wait().await?;
        self.reap_group();
        Ok(status)
    }

    /// Wait for the exit, enforcing the wall-clock timeout: on expiry the
    /// configured signal goes to the group and the child is reaped.
    pub async fn wait_with_timeout(&mut self) -> Result<ExitStatus> {
        loop {
            if let Some(status) = self.try_wait()? {
                self.reap_group();
                return Ok(status);
            }
            if self.timed_out() {
                warn!(pid = self.pgid, "command hit its wall-clock timeout");
                return self.terminate().await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// After an exit, force-clear the group so no orphaned grandchild
    /// survives. Almost always a no-op.
    pub fn reap_group(&self) {
        let rc = unsafe { libc::killpg(self.pgid, libc::SIGKILL) };
        if rc == 0 {
            trace!(pgid = self.pgid, "stray group members reaped");
        }
    }
}
