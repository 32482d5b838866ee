// src/run/mod.rs

//! The debounce / execute / restart loop.
//!
//! State machine:
//!
//! ```text
//! Idle ──event──► Debouncing ──quiescence──► Executing
//! Executing ──exit──► Idle
//! Executing ──event, restart──► Killing ──reaped──► Executing
//! Executing ──event, no restart──► Executing (events stay queued)
//! ```
//!
//! While a child runs with `--restart`, the loop alternates its `try_wait`
//! with a 10 ms monitor poll on the one thread; when both fire in the same
//! tick the exit wins, so a finished process is never "restarted".

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Result;
use console::style;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::monitor::MonitorResult;
use crate::notification;
use crate::process::{ChildHandle, ChildSupervisor};

/// Environment variable carrying the change-set to the child.
pub const EVENT_ENV_VAR: &str = "WATCHEXEC_EVENT";

/// Cadence of the try_wait / monitor-poll alternation while a child runs.
const POLL_PERIOD: Duration = Duration::from_millis(10);

/// How long an idle `wait` parks before looping; not observable behavior.
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// The seam between the run loop and whatever produces change-sets: the
/// live [`RecursiveMonitor`](crate::monitor::RecursiveMonitor) in
/// production, a scripted fake in tests.
#[allow(async_fn_in_trait)]
pub trait ChangeSource {
    /// Block up to `timeout` for the next batch of changes.
    async fn wait(&mut self, timeout: Duration) -> Result<Vec<MonitorResult>>;
    /// Drain every change arriving within `window` of the call.
    async fn collect(&mut self, window: Duration) -> Result<Vec<MonitorResult>>;
    /// Discard everything currently queued.
    async fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub restart: bool,
    pub debounce: Duration,
    pub clear_screen: bool,
    pub postpone: bool,
    pub clear_events: bool,
    pub export_env: bool,
    pub notify: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            restart: false,
            debounce: Duration::from_millis(200),
            clear_screen: false,
            postpone: false,
            clear_events: false,
            export_env: false,
            notify: None,
        }
    }
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut(ExitStatus),
    Restart(Vec<MonitorResult>),
}

pub struct RunLoop<S: ChangeSource> {
    source: S,
    supervisor: ChildSupervisor,
    command: Vec<String>,
    options: RunOptions,
    runs: u64,
}

impl<S: ChangeSource> RunLoop<S> {
    pub fn new(
        source: S,
        supervisor: ChildSupervisor,
        command: Vec<String>,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            supervisor,
            command,
            options,
            runs: 0,
        }
    }

    /// Run until externally terminated. Only a configuration-level failure
    /// (notably the very first spawn) returns.
    pub async fn run(mut self) -> Result<()> {
        info!(cmd = %self.command.join(" "), restart = self.options.restart, "run loop started");

        if !self.options.postpone {
            self.execute(Vec::new()).await?;
        }

        loop {
            let initial = self.source.wait(IDLE_WAIT).await?;
            if initial.is_empty() {
                continue;
            }
            let changes = self.debounce(initial).await?;
            self.execute(changes).await?;
        }
    }

    /// Fold everything arriving within the debounce window into one
    /// change-set. A zero window disables coalescing.
    async fn debounce(&mut self, initial: Vec<MonitorResult>) -> Result<Vec<MonitorResult>> {
        let mut seen: HashSet<MonitorResult> = initial.iter().cloned().collect();
        let mut changes = initial;
        if !self.options.debounce.is_zero() {
            for extra in self.source.collect(self.options.debounce).await? {
                if seen.insert(extra.clone()) {
                    changes.push(extra);
                }
            }
        }
        Ok(changes)
    }

    /// One Executing episode: spawn, supervise, restart as long as events
    /// keep evicting the child, then report the final status.
    async fn execute(&mut self, mut changes: Vec<MonitorResult>) -> Result<()> {
        loop {
            if self.options.clear_screen {
                print!("\x1bc");
                let _ = std::io::stdout().flush();
            }

            let env = self.child_env(&changes);
            let mut child = match self.supervisor.spawn(&self.command, &env) {
                Ok(child) => child,
                Err(err) => {
                    if self.runs == 0 {
                        return Err(err.context("first command spawn failed"));
                    }
                    error!(error = %err, "command spawn failed");
                    return Ok(());
                }
            };
            self.runs += 1;

            match self.supervise(&mut child).await? {
                Outcome::Exited(status) => {
                    report_status(status, self.options.notify.as_deref());
                    break;
                }
                Outcome::TimedOut(status) => {
                    warn!("command hit its wall-clock timeout and was killed");
                    report_status(status, self.options.notify.as_deref());
                    break;
                }
                Outcome::Restart(next) => {
                    info!("restarting");
                    changes = next;
                }
            }
        }

        if self.options.clear_events {
            self.source.clear().await?;
        }
        Ok(())
    }

    async fn supervise(&mut self, child: &mut ChildHandle) -> Result<Outcome> {
        loop {
            // Tie-break: an exit observed in this tick wins over any event.
            if let Some(status) = child.try_wait()? {
                child.reap_group();
                return Ok(Outcome::Exited(status));
            }
            if child.timed_out() {
                let status = child.terminate().await?;
                return Ok(Outcome::TimedOut(status));
            }

            if self.options.restart {
                let events = self.source.wait(POLL_PERIOD).await?;
                if !events.is_empty() {
                    child.terminate().await?;
                    let changes = self.debounce(events).await?;
                    return Ok(Outcome::Restart(changes));
                }
            } else {
                // Without restart the child is left alone; events queue up
                // in the kernel and surface after the exit.
                sleep(POLL_PERIOD).await;
            }
        }
    }

    fn child_env(&self, changes: &[MonitorResult]) -> HashMap<String, String> {
        let mut env = HashMap::new();
        if self.options.export_env {
            env.insert(EVENT_ENV_VAR.to_string(), encode_change_set(changes));
        }
        env
    }
}

/// `kind:path` tuples joined by `;`, the `WATCHEXEC_EVENT` payload.
pub fn encode_change_set(changes: &[MonitorResult]) -> String {
    let tuples: Vec<String> = changes
        .iter()
        .map(|c| format!("{}:{}", c.kind.label(), c.path.display()))
        .collect();
    tuples.join(";")
}

/// Print the colored ✓/✗ status line and fire the optional notification.
pub fn report_status(status: ExitStatus, notify: Option<&str>) {
    let plain = if let Some(code) = status.code() {
        format!("exit status {code}")
    } else if let Some(sig) = status.signal() {
        format!("killed by signal {sig}")
    } else {
        "exited abnormally".to_string()
    };

    if status.success() {
        println!("{} {plain}", style("✓").green());
    } else {
        println!("{} {plain}", style("✗").red());
    }

    if let Some(message) = notify {
        notification::send(crate::PROGNAME, &format!("{message}: {plain}"));
    }
}
