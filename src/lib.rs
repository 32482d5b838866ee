// src/lib.rs

pub mod cli;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod oneshot;
pub mod process;
pub mod run;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::filter::{GlobFilter, DEFAULT_IGNORES};
use crate::monitor::{EventClasses, RecursiveMonitor};
use crate::oneshot::OneShotDiffer;
use crate::process::{ChildSupervisor, Signal};
use crate::run::{RunLoop, RunOptions};

/// Name reported to the notification daemon.
pub const PROGNAME: &str = "watchrun";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - filter assembly (includes, excludes, default ignores)
/// - the child supervisor (shell, signal, timeout)
/// - either the live monitor + run loop, or the one-shot differ
pub async fn run(args: CliArgs) -> Result<()> {
    if args.command.is_empty() {
        bail!("no command given (usage: watchrun [options] -- cmd ...)");
    }
    if args.watch.is_empty() {
        bail!("no watch roots given (use -w DIR)");
    }
    if args.shell {
        warn!("--shell is deprecated and ignored; commands always run via $SHELL -c");
    }

    let filter = build_filter(&args)?;
    debug!(?filter, "primary filter assembled");

    let signal = match &args.signal {
        Some(name) => Signal::parse(name)?,
        None => Signal::KILL,
    };
    let supervisor = ChildSupervisor::new(signal, Duration::from_secs(args.timeout));

    let options = RunOptions {
        restart: args.restart,
        debounce: Duration::from_millis(args.debounce),
        clear_screen: args.clear,
        postpone: args.postpone,
        clear_events: args.clear_events,
        export_env: args.env,
        notify: args.notify.clone(),
    };

    if args.oneshot {
        let db_path = args
            .oneshot_db
            .clone()
            .context("--oneshot requires --oneshot-db PATH")?;
        let differ = OneShotDiffer::new(
            args.watch.clone(),
            filter,
            !args.no_follow_symlink,
            db_path,
        )?;
        return differ.run(&supervisor, &args.command, &options).await;
    }

    let classes = EventClasses {
        content: true,
        metadata: args.meta,
    };
    let monitor = RecursiveMonitor::new(
        &args.watch,
        filter,
        !args.no_vcs_ignore,
        !args.no_follow_symlink,
        classes,
    )?;

    RunLoop::new(monitor, supervisor, args.command.clone(), options)
        .run()
        .await
}

/// Includes from `--include` and `--ext`, excludes from `--exclude` plus the
/// built-in ignore set.
fn build_filter(args: &CliArgs) -> Result<GlobFilter> {
    let mut include = args.include.clone();
    for ext in &args.ext {
        include.push(format!("*.{}", ext.trim_start_matches('.')));
    }

    let mut exclude = args.exclude.clone();
    if !args.no_default_ignore {
        exclude.extend(DEFAULT_IGNORES.iter().map(|s| s.to_string()));
    }

    GlobFilter::new(&include, &exclude)
}
