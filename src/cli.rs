// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Usage shape: `watchrun [options] -- cmd...`; everything after `--` is
//! the command, joined and handed to `$SHELL -c`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Run a command whenever watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory root to watch (repeatable).
    #[arg(short = 'w', long = "watch", value_name = "DIR")]
    pub watch: Vec<PathBuf>,

    /// File extension to react to; sugar for `--include "*.EXT"` (repeatable).
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub ext: Vec<String>,

    /// Glob pattern to include (repeatable). Empty means everything.
    #[arg(long = "include", value_name = "PAT")]
    pub include: Vec<String>,

    /// Glob pattern to exclude (repeatable).
    #[arg(long = "exclude", value_name = "PAT")]
    pub exclude: Vec<String>,

    /// Do not consume `.gitignore` files.
    #[arg(long)]
    pub no_vcs_ignore: bool,

    /// Skip the built-in ignore patterns (editor droppings, `.git`).
    #[arg(long)]
    pub no_default_ignore: bool,

    /// Do not traverse symbolic links.
    #[arg(long)]
    pub no_follow_symlink: bool,

    /// Clear the terminal before each run.
    #[arg(short = 'c', long = "clear")]
    pub clear: bool,

    /// Debounce window in milliseconds; 0 disables coalescing.
    #[arg(short = 'd', long = "debounce", value_name = "MS", default_value_t = 200)]
    pub debounce: u64,

    /// Per-run wall-clock timeout in seconds.
    #[arg(short = 't', long = "timeout", value_name = "SEC", default_value_t = 3600)]
    pub timeout: u64,

    /// Kill and restart the command when new events arrive.
    #[arg(short = 'r', long = "restart")]
    pub restart: bool,

    /// Signal used to kill the command (name or number; default SIGKILL).
    #[arg(short = 's', long = "signal", value_name = "SIG")]
    pub signal: Option<String>,

    /// Also observe metadata events (access, attribute, open, close-nowrite).
    #[arg(long)]
    pub meta: bool,

    /// Export the change-set to the command via `WATCHEXEC_EVENT`.
    #[arg(long)]
    pub env: bool,

    /// Send a desktop notification with the exit status after each run.
    #[arg(long, value_name = "MSG")]
    pub notify: Option<String>,

    /// Do not run the command at startup; wait for the first change.
    #[arg(short = 'p', long = "postpone")]
    pub postpone: bool,

    /// Drain events that arrived while the command was running.
    #[arg(long)]
    pub clear_events: bool,

    /// One-shot mode: diff the tree against the fingerprint database
    /// instead of watching live.
    #[arg(short = 'o', long = "oneshot", requires = "oneshot_db")]
    pub oneshot: bool,

    /// Fingerprint database path for one-shot mode.
    #[arg(long = "oneshot-db", value_name = "PATH")]
    pub oneshot_db: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(short = 'v', long = "verbose", value_enum, value_name = "LEVEL")]
    pub verbose: Option<LogLevel>,

    /// Deprecated: commands always run through `$SHELL -c`.
    #[arg(long, hide = true)]
    pub shell: bool,

    /// The command to run, after `--`.
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
