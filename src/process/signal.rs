// src/process/signal.rs

use std::fmt;

use anyhow::{bail, Result};

/// A POSIX signal, as selected with `-s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal(i32);

impl Signal {
    pub const KILL: Signal = Signal(libc::SIGKILL);
    pub const TERM: Signal = Signal(libc::SIGTERM);

    /// Accepts `TERM`, `SIGTERM`, lower case variants, or a raw number.
    pub fn parse(input: &str) -> Result<Signal> {
        let trimmed = input.trim();
        if let Ok(num) = trimmed.parse::<i32>() {
            if num > 0 {
                return Ok(Signal(num));
            }
            bail!("signal number must be positive: {input}");
        }

        let name = trimmed.to_uppercase();
        let name = name.strip_prefix("SIG").unwrap_or(&name);
        let raw = match name {
            "HUP" => libc::SIGHUP,
            "INT" => libc::SIGINT,
            "QUIT" => libc::SIGQUIT,
            "KILL" => libc::SIGKILL,
            "USR1" => libc::SIGUSR1,
            "USR2" => libc::SIGUSR2,
            "TERM" => libc::SIGTERM,
            "CONT" => libc::SIGCONT,
            "STOP" => libc::SIGSTOP,
            _ => bail!("unknown signal: {input}"),
        };
        Ok(Signal(raw))
    }

    pub fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            libc::SIGHUP => "SIGHUP",
            libc::SIGINT => "SIGINT",
            libc::SIGQUIT => "SIGQUIT",
            libc::SIGKILL => "SIGKILL",
            libc::SIGUSR1 => "SIGUSR1",
            libc::SIGUSR2 => "SIGUSR2",
            libc::SIGTERM => "SIGTERM",
            libc::SIGCONT => "SIGCONT",
            libc::SIGSTOP => "SIGSTOP",
            other => return write!(f, "signal {other}"),
        };
        f.write_str(name)
    }
}
