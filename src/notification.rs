// src/notification.rs

//! Desktop notification via the external `notify-send` binary.

use tokio::process::Command;
use tracing::debug;

/// Fire-and-forget `notify-send`. A missing binary or a non-zero exit is
/// logged and otherwise ignored.
pub fn send(progname: &str, message: &str) {
    let mut cmd = Command::new("notify-send");
    cmd.args(["-u", "normal", "-t", "3000", "-a", progname]);
    cmd.arg(message);

    match cmd.spawn() {
        Ok(mut child) => {
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
        Err(err) => debug!(error = %err, "notify-send unavailable"),
    }
}
