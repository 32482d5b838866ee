mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::time::{Duration, Instant};

use watchrun::process::{ChildSupervisor, Signal};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor_with(signal: Signal, timeout: Duration) -> ChildSupervisor {
    ChildSupervisor::new(signal, timeout)
}

async fn wait_for<F: Fn() -> bool>(pred: F, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    pred()
}

fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[tokio::test]
async fn signal_names_and_numbers_parse() -> TestResult {
    init_tracing();

    assert_eq!(Signal::parse("TERM")?.as_raw(), libc::SIGTERM);
    assert_eq!(Signal::parse("sigkill")?.as_raw(), libc::SIGKILL);
    assert_eq!(Signal::parse("9")?.as_raw(), 9);
    assert_eq!(Signal::parse("SIGUSR1")?.as_raw(), libc::SIGUSR1);
    assert!(Signal::parse("bogus").is_err());
    assert!(Signal::parse("-3").is_err());

    Ok(())
}

#[tokio::test]
async fn try_wait_never_blocks_and_wait_reaps() -> TestResult {
    init_tracing();

    let sup = supervisor_with(Signal::KILL, Duration::from_secs(30));
    let mut child = sup.spawn(&["sleep 0.2".to_string()], &Default::default())?;

    let before = Instant::now();
    let early = child.try_wait()?;
    assert!(before.elapsed() < Duration::from_millis(50));
    assert!(early.is_none(), "child should still be running");

    let status = child.wait().await?;
    assert!(status.success());

    Ok(())
}

#[tokio::test]
async fn group_kill_takes_down_a_term_ignoring_grandchild() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let pidfile = dir.path().join("grandchild.pid");

    // The subshell ignores SIGTERM (inherited by its sleep); only the
    // group-wide forced reap can end it.
    let script = format!(
        "(trap '' TERM; sleep 30) & echo $! > {pf}; wait",
        pf = pidfile.display()
    );

    let sup = supervisor_with(Signal::TERM, Duration::from_secs(30));
    let mut child = sup.spawn(&[script], &Default::default())?;

    // setsid makes the child its own group leader.
    assert_eq!(unsafe { libc::getpgid(child.pid()) }, child.pid());

    let pf = pidfile.clone();
    assert!(
        wait_for(move || pf.exists(), Duration::from_secs(3)).await,
        "grandchild pid file never appeared"
    );
    let grandchild: i32 = fs::read_to_string(&pidfile)?.trim().parse()?;
    assert!(process_alive(grandchild));

    child.terminate().await?;

    assert!(
        wait_for(move || !process_alive(grandchild), Duration::from_secs(2)).await,
        "grandchild survived the group kill"
    );

    Ok(())
}

#[tokio::test]
async fn timeout_expiry_kills_the_group() -> TestResult {
    init_tracing();

    let sup = supervisor_with(Signal::KILL, Duration::from_millis(300));
    let mut child = sup.spawn(&["sleep 10".to_string()], &Default::default())?;

    let before = Instant::now();
    let status = child.wait_with_timeout().await?;

    assert!(
        before.elapsed() < Duration::from_secs(2),
        "timeout did not fire promptly"
    );
    assert_eq!(status.signal(), Some(libc::SIGKILL));

    Ok(())
}

#[tokio::test]
async fn extra_env_reaches_the_child() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.out");

    let mut env = std::collections::HashMap::new();
    env.insert("WATCHEXEC_EVENT".to_string(), "create:/tmp/a".to_string());

    let sup = supervisor_with(Signal::KILL, Duration::from_secs(10));
    let mut child = sup.spawn(
        &[format!("echo \"$WATCHEXEC_EVENT\" > {}", out.display())],
        &env,
    )?;
    let status = child.wait().await?;
    assert!(status.success());

    assert_eq!(fs::read_to_string(&out)?.trim(), "create:/tmp/a");
    Ok(())
}
