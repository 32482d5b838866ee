mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

use watchrun::filter::GlobFilter;
use watchrun::monitor::{EventClasses, EventKind, MonitorResult, RecursiveMonitor};

type TestResult = Result<(), Box<dyn Error>>;

fn content_monitor(root: &Path, filter: GlobFilter) -> anyhow::Result<RecursiveMonitor> {
    RecursiveMonitor::new(
        &[root.to_path_buf()],
        filter,
        false,
        false,
        EventClasses::content_only(),
    )
}

/// Pump the monitor until `pred` is satisfied by the accumulated results or
/// the budget runs out.
async fn gather_until(
    monitor: &mut RecursiveMonitor,
    budget: Duration,
    pred: impl Fn(&[MonitorResult]) -> bool,
) -> anyhow::Result<Vec<MonitorResult>> {
    let deadline = Instant::now() + budget;
    let mut seen = Vec::new();
    while Instant::now() < deadline && !pred(&seen) {
        seen.extend(monitor.wait(Duration::from_millis(100)).await?);
    }
    Ok(seen)
}

#[tokio::test]
async fn writes_in_freshly_created_subtrees_are_seen() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let mut monitor = content_monitor(&root, GlobFilter::universal())?;

    // Build a nested tree *after* setup. Once a wait call has processed the
    // Create, the whole fresh subtree must be watched.
    let deep = root.join("a").join("b");
    fs::create_dir_all(&deep)?;

    let deadline = Instant::now() + Duration::from_secs(2);
    while !monitor.is_watched(&deep) && Instant::now() < deadline {
        monitor.wait(Duration::from_millis(100)).await?;
    }
    assert!(monitor.is_watched(&deep), "fresh subtree never registered");

    // Writes from here on are guaranteed visible.
    let file = deep.join("inner.txt");
    fs::write(&file, b"payload")?;

    let seen = gather_until(&mut monitor, Duration::from_secs(2), |results| {
        results
            .iter()
            .any(|r| r.path == file && r.kind == EventKind::CloseWrite)
    })
    .await?;

    assert!(
        seen.iter()
            .any(|r| r.path == file && r.kind == EventKind::CloseWrite),
        "expected CloseWrite for {file:?}, got {seen:?}"
    );
    assert!(monitor.is_watched(&deep), "fresh subtree must be watched");

    Ok(())
}

#[tokio::test]
async fn filter_rejects_paths_it_never_reports() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let filter = GlobFilter::new(&["*.d".to_string()], &[])?;
    let mut monitor = content_monitor(&root, filter)?;

    fs::write(root.join("a.py"), b"print()")?;
    fs::write(root.join("a.d"), b"module a;")?;
    let wanted = root.join("a.d");

    let seen = gather_until(&mut monitor, Duration::from_secs(2), |results| {
        results.iter().any(|r| r.path == wanted)
    })
    .await?;

    assert!(seen.iter().any(|r| r.path == wanted));
    assert!(
        seen.iter().all(|r| r.path.to_string_lossy().ends_with(".d")),
        "a filtered-out path leaked: {seen:?}"
    );

    Ok(())
}

#[tokio::test]
async fn clear_discards_and_is_idempotent() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let mut monitor = content_monitor(&root, GlobFilter::universal())?;

    fs::write(root.join("noise.txt"), b"x")?;
    // Give the kernel a moment to queue the burst.
    tokio::time::sleep(Duration::from_millis(100)).await;

    monitor.clear().await?;
    let watches = monitor.watch_count();
    monitor.clear().await?;

    assert_eq!(monitor.watch_count(), watches);
    assert!(monitor.wait(Duration::ZERO).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn deleted_directory_is_pruned_from_watch_set() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let sub = root.join("sub");
    fs::create_dir(&sub)?;

    let mut monitor = content_monitor(&root, GlobFilter::universal())?;
    assert!(monitor.is_watched(&sub));

    fs::remove_dir(&sub)?;
    let seen = gather_until(&mut monitor, Duration::from_secs(2), |results| {
        results
            .iter()
            .any(|r| r.path == sub && r.kind == EventKind::DeleteSelf)
    })
    .await?;

    assert!(
        seen.iter()
            .any(|r| r.path == sub && r.kind == EventKind::DeleteSelf),
        "expected DeleteSelf, got {seen:?}"
    );
    assert!(!monitor.is_watched(&sub), "watch entry must be pruned");

    Ok(())
}

#[tokio::test]
async fn created_directory_joins_watch_set_before_wait_returns() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let mut monitor = content_monitor(&root, GlobFilter::universal())?;

    let sub = root.join("fresh");
    fs::create_dir(&sub)?;

    let seen = gather_until(&mut monitor, Duration::from_secs(2), |results| {
        results
            .iter()
            .any(|r| r.path == sub && r.kind == EventKind::Create)
    })
    .await?;

    assert!(seen
        .iter()
        .any(|r| r.path == sub && r.kind == EventKind::Create));
    assert!(monitor.is_watched(&sub));

    Ok(())
}

#[test]
fn event_classes_partition_the_kinds() {
    let content = EventClasses::content_only();
    let all = EventClasses::all();

    for kind in [
        EventKind::CloseWrite,
        EventKind::Create,
        EventKind::Delete,
        EventKind::DeleteSelf,
        EventKind::Modify,
        EventKind::MoveSelf,
        EventKind::Rename,
    ] {
        assert!(kind.is_content());
        assert!(content.enables(kind));
    }
    for kind in [
        EventKind::Access,
        EventKind::Attribute,
        EventKind::CloseNoWrite,
        EventKind::Open,
    ] {
        assert!(kind.is_metadata());
        assert!(!content.enables(kind));
        assert!(all.enables(kind));
    }
}

#[tokio::test]
async fn zero_timeout_wait_never_blocks() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let mut monitor = content_monitor(&root, GlobFilter::universal())?;

    let before = Instant::now();
    let results = monitor.wait(Duration::ZERO).await?;
    assert!(results.is_empty());
    assert!(before.elapsed() < Duration::from_millis(50));

    Ok(())
}
