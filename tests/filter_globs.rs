mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use watchrun::filter::{read_gitignore, GlobFilter, IgnoreLayers, DEFAULT_IGNORES};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn include_then_exclude_ordering() -> TestResult {
    init_tracing();

    let filter = GlobFilter::new(
        &["*.rs".to_string(), "*.toml".to_string()],
        &["*/target/*".to_string()],
    )?;

    assert!(filter.matches("/proj/src/main.rs"));
    assert!(filter.matches("/proj/Cargo.toml"));
    assert!(!filter.matches("/proj/src/main.py"));
    // An exclude shadows an otherwise-included path.
    assert!(!filter.matches("/proj/target/debug/build.rs"));

    Ok(())
}

#[test]
fn empty_include_is_universal() -> TestResult {
    init_tracing();

    let filter = GlobFilter::new(&[], &["*.log".to_string()])?;
    assert!(filter.matches("/anything/at/all"));
    assert!(!filter.matches("/var/run/app.log"));

    Ok(())
}

#[test]
fn directories_only_consult_excludes() -> TestResult {
    init_tracing();

    // `--ext d` style include: directories never end in `.d`, but they must
    // still be descended into.
    let filter = GlobFilter::new(&["*.d".to_string()], &["*/.git/*".to_string()])?;

    assert!(filter.accepts_dir("/proj/src"));
    assert!(!filter.accepts_dir("/proj/.git/objects"));
    assert!(filter.matches("/proj/src/app.d"));
    assert!(!filter.matches("/proj/src/app.py"));

    Ok(())
}

#[test]
fn default_ignores_cover_editor_droppings() -> TestResult {
    init_tracing();

    let excludes: Vec<String> = DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect();
    let filter = GlobFilter::new(&[], &excludes)?;

    assert!(!filter.matches("/proj/.DS_Store"));
    assert!(!filter.matches("/proj/mod.pyc"));
    assert!(!filter.matches("/proj/#scratch.txt#"));
    assert!(!filter.matches("/proj/.main.rs.swp"));
    assert!(!filter.matches("/proj/.git/HEAD"));
    assert!(filter.matches("/proj/src/main.rs"));

    Ok(())
}

#[test]
fn gitignore_lines_become_exclude_patterns() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join(".gitignore");
    fs::write(
        &path,
        "# build output\n\ntarget/\n*.log\n!keep.log\n  spaced.txt  \n",
    )?;

    let patterns = read_gitignore(&path)?;
    assert_eq!(
        patterns,
        vec![
            "target".to_string(),
            "*.log".to_string(),
            "spaced.txt".to_string(),
        ]
    );

    Ok(())
}

#[test]
fn ignore_layers_resolve_nearest_ancestor() -> TestResult {
    init_tracing();

    let mut layers = IgnoreLayers::new();
    layers.push(
        PathBuf::from("/proj"),
        GlobFilter::new(&[], &["*.log".to_string()])?,
    );
    layers.push(
        PathBuf::from("/proj/sub"),
        GlobFilter::new(&[], &["generated".to_string()])?,
    );

    // Nearest layer is /proj/sub: its patterns apply, the outer ones do not.
    assert!(!layers.accepts(&PathBuf::from("/proj/sub/generated")));
    assert!(layers.accepts(&PathBuf::from("/proj/sub/app.log")));
    // Outside /proj/sub the outer layer applies.
    assert!(!layers.accepts(&PathBuf::from("/proj/app.log")));
    // Unrelated trees are untouched.
    assert!(layers.accepts(&PathBuf::from("/elsewhere/app.log")));

    Ok(())
}
