use std::path::{Path, PathBuf};

use proptest::prelude::*;

use watchrun::filter::GlobFilter;
use watchrun::monitor::{EventKind, MonitorResult};
use watchrun::oneshot::{FileDb, Fingerprint};
use watchrun::run::encode_change_set;

proptest! {
    // Filter honesty: an exclude pattern always wins, and an empty include
    // list is universal.
    #[test]
    fn exclude_always_shadows_include(
        dir in "[a-z]{1,8}",
        stem in "[a-z]{1,8}",
    ) {
        let filter = GlobFilter::new(
            &["*".to_string()],
            &["*.tmp".to_string()],
        ).unwrap();

        let excluded = format!("/{dir}/{stem}.tmp");
        let included = format!("/{dir}/{stem}.rs");
        prop_assert!(!filter.matches(&excluded));
        prop_assert!(filter.matches(&included));

        let universal = GlobFilter::new(&[], &["*.tmp".to_string()]).unwrap();
        prop_assert!(universal.matches(&included));
        prop_assert!(!universal.matches(&excluded));
    }

    // writeDb(readDb(x)) == x up to member ordering.
    #[test]
    fn db_survives_a_write_read_cycle(
        entries in prop::collection::btree_map(
            "[a-z]{1,6}/[a-z]{1,6}",
            (any::<u32>(), any::<u32>(), any::<u64>()),
            0..8,
        ),
        cmd in prop::collection::vec("[a-z ._-]{1,12}", 1..4),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let mut db = FileDb::new(cmd.clone());
        for (p, (t, s, c)) in &entries {
            db.insert(Fingerprint::restored(
                PathBuf::from(p),
                *t as i64,
                *s as u64,
                *c,
            ));
        }
        db.write_to(&path).unwrap();

        let loaded = FileDb::load(&path);
        prop_assert_eq!(loaded.len(), entries.len());
        prop_assert_eq!(loaded.cmd(), cmd.as_slice());
        for (p, (t, s, c)) in &entries {
            let fp = loaded.get(Path::new(p)).expect("entry lost in round trip");
            prop_assert_eq!(fp.mtime_unix_s, *t as i64);
            prop_assert_eq!(fp.size_bytes, *s as u64);
            prop_assert_eq!(fp.cached_checksum(), Some(*c));
        }
    }

    // The WATCHEXEC_EVENT encoding mentions every change exactly once.
    #[test]
    fn change_set_encoding_mentions_every_path(
        names in prop::collection::btree_set("[a-z]{1,8}", 1..6),
    ) {
        let changes: Vec<MonitorResult> = names
            .iter()
            .map(|n| MonitorResult::new(EventKind::Modify, PathBuf::from(format!("/w/{n}"))))
            .collect();

        let encoded = encode_change_set(&changes);
        prop_assert_eq!(encoded.matches(';').count(), changes.len() - 1);
        for name in &names {
            let needle = format!("modify:/w/{}", name);
            prop_assert!(encoded.contains(&needle));
        }
    }
}
