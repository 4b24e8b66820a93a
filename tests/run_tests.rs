use bucketer::engine::{LimiterError, exit_code_for};
use bucketer::{
    CopyOutcome, FailureKind, MemorySink, RunError, RunStatus, SortOpts, sort_dir, sort_dir_with,
};
use log::Level;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// `{a.txt: "hello", sub/b.TXT: "world", data: "x"}`
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", "hello");
    write(dir.path(), "sub/b.TXT", "world");
    write(dir.path(), "data", "x");
    dir
}

fn opts_with_limit(limit: usize) -> SortOpts {
    SortOpts {
        limit,
        ..SortOpts::default()
    }
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

fn assert_sample_sorted(out: &Path) {
    assert_eq!(read(out.join("txt/a.txt")), "hello");
    assert_eq!(read(out.join("txt/b.TXT")), "world");
    assert_eq!(read(out.join("_noext/data")), "x");
    let mut buckets: Vec<String> = fs::read_dir(out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    buckets.sort();
    assert_eq!(buckets, vec!["_noext".to_string(), "txt".to_string()]);
}

#[test]
fn test_sample_tree_limit_one() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let sink = MemorySink::new();
    let report = sort_dir(src.path(), out.path(), &opts_with_limit(1), &sink).unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.files_found, 3);
    assert_eq!(report.copied, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.bytes_copied, 11);
    assert_eq!(report.limit, 1);
    assert_eq!(report.peak_in_flight, 1);
    assert_sample_sorted(out.path());
    assert_eq!(exit_code_for(&report), 0);
}

#[test]
fn test_sample_tree_limit_sixty_four() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let report = sort_dir(
        src.path(),
        out.path(),
        &opts_with_limit(64),
        &MemorySink::new(),
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.copied, 3);
    assert!(report.peak_in_flight <= report.limit);
    assert_sample_sorted(out.path());
}

#[test]
fn test_peak_never_exceeds_limit() {
    let src = TempDir::new().unwrap();
    for i in 0..200 {
        write(src.path(), &format!("d{}/f{}.bin", i % 7, i), &"z".repeat(i));
    }
    let out = TempDir::new().unwrap();
    let report = sort_dir(
        src.path(),
        out.path(),
        &opts_with_limit(4),
        &MemorySink::new(),
    )
    .unwrap();
    assert_eq!(report.copied, 200);
    assert!(report.peak_in_flight >= 1);
    assert!(report.peak_in_flight <= 4);
    assert_eq!(fs::read_dir(out.path().join("bin")).unwrap().count(), 200);
}

#[test]
fn test_missing_source_is_root_invalid() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let sink = MemorySink::new();
    let report = sort_dir(
        &tmp.path().join("nope"),
        &out,
        &SortOpts::default(),
        &sink,
    )
    .unwrap();

    match &report.status {
        RunStatus::RootInvalid { reason } => assert!(reason.contains("folder not exist")),
        other => panic!("expected RootInvalid, got {:?}", other),
    }
    assert_eq!(report.copied, 0);
    assert!(!out.exists(), "no output may be created for an invalid root");
    assert_eq!(sink.count_at(Level::Error), 1);
    assert_eq!(exit_code_for(&report), 2);
}

#[test]
fn test_file_as_source_is_root_invalid() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "plain.txt", "hi");
    let report = sort_dir(
        &tmp.path().join("plain.txt"),
        &tmp.path().join("out"),
        &SortOpts::default(),
        &MemorySink::new(),
    )
    .unwrap();
    assert!(report.is_root_invalid());
}

#[test]
fn test_empty_tree() {
    let src = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("only/dirs/here")).unwrap();
    let out = TempDir::new().unwrap();
    let sink = MemorySink::new();
    let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &sink).unwrap();

    assert_eq!(report.status, RunStatus::EmptyTree);
    assert_eq!(report.copied, 0);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    assert!(
        sink.messages_at(Level::Warn)
            .iter()
            .any(|m| m.starts_with("no files in the folder"))
    );
    assert_eq!(exit_code_for(&report), 0);
}

#[test]
fn test_rerun_is_idempotent() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let opts = SortOpts::default();
    let first = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    let second = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();

    assert_eq!(first.copied, second.copied);
    assert_eq!(second.failed, 0);
    assert_sample_sorted(out.path());
}

#[test]
fn test_success_logged_per_file() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let sink = MemorySink::new();
    sort_dir(src.path(), out.path(), &SortOpts::default(), &sink).unwrap();

    let ok: Vec<String> = sink
        .messages_at(Level::Info)
        .into_iter()
        .filter(|m| m.starts_with("OK: "))
        .collect();
    assert_eq!(ok.len(), 3);
    assert!(ok.iter().any(|m| m.contains("a.txt") && m.contains(" -> ")));
}

#[test]
fn test_outcome_callback_sees_every_file() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let mut seen = Vec::new();
    let report = sort_dir_with(
        src.path(),
        out.path(),
        &SortOpts::default(),
        &MemorySink::new(),
        Some(|o: &CopyOutcome| seen.push(o.is_success())),
    )
    .unwrap();
    assert_eq!(seen.len() as u64, report.files_found);
    assert!(seen.iter().all(|ok| *ok));
}

#[test]
fn test_small_chunks_copy_whole_file() {
    let src = TempDir::new().unwrap();
    let body: String = (0..10_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    write(src.path(), "big.dat", &body);
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        chunk_size: 7,
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.bytes_copied, 10_000);
    assert_eq!(read(out.path().join("dat/big.dat")), body);
}

#[test]
fn test_verify_passes_for_good_copy() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        verify: true,
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.copied, 3);
    assert_eq!(report.failures_of(FailureKind::Verify).count(), 0);
}

#[test]
fn test_nested_output_is_not_walked() {
    let src = sample_tree();
    let out = src.path().join("sorted");
    let opts = SortOpts::default();
    let first = sort_dir(src.path(), &out, &opts, &MemorySink::new()).unwrap();
    let second = sort_dir(src.path(), &out, &opts, &MemorySink::new()).unwrap();

    assert_eq!(first.files_found, 3);
    assert_eq!(second.files_found, 3);
    assert!(out.join("txt/a.txt").is_file());
    assert!(!out.join("txt/txt").exists());
}

#[test]
fn test_exclude_patterns() {
    let src = sample_tree();
    write(src.path(), "debug.log", "noise");
    write(src.path(), "cache/keep.log", "noise");
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        exclude: vec!["*.log".to_string(), "cache".to_string()],
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.files_found, 3);
    assert!(!out.path().join("log").exists());
}

#[test]
fn test_invalid_exclude_pattern_is_error() {
    let src = sample_tree();
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let opts = SortOpts {
        exclude: vec!["a[".to_string()],
        ..SortOpts::default()
    };
    let err = sort_dir(src.path(), &out, &opts, &MemorySink::new()).unwrap_err();
    assert!(matches!(err, RunError::InvalidPattern(_)));
    assert!(!out.exists());
}

#[test]
fn test_collisions_reported_last_writer_wins() {
    let src = TempDir::new().unwrap();
    write(src.path(), "one/x.txt", "first");
    write(src.path(), "two/x.txt", "second");
    let out = TempDir::new().unwrap();
    let sink = MemorySink::new();
    let report = sort_dir(src.path(), out.path(), &opts_with_limit(1), &sink).unwrap();

    assert_eq!(report.copied, 2);
    assert_eq!(report.collisions.len(), 1);
    let body = read(out.path().join("txt/x.txt"));
    assert!(body == "first" || body == "second");
    assert!(
        sink.messages_at(Level::Warn)
            .iter()
            .any(|m| m.contains("destination collision"))
    );
    assert_eq!(exit_code_for(&report), 0);
}

#[test]
fn test_cancel_before_start() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.copied, 0);
    assert_eq!(exit_code_for(&report), 1);
}

#[test]
fn test_zero_limit_is_error() {
    let src = sample_tree();
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let err = sort_dir(src.path(), &out, &opts_with_limit(0), &MemorySink::new()).unwrap_err();
    assert!(matches!(err, RunError::Limiter(LimiterError::ZeroCapacity)));
    assert!(!out.exists());
}

#[test]
fn test_source_inside_output_left_intact() {
    let out = TempDir::new().unwrap();
    write(out.path(), "txt/a.txt", "hello");
    let report = sort_dir(
        &out.path().join("txt"),
        out.path(),
        &SortOpts::default(),
        &MemorySink::new(),
    )
    .unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.copied, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(read(out.path().join("txt/a.txt")), "hello");
}

#[test]
fn test_output_same_as_source_left_intact() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "txt/a.txt", "hello");
    write(tmp.path(), "b.md", "bee");
    let report = sort_dir(tmp.path(), tmp.path(), &opts_with_limit(1), &MemorySink::new()).unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(read(tmp.path().join("txt/a.txt")), "hello");
    assert_eq!(read(tmp.path().join("b.md")), "bee");
    assert_eq!(read(tmp.path().join("md/b.md")), "bee");
}

#[test]
fn test_colliding_large_files_end_whole() {
    let src = TempDir::new().unwrap();
    let first = "A".repeat(256 * 1024);
    let second = "B".repeat(256 * 1024);
    write(src.path(), "one/big.dat", &first);
    write(src.path(), "two/big.dat", &second);
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        limit: 2,
        chunk_size: 1024,
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.copied, 2);
    assert_eq!(report.collisions.len(), 1);
    let body = read(out.path().join("dat/big.dat"));
    assert!(body == first || body == second, "destination mixes both sources");
    assert_eq!(fs::read_dir(out.path().join("dat")).unwrap().count(), 1);
}

#[test]
fn test_parallel_walk_sample_tree() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        parallel_walk: true,
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.files_found, 3);
    assert_eq!(report.copied, 3);
    assert_sample_sorted(out.path());
}

#[test]
fn test_parallel_walk_follow_links_and_exclude() {
    let src = sample_tree();
    write(src.path(), "skip/me.log", "noise");
    let out = TempDir::new().unwrap();
    let opts = SortOpts {
        parallel_walk: true,
        follow_links: true,
        exclude: vec!["skip".to_string()],
        ..SortOpts::default()
    };
    let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();
    assert_eq!(report.files_found, 3);
    assert_sample_sorted(out.path());
}

#[test]
fn test_report_json_shape() {
    let src = sample_tree();
    let out = TempDir::new().unwrap();
    let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &MemorySink::new()).unwrap();
    let v: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(v["status"], "completed");
    assert_eq!(v["copied"], 3);
    assert_eq!(report.to_dict()["files_found"], 3);
    assert!(report.to_string().starts_with("[SORT] completed"));
}

#[cfg(unix)]
mod permissions {
    use super::*;
    use bucketer::engine::running_as_root;
    use std::os::unix::fs::PermissionsExt;

    fn set_mode(path: &Path, mode: u32) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_unreadable_subtree_is_skipped() {
        if running_as_root() {
            eprintln!("skipping: permission checks do not apply to root");
            return;
        }
        let src = sample_tree();
        write(src.path(), "locked/secret.txt", "hidden");
        let locked = src.path().join("locked");
        set_mode(&locked, 0o000);

        let out = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &sink);
        set_mode(&locked, 0o755);
        let report = report.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.copied, 3);
        assert_eq!(report.traversal_errors.len(), 1);
        assert_eq!(report.traversal_errors[0].kind, FailureKind::TraversalAccess);
        assert!(report.traversal_errors[0].path.ends_with("locked"));
        assert!(!out.path().join("txt/secret.txt").exists());
        assert!(sink.count_at(Level::Error) >= 1);
        assert_eq!(exit_code_for(&report), 1);
    }

    #[test]
    fn test_unreadable_file_fails_alone() {
        if running_as_root() {
            eprintln!("skipping: permission checks do not apply to root");
            return;
        }
        let src = sample_tree();
        write(src.path(), "closed.md", "nope");
        let closed = src.path().join("closed.md");
        set_mode(&closed, 0o000);

        let out = TempDir::new().unwrap();
        let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &MemorySink::new());
        set_mode(&closed, 0o644);
        let report = report.unwrap();

        assert_eq!(report.copied, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].kind, FailureKind::OpenSource);
        assert!(!out.path().join("md/closed.md").exists());
        // No in-progress file left behind in the bucket.
        assert_eq!(fs::read_dir(out.path().join("md")).unwrap().count(), 0);
        assert_sample_sorted_with_md(out.path());
    }

    #[test]
    fn test_parallel_walk_reports_unreadable_subtree() {
        if running_as_root() {
            eprintln!("skipping: permission checks do not apply to root");
            return;
        }
        let src = sample_tree();
        write(src.path(), "locked/secret.txt", "hidden");
        let locked = src.path().join("locked");
        set_mode(&locked, 0o000);

        let out = TempDir::new().unwrap();
        let opts = SortOpts {
            parallel_walk: true,
            ..SortOpts::default()
        };
        let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new());
        set_mode(&locked, 0o755);
        let report = report.unwrap();

        assert_eq!(report.copied, 3);
        assert!(!report.traversal_errors.is_empty());
        assert!(
            report
                .traversal_errors
                .iter()
                .all(|e| e.kind == FailureKind::TraversalAccess)
        );
        assert!(!out.path().join("txt/secret.txt").exists());
    }

    #[test]
    fn test_follow_links_survives_cycle() {
        use std::os::unix::fs::symlink;

        let src = sample_tree();
        symlink(src.path(), src.path().join("sub/loop")).unwrap();
        symlink(src.path().join("a.txt"), src.path().join("sub/link.txt")).unwrap();

        let out = TempDir::new().unwrap();
        let opts = SortOpts {
            follow_links: true,
            ..SortOpts::default()
        };
        let report = sort_dir(src.path(), out.path(), &opts, &MemorySink::new()).unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        // a.txt, sub/b.TXT, data, sub/link.txt; the loop back to the root adds nothing.
        assert_eq!(report.files_found, 4);
        assert!(report.collisions.is_empty());
        assert_eq!(read(out.path().join("txt/link.txt")), "hello");
    }

    #[test]
    fn test_symlinks_skipped_without_follow_links() {
        use std::os::unix::fs::symlink;

        let src = sample_tree();
        symlink(src.path().join("a.txt"), src.path().join("link.txt")).unwrap();
        let out = TempDir::new().unwrap();
        let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &MemorySink::new())
            .unwrap();
        assert_eq!(report.files_found, 3);
        assert!(!out.path().join("txt/link.txt").exists());
    }

    #[test]
    fn test_copies_keep_source_mode() {
        let src = sample_tree();
        write(src.path(), "run.sh", "echo hi");
        set_mode(&src.path().join("run.sh"), 0o750);
        set_mode(&src.path().join("a.txt"), 0o640);

        let out = TempDir::new().unwrap();
        let report = sort_dir(src.path(), out.path(), &SortOpts::default(), &MemorySink::new())
            .unwrap();
        assert_eq!(report.copied, 4);
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out.path().join("sh/run.sh")), 0o750);
        assert_eq!(mode(&out.path().join("txt/a.txt")), 0o640);
    }

    fn assert_sample_sorted_with_md(out: &Path) {
        assert_eq!(read(out.join("txt/a.txt")), "hello");
        assert_eq!(read(out.join("_noext/data")), "x");
    }
}
