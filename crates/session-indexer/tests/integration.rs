//! End-to-end tests over real directory trees

use serde_json::json;
use session_core::{CorrelationStrength, Role};
use session_indexer::{
    path_similarity, scan_roots, FileFailureKind, IndexerConfig, Provenance, SearchOptions,
    SessionIndex,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_session(path: &Path, lines: &[serde_json::Value]) {
    let body: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    fs::write(path, body.join("\n") + "\n").unwrap();
}

fn config(root: &Path, snapshots: Option<PathBuf>) -> IndexerConfig {
    IndexerConfig::default()
        .with_roots([root])
        .with_snapshot_dir(snapshots)
}

/// Corpus with one project directory and the given sessions
fn corpus(sessions: &[(&str, &str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("-home-a-proj");
    fs::create_dir(&project).unwrap();
    for (id, cwd, text) in sessions {
        write_session(
            &project.join(format!("{id}.jsonl")),
            &[
                json!({"sessionId": id, "cwd": cwd, "type": "user", "timestamp": "2024-05-01T09:00:00Z",
                       "message": {"role": "user", "content": text}}),
                json!({"type": "assistant", "timestamp": "2024-05-01T09:01:00Z",
                       "message": {"role": "assistant", "content": [{"type": "text", "text": "On it."}]}}),
            ],
        );
    }
    dir
}

fn snapshot_dir(lines: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tmux_resurrect_20240501T080000.txt"), lines).unwrap();
    dir
}

#[tokio::test]
async fn scenario_a_zero_byte_file_is_reported_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_session(&dir.path().join("1.jsonl"), &[json!({"content": "one"})]);
    fs::write(dir.path().join("2.jsonl"), "").unwrap();
    write_session(&dir.path().join("3.jsonl"), &[json!({"content": "three"})]);

    let index = SessionIndex::build(&config(dir.path(), None)).await.unwrap();
    let report = index.report();

    assert_eq!(report.files_scanned, 3);
    assert_eq!(index.sessions().len(), 2);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("2.jsonl"));
    assert_eq!(report.failures[0].kind, FileFailureKind::Empty);
    assert!(!report.timed_out);
}

#[tokio::test]
async fn scenario_b_parent_directory_correlates_strongly() {
    let root = corpus(&[("s1", "/home/a/proj/sub", "fix the parser")]);
    let snaps = snapshot_dir("pane\t0\tproj\t0\teditor\t:*\t:/home/a/proj\tnvim\n");

    let index = SessionIndex::build(&config(root.path(), Some(snaps.path().to_path_buf())))
        .await
        .unwrap();
    let session = index.session("s1").unwrap();
    let correlation = session.correlation.as_ref().unwrap();
    assert_eq!(correlation.path_match_confidence, 0.8);
    assert_eq!(correlation.strength, CorrelationStrength::Strong);
    assert_eq!(correlation.snapshot.snapshot_name, "proj");
    assert_eq!(index.report().correlation.strong, 1);
}

#[tokio::test]
async fn scenario_c_half_overlap_is_attached_as_weak() {
    let root = corpus(&[("s1", "/a/b/x/y", "hello")]);
    let snaps = snapshot_dir("pane\t0\tdev\t0\tmain\t:*\t:/a/b/c/d\tzsh\n");

    let index = SessionIndex::build(&config(root.path(), Some(snaps.path().to_path_buf())))
        .await
        .unwrap();
    let correlation = index.session("s1").unwrap().correlation.as_ref().unwrap();
    assert_eq!(correlation.path_match_confidence, 0.5);
    assert_eq!(correlation.strength, CorrelationStrength::Weak);
}

#[tokio::test]
async fn scenario_d_depth_limit_abandons_only_the_deep_branch() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("root.jsonl"), "{}").unwrap();
    let sibling = dir.path().join("sibling");
    fs::create_dir(&sibling).unwrap();
    fs::write(sibling.join("s.jsonl"), "{}").unwrap();

    let mut deep = dir.path().to_path_buf();
    for level in 1..=25 {
        deep = deep.join(format!("level{level}"));
        fs::create_dir(&deep).unwrap();
        fs::write(deep.join("f.jsonl"), "{}").unwrap();
    }

    let outcome = scan_roots(&config(dir.path(), None).with_max_depth(20)).await;
    assert_eq!(outcome.report.depth_exceeded, 1);
    assert!(outcome.files.contains(&dir.path().join("root.jsonl")));
    assert!(outcome.files.contains(&sibling.join("s.jsonl")));
    // level1..level19 are listed; their files sit at depth 2..20
    assert_eq!(outcome.files.len(), 2 + 19);
    assert!(!outcome.files.iter().any(|p| p.to_string_lossy().contains("level20/")));
}

#[tokio::test]
async fn scanning_twice_yields_identical_file_sets() {
    let root = corpus(&[("a", "/x", "one"), ("b", "/y", "two"), ("c", "/z", "three")]);
    let nested = root.path().join("-home-a-proj").join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("d.jsonl"), "{}").unwrap();

    let cfg = config(root.path(), None);
    let first = scan_roots(&cfg).await;
    let second = scan_roots(&cfg).await;
    assert_eq!(first.files, second.files);
    assert_eq!(first.files.len(), 4);
}

#[cfg(unix)]
#[tokio::test]
async fn self_referential_symlink_terminates_and_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    fs::create_dir(&project).unwrap();
    write_session(&project.join("s.jsonl"), &[json!({"content": "hi"})]);
    std::os::unix::fs::symlink(dir.path(), project.join("back-to-root")).unwrap();
    std::os::unix::fs::symlink(&project, project.join("self")).unwrap();

    let cfg = config(dir.path(), None).with_scan_timeout(std::time::Duration::from_secs(5));
    let index = SessionIndex::build(&cfg).await.unwrap();
    let report = index.report();
    assert!(!report.timed_out);
    assert_eq!(report.scan.cycles_detected, 2);
    assert_eq!(report.files_scanned, 1);
    assert_eq!(index.sessions().len(), 1);
}

#[tokio::test]
async fn malformed_lines_are_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let valid = [
        json!({"sessionId": "mixed", "role": "user", "content": "first"}).to_string(),
        json!({"role": "assistant", "content": "second"}).to_string(),
        json!({"role": "user", "content": "third"}).to_string(),
        json!({"role": "assistant", "content": "fourth"}).to_string(),
    ];
    let malformed = ["{", "not json", r#"{"role": "user""#];
    let body = format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
        malformed[0], valid[0], valid[1], malformed[1], valid[2], malformed[2], valid[3]
    );
    fs::write(dir.path().join("mixed.jsonl"), body).unwrap();
    fs::write(dir.path().join("junk.jsonl"), "nope\nstill nope\n").unwrap();

    let index = SessionIndex::build(&config(dir.path(), None)).await.unwrap();
    let session = index.session("mixed").unwrap();
    assert_eq!(session.blocks.len(), 4);
    assert_eq!(session.lines_skipped, 3);
    assert_eq!(index.report().lines_skipped, 5);
    assert_eq!(index.sessions().len(), 1);
    assert_eq!(index.report().failures[0].kind, FileFailureKind::Empty);
}

#[tokio::test]
async fn content_hit_outranks_snapshot_name_hit() {
    let root = corpus(&[("s1", "/home/a/proj", "the kraken deploy is stuck")]);
    let snaps = snapshot_dir("pane\t0\tkraken\t0\tmain\t:*\t:/home/a/proj\tcargo watch\n");

    let index = SessionIndex::build(&config(root.path(), Some(snaps.path().to_path_buf())))
        .await
        .unwrap();
    let results = index.search("kraken");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].provenance, Provenance::PrimaryContent);
    assert_eq!(results[0].role, Some(Role::User));
    assert_eq!(results[1].provenance, Provenance::SnapshotSessionName);
    assert!(results[0].score > results[1].score);

    let assistant_only = SearchOptions::new().with_roles(vec![Role::Assistant]);
    let results = index.search_with("kraken", &assistant_only);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provenance, Provenance::SnapshotSessionName);

    assert!(index.search("  ").is_empty());
}

#[tokio::test]
async fn aggregate_stats_and_date_filter_over_built_index() {
    let root = corpus(&[
        ("s1", "/home/a/proj", "kraken notes"),
        ("s2", "/srv/other", "more kraken"),
    ]);
    let snaps = snapshot_dir("pane\t0\twork\t0\tmain\t:*\t:/home/a/proj\tzsh\n");

    let index = SessionIndex::build(&config(root.path(), Some(snaps.path().to_path_buf())))
        .await
        .unwrap();
    let stats = index.aggregate_stats();
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.total_blocks, 4);
    assert_eq!(stats.correlated_sessions, 1);
    assert_eq!(stats.average_session_duration_secs, Some(60));

    let day = |d: u32| {
        chrono::NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    };
    let may_first = SearchOptions::new().with_date_range(day(1), day(2));
    assert_eq!(index.search_with("kraken", &may_first).len(), 2);
    let later = SearchOptions::new().with_date_range(day(2), day(3));
    assert!(index.search_with("kraken", &later).is_empty());
}

#[tokio::test]
async fn duplicate_session_ids_are_made_unique() {
    let dir = tempfile::tempdir().unwrap();
    write_session(&dir.path().join("one.jsonl"), &[json!({"sessionId": "dup", "content": "a"})]);
    write_session(&dir.path().join("two.jsonl"), &[json!({"sessionId": "dup", "content": "b"})]);

    let index = SessionIndex::build(&config(dir.path(), None)).await.unwrap();
    let ids: Vec<_> = index.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["dup", "two"]);
    assert_eq!(index.report().duplicate_ids, 1);
}

#[tokio::test]
async fn project_path_decoded_when_cwd_missing() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("-Users-me--config-nvim");
    fs::create_dir(&project).unwrap();
    write_session(&project.join("abc.jsonl"), &[json!({"content": "tweak keymaps"})]);

    let index = SessionIndex::build(&config(dir.path(), None)).await.unwrap();
    let session = index.session("abc").unwrap();
    assert_eq!(session.project_path.as_deref(), Some("/Users/me/.config/nvim"));
}

#[test]
fn similarity_properties() {
    for p in ["/home/a/proj", "/srv/x/y/z", "/a"] {
        assert_eq!(path_similarity(p, p), 1.0);
    }
    assert_eq!(path_similarity("/home/a/proj/sub", "/home/a/proj"), 0.8);
    assert_eq!(path_similarity("/home/a/proj", "/home/a/proj/sub"), 0.8);
    assert_eq!(path_similarity("/one/two", "/three/four"), 0.0);
}
