//! Loader for tmux-resurrect style snapshot files
//!
//! Pane lines are tab-delimited with fixed columns:
//!
//! | col | field |
//! |-----|-------|
//! | 0 | pane index |
//! | 1 | session name |
//! | 2 | window index |
//! | 3 | window name |
//! | 4 | window flags (`*` marks the active window) |
//! | 5 | working directory |
//! | 6 | shell command |
//!
//! A leading `pane` tag is dropped, `:` field prefixes are stripped and extra
//! columns are ignored. `window` and `state` lines carry nothing we need.

use chrono::{DateTime, NaiveDateTime, Utc};
use session_core::SnapshotMetadata;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PANE_COLUMNS: usize = 7;
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
const STAMP_LEN: usize = 15;

/// Result of loading a snapshot directory
#[derive(Debug, Default)]
pub struct SnapshotLoad {
    /// Snapshots in load order: files by name, then sessions by first appearance
    pub snapshots: Vec<SnapshotMetadata>,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub malformed_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PaneRow {
    session_name: String,
    window_index: u32,
    active_window: bool,
    directory: String,
    command: String,
}

/// Snapshot files directly inside `dir`, sorted by name, `last` link excluded
pub fn find_snapshot_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path_is_symlink() || entry.file_name() == "last" {
            continue;
        }
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files
}

/// Load every snapshot file in `dir`. Blocking; run it on the blocking pool.
pub fn load_snapshots(dir: &Path) -> SnapshotLoad {
    let mut load = SnapshotLoad::default();

    for path in find_snapshot_files(dir) {
        match parse_snapshot_file(&path) {
            Ok((snapshots, malformed)) if !snapshots.is_empty() => {
                load.files_loaded += 1;
                load.malformed_lines += malformed;
                load.snapshots.extend(snapshots);
            }
            Ok((_, malformed)) => {
                load.files_skipped += 1;
                load.malformed_lines += malformed;
                tracing::warn!(path = %path.display(), "snapshot file has no pane lines, skipping");
            }
            Err(e) => {
                load.files_skipped += 1;
                tracing::warn!(path = %path.display(), error = %e, "failed to read snapshot file");
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        snapshots = load.snapshots.len(),
        files = load.files_loaded,
        skipped = load.files_skipped,
        "snapshots loaded"
    );
    load
}

/// Read one snapshot file; returns its snapshots and the malformed line count
pub fn parse_snapshot_file(path: &Path) -> std::io::Result<(Vec<SnapshotMetadata>, usize)> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let captured_at = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(timestamp_from_file_name)
        .or_else(|| {
            std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from)
        })
        .unwrap_or_else(Utc::now);
    Ok(parse_snapshot_str(&content, path, captured_at))
}

/// Parse snapshot text, grouping pane rows per multiplexer session
pub fn parse_snapshot_str(
    content: &str,
    source: &Path,
    captured_at: DateTime<Utc>,
) -> (Vec<SnapshotMetadata>, usize) {
    let mut groups: Vec<(String, Vec<PaneRow>)> = Vec::new();
    let mut malformed = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let first = line.split('\t').next().unwrap_or("");
        if first == "window" || first == "state" {
            continue;
        }
        match parse_pane_line(line) {
            Some(row) => match groups.iter_mut().find(|(name, _)| *name == row.session_name) {
                Some((_, rows)) => rows.push(row),
                None => groups.push((row.session_name.clone(), vec![row])),
            },
            None => malformed += 1,
        }
    }

    let snapshots = groups
        .into_iter()
        .map(|(name, rows)| group_to_metadata(name, &rows, source, captured_at))
        .collect();
    (snapshots, malformed)
}

fn field(raw: &str) -> &str {
    raw.strip_prefix(':').unwrap_or(raw)
}

fn parse_pane_line(line: &str) -> Option<PaneRow> {
    let mut cols: Vec<&str> = line.split('\t').collect();
    if cols.first() == Some(&"pane") {
        cols.remove(0);
    }
    if cols.len() < PANE_COLUMNS {
        return None;
    }
    field(cols[0]).trim().parse::<u32>().ok()?;
    let window_index = field(cols[2]).trim().parse::<u32>().ok()?;
    let session_name = field(cols[1]).to_string();
    if session_name.is_empty() {
        return None;
    }
    Some(PaneRow {
        session_name,
        window_index,
        active_window: field(cols[4]).contains('*'),
        directory: field(cols[5]).trim().to_string(),
        command: field(cols[6]).trim().to_string(),
    })
}

fn group_to_metadata(
    name: String,
    rows: &[PaneRow],
    source: &Path,
    captured_at: DateTime<Utc>,
) -> SnapshotMetadata {
    let windows: HashSet<u32> = rows.iter().map(|r| r.window_index).collect();
    let primary = rows.iter().find(|r| r.active_window).or(rows.first());

    let mut pane_directories: Vec<String> = Vec::new();
    for row in rows {
        if !row.directory.is_empty() && !pane_directories.contains(&row.directory) {
            pane_directories.push(row.directory.clone());
        }
    }

    SnapshotMetadata {
        snapshot_name: name,
        source_file: source.to_path_buf(),
        window_count: windows.len(),
        pane_count: rows.len(),
        working_directory: primary.map(|r| r.directory.clone()).unwrap_or_default(),
        pane_directories,
        shell_command: primary
            .map(|r| r.command.clone())
            .filter(|c| !c.is_empty()),
        captured_at,
    }
}

/// Capture time from a `YYYYMMDDTHHMMSS` stamp anywhere in a file name
pub fn timestamp_from_file_name(name: &str) -> Option<DateTime<Utc>> {
    let bytes = name.as_bytes();
    if bytes.len() < STAMP_LEN {
        return None;
    }
    (0..=bytes.len() - STAMP_LEN).find_map(|start| {
        let window = &bytes[start..start + STAMP_LEN];
        let shaped = window.iter().enumerate().all(|(i, b)| {
            if i == 8 {
                *b == b'T'
            } else {
                b.is_ascii_digit()
            }
        });
        if !shaped {
            return None;
        }
        let stamp = std::str::from_utf8(window).ok()?;
        NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    const SAMPLE: &str = "pane\t0\twork\t0\teditor\t:*\t:/home/me/app\tnvim\textra\n\
pane\t1\twork\t0\teditor\t:*\t:/home/me/app/src\tzsh\n\
pane\t0\twork\t1\tlogs\t:-\t:/var/log\ttail\n\
window\twork\t0\t:editor\t1\t:*\tlayout\n\
pane\t0\tscratch\t0\tshell\t:*\t:/tmp\t\n\
state\twork\tscratch\n\
garbage line\n\
pane\t0\tbroken\tx\tname\t:*\t:/tmp\tzsh\n";

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_parse_groups_panes_per_session() {
        let (snapshots, malformed) = parse_snapshot_str(SAMPLE, Path::new("/r/a.txt"), stamp());
        assert_eq!(malformed, 2);
        assert_eq!(snapshots.len(), 2);

        let work = &snapshots[0];
        assert_eq!(work.snapshot_name, "work");
        assert_eq!(work.pane_count, 3);
        assert_eq!(work.window_count, 2);
        assert_eq!(work.working_directory, "/home/me/app");
        assert_eq!(work.shell_command.as_deref(), Some("nvim"));
        assert_eq!(
            work.pane_directories,
            vec!["/home/me/app", "/home/me/app/src", "/var/log"]
        );
        assert_eq!(work.captured_at, stamp());

        let scratch = &snapshots[1];
        assert_eq!(scratch.snapshot_name, "scratch");
        assert_eq!(scratch.shell_command, None);
    }

    #[test]
    fn test_untagged_lines_and_inactive_windows() {
        let content = "0\tdev\t2\tbuild\t-\t/srv/build\tmake\n1\tdev\t3\tedit\t-\t/srv/edit\tvim\n";
        let (snapshots, malformed) = parse_snapshot_str(content, Path::new("/r/b.txt"), stamp());
        assert_eq!(malformed, 0);
        assert_eq!(snapshots[0].working_directory, "/srv/build");
        assert_eq!(snapshots[0].window_count, 2);
    }

    #[test]
    fn test_timestamp_from_file_name() {
        assert_eq!(
            timestamp_from_file_name("tmux_resurrect_20240102T030405.txt"),
            Some(stamp())
        );
        assert_eq!(timestamp_from_file_name("last"), None);
        assert_eq!(timestamp_from_file_name("tmux_resurrect_20241399T999999.txt"), None);
    }

    #[test]
    fn test_load_snapshots_skips_last_link_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let newer = dir.path().join("tmux_resurrect_20240105T000000.txt");
        let older = dir.path().join("tmux_resurrect_20240101T000000.txt");
        fs::write(&newer, "pane\t0\tnew\t0\tw\t:*\t:/a\tzsh\n").unwrap();
        fs::write(&older, "pane\t0\told\t0\tw\t:*\t:/b\tzsh\n").unwrap();
        fs::write(dir.path().join("empty.txt"), "state\tx\n").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&newer, dir.path().join("last")).unwrap();

        let load = load_snapshots(dir.path());
        let names: Vec<_> = load.snapshots.iter().map(|s| s.snapshot_name.as_str()).collect();
        assert_eq!(names, vec!["old", "new"]);
        assert_eq!(load.files_loaded, 2);
        assert_eq!(load.files_skipped, 1);
    }

    #[test]
    fn test_missing_dir_loads_nothing() {
        let load = load_snapshots(Path::new("/definitely/not/here"));
        assert!(load.snapshots.is_empty());
        assert_eq!(load.files_skipped, 0);
    }
}
