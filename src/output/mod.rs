//! Everything an investigation leaves on disk.
//!
//! ```text
//! memory_investigation_YYYYmmdd_HHMMSS/
//!   snapshots/snapshot_YYYYmmdd_HHMMSS.json
//!   snapshots/summary_YYYYmmdd_HHMMSS.txt
//!   analysis_report.json
//!   analysis_report.txt
//!   unevictable_diagnostic.txt
//! ```

pub mod report_text;
pub mod summary;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::analysis::Report;
use crate::system::snapshot::Snapshot;

pub use report_text::RunSettings;

const FILE_STAMP: &str = "%Y%m%d_%H%M%S";
const SNAPSHOT_DIR: &str = "snapshots";
const SNAPSHOT_PREFIX: &str = "snapshot_";

#[derive(Debug)]
pub enum PersistError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    NoSnapshots(PathBuf),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            PersistError::Json { path, source } => write!(f, "{}: {source}", path.display()),
            PersistError::NoSnapshots(dir) => {
                write!(f, "no loadable snapshots under {}", dir.display())
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io { source, .. } => Some(source),
            PersistError::Json { source, .. } => Some(source),
            PersistError::NoSnapshots(_) => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PersistError> {
    fs::write(path, contents).map_err(io_err(path))
}

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Creates `memory_investigation_<stamp>/snapshots` under `base`.
    pub fn create(base: &Path, started: DateTime<Local>) -> Result<Self, PersistError> {
        let root = base.join(format!(
            "memory_investigation_{}",
            started.format(FILE_STAMP)
        ));
        let snapshots = root.join(SNAPSHOT_DIR);
        fs::create_dir_all(&snapshots).map_err(io_err(&snapshots))?;
        tracing::debug!(dir = %root.display(), "output directory ready");
        Ok(Self { root })
    }

    /// An existing investigation directory, as written by `create`.
    pub fn open(root: &Path) -> Result<Self, PersistError> {
        let snapshots = root.join(SNAPSHOT_DIR);
        fs::metadata(&snapshots).map_err(io_err(&snapshots))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOT_DIR)
    }

    /// Writes the snapshot as pretty JSON, plus its text summary when asked.
    /// Returns the JSON path.
    pub fn persist_snapshot(
        &self,
        snapshot: &Snapshot,
        with_summary: bool,
    ) -> Result<PathBuf, PersistError> {
        let stamp = snapshot.timestamp.format(FILE_STAMP);
        let json_path = self.snapshot_dir().join(format!("{SNAPSHOT_PREFIX}{stamp}.json"));
        let json = serde_json::to_string_pretty(snapshot).map_err(|source| PersistError::Json {
            path: json_path.clone(),
            source,
        })?;
        write_file(&json_path, json)?;

        if with_summary {
            let summary_path = self.snapshot_dir().join(format!("summary_{stamp}.txt"));
            write_file(&summary_path, summary::snapshot_summary(snapshot))?;
        }
        Ok(json_path)
    }

    /// Writes the three report files and returns their paths.
    pub fn write_reports(
        &self,
        report: &Report,
        latest: Option<&Snapshot>,
        settings: RunSettings,
    ) -> Result<Vec<PathBuf>, PersistError> {
        let json_path = self.root.join("analysis_report.json");
        let json = serde_json::to_string_pretty(report).map_err(|source| PersistError::Json {
            path: json_path.clone(),
            source,
        })?;
        write_file(&json_path, json)?;

        let text_path = self.root.join("analysis_report.txt");
        write_file(&text_path, report_text::analysis_report(report, settings))?;

        let diagnostic_path = self.root.join("unevictable_diagnostic.txt");
        write_file(
            &diagnostic_path,
            report_text::unevictable_diagnostic(report, latest),
        )?;

        Ok(vec![json_path, text_path, diagnostic_path])
    }

    /// Every file under the directory with its size, sorted by path.
    pub fn list_files(&self) -> Result<Vec<(PathBuf, u64)>, PersistError> {
        let mut files = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
                let entry = entry.map_err(io_err(&dir))?;
                let path = entry.path();
                let meta = entry.metadata().map_err(io_err(&path))?;
                if meta.is_dir() {
                    stack.push(path);
                } else {
                    files.push((path, meta.len()));
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Reloads persisted snapshots in timestamp order. Files that do not
    /// parse are skipped with a warning.
    pub fn load_snapshots(&self) -> Result<Vec<Snapshot>, PersistError> {
        let dir = self.snapshot_dir();
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let path = entry.map_err(io_err(&dir))?.path();
            let is_snapshot = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(".json"));
            if !is_snapshot {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(io_err(&path))
                .and_then(|raw| {
                    serde_json::from_str::<Snapshot>(&raw).map_err(|source| PersistError::Json {
                        path: path.clone(),
                        source,
                    })
                });
            match parsed {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!("skipping {e}"),
            }
        }

        if snapshots.is_empty() {
            return Err(PersistError::NoSnapshots(dir));
        }
        snapshots.sort_by_key(|s| s.timestamp);
        tracing::info!(count = snapshots.len(), "loaded snapshots");
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::analysis::{ReportLimits, Thresholds, analyze};
    use crate::system::snapshot::{Sample, UnevictableMemory};

    fn snapshot(secs: i64, unevictable: u64) -> Snapshot {
        let base = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut snap = Snapshot::empty(base + Duration::seconds(secs));
        snap.unevictable = Sample::Available(UnevictableMemory {
            total_unevictable: unevictable,
            ..Default::default()
        });
        snap
    }

    #[test]
    fn creates_timestamped_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let started = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let out = OutputDir::create(tmp.path(), started).unwrap();

        assert!(out.root().ends_with("memory_investigation_20240301_090000"));
        assert!(out.root().join("snapshots").is_dir());
    }

    #[test]
    fn persisted_snapshots_reload_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let out = OutputDir::create(tmp.path(), Local::now()).unwrap();

        let later = snapshot(30, 2048);
        let earlier = snapshot(0, 1024);
        let path = out.persist_snapshot(&later, true).unwrap();
        out.persist_snapshot(&earlier, false).unwrap();
        assert!(path.ends_with("snapshot_20240301_090030.json"));
        assert!(out.root().join("snapshots/summary_20240301_090030.txt").is_file());
        assert!(!out.root().join("snapshots/summary_20240301_090000.txt").exists());

        fs::write(out.root().join("snapshots/snapshot_broken.json"), "{").unwrap();

        let loaded = out.load_snapshots().unwrap();
        assert_eq!(loaded, vec![earlier, later]);
    }

    #[test]
    fn empty_directory_has_no_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let out = OutputDir::create(tmp.path(), Local::now()).unwrap();
        assert!(matches!(
            out.load_snapshots(),
            Err(PersistError::NoSnapshots(_))
        ));
    }

    #[test]
    fn open_requires_snapshot_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(OutputDir::open(tmp.path()).is_err());
    }

    #[test]
    fn writes_and_lists_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let out = OutputDir::create(tmp.path(), Local::now()).unwrap();
        let snaps = [snapshot(0, 1024), snapshot(30, 4096)];
        let report = analyze(snaps.iter(), &Thresholds::default(), ReportLimits::default());

        let written = out
            .write_reports(&report, snaps.last(), RunSettings::default())
            .unwrap();
        assert_eq!(written.len(), 3);

        let files = out.list_files().unwrap();
        let names: Vec<String> = files
            .iter()
            .filter_map(|(p, _)| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert!(names.contains(&"analysis_report.json".to_string()));
        assert!(names.contains(&"unevictable_diagnostic.txt".to_string()));
        assert!(files.iter().all(|(_, size)| *size > 0));
    }
}
