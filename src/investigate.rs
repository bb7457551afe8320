//! Batch mode: sample on a fixed interval for a fixed duration, persisting
//! every snapshot, then write the reports.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::analysis::{self, Report, ReportLimits, Thresholds};
use crate::output::{OutputDir, PersistError, RunSettings};
use crate::system::platform::MemorySource;
use crate::system::{Collector, SnapshotStore};

#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    pub interval: Duration,
    pub duration: Duration,
    pub write_summaries: bool,
}

impl Schedule {
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            interval_secs: Some(self.interval.as_secs()),
            duration_minutes: Some(self.duration.as_secs() / 60),
        }
    }
}

/// Why collection stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stop {
    Completed,
    Interrupted,
}

/// Collects until the schedule runs out or Ctrl+C arrives.
pub async fn collect_series<S: MemorySource>(
    collector: &mut Collector<S>,
    out: &OutputDir,
    schedule: Schedule,
) -> (SnapshotStore, Stop) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("investigation interrupted by user"),
            Err(e) => {
                tracing::warn!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    collect_series_until(collector, out, schedule, ctrl_c).await
}

/// Collects until the schedule runs out or `shutdown` resolves. Shutdown is
/// only observed between snapshots. Snapshots that fail to persist are kept
/// in the store and logged.
pub async fn collect_series_until<S, F>(
    collector: &mut Collector<S>,
    out: &OutputDir,
    schedule: Schedule,
    shutdown: F,
) -> (SnapshotStore, Stop)
where
    S: MemorySource,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    // The first poll installs signal handlers before the first, possibly
    // slow, collection.
    let mut shutdown_requested = futures::poll!(&mut shutdown).is_ready();

    let deadline = Instant::now().checked_add(schedule.duration);
    if deadline.is_none() {
        tracing::warn!("duration out of range, collecting until interrupted");
    }
    let mut store = SnapshotStore::unbounded();
    let mut iteration: u64 = 1;

    let stop = loop {
        tracing::info!(iteration, "collecting snapshot");
        let snapshot = collector.collect();
        match out.persist_snapshot(&snapshot, schedule.write_summaries) {
            Ok(path) => tracing::debug!(path = %path.display(), "snapshot saved"),
            Err(e) => tracing::warn!("failed to save snapshot: {e}"),
        }
        store.push(snapshot);

        if shutdown_requested {
            break Stop::Interrupted;
        }
        let remaining = deadline.map_or(Duration::MAX, |d| {
            d.saturating_duration_since(Instant::now())
        });
        if remaining <= schedule.interval {
            break Stop::Completed;
        }

        tracing::info!("waiting {}s until next collection", schedule.interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(schedule.interval) => {}
            () = &mut shutdown => {
                shutdown_requested = true;
            }
        }
        if shutdown_requested {
            break Stop::Interrupted;
        }
        iteration += 1;
    };

    (store, stop)
}

/// Analyzes the series and writes the report files into `out`.
pub fn write_reports(
    out: &OutputDir,
    store: &SnapshotStore,
    thresholds: &Thresholds,
    limits: ReportLimits,
    settings: RunSettings,
) -> Result<(Report, Vec<PathBuf>), PersistError> {
    let report = analysis::analyze(store.iter(), thresholds, limits);
    let written = out.write_reports(&report, store.last(), settings)?;
    for path in &written {
        tracing::info!(path = %path.display(), "report written");
    }
    Ok((report, written))
}
