//! Trend analysis over a series of snapshots.
//!
//! `analyze` is a pure function of the snapshots and thresholds; it never
//! touches the system or the filesystem.

pub mod growth;
pub mod metric;
pub mod processes;
pub mod recommendations;
pub mod slab;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::system::snapshot::Snapshot;

pub use growth::{Contributor, Growth};
pub use metric::Metric;
pub use processes::{MlockedSummary, ProcessTrend};
pub use recommendations::{Diagnosis, FOLLOW_UP_COMMANDS, Recommendation, Thresholds};
pub use slab::SlabDiff;

/// How many rows the ranked report sections keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportLimits {
    pub mlocked_processes: usize,
    pub slab_diffs: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            mlocked_processes: 10,
            slab_diffs: 10,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GrowthSummary {
    pub unevictable: Option<Growth>,
    pub mlocked: Option<Growth>,
    pub slab_unreclaimable: Option<Growth>,
    pub page_tables: Option<Growth>,
    pub kernel_stack: Option<Growth>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Local>,
    pub unevictable_mb: Option<f64>,
    pub mlocked_mb: Option<f64>,
    pub slab_unreclaimable_mb: Option<f64>,
    pub page_tables_mb: Option<f64>,
    pub kernel_stack_mb: Option<f64>,
    pub memory_percent: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MemoryStats {
    pub mean: f64,
    pub peak: f64,
    pub min: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BreakdownShare {
    pub component: String,
    pub bytes: u64,
    /// Percent of total unevictable; `None` when the total is zero.
    pub share_percent: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentBreakdown {
    pub timestamp: DateTime<Local>,
    pub total_unevictable: u64,
    pub components: Vec<BreakdownShare>,
    pub slab_unreclaimable: Option<u64>,
    pub slab_reclaimable: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub snapshot_count: usize,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    pub timeline: Vec<TimelineEntry>,
    pub growth: GrowthSummary,
    pub contributors: Vec<Contributor>,
    pub slab_cache_changes: Vec<SlabDiff>,
    pub mlocked_processes: Vec<MlockedSummary>,
    pub process_trends: Vec<ProcessTrend>,
    pub memory_percent: Option<MemoryStats>,
    pub current_breakdown: Option<CurrentBreakdown>,
    pub diagnosis: Diagnosis,
}

impl Report {
    /// Processes classified as increasing.
    pub fn leak_candidates(&self) -> impl Iterator<Item = &ProcessTrend> {
        self.process_trends.iter().filter(|t| t.increasing)
    }
}

pub fn analyze<'a>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    thresholds: &Thresholds,
    limits: ReportLimits,
) -> Report {
    let snapshots: Vec<&Snapshot> = snapshots.into_iter().collect();

    let growth = GrowthSummary {
        unevictable: metric_growth(&snapshots, Metric::Unevictable),
        mlocked: metric_growth(&snapshots, Metric::Mlocked),
        slab_unreclaimable: metric_growth(&snapshots, Metric::SlabUnreclaimable),
        page_tables: metric_growth(&snapshots, Metric::PageTables),
        kernel_stack: metric_growth(&snapshots, Metric::KernelStack),
    };
    let contributors = growth::rank_contributors(
        &[
            ("Mlocked Memory", growth.mlocked),
            ("Unreclaimable Slab", growth.slab_unreclaimable),
            ("Page Tables", growth.page_tables),
            ("Kernel Stack", growth.kernel_stack),
        ],
        thresholds.significance_mb,
    );

    let diagnosis = recommendations::diagnose(&growth, thresholds);
    tracing::debug!(
        snapshots = snapshots.len(),
        contributors = contributors.len(),
        significant = diagnosis.significant_growth,
        "analysis complete"
    );

    Report {
        snapshot_count: snapshots.len(),
        started_at: snapshots.first().map(|s| s.timestamp),
        ended_at: snapshots.last().map(|s| s.timestamp),
        timeline: snapshots.iter().map(|s| timeline_entry(s)).collect(),
        contributors,
        slab_cache_changes: slab_changes(&snapshots, thresholds, limits),
        mlocked_processes: processes::aggregate_mlocked(
            snapshots.iter().copied(),
            limits.mlocked_processes,
        ),
        process_trends: processes::process_trends(
            snapshots.iter().copied(),
            thresholds.process_min_samples,
            thresholds.process_increase_percent,
        ),
        memory_percent: memory_stats(&snapshots),
        current_breakdown: snapshots.last().and_then(|s| current_breakdown(s)),
        growth,
        diagnosis,
    }
}

/// Growth between the first and last snapshots that carry `metric`.
fn metric_growth(snapshots: &[&Snapshot], metric: Metric) -> Option<Growth> {
    let values: Vec<u64> = snapshots.iter().filter_map(|s| metric.bytes(s)).collect();
    growth::growth(&values)
}

fn timeline_entry(snapshot: &Snapshot) -> TimelineEntry {
    TimelineEntry {
        timestamp: snapshot.timestamp,
        unevictable_mb: Metric::Unevictable.value(snapshot),
        mlocked_mb: Metric::Mlocked.value(snapshot),
        slab_unreclaimable_mb: Metric::SlabUnreclaimable.value(snapshot),
        page_tables_mb: Metric::PageTables.value(snapshot),
        kernel_stack_mb: Metric::KernelStack.value(snapshot),
        memory_percent: Metric::MemoryPercent.value(snapshot),
    }
}

fn slab_changes(
    snapshots: &[&Snapshot],
    thresholds: &Thresholds,
    limits: ReportLimits,
) -> Vec<SlabDiff> {
    let caches: Vec<_> = snapshots
        .iter()
        .filter_map(|s| s.slab.available())
        .filter_map(|slab| slab.top_slab_caches.available())
        .collect();
    if caches.len() < 2 {
        return Vec::new();
    }
    let (Some(first), Some(last)) = (caches.first(), caches.last()) else {
        return Vec::new();
    };
    slab::diff_slab_caches(first, last, thresholds.slab_cache_mb, limits.slab_diffs)
}

fn memory_stats(snapshots: &[&Snapshot]) -> Option<MemoryStats> {
    let values: Vec<f64> = snapshots
        .iter()
        .filter_map(|s| Metric::MemoryPercent.value(s))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(MemoryStats {
        mean: values.iter().sum::<f64>() / values.len() as f64,
        peak: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
    })
}

fn current_breakdown(snapshot: &Snapshot) -> Option<CurrentBreakdown> {
    let unevictable = snapshot.unevictable.available()?;
    let total = unevictable.total_unevictable;
    let share = |bytes: u64| (total > 0).then(|| bytes as f64 / total as f64 * 100.0);

    let components = [
        ("Mlocked Pages", unevictable.mlocked_pages),
        ("Kernel Stack", unevictable.kernel_stack),
        ("Page Tables", unevictable.page_tables),
        ("NFS Unstable", unevictable.nfs_unstable),
        ("Bounce", unevictable.bounce),
        ("Writeback Tmp", unevictable.writeback_tmp),
    ]
    .into_iter()
    .map(|(component, bytes)| BreakdownShare {
        component: component.to_string(),
        bytes,
        share_percent: share(bytes),
    })
    .collect();

    let slab = snapshot.slab.available();
    Some(CurrentBreakdown {
        timestamp: snapshot.timestamp,
        total_unevictable: total,
        components,
        slab_unreclaimable: slab.map(|s| s.slab_unreclaimable),
        slab_reclaimable: slab.map(|s| s.slab_reclaimable),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::system::snapshot::{Sample, SystemMemory, UnevictableMemory};

    fn snapshot(minute: i64, unevictable: u64, percent: f64) -> Snapshot {
        let base = Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut s = Snapshot::empty(base + Duration::minutes(minute));
        s.unevictable = Sample::Available(UnevictableMemory {
            total_unevictable: unevictable,
            mlocked_pages: unevictable / 2,
            ..Default::default()
        });
        s.system_memory = Sample::Available(SystemMemory {
            percent,
            ..Default::default()
        });
        s
    }

    #[test]
    fn empty_series_produces_empty_report() {
        let report = analyze(std::iter::empty(), &Thresholds::default(), ReportLimits::default());
        assert_eq!(report.snapshot_count, 0);
        assert!(report.growth.unevictable.is_none());
        assert!(report.memory_percent.is_none());
        assert!(report.current_breakdown.is_none());
    }

    #[test]
    fn stats_and_breakdown() {
        let series = [snapshot(0, 1000, 40.0), snapshot(1, 2000, 60.0), snapshot(2, 4000, 50.0)];
        let report = analyze(&series, &Thresholds::default(), ReportLimits::default());

        let stats = report.memory_percent.unwrap();
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.peak, 60.0);
        assert_eq!(stats.min, 40.0);

        let breakdown = report.current_breakdown.unwrap();
        assert_eq!(breakdown.total_unevictable, 4000);
        assert_eq!(breakdown.components[0].share_percent, Some(50.0));
        assert_eq!(report.timeline.len(), 3);
    }

    #[test]
    fn zero_total_has_no_shares() {
        let report = analyze(
            &[snapshot(0, 0, 10.0)],
            &Thresholds::default(),
            ReportLimits::default(),
        );
        let breakdown = report.current_breakdown.unwrap();
        assert!(breakdown.components.iter().all(|c| c.share_percent.is_none()));
    }

    #[test]
    fn growth_skips_snapshots_without_the_metric() {
        let mut gap = Snapshot::empty(Local::now());
        gap.system_memory = Sample::Available(SystemMemory::default());
        let series = [snapshot(0, 1000, 1.0), gap, snapshot(2, 3000, 1.0)];
        let report = analyze(&series, &Thresholds::default(), ReportLimits::default());
        assert_eq!(report.growth.unevictable.unwrap().delta, 2000);
    }
}
