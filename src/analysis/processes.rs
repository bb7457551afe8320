use std::collections::BTreeMap;

use serde::Serialize;

use crate::format::BYTES_PER_MB;
use crate::system::snapshot::Snapshot;

/// Locked memory of one pid across the whole series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MlockedSummary {
    pub pid: u32,
    pub name: String,
    pub samples: usize,
    pub max_bytes: u64,
    pub mean_bytes: f64,
}

impl MlockedSummary {
    pub fn max_mb(&self) -> f64 {
        self.max_bytes as f64 / BYTES_PER_MB
    }

    pub fn mean_mb(&self) -> f64 {
        self.mean_bytes / BYTES_PER_MB
    }
}

/// Groups mlocked processes by pid and keeps the `limit` with the largest
/// peak. A pid only counts the snapshots it appeared in.
pub fn aggregate_mlocked<'a>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    limit: usize,
) -> Vec<MlockedSummary> {
    // pid -> (name, samples, max, sum)
    let mut by_pid: BTreeMap<u32, (String, usize, u64, u128)> = BTreeMap::new();
    for snapshot in snapshots {
        let Some(unevictable) = snapshot.unevictable.available() else {
            continue;
        };
        for proc in &unevictable.processes_with_mlocked {
            let entry = by_pid
                .entry(proc.pid)
                .or_insert_with(|| (proc.name.clone(), 0, 0, 0));
            entry.1 += 1;
            entry.2 = entry.2.max(proc.mlocked_bytes);
            entry.3 += u128::from(proc.mlocked_bytes);
        }
    }

    let mut summaries: Vec<MlockedSummary> = by_pid
        .into_iter()
        .map(|(pid, (name, samples, max_bytes, sum))| MlockedSummary {
            pid,
            name,
            samples,
            max_bytes,
            mean_bytes: sum as f64 / samples as f64,
        })
        .collect();
    summaries.sort_by_key(|s| std::cmp::Reverse(s.max_bytes));
    summaries.truncate(limit);
    summaries
}

/// Memory-percent change of one pid between its first and last appearance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessTrend {
    pub pid: u32,
    pub name: String,
    pub samples: usize,
    pub first_percent: f64,
    pub last_percent: f64,
    pub increase: f64,
    pub increasing: bool,
}

/// Per-pid endpoint comparison. This is a coarse leak heuristic rather than
/// a regression: a pid is increasing when it has at least `min_samples`
/// samples and grew by more than `min_increase` percentage points.
pub fn process_trends<'a>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    min_samples: usize,
    min_increase: f64,
) -> Vec<ProcessTrend> {
    let mut by_pid: BTreeMap<u32, (String, Vec<f64>)> = BTreeMap::new();
    for snapshot in snapshots {
        let Some(processes) = snapshot.processes.available() else {
            continue;
        };
        for proc in processes {
            by_pid
                .entry(proc.pid)
                .or_insert_with(|| (proc.name.clone(), Vec::new()))
                .1
                .push(proc.memory_percent);
        }
    }

    let mut trends: Vec<ProcessTrend> = by_pid
        .into_iter()
        .filter(|(_, (_, samples))| samples.len() >= min_samples)
        .filter_map(|(pid, (name, samples))| {
            let first_percent = *samples.first()?;
            let last_percent = *samples.last()?;
            let increase = last_percent - first_percent;
            Some(ProcessTrend {
                pid,
                name,
                samples: samples.len(),
                first_percent,
                last_percent,
                increase,
                increasing: increase > min_increase,
            })
        })
        .collect();
    trends.sort_by(|a, b| b.increase.total_cmp(&a.increase));
    trends
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;
    use crate::system::process::{MlockedProcess, ProcessMemory};
    use crate::system::snapshot::{Sample, UnevictableMemory};

    fn with_mlocked(entries: &[(u32, u64)]) -> Snapshot {
        let mut snapshot = Snapshot::empty(Local::now());
        snapshot.unevictable = Sample::Available(UnevictableMemory {
            processes_with_mlocked: entries
                .iter()
                .map(|&(pid, mlocked_bytes)| MlockedProcess {
                    pid,
                    name: format!("p{pid}"),
                    mlocked_bytes,
                })
                .collect(),
            ..Default::default()
        });
        snapshot
    }

    fn with_processes(entries: &[(u32, f64)]) -> Snapshot {
        let mut snapshot = Snapshot::empty(Local::now());
        snapshot.processes = Sample::Available(
            entries
                .iter()
                .map(|&(pid, memory_percent)| ProcessMemory {
                    pid,
                    name: format!("p{pid}"),
                    cmdline_prefix: String::new(),
                    memory_percent,
                    rss_bytes: 0,
                    vms_bytes: 0,
                    shared_bytes: 0,
                    text_bytes: 0,
                    data_bytes: 0,
                })
                .collect(),
        );
        snapshot
    }

    #[test]
    fn mlocked_max_and_mean_per_pid() {
        let series = [
            with_mlocked(&[(10, 100), (20, 50)]),
            with_mlocked(&[(10, 300)]),
            with_mlocked(&[(20, 70), (30, 1000)]),
        ];
        let summary = aggregate_mlocked(&series, 2);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].pid, 30);
        assert_eq!(summary[1].pid, 10);
        assert_eq!(summary[1].samples, 2);
        assert_eq!(summary[1].max_bytes, 300);
        assert_eq!(summary[1].mean_bytes, 200.0);
    }

    #[test]
    fn trends_need_enough_samples() {
        let series = [
            with_processes(&[(1, 1.0), (2, 5.0)]),
            with_processes(&[(1, 3.0), (2, 5.1)]),
            with_processes(&[(2, 5.2)]),
        ];
        let trends = process_trends(&series, 3, 0.5);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].pid, 2);
        assert!(!trends[0].increasing);
    }
}
