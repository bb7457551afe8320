use serde::{Deserialize, Serialize};

use crate::chart::ChartPoint;
use crate::format::BYTES_PER_MB;
use crate::system::snapshot::Snapshot;

/// A scalar derived from every snapshot: the things we chart and trend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Unevictable,
    Mlocked,
    SlabUnreclaimable,
    PageTables,
    KernelStack,
    MemoryPercent,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Unevictable,
        Metric::Mlocked,
        Metric::SlabUnreclaimable,
        Metric::PageTables,
        Metric::KernelStack,
        Metric::MemoryPercent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Unevictable => "Unevictable",
            Metric::Mlocked => "Mlocked",
            Metric::SlabUnreclaimable => "Unreclaimable Slab",
            Metric::PageTables => "Page Tables",
            Metric::KernelStack => "Kernel Stack",
            Metric::MemoryPercent => "Memory Usage",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::MemoryPercent => "%",
            _ => "MB",
        }
    }

    /// The next metric in display order, wrapping around.
    pub fn next(self) -> Metric {
        let idx = Metric::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Metric::ALL[(idx + 1) % Metric::ALL.len()]
    }

    /// Raw byte count for byte-valued metrics; `None` for percentages or when
    /// the snapshot lacks the source.
    pub fn bytes(self, snapshot: &Snapshot) -> Option<u64> {
        let unevictable = snapshot.unevictable.available();
        match self {
            Metric::Unevictable => unevictable.map(|u| u.total_unevictable),
            Metric::Mlocked => unevictable.map(|u| u.mlocked_pages),
            Metric::PageTables => unevictable.map(|u| u.page_tables),
            Metric::KernelStack => unevictable.map(|u| u.kernel_stack),
            Metric::SlabUnreclaimable => snapshot.slab.available().map(|s| s.slab_unreclaimable),
            Metric::MemoryPercent => None,
        }
    }

    /// Value in display units (MB or percent).
    pub fn value(self, snapshot: &Snapshot) -> Option<f64> {
        match self {
            Metric::MemoryPercent => snapshot.system_memory.available().map(|m| m.percent),
            _ => self.bytes(snapshot).map(|b| b as f64 / BYTES_PER_MB),
        }
    }

    /// Chart points for every snapshot that has this metric, oldest first.
    pub fn series<'a>(self, snapshots: impl IntoIterator<Item = &'a Snapshot>) -> Vec<ChartPoint> {
        snapshots
            .into_iter()
            .filter_map(|s| {
                self.value(s).map(|value| ChartPoint {
                    timestamp: s.timestamp,
                    value,
                })
            })
            .collect()
    }
}
