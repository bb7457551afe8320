use std::collections::BTreeMap;
use std::fmt;
use std::io;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::process::{MlockedProcess, ProcessMemory};

/// Why a sub-measurement is missing from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Unavailable {
    Missing,
    PermissionDenied,
    RequiresPrivilege,
    NotRequested,
    Unsupported,
    CommandFailed(String),
    Malformed(String),
    Io(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Missing => write!(f, "source missing"),
            Unavailable::PermissionDenied => write!(f, "permission denied"),
            Unavailable::RequiresPrivilege => write!(f, "requires root"),
            Unavailable::NotRequested => write!(f, "not collected"),
            Unavailable::Unsupported => write!(f, "unsupported on this platform"),
            Unavailable::CommandFailed(msg) => write!(f, "command failed: {msg}"),
            Unavailable::Malformed(msg) => write!(f, "malformed data: {msg}"),
            Unavailable::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<io::Error> for Unavailable {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Unavailable::Missing,
            io::ErrorKind::PermissionDenied => Unavailable::PermissionDenied,
            io::ErrorKind::Unsupported => Unavailable::Unsupported,
            _ => Unavailable::Io(err.to_string()),
        }
    }
}

/// One sub-measurement of a snapshot: either the value or an explicit marker
/// saying why it could not be taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Sample<T> {
    Available(T),
    Unavailable(Unavailable),
}

impl<T> Sample<T> {
    pub fn from_io(result: io::Result<T>) -> Self {
        match result {
            Ok(value) => Sample::Available(value),
            Err(err) => Sample::Unavailable(err.into()),
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Sample::Available(value) => Some(value),
            Sample::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Sample::Available(_))
    }

    pub fn reason(&self) -> Option<&Unavailable> {
        match self {
            Sample::Available(_) => None,
            Sample::Unavailable(reason) => Some(reason),
        }
    }

    pub fn as_ref(&self) -> Sample<&T> {
        match self {
            Sample::Available(value) => Sample::Available(value),
            Sample::Unavailable(reason) => Sample::Unavailable(reason.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sample<U> {
        match self {
            Sample::Available(value) => Sample::Available(f(value)),
            Sample::Unavailable(reason) => Sample::Unavailable(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Sample<U>) -> Sample<U> {
        match self {
            Sample::Available(value) => f(value),
            Sample::Unavailable(reason) => Sample::Unavailable(reason),
        }
    }
}

impl<T> Default for Sample<T> {
    fn default() -> Self {
        Sample::Unavailable(Unavailable::NotRequested)
    }
}

impl<T> From<Option<T>> for Sample<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Sample::Available(value),
            None => Sample::Unavailable(Unavailable::Missing),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub active: u64,
    pub inactive: u64,
    pub buffers: u64,
    pub cached: u64,
    pub shared: u64,
}

/// Kernel-reported unevictable memory and the counters usually behind it.
///
/// `total_unevictable` comes straight from the `Unevictable:` line and is not
/// the sum of the other fields: they are a partial breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnevictableMemory {
    pub total_unevictable: u64,
    pub mlocked_pages: u64,
    pub kernel_stack: u64,
    pub page_tables: u64,
    pub nfs_unstable: u64,
    pub bounce: u64,
    pub writeback_tmp: u64,
    pub processes_with_mlocked: Vec<MlockedProcess>,
    /// Unevictable bytes per `node{n}/{zone}`, from `/proc/zoneinfo`.
    pub zones: Sample<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabCache {
    pub name: String,
    pub active_objects: u64,
    pub total_objects: u64,
    pub object_size: u64,
    pub active_slabs: u64,
    pub total_slabs: u64,
    pub total_size_bytes: u64,
}

/// Slab totals plus the largest caches, largest first.
///
/// `top_slab_caches` is truncated at collection time, so caches outside the
/// tracked set are invisible to later diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabMemory {
    pub total_slab: u64,
    pub slab_reclaimable: u64,
    pub slab_unreclaimable: u64,
    pub top_slab_caches: Sample<Vec<SlabCache>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HugePages {
    pub total: u64,
    pub free: u64,
    pub reserved: u64,
    pub surplus: u64,
    pub page_size_bytes: u64,
    pub thp_enabled: Option<String>,
    pub thp_counters: BTreeMap<String, u64>,
}

impl HugePages {
    pub fn used_bytes(&self) -> u64 {
        self.total.saturating_sub(self.free) * self.page_size_bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmpfsMount {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: String,
    pub mountpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixShmEntry {
    pub name: String,
    pub size_bytes: u64,
    pub permissions: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysvSegment {
    pub shmid: String,
    pub owner: String,
    pub perms: String,
    pub bytes: u64,
    pub attached: u64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedMemory {
    pub shmem_total: u64,
    pub tmpfs: Sample<Vec<TmpfsMount>>,
    pub posix: Sample<Vec<PosixShmEntry>>,
    pub sysv: Sample<Vec<SysvSegment>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMapEntry {
    pub path: String,
    pub size: u64,
    pub rss: u64,
    pub pss: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub locked: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMaps {
    pub pid: u32,
    pub maps: Vec<MemoryMapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedProcess {
    pub pid: u32,
    pub name: String,
    pub locked_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLocks {
    pub total_locked_bytes: u64,
    pub processes_with_locks: Vec<LockedProcess>,
    pub mlock_failures: Sample<usize>,
}

/// One complete measurement instant. Built once by the collector and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    pub system_memory: Sample<SystemMemory>,
    pub unevictable: Sample<UnevictableMemory>,
    pub slab: Sample<SlabMemory>,
    /// Top processes by memory percent, largest first.
    pub processes: Sample<Vec<ProcessMemory>>,
    pub hugepages: Sample<HugePages>,
    pub swap: Sample<SwapMemory>,
    pub vm_counters: Sample<BTreeMap<String, u64>>,
    pub kernel_memory: Sample<BTreeMap<String, u64>>,
    pub shared_memory: Sample<SharedMemory>,
    pub memory_maps: Sample<Vec<ProcessMaps>>,
    pub memory_locks: Sample<MemoryLocks>,
}

impl Snapshot {
    /// A snapshot with every sub-field marked as not collected.
    pub fn empty(timestamp: DateTime<Local>) -> Self {
        let skipped = || Unavailable::NotRequested;
        Snapshot {
            timestamp,
            system_memory: Sample::Unavailable(skipped()),
            unevictable: Sample::Unavailable(skipped()),
            slab: Sample::Unavailable(skipped()),
            processes: Sample::Unavailable(skipped()),
            hugepages: Sample::Unavailable(skipped()),
            swap: Sample::Unavailable(skipped()),
            vm_counters: Sample::Unavailable(skipped()),
            kernel_memory: Sample::Unavailable(skipped()),
            shared_memory: Sample::Unavailable(skipped()),
            memory_maps: Sample::Unavailable(skipped()),
            memory_locks: Sample::Unavailable(skipped()),
        }
    }

    /// Names of sub-fields that could not be collected, with the reason.
    pub fn unavailable_fields(&self) -> Vec<(&'static str, &Unavailable)> {
        let fields: [(&'static str, Option<&Unavailable>); 11] = [
            ("system_memory", self.system_memory.reason()),
            ("unevictable", self.unevictable.reason()),
            ("slab", self.slab.reason()),
            ("processes", self.processes.reason()),
            ("hugepages", self.hugepages.reason()),
            ("swap", self.swap.reason()),
            ("vm_counters", self.vm_counters.reason()),
            ("kernel_memory", self.kernel_memory.reason()),
            ("shared_memory", self.shared_memory.reason()),
            ("memory_maps", self.memory_maps.reason()),
            ("memory_locks", self.memory_locks.reason()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, reason)| reason.map(|r| (name, r)))
            .collect()
    }
}
