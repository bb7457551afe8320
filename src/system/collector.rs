use std::collections::BTreeMap;
use std::io;

use chrono::Local;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use super::commands;
use super::platform::{MemorySource, NativeSource};
use super::process::{self, MlockedProcess, ProcessMemory};
use super::procfs;
use super::snapshot::{
    LockedProcess, MemoryLocks, ProcessMaps, Sample, SharedMemory, Snapshot, SwapMemory,
    Unavailable,
};

/// Processes whose smaps are captured in a full snapshot.
const MAPPED_PROCESSES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Everything, including shell-outs and privileged scans.
    Full,
    /// Just what the live chart needs.
    Live,
}

#[derive(Clone, Debug)]
pub struct CollectOptions {
    pub profile: Profile,
    pub top_processes: usize,
    pub top_slab_caches: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Full,
            top_processes: 50,
            top_slab_caches: 20,
        }
    }
}

pub struct Collector<S: MemorySource = NativeSource> {
    sys: System,
    source: S,
    options: CollectOptions,
}

impl Collector<NativeSource> {
    pub fn new(options: CollectOptions) -> Self {
        Self::with_source(NativeSource::default(), options)
    }
}

impl<S: MemorySource> Collector<S> {
    pub fn with_source(source: S, options: CollectOptions) -> Self {
        Collector {
            sys: System::new(),
            source,
            options,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.source.is_privileged()
    }

    /// Takes one snapshot. Individual sources may fail; the snapshot is
    /// always produced with those fields marked unavailable.
    pub fn collect(&mut self) -> Snapshot {
        let _span = tracing::debug_span!("collect", profile = ?self.options.profile).entered();

        let full = self.options.profile == Profile::Full;
        self.refresh_system(full);

        let mut snapshot = Snapshot::empty(Local::now());
        let meminfo = Sample::from_io(self.source.meminfo()).and_then(|c| procfs::parse_meminfo(&c));

        snapshot.system_memory = meminfo.as_ref().and_then(procfs::system_memory);
        snapshot.swap = Sample::Available(self.swap());

        let mlocked = self.mlocked_processes();
        let zones = if full {
            Sample::from_io(self.source.zoneinfo()).and_then(|c| procfs::parse_zoneinfo(&c))
        } else {
            Sample::Unavailable(Unavailable::NotRequested)
        };
        snapshot.unevictable = meminfo.as_ref().and_then(procfs::unevictable_memory).map(|mut u| {
            u.processes_with_mlocked = mlocked;
            u.zones = zones;
            u
        });

        let top_slab_caches = if full {
            Sample::from_io(self.source.slabinfo())
                .and_then(|c| procfs::parse_slabinfo(&c, self.options.top_slab_caches))
        } else {
            Sample::Unavailable(Unavailable::NotRequested)
        };
        snapshot.slab = meminfo
            .as_ref()
            .and_then(|m| procfs::slab_memory(m, top_slab_caches));

        if full {
            let vm_counters =
                Sample::from_io(self.source.vmstat()).and_then(|c| procfs::parse_vmstat(&c));
            let thp = self.source.thp_enabled().ok().map(|c| procfs::thp_mode(&c));
            snapshot.hugepages = meminfo
                .as_ref()
                .map(|m| procfs::hugepages(m, thp, vm_counters.available()));
            snapshot.vm_counters = vm_counters;
            snapshot.shared_memory = meminfo.as_ref().map(|m| self.shared_memory(m));
            snapshot.kernel_memory = meminfo.clone();

            let total = snapshot
                .system_memory
                .available()
                .map(|m| m.total)
                .unwrap_or_else(|| self.sys.total_memory());
            let processes = self.top_processes(total);

            if self.source.is_privileged() {
                snapshot.memory_maps = Sample::Available(self.memory_maps(&processes));
                snapshot.memory_locks = Sample::Available(self.memory_locks());
            } else {
                snapshot.memory_maps = Sample::Unavailable(Unavailable::RequiresPrivilege);
                snapshot.memory_locks = Sample::Unavailable(Unavailable::RequiresPrivilege);
            }
            snapshot.processes = Sample::Available(processes);
        }

        for (field, reason) in snapshot.unavailable_fields() {
            if *reason != Unavailable::NotRequested {
                tracing::debug!(field, %reason, "sub-measurement unavailable");
            }
        }
        tracing::info!(
            timestamp = %snapshot.timestamp.format("%H:%M:%S"),
            unevictable_mb = snapshot
                .unevictable
                .available()
                .map(|u| u.total_unevictable as f64 / (1024.0 * 1024.0)),
            "snapshot collected"
        );
        snapshot
    }

    fn refresh_system(&mut self, full: bool) {
        self.sys.refresh_memory();
        let kind = if full {
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cmd(UpdateKind::OnlyIfNotSet)
        } else {
            ProcessRefreshKind::nothing()
        };
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
    }

    fn swap(&self) -> SwapMemory {
        let total = self.sys.total_swap();
        let used = self.sys.used_swap();
        let percent = if total > 0 {
            (used as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        SwapMemory {
            total,
            used,
            free: self.sys.free_swap(),
            percent,
        }
    }

    fn pids(&self) -> Vec<(u32, String)> {
        self.sys
            .processes()
            .iter()
            .map(|(pid, p)| (pid.as_u32(), p.name().to_string_lossy().into_owned()))
            .collect()
    }

    /// Processes with a non-zero `VmLck`, ordered by pid.
    fn mlocked_processes(&self) -> Vec<MlockedProcess> {
        let mut locked: Vec<MlockedProcess> = self
            .pids()
            .into_iter()
            .filter_map(|(pid, name)| {
                let status = self.source.process_status(pid).ok()?;
                let mlocked_bytes = procfs::parse_vm_locked(&status)?;
                (mlocked_bytes > 0).then_some(MlockedProcess {
                    pid,
                    name,
                    mlocked_bytes,
                })
            })
            .collect();
        locked.sort_by_key(|p| p.pid);
        locked
    }

    fn top_processes(&self, total_memory: u64) -> Vec<ProcessMemory> {
        let all: Vec<ProcessMemory> = self
            .sys
            .processes()
            .iter()
            .map(|(pid, p)| ProcessMemory {
                pid: pid.as_u32(),
                name: p.name().to_string_lossy().into_owned(),
                cmdline_prefix: process::cmdline_prefix(
                    p.cmd().iter().map(|arg| arg.to_string_lossy()),
                ),
                memory_percent: process::memory_percent(p.memory(), total_memory),
                rss_bytes: p.memory(),
                vms_bytes: p.virtual_memory(),
                shared_bytes: 0,
                text_bytes: 0,
                data_bytes: 0,
            })
            .collect();

        let page_size = self.source.page_size();
        let mut top = process::rank_by_memory_percent(all, self.options.top_processes);
        for entry in &mut top {
            let statm = self
                .source
                .process_statm(entry.pid)
                .ok()
                .and_then(|c| procfs::parse_statm(&c, page_size));
            if let Some(statm) = statm {
                entry.shared_bytes = statm.shared;
                entry.text_bytes = statm.text;
                entry.data_bytes = statm.data;
            }
        }
        top
    }

    fn command<T>(&self, program: &str, args: &[&str], parse: impl FnOnce(&str) -> T) -> Sample<T> {
        match self.source.command_output(program, args) {
            Ok(output) => Sample::Available(parse(&output)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Sample::Unavailable(Unavailable::Missing)
            }
            Err(err) if err.kind() == io::ErrorKind::Unsupported => {
                Sample::Unavailable(Unavailable::Unsupported)
            }
            Err(err) => Sample::Unavailable(Unavailable::CommandFailed(err.to_string())),
        }
    }

    fn shared_memory(&self, meminfo: &BTreeMap<String, u64>) -> SharedMemory {
        SharedMemory {
            shmem_total: meminfo.get("Shmem").copied().unwrap_or(0),
            tmpfs: self.command("df", &["-h", "-t", "tmpfs"], commands::parse_df_tmpfs),
            posix: self.command("ls", &["-la", "/dev/shm/"], commands::parse_ls_shm),
            sysv: self.command("ipcs", &["-m"], commands::parse_ipcs),
        }
    }

    fn memory_maps(&self, processes: &[ProcessMemory]) -> Vec<ProcessMaps> {
        processes
            .iter()
            .take(MAPPED_PROCESSES)
            .filter_map(|p| {
                let smaps = self.source.process_smaps(p.pid).ok()?;
                Some(ProcessMaps {
                    pid: p.pid,
                    maps: procfs::parse_smaps(&smaps),
                })
            })
            .collect()
    }

    fn memory_locks(&self) -> MemoryLocks {
        let mut processes_with_locks: Vec<LockedProcess> = self
            .pids()
            .into_iter()
            .filter_map(|(pid, name)| {
                let smaps = self.source.process_smaps(pid).ok()?;
                let locked_bytes: u64 = procfs::parse_smaps(&smaps).iter().map(|m| m.locked).sum();
                (locked_bytes > 0).then_some(LockedProcess {
                    pid,
                    name,
                    locked_bytes,
                })
            })
            .collect();
        processes_with_locks.sort_by(|a, b| b.locked_bytes.cmp(&a.locked_bytes));

        MemoryLocks {
            total_locked_bytes: processes_with_locks.iter().map(|p| p.locked_bytes).sum(),
            processes_with_locks,
            mlock_failures: self.command("dmesg", &[], commands::count_mlock_failures),
        }
    }
}
