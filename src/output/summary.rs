use std::fmt::Write;

use crate::format::{BYTES_PER_GB, BYTES_PER_MB, format_mb, truncate_unicode};
use crate::system::snapshot::{Sample, Snapshot};

const RULE: usize = 40;
const TOP_PROCESSES: usize = 10;
const TOP_SLAB_CACHES: usize = 5;

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{title}:");
    let _ = writeln!(out, "{}", "-".repeat(RULE));
}

fn unavailable<T>(out: &mut String, sample: &Sample<T>) {
    if let Some(reason) = sample.reason() {
        let _ = writeln!(out, "unavailable ({reason})");
        let _ = writeln!(out);
    }
}

/// Plain-text rendering of one snapshot, written next to its JSON.
pub fn snapshot_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Memory Snapshot - {}",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);

    match snapshot.system_memory.available() {
        Some(sys) => {
            let _ = writeln!(out, "System Memory Usage: {:.1}%", sys.percent);
            let _ = writeln!(out, "Total: {:.2} GB", sys.total as f64 / BYTES_PER_GB);
            let _ = writeln!(out, "Used: {:.2} GB", sys.used as f64 / BYTES_PER_GB);
            let _ = writeln!(out, "Available: {:.2} GB", sys.available as f64 / BYTES_PER_GB);
            let _ = writeln!(out);
        }
        None => {
            let _ = write!(out, "System Memory: ");
            unavailable(&mut out, &snapshot.system_memory);
        }
    }

    heading(&mut out, "UNEVICTABLE MEMORY ANALYSIS");
    match snapshot.unevictable.available() {
        Some(u) => {
            for (label, bytes) in [
                ("Total Unevictable", u.total_unevictable),
                ("Mlocked Pages", u.mlocked_pages),
                ("Kernel Stack", u.kernel_stack),
                ("Page Tables", u.page_tables),
                ("NFS Unstable", u.nfs_unstable),
                ("Bounce", u.bounce),
                ("Writeback Tmp", u.writeback_tmp),
            ] {
                let _ = writeln!(out, "{label}: {}", format_mb(bytes));
            }
            if let Some(zones) = u.zones.available()
                && !zones.is_empty()
            {
                let _ = writeln!(out, "\nUnevictable by Zone:");
                for (zone, bytes) in zones {
                    let _ = writeln!(out, "  {zone}: {}", format_mb(*bytes));
                }
            }
            if !u.processes_with_mlocked.is_empty() {
                let _ = writeln!(out, "\nProcesses with Mlocked Memory:");
                for p in &u.processes_with_mlocked {
                    let _ = writeln!(out, "  PID {} ({}): {}", p.pid, p.name, format_mb(p.mlocked_bytes));
                }
            }
            let _ = writeln!(out);
        }
        None => unavailable(&mut out, &snapshot.unevictable),
    }

    heading(&mut out, "SHARED MEMORY ANALYSIS");
    match snapshot.shared_memory.available() {
        Some(shared) => {
            let _ = writeln!(out, "Total Shared Memory: {}", format_mb(shared.shmem_total));
            if let Some(mounts) = shared.tmpfs.available()
                && !mounts.is_empty()
            {
                let _ = writeln!(out, "tmpfs Usage:");
                for m in mounts {
                    let _ = writeln!(
                        out,
                        "  {}: {} / {} ({})",
                        m.mountpoint, m.used, m.size, m.use_percent
                    );
                }
            }
            if let Some(segments) = shared.sysv.available()
                && !segments.is_empty()
            {
                let _ = writeln!(out, "System V Shared Memory Segments:");
                for seg in segments {
                    let _ = writeln!(out, "  ID {} ({}): {}", seg.shmid, seg.owner, format_mb(seg.bytes));
                }
            }
            let _ = writeln!(out);
        }
        None => unavailable(&mut out, &snapshot.shared_memory),
    }

    heading(&mut out, "SLAB MEMORY ANALYSIS");
    match snapshot.slab.available() {
        Some(slab) => {
            let _ = writeln!(out, "Total Slab: {}", format_mb(slab.total_slab));
            let _ = writeln!(out, "Reclaimable: {}", format_mb(slab.slab_reclaimable));
            let _ = writeln!(out, "Unreclaimable: {}", format_mb(slab.slab_unreclaimable));
            match slab.top_slab_caches.available() {
                Some(caches) if !caches.is_empty() => {
                    let _ = writeln!(out, "Top {TOP_SLAB_CACHES} Slab Caches:");
                    for cache in caches.iter().take(TOP_SLAB_CACHES) {
                        let _ = writeln!(
                            out,
                            "  {}: {} ({} objects)",
                            cache.name,
                            format_mb(cache.total_size_bytes),
                            cache.total_objects
                        );
                    }
                }
                Some(_) => {}
                None => {
                    let _ = write!(out, "Slab caches: ");
                    unavailable(&mut out, &slab.top_slab_caches);
                }
            }
            let _ = writeln!(out);
        }
        None => unavailable(&mut out, &snapshot.slab),
    }

    if let Some(huge) = snapshot.hugepages.available()
        && huge.total > 0
    {
        heading(&mut out, "HUGEPAGES ANALYSIS");
        let _ = writeln!(out, "Total HugePages: {}", huge.total);
        let _ = writeln!(out, "Free HugePages: {}", huge.free);
        let _ = writeln!(out, "HugePage Size: {}", format_mb(huge.page_size_bytes));
        let _ = writeln!(out, "Used HugePages Memory: {}", format_mb(huge.used_bytes()));
        let _ = writeln!(
            out,
            "THP Enabled: {}",
            huge.thp_enabled.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(out);
    }

    if let Some(processes) = snapshot.processes.available() {
        let _ = writeln!(out, "Top {TOP_PROCESSES} Memory Consuming Processes:");
        let _ = writeln!(out, "{}", "-".repeat(70));
        let _ = writeln!(
            out,
            "{:<8} {:<20} {:<8} {:<10} Command",
            "PID", "Name", "Memory%", "RSS (MB)"
        );
        let _ = writeln!(out, "{}", "-".repeat(70));
        for p in processes.iter().take(TOP_PROCESSES) {
            let _ = writeln!(
                out,
                "{:<8} {:<20} {:<8.2} {:<10.1} {}",
                p.pid,
                truncate_unicode(&p.name, 20),
                p.memory_percent,
                p.rss_bytes as f64 / BYTES_PER_MB,
                p.cmdline_prefix
            );
        }
    }

    if let Some(swap) = snapshot.swap.available() {
        let _ = writeln!(out, "\nSwap Usage: {:.1}%", swap.percent);
        let _ = writeln!(out, "Swap Used: {}", format_mb(swap.used));
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::system::snapshot::{SlabMemory, UnevictableMemory, Unavailable};

    const MB: u64 = 1024 * 1024;

    #[test]
    fn marks_missing_sections() {
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut snap = Snapshot::empty(ts);
        snap.unevictable = Sample::Available(UnevictableMemory {
            total_unevictable: 128 * MB,
            mlocked_pages: 64 * MB,
            ..Default::default()
        });
        snap.slab = Sample::Available(SlabMemory {
            total_slab: 10 * MB,
            slab_reclaimable: 6 * MB,
            slab_unreclaimable: 4 * MB,
            top_slab_caches: Sample::Unavailable(Unavailable::PermissionDenied),
        });

        let text = snapshot_summary(&snap);
        assert!(text.starts_with("Memory Snapshot - 2024-03-01 09:00:00"));
        assert!(text.contains("Total Unevictable: 128.0 MB"));
        assert!(text.contains("Mlocked Pages: 64.0 MB"));
        assert!(text.contains("Slab caches: unavailable (permission denied)"));
        assert!(text.contains("System Memory: unavailable (not collected)"));
        assert!(!text.contains("HUGEPAGES"));
    }
}
