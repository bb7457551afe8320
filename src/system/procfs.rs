//! Parsers for the kernel text interfaces under `/proc`.
//!
//! Every function here is pure: it takes file contents and returns structured
//! data, so the collector can feed it from the real filesystem or from test
//! fixtures.

use std::collections::BTreeMap;

use super::snapshot::{
    HugePages, MemoryMapEntry, SlabCache, SlabMemory, Sample, SystemMemory, Unavailable,
    UnevictableMemory,
};

/// Bytes per page assumed for `/proc/zoneinfo` page counts.
pub const ZONEINFO_PAGE_SIZE: u64 = 4096;

/// Parses `/proc/meminfo` into field name → value. Values with a `kB` unit are
/// converted to bytes; unit-less values (hugepage counts) are kept as-is.
pub fn parse_meminfo(content: &str) -> Sample<BTreeMap<String, u64>> {
    let mut fields = BTreeMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let value = match parts.next() {
            Some(unit) if unit.eq_ignore_ascii_case("kB") => value * 1024,
            _ => value,
        };
        fields.insert(key.trim().to_string(), value);
    }
    if fields.is_empty() {
        return Sample::Unavailable(Unavailable::Malformed("no meminfo fields".into()));
    }
    Sample::Available(fields)
}

fn field(meminfo: &BTreeMap<String, u64>, key: &str) -> u64 {
    meminfo.get(key).copied().unwrap_or(0)
}

/// Derives system-wide memory figures the way `free(1)` does: `cached`
/// includes reclaimable slab and `used` excludes buffers and cache.
pub fn system_memory(meminfo: &BTreeMap<String, u64>) -> Sample<SystemMemory> {
    let Some(&total) = meminfo.get("MemTotal") else {
        return Sample::Unavailable(Unavailable::Malformed("MemTotal missing".into()));
    };
    let free = field(meminfo, "MemFree");
    let buffers = field(meminfo, "Buffers");
    let cached = field(meminfo, "Cached") + field(meminfo, "SReclaimable");
    let available = meminfo.get("MemAvailable").copied().unwrap_or(free);

    let used = total.saturating_sub(free + buffers + cached);
    let percent = if total > 0 {
        let pct = total.saturating_sub(available) as f64 / total as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    } else {
        0.0
    };

    Sample::Available(SystemMemory {
        total,
        available,
        used,
        free,
        percent,
        active: field(meminfo, "Active"),
        inactive: field(meminfo, "Inactive"),
        buffers,
        cached,
        shared: field(meminfo, "Shmem"),
    })
}

/// Unevictable counters from meminfo. Per-process and per-zone parts are
/// filled in by the caller.
pub fn unevictable_memory(meminfo: &BTreeMap<String, u64>) -> Sample<UnevictableMemory> {
    if !meminfo.contains_key("Unevictable") {
        return Sample::Unavailable(Unavailable::Malformed("Unevictable missing".into()));
    }
    Sample::Available(UnevictableMemory {
        total_unevictable: field(meminfo, "Unevictable"),
        mlocked_pages: field(meminfo, "Mlocked"),
        kernel_stack: field(meminfo, "KernelStack"),
        page_tables: field(meminfo, "PageTables"),
        nfs_unstable: field(meminfo, "NFS_Unstable"),
        bounce: field(meminfo, "Bounce"),
        writeback_tmp: field(meminfo, "WritebackTmp"),
        processes_with_mlocked: Vec::new(),
        zones: Sample::Unavailable(Unavailable::NotRequested),
    })
}

pub fn slab_memory(
    meminfo: &BTreeMap<String, u64>,
    top_slab_caches: Sample<Vec<SlabCache>>,
) -> Sample<SlabMemory> {
    if !meminfo.contains_key("Slab") {
        return Sample::Unavailable(Unavailable::Malformed("Slab missing".into()));
    }
    Sample::Available(SlabMemory {
        total_slab: field(meminfo, "Slab"),
        slab_reclaimable: field(meminfo, "SReclaimable"),
        slab_unreclaimable: field(meminfo, "SUnreclaim"),
        top_slab_caches,
    })
}

pub fn hugepages(
    meminfo: &BTreeMap<String, u64>,
    thp_enabled: Option<String>,
    vm_counters: Option<&BTreeMap<String, u64>>,
) -> HugePages {
    let thp_counters = vm_counters
        .map(|counters| {
            counters
                .iter()
                .filter(|(name, _)| name.starts_with("thp_"))
                .map(|(name, value)| (name.clone(), *value))
                .collect()
        })
        .unwrap_or_default();

    HugePages {
        total: field(meminfo, "HugePages_Total"),
        free: field(meminfo, "HugePages_Free"),
        reserved: field(meminfo, "HugePages_Rsvd"),
        surplus: field(meminfo, "HugePages_Surp"),
        page_size_bytes: field(meminfo, "Hugepagesize"),
        thp_enabled,
        thp_counters,
    }
}

/// Extracts the selected mode from
/// `/sys/kernel/mm/transparent_hugepage/enabled`, e.g. `always [madvise] never`.
pub fn thp_mode(content: &str) -> String {
    let trimmed = content.trim();
    trimmed
        .split_whitespace()
        .find_map(|word| word.strip_prefix('[').and_then(|w| w.strip_suffix(']')))
        .unwrap_or(trimmed)
        .to_string()
}

pub fn parse_vmstat(content: &str) -> Sample<BTreeMap<String, u64>> {
    let counters: BTreeMap<String, u64> = content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?;
            let value = parts.next()?.parse().ok()?;
            Some((key.to_string(), value))
        })
        .collect();
    if counters.is_empty() {
        return Sample::Unavailable(Unavailable::Malformed("no vmstat counters".into()));
    }
    Sample::Available(counters)
}

/// Parses `/proc/slabinfo` and returns the `limit` largest caches by
/// `total_objects * object_size`, largest first.
pub fn parse_slabinfo(content: &str, limit: usize) -> Sample<Vec<SlabCache>> {
    let mut caches = Vec::new();
    let mut saw_header = false;

    for line in content.lines() {
        if line.starts_with("slabinfo") || line.starts_with('#') {
            saw_header = true;
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let numbers: Option<Vec<u64>> = parts[1..4].iter().map(|p| p.parse().ok()).collect();
        let Some(numbers) = numbers else {
            continue;
        };
        let (active_objects, total_objects, object_size) = (numbers[0], numbers[1], numbers[2]);

        // Slab counts follow the `slabdata` marker; older formats put them at 4/5.
        let slab_fields = match parts.iter().position(|p| *p == "slabdata") {
            Some(idx) => (parts.get(idx + 1), parts.get(idx + 2)),
            None => (parts.get(4), parts.get(5)),
        };
        let active_slabs = slab_fields.0.and_then(|v| v.parse().ok()).unwrap_or(0);
        let total_slabs = slab_fields.1.and_then(|v| v.parse().ok()).unwrap_or(0);

        caches.push(SlabCache {
            name: parts[0].to_string(),
            active_objects,
            total_objects,
            object_size,
            active_slabs,
            total_slabs,
            total_size_bytes: total_objects * object_size,
        });
    }

    if caches.is_empty() && !saw_header {
        return Sample::Unavailable(Unavailable::Malformed("no slab caches".into()));
    }
    caches.sort_by(|a, b| b.total_size_bytes.cmp(&a.total_size_bytes));
    caches.truncate(limit);
    Sample::Available(caches)
}

/// Unevictable bytes per zone from `/proc/zoneinfo`, keyed `node{n}/{zone}`.
pub fn parse_zoneinfo(content: &str) -> Sample<BTreeMap<String, u64>> {
    let mut zones = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Node ") {
            // "Node 0, zone   Normal"
            let node = rest.split(',').next().unwrap_or("").trim();
            let zone = rest.split_whitespace().last().unwrap_or("");
            current = Some(format!("node{node}/{zone}"));
            continue;
        }
        let Some(zone) = current.as_ref() else {
            continue;
        };
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(pages) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "nr_zone_unevictable" => {
                zones.insert(zone.clone(), pages * ZONEINFO_PAGE_SIZE);
            }
            "nr_unevictable" => {
                zones
                    .entry(zone.clone())
                    .or_insert(pages * ZONEINFO_PAGE_SIZE);
            }
            _ => {}
        }
    }

    if current.is_none() {
        return Sample::Unavailable(Unavailable::Malformed("no zones".into()));
    }
    Sample::Available(zones)
}

/// `VmLck:` from `/proc/<pid>/status`, in bytes.
pub fn parse_vm_locked(status: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmLck:")?;
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statm {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
    pub text: u64,
    pub data: u64,
}

/// `/proc/<pid>/statm`: page counts `size resident shared text lib data dt`.
pub fn parse_statm(content: &str, page_size: u64) -> Option<Statm> {
    let pages: Vec<u64> = content
        .split_whitespace()
        .map(|v| v.parse().ok())
        .collect::<Option<Vec<u64>>>()?;
    if pages.len() < 6 {
        return None;
    }
    Some(Statm {
        size: pages[0] * page_size,
        resident: pages[1] * page_size,
        shared: pages[2] * page_size,
        text: pages[3] * page_size,
        data: pages[5] * page_size,
    })
}

/// Parses `/proc/<pid>/smaps` into one entry per mapping.
pub fn parse_smaps(content: &str) -> Vec<MemoryMapEntry> {
    let mut maps: Vec<MemoryMapEntry> = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else {
            continue;
        };

        if let Some(key) = first.strip_suffix(':') {
            let Some(entry) = maps.last_mut() else {
                continue;
            };
            let Some(bytes) = parts
                .next()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|kb| kb * 1024)
            else {
                continue;
            };
            match key {
                "Size" => entry.size = bytes,
                "Rss" => entry.rss = bytes,
                "Pss" => entry.pss = bytes,
                "Shared_Clean" => entry.shared_clean = bytes,
                "Shared_Dirty" => entry.shared_dirty = bytes,
                "Locked" => entry.locked = bytes,
                _ => {}
            }
        } else if first.contains('-') {
            // address perms offset dev inode [path]
            let path = parts.nth(4).map(str::to_string).unwrap_or_default();
            maps.push(MemoryMapEntry {
                path,
                size: 0,
                rss: 0,
                pss: 0,
                shared_clean: 0,
                shared_dirty: 0,
                locked: 0,
            });
        }
    }
    maps
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         4096000 kB
MemAvailable:    8192000 kB
Buffers:          512000 kB
Cached:          2048000 kB
Active:          6000000 kB
Inactive:        3000000 kB
Unevictable:      102400 kB
Mlocked:           51200 kB
Shmem:            256000 kB
Slab:             600000 kB
SReclaimable:     400000 kB
SUnreclaim:       200000 kB
KernelStack:       16384 kB
PageTables:        32768 kB
NFS_Unstable:          0 kB
Bounce:                0 kB
WritebackTmp:          0 kB
HugePages_Total:       4
HugePages_Free:        1
HugePages_Rsvd:        0
HugePages_Surp:        0
Hugepagesize:       2048 kB
";

    fn meminfo() -> BTreeMap<String, u64> {
        parse_meminfo(MEMINFO).available().cloned().unwrap()
    }

    #[test]
    fn meminfo_converts_kb_but_not_counts() {
        let m = meminfo();
        assert_eq!(m["MemTotal"], 16384000 * 1024);
        assert_eq!(m["HugePages_Total"], 4);
        assert_eq!(m["Hugepagesize"], 2048 * 1024);
    }

    #[test]
    fn empty_meminfo_is_malformed() {
        assert!(!parse_meminfo("").is_available());
    }

    #[test]
    fn system_memory_follows_free_semantics() {
        let sys = system_memory(&meminfo()).available().cloned().unwrap();
        assert_eq!(sys.cached, (2048000 + 400000) * 1024);
        assert_eq!(sys.used, (16384000 - 4096000 - 512000 - 2048000 - 400000) * 1024);
        assert_eq!(sys.percent, 50.0);
        assert_eq!(sys.shared, 256000 * 1024);
    }

    #[test]
    fn unevictable_total_is_not_recomputed() {
        let u = unevictable_memory(&meminfo()).available().cloned().unwrap();
        assert_eq!(u.total_unevictable, 102400 * 1024);
        assert_eq!(u.mlocked_pages, 51200 * 1024);
        assert_eq!(u.page_tables, 32768 * 1024);
    }

    #[test]
    fn hugepages_used_bytes() {
        let h = hugepages(&meminfo(), Some("madvise".into()), None);
        assert_eq!(h.used_bytes(), 3 * 2048 * 1024);
    }

    #[test]
    fn thp_mode_picks_bracketed_entry() {
        assert_eq!(thp_mode("always [madvise] never\n"), "madvise");
        assert_eq!(thp_mode("unknown"), "unknown");
    }

    #[test]
    fn slabinfo_sorted_by_size_and_truncated() {
        let content = "\
slabinfo - version: 2.1
# name            <active_objs> <num_objs> <objsize> <objperslab> <pagesperslab> : tunables <limit> <batchcount> <sharedfactor> : slabdata <active_slabs> <num_slabs> <sharedavail>
dentry             1000   1200    192   21    1 : tunables    0    0    0 : slabdata     57     57      0
kmalloc-64         5000   5120     64   64    1 : tunables    0    0    0 : slabdata     80     80      0
inode_cache         800    900    600   13    2 : tunables    0    0    0 : slabdata     69     70      0
";
        let caches = parse_slabinfo(content, 2).available().cloned().unwrap();
        assert_eq!(caches.len(), 2);
        assert_eq!(caches[0].name, "inode_cache");
        assert_eq!(caches[0].total_size_bytes, 900 * 600);
        assert_eq!(caches[0].active_slabs, 69);
        assert_eq!(caches[0].total_slabs, 70);
        assert_eq!(caches[1].name, "kmalloc-64");
    }

    #[test]
    fn zoneinfo_prefers_zone_counter() {
        let content = "\
Node 0, zone      DMA
  per-node stats
      nr_unevictable 10
      nr_zone_unevictable 3
Node 0, zone   Normal
      nr_zone_unevictable 250
";
        let zones = parse_zoneinfo(content).available().cloned().unwrap();
        assert_eq!(zones["node0/DMA"], 3 * ZONEINFO_PAGE_SIZE);
        assert_eq!(zones["node0/Normal"], 250 * ZONEINFO_PAGE_SIZE);
    }

    #[test]
    fn vm_locked_from_status() {
        let status = "Name:\tpostgres\nVmLck:\t    2048 kB\nVmPin:\t 0 kB\n";
        assert_eq!(parse_vm_locked(status), Some(2048 * 1024));
        assert_eq!(parse_vm_locked("Name:\tkthreadd\n"), None);
    }

    #[test]
    fn statm_scales_pages() {
        let statm = parse_statm("100 50 10 5 0 30 0\n", 4096).unwrap();
        assert_eq!(statm.resident, 50 * 4096);
        assert_eq!(statm.data, 30 * 4096);
        assert!(parse_statm("garbage", 4096).is_none());
    }

    #[test]
    fn smaps_collects_per_mapping_fields() {
        let content = "\
55d0c0000000-55d0c0021000 r--p 00000000 fd:01 1234   /usr/bin/app
Size:                132 kB
Rss:                 100 kB
Pss:                  50 kB
Shared_Clean:         40 kB
Shared_Dirty:          0 kB
Locked:                8 kB
7ffd00000000-7ffd00021000 rw-p 00000000 00:00 0
Size:                 64 kB
Locked:               64 kB
";
        let maps = parse_smaps(content);
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].path, "/usr/bin/app");
        assert_eq!(maps[0].rss, 100 * 1024);
        assert_eq!(maps[0].locked, 8 * 1024);
        assert_eq!(maps[1].path, "");
        assert_eq!(maps[1].locked, 64 * 1024);
    }
}
