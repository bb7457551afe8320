use std::fmt::Write;

use crate::analysis::{FOLLOW_UP_COMMANDS, Growth, Report};
use crate::format::{format_duration, format_mb, format_signed_mb, truncate_unicode};
use crate::system::snapshot::Snapshot;

const TOP_SLAB_CACHES: usize = 10;
const TOP_MLOCKED: usize = 15;

/// How the series was collected, when known. A reloaded directory has no
/// record of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSettings {
    pub interval_secs: Option<u64>,
    pub duration_minutes: Option<u64>,
}

fn rule(out: &mut String, ch: char, width: usize) {
    let _ = writeln!(out, "{}", ch.to_string().repeat(width));
}

fn opt_mb(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}MB"))
}

fn growth_line(out: &mut String, label: &str, growth: Option<Growth>) {
    match growth {
        Some(g) => {
            let rate = g
                .rate_percent
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.1}%"));
            let _ = writeln!(out, "{label}: {:.1} MB ({rate})", g.delta_mb());
        }
        None => {
            let _ = writeln!(out, "{label}: n/a");
        }
    }
}

/// `analysis_report.txt`.
pub fn analysis_report(report: &Report, settings: RunSettings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Memory Investigation Analysis Report");
    rule(&mut out, '=', 50);
    let _ = writeln!(out);

    if let Some(minutes) = settings.duration_minutes {
        let _ = writeln!(out, "Investigation Duration: {minutes} minutes");
    }
    if let Some(secs) = settings.interval_secs {
        let _ = writeln!(out, "Collection Interval: {secs} seconds");
    }
    if let (Some(start), Some(end)) = (report.started_at, report.ended_at) {
        let _ = writeln!(
            out,
            "Time Span: {} -> {} ({})",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%H:%M:%S"),
            format_duration(end - start)
        );
    }
    let _ = writeln!(out, "Total Snapshots: {}", report.snapshot_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "UNEVICTABLE MEMORY TREND ANALYSIS:");
    rule(&mut out, '=', 50);
    for entry in &report.timeline {
        let _ = writeln!(
            out,
            "{}: Unevictable={}, Mlocked={}, SlabUnreclaim={}, PageTables={}, KernelStack={}",
            entry.timestamp.format("%H:%M:%S"),
            opt_mb(entry.unevictable_mb),
            opt_mb(entry.mlocked_mb),
            opt_mb(entry.slab_unreclaimable_mb),
            opt_mb(entry.page_tables_mb),
            opt_mb(entry.kernel_stack_mb),
        );
    }

    let _ = writeln!(out, "\nUnevictable Memory Growth Analysis:");
    rule(&mut out, '-', 40);
    growth_line(&mut out, "Total Unevictable Growth", report.growth.unevictable);
    growth_line(&mut out, "Mlocked Memory Growth", report.growth.mlocked);
    growth_line(&mut out, "Unreclaimable Slab Growth", report.growth.slab_unreclaimable);
    growth_line(&mut out, "Page Tables Growth", report.growth.page_tables);
    growth_line(&mut out, "Kernel Stack Growth", report.growth.kernel_stack);

    let _ = writeln!(out, "\nBiggest Contributors to Unevictable Memory Growth:");
    rule(&mut out, '-', 50);
    if report.contributors.is_empty() {
        let _ = writeln!(out, "No significant changes");
    }
    for c in &report.contributors {
        let _ = writeln!(out, "{}: {}", c.component, format_signed_mb(c.delta));
    }

    let _ = writeln!(out, "\nSlab Cache Growth Analysis:");
    rule(&mut out, '-', 40);
    if report.slab_cache_changes.is_empty() {
        let _ = writeln!(out, "No significant slab cache changes");
    }
    for diff in &report.slab_cache_changes {
        let _ = writeln!(out, "{}: {}", diff.name, format_signed_mb(diff.delta));
    }

    let _ = writeln!(out, "\nProcesses with Mlocked Memory:");
    rule(&mut out, '-', 40);
    for p in &report.mlocked_processes {
        let _ = writeln!(
            out,
            "PID {} ({}): Max={:.1}MB, Avg={:.1}MB",
            p.pid,
            p.name,
            p.max_mb(),
            p.mean_mb()
        );
    }

    let _ = writeln!(out, "\nOverall Memory Usage Trend:");
    rule(&mut out, '-', 30);
    for entry in &report.timeline {
        if let Some(percent) = entry.memory_percent {
            let _ = writeln!(out, "{}: {percent:.1}%", entry.timestamp.format("%H:%M:%S"));
        }
    }

    let _ = writeln!(out, "\nPotential Memory Leaks (increasing memory usage):");
    rule(&mut out, '-', 50);
    for trend in report.leak_candidates() {
        let _ = writeln!(
            out,
            "PID {}: {} - Memory increased by {:.1}%",
            trend.pid, trend.name, trend.increase
        );
    }

    if let Some(stats) = report.memory_percent {
        let _ = writeln!(out, "\nSystem Memory Statistics:");
        rule(&mut out, '-', 30);
        let _ = writeln!(out, "Average usage: {:.1}%", stats.mean);
        let _ = writeln!(out, "Peak usage: {:.1}%", stats.peak);
        let _ = writeln!(out, "Minimum usage: {:.1}%", stats.min);
    }

    let _ = writeln!(out, "\nDIAGNOSTIC RECOMMENDATIONS:");
    rule(&mut out, '=', 40);
    if report.diagnosis.significant_growth {
        let _ = writeln!(out, "SIGNIFICANT UNEVICTABLE MEMORY GROWTH DETECTED!\n");
        for rec in &report.diagnosis.recommendations {
            let _ = writeln!(out, "* {}", rec.title);
            for action in &rec.actions {
                let _ = writeln!(out, "  - {action}");
            }
            let _ = writeln!(out);
        }
    } else {
        let _ = writeln!(out, "No significant unevictable memory growth.\n");
    }

    let _ = writeln!(out, "Additional Investigation Commands:");
    for cmd in FOLLOW_UP_COMMANDS {
        let _ = writeln!(out, "* {cmd}");
    }

    out
}

const CHECKLIST: &[(&str, &[&str])] = &[
    (
        "Check for processes with high mlocked memory",
        &["grep -H VmLck /proc/*/status | grep -v '0 kB' | sort -k2 -n"],
    ),
    (
        "Examine slab allocator usage",
        &["sudo cat /proc/slabinfo | sort -k3 -nr | head -20"],
    ),
    (
        "Check for memory fragmentation",
        &["cat /proc/buddyinfo", "cat /proc/pagetypeinfo"],
    ),
    (
        "Look for kernel memory leaks",
        &["dmesg | grep -i 'memory\\|oom\\|alloc'"],
    ),
    (
        "Check transparent hugepages settings",
        &[
            "cat /sys/kernel/mm/transparent_hugepage/enabled",
            "cat /sys/kernel/mm/transparent_hugepage/defrag",
        ],
    ),
    (
        "Examine per-process memory locks",
        &[
            "for pid in $(ps -eo pid --no-headers); do",
            "  echo \"PID $pid:\"; grep -E '(VmLck|VmPin)' /proc/$pid/status 2>/dev/null",
            "done | grep -B1 -A1 -v '0 kB'",
        ],
    ),
    (
        "Check for NUMA-related issues",
        &["numactl --hardware", "cat /proc/zoneinfo | grep -A5 unevictable"],
    ),
    (
        "Monitor real-time applications",
        &["ps -eo pid,comm,pri,ni,rtprio,sched | grep -v '-'"],
    ),
];

const COMMON_CAUSES: &[(&str, &[&str])] = &[
    (
        "Real-time applications using mlock()",
        &[
            "Audio/video processing software",
            "Real-time databases",
            "High-frequency trading applications",
        ],
    ),
    (
        "Kernel module memory leaks",
        &[
            "Network drivers",
            "Graphics drivers (especially proprietary)",
            "Filesystem modules",
        ],
    ),
    (
        "Slab allocator issues",
        &[
            "Dentries and inodes accumulation",
            "Network buffer leaks",
            "Security module allocations",
        ],
    ),
    (
        "Memory fragmentation",
        &[
            "Long-running systems",
            "Applications with irregular allocation patterns",
            "Insufficient memory compaction",
        ],
    ),
];

/// One paragraph printed when the live chart exits.
pub fn session_summary(report: &Report) -> String {
    let mut out = format!("Collected {} data points", report.snapshot_count);
    if let (Some(start), Some(end)) = (report.started_at, report.ended_at) {
        let _ = write!(out, " over {}", format_duration(end - start));
    }
    out.push('.');

    match report.growth.unevictable {
        Some(g) => {
            let _ = write!(
                out,
                " Unevictable memory went from {} to {} ({})",
                format_mb(g.first),
                format_mb(g.last),
                format_signed_mb(g.delta)
            );
            if let Some(rate) = g.rate_percent {
                let _ = write!(out, ", {rate:+.1}%");
            }
            out.push('.');
        }
        None => out.push_str(" Not enough unevictable samples to measure growth."),
    }

    if let Some(top) = report.contributors.first() {
        let _ = write!(
            out,
            " Largest contributor: {} ({}).",
            top.component,
            format_signed_mb(top.delta)
        );
    }
    if report.diagnosis.significant_growth {
        let titles: Vec<&str> = report
            .diagnosis
            .recommendations
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        let _ = write!(out, " Significant growth detected");
        if !titles.is_empty() {
            let _ = write!(out, ": {}", titles.join("; "));
        }
        out.push('.');
    }
    out
}

/// `unevictable_diagnostic.txt`: the latest breakdown plus a checklist.
pub fn unevictable_diagnostic(report: &Report, latest: Option<&Snapshot>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "UNEVICTABLE MEMORY DIAGNOSTIC REPORT");
    rule(&mut out, '=', 50);
    let _ = writeln!(out);

    if let Some(breakdown) = &report.current_breakdown {
        let _ = writeln!(out, "Current Unevictable Memory Breakdown:");
        rule(&mut out, '-', 40);
        let _ = writeln!(out, "Total Unevictable: {}", format_mb(breakdown.total_unevictable));
        let last = breakdown.components.len().saturating_sub(1);
        for (i, share) in breakdown.components.iter().enumerate() {
            let branch = if i == last { "\u{2514}\u{2500}" } else { "\u{251c}\u{2500}" };
            let pct = share
                .share_percent
                .map(|p| format!(" ({p:.1}%)"))
                .unwrap_or_default();
            let _ = writeln!(out, "{branch} {}: {}{pct}", share.component, format_mb(share.bytes));
        }
        let _ = writeln!(out);

        if let (Some(unreclaimable), Some(reclaimable)) =
            (breakdown.slab_unreclaimable, breakdown.slab_reclaimable)
        {
            let _ = writeln!(out, "Related Slab Memory:");
            rule(&mut out, '-', 20);
            let _ = writeln!(out, "Unreclaimable Slab: {}", format_mb(unreclaimable));
            let _ = writeln!(out, "Reclaimable Slab: {}", format_mb(reclaimable));
            let _ = writeln!(out);
        }
    } else {
        let _ = writeln!(out, "No unevictable breakdown available.\n");
    }

    let caches = latest
        .and_then(|s| s.slab.available())
        .and_then(|slab| slab.top_slab_caches.available());
    if let Some(caches) = caches {
        let _ = writeln!(out, "Top {TOP_SLAB_CACHES} Slab Caches (by size):");
        rule(&mut out, '-', 30);
        for (i, cache) in caches.iter().take(TOP_SLAB_CACHES).enumerate() {
            let _ = writeln!(
                out,
                "{:2}. {:<25} {:>11} ({:>8} objects)",
                i + 1,
                truncate_unicode(&cache.name, 25),
                format_mb(cache.total_size_bytes),
                cache.total_objects
            );
        }
        let _ = writeln!(out);
    }

    let mut mlocked: Vec<_> = latest
        .and_then(|s| s.unevictable.available())
        .map(|u| u.processes_with_mlocked.iter().collect())
        .unwrap_or_default();
    if !mlocked.is_empty() {
        mlocked.sort_by(|a, b| b.mlocked_bytes.cmp(&a.mlocked_bytes));
        let _ = writeln!(out, "Processes with Mlocked Memory:");
        rule(&mut out, '-', 35);
        for p in mlocked.iter().take(TOP_MLOCKED) {
            let _ = writeln!(
                out,
                "PID {:>6} ({:<20}): {:>11}",
                p.pid,
                truncate_unicode(&p.name, 20),
                format_mb(p.mlocked_bytes)
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "DIAGNOSTIC CHECKLIST:");
    rule(&mut out, '=', 30);
    for (title, commands) in CHECKLIST {
        let _ = writeln!(out, "[ ] {title}:");
        for cmd in *commands {
            let _ = writeln!(out, "  {cmd}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "COMMON CAUSES OF UNEVICTABLE MEMORY GROWTH:");
    rule(&mut out, '=', 50);
    for (i, (cause, examples)) in COMMON_CAUSES.iter().enumerate() {
        let _ = writeln!(out, "{}. {cause}", i + 1);
        for example in *examples {
            let _ = writeln!(out, "   - {example}");
        }
        let _ = writeln!(out);
    }

    out
}
