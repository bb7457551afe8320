use chrono::{Local, TimeZone};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::analysis::Metric;
use crate::app::ResolvedKeybinds;
use crate::chart::ChartPoint;
use crate::config::KeybindsConfig;
use crate::format::BYTES_PER_MB;
use crate::system::SnapshotStore;
use crate::system::process::MlockedProcess;
use crate::system::snapshot::{
    Sample, SlabMemory, Snapshot, SystemMemory, UnevictableMemory, Unavailable,
};
use crate::ui::theme::Theme;
use crate::ui::{chart_panel, header, help, sidebar, statusbar};

fn buffer_to_string(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            let cell = buf.cell((x, y)).unwrap();
            out.push_str(cell.symbol());
        }
        if y + 1 < area.height {
            out.push('\n');
        }
    }
    out
}

fn render_to_string<F>(width: u16, height: u16, draw: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer();
    buffer_to_string(buf)
}

const MB: u64 = 1024 * 1024;

fn make_snapshot(secs: i64, unevictable_mb: u64) -> Snapshot {
    let ts = Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
    let mut snap = Snapshot::empty(ts);
    snap.system_memory = Sample::Available(SystemMemory {
        total: 8192 * MB,
        available: 4096 * MB,
        used: 4096 * MB,
        percent: 50.0,
        ..Default::default()
    });
    snap.unevictable = Sample::Available(UnevictableMemory {
        total_unevictable: unevictable_mb * MB,
        mlocked_pages: unevictable_mb * MB / 2,
        page_tables: 10 * MB,
        processes_with_mlocked: vec![
            MlockedProcess {
                pid: 42,
                name: "pinned-db".to_string(),
                mlocked_bytes: 64 * MB,
            },
            MlockedProcess {
                pid: 7,
                name: "agent".to_string(),
                mlocked_bytes: 2 * MB,
            },
        ],
        ..Default::default()
    });
    snap.slab = Sample::Available(SlabMemory {
        total_slab: 300 * MB,
        slab_reclaimable: 200 * MB,
        slab_unreclaimable: 100 * MB,
        top_slab_caches: Sample::Unavailable(Unavailable::NotRequested),
    });
    snap
}

fn make_store() -> SnapshotStore {
    [make_snapshot(0, 100), make_snapshot(60, 150), make_snapshot(120, 180)]
        .into_iter()
        .collect()
}

#[test]
fn header_shows_branding_and_ram() {
    let theme = Theme::dark();
    let snap = make_snapshot(0, 100);
    let info = header::HeaderInfo {
        metric: Metric::Unevictable,
        points: 3,
        capacity: Some(120),
        system_memory: Some(&snap.system_memory),
    };
    let output = render_to_string(100, 3, |frame| {
        header::render(frame, Rect::new(0, 0, 100, 3), &info, &theme);
    });

    assert!(output.contains("memtrend"));
    assert!(output.contains("Points: 3/120"));
    assert!(output.contains("4096/8192 MB (50.0%)"));
}

#[test]
fn header_reports_unavailable_reason() {
    let theme = Theme::dark();
    let sample: Sample<SystemMemory> = Sample::Unavailable(Unavailable::PermissionDenied);
    let info = header::HeaderInfo {
        metric: Metric::PageTables,
        points: 0,
        capacity: None,
        system_memory: Some(&sample),
    };
    let output = render_to_string(100, 3, |frame| {
        header::render(frame, Rect::new(0, 0, 100, 3), &info, &theme);
    });

    assert!(output.contains("Points: 0"));
    assert!(output.contains(&Unavailable::PermissionDenied.to_string()));
}

#[test]
fn statusbar_lists_keybind_pills() {
    let theme = Theme::dark();
    let keybinds = ResolvedKeybinds::from_config(&KeybindsConfig::default());
    let output = render_to_string(80, 1, |frame| {
        statusbar::render(frame, Rect::new(0, 0, 80, 1), &keybinds, None, &theme);
    });

    for label in ["Quit", "Metric", "Collect", "Help"] {
        assert!(output.contains(label), "missing {label} in {output:?}");
    }
}

#[test]
fn statusbar_prefers_status_message() {
    let theme = Theme::dark();
    let keybinds = ResolvedKeybinds::from_config(&KeybindsConfig::default());
    let message = ("Charting Mlocked".to_string(), std::time::Instant::now());
    let output = render_to_string(80, 1, |frame| {
        statusbar::render(frame, Rect::new(0, 0, 80, 1), &keybinds, Some(&message), &theme);
    });

    assert!(output.contains("Charting Mlocked"));
    assert!(!output.contains("Quit"));
}

#[test]
fn chart_panel_draws_series() {
    let theme = Theme::dark();
    let store = make_store();
    let points: Vec<ChartPoint> = Metric::Unevictable.series(store.iter());
    let output = render_to_string(60, 14, |frame| {
        chart_panel::render(frame, Rect::new(0, 0, 60, 14), Metric::Unevictable, &points, &theme);
    });

    assert!(output.contains("100.0 \u{2013} 180.0"));
    assert!(output.contains('\u{25cf}'));
    assert!(output.contains('\u{2514}'));
}

#[test]
fn chart_panel_waits_for_second_point() {
    let theme = Theme::dark();
    let points = vec![ChartPoint {
        timestamp: make_snapshot(0, 100).timestamp,
        value: 100.0,
    }];
    let output = render_to_string(60, 10, |frame| {
        chart_panel::render(frame, Rect::new(0, 0, 60, 10), Metric::Mlocked, &points, &theme);
    });

    assert!(output.contains("Collecting data... (1 of 2 points)"));
}

#[test]
fn sidebar_shows_stats_breakdown_and_mlocked() {
    let theme = Theme::dark();
    let store = make_store();
    let output = render_to_string(40, 40, |frame| {
        sidebar::render(frame, Rect::new(0, 0, 40, 40), &store, &theme);
    });

    assert!(output.contains("Data points"));
    assert!(output.contains("2m 00s"));
    assert!(output.contains(&format!("{:+.1} MB", (80 * MB) as f64 / BYTES_PER_MB)));
    assert!(output.contains("Mlocked"));
    assert!(output.contains("pinned-db"));
    assert!(output.contains("Unreclaimable"));
}

#[test]
fn sidebar_handles_empty_history() {
    let theme = Theme::dark();
    let store = SnapshotStore::with_capacity(4);
    let output = render_to_string(40, 30, |frame| {
        sidebar::render(frame, Rect::new(0, 0, 40, 30), &store, &theme);
    });

    assert!(output.contains("n/a"));
    assert!(output.contains("unavailable"));
}

#[test]
fn help_overlay_lists_metrics() {
    let theme = Theme::dark();
    let keybinds = ResolvedKeybinds::from_config(&KeybindsConfig::default());
    let output = render_to_string(80, 30, |frame| {
        help::render(frame, Rect::new(0, 0, 80, 30), &keybinds.help_entries(), &theme);
    });

    assert!(output.contains("Cycle charted metric"));
    assert!(output.contains(Metric::SlabUnreclaimable.label()));
}
