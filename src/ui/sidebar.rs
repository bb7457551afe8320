use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};

use crate::format::{BYTES_PER_MB, format_duration, format_mb, truncate_unicode};
use crate::system::SnapshotStore;
use crate::system::snapshot::Snapshot;
use crate::ui::theme::Theme;

const MLOCKED_ROWS: usize = 10;

fn block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.text_secondary)
                .add_modifier(Modifier::BOLD),
        ))
}

pub fn render(frame: &mut Frame, area: Rect, store: &SnapshotStore, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Min(3),
        ])
        .split(area);

    render_stats(frame, chunks[0], store, theme);
    let latest = store.last();
    render_breakdown(frame, chunks[1], latest, theme);
    render_slab(frame, chunks[2], latest, theme);
    render_mlocked(frame, chunks[3], latest, theme);
}

fn stat_line<'a>(label: &'a str, value: String, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<18}"), Style::default().fg(theme.text_secondary)),
        Span::styled(value, Style::default().fg(theme.text_primary)),
    ])
}

fn render_stats(frame: &mut Frame, area: Rect, store: &SnapshotStore, theme: &Theme) {
    let latest = store.last();
    let system = latest.and_then(|s| s.system_memory.available());
    let unevictable = latest.and_then(|s| s.unevictable.available());

    let unevictable_pct = match (system, unevictable) {
        (Some(sys), Some(u)) if sys.total > 0 => {
            format!("{:.2}%", u.total_unevictable as f64 / sys.total as f64 * 100.0)
        }
        _ => "n/a".to_string(),
    };

    let span = match (store.first(), store.last()) {
        (Some(first), Some(last)) => format_duration(last.timestamp - first.timestamp),
        _ => "n/a".to_string(),
    };

    let first_total = store
        .iter()
        .find_map(|s| s.unevictable.available())
        .map(|u| u.total_unevictable);
    let change = match (first_total, unevictable) {
        (Some(first), Some(last)) if store.len() > 1 => {
            Some((last.total_unevictable as f64 - first as f64) / BYTES_PER_MB)
        }
        _ => None,
    };

    let mut lines = vec![
        stat_line(
            "System memory",
            system
                .map(|s| format!("{:.1}%", s.percent))
                .unwrap_or_else(|| "n/a".to_string()),
            theme,
        ),
        stat_line(
            "Unevictable",
            unevictable
                .map(|u| format_mb(u.total_unevictable))
                .unwrap_or_else(|| "n/a".to_string()),
            theme,
        ),
        stat_line("Share of RAM", unevictable_pct, theme),
        stat_line("Data points", store.len().to_string(), theme),
        stat_line("Time span", span, theme),
    ];
    lines.push(match change {
        Some(delta) => Line::from(vec![
            Span::styled(
                format!("{:<18}", "Change"),
                Style::default().fg(theme.text_secondary),
            ),
            Span::styled(
                format!("{delta:+.1} MB"),
                Style::default()
                    .fg(theme.delta_color(delta))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        None => stat_line("Change", "n/a".to_string(), theme),
    });

    frame.render_widget(
        Paragraph::new(lines).block(block(" Statistics ", theme)),
        area,
    );
}

fn header_row(cells: &[&'static str], theme: &Theme) -> Row<'static> {
    Row::new(cells.iter().copied().map(Cell::from)).style(
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_breakdown(frame: &mut Frame, area: Rect, latest: Option<&Snapshot>, theme: &Theme) {
    let Some(u) = latest.and_then(|s| s.unevictable.available()) else {
        frame.render_widget(
            Paragraph::new("unavailable").block(block(" Unevictable Breakdown ", theme)),
            area,
        );
        return;
    };

    let share = |bytes: u64| {
        if u.total_unevictable > 0 {
            format!("{:.1}%", bytes as f64 / u.total_unevictable as f64 * 100.0)
        } else {
            "-".to_string()
        }
    };
    let components = [
        ("Mlocked", u.mlocked_pages),
        ("Kernel Stack", u.kernel_stack),
        ("Page Tables", u.page_tables),
        ("NFS Unstable", u.nfs_unstable),
        ("Bounce", u.bounce),
        ("Writeback Tmp", u.writeback_tmp),
    ];
    let rows: Vec<Row> = components
        .iter()
        .map(|&(name, bytes)| {
            Row::new(vec![
                Cell::from(name),
                Cell::from(format_mb(bytes)),
                Cell::from(share(bytes)),
            ])
            .style(Style::default().fg(theme.text_primary))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(7),
        ],
    )
    .header(header_row(&["Component", "Size", "Share"], theme))
    .block(block(" Unevictable Breakdown ", theme));
    frame.render_widget(table, area);
}

fn render_slab(frame: &mut Frame, area: Rect, latest: Option<&Snapshot>, theme: &Theme) {
    let lines = match latest.and_then(|s| s.slab.available()) {
        Some(slab) => vec![
            stat_line("Total", format_mb(slab.total_slab), theme),
            stat_line("Reclaimable", format_mb(slab.slab_reclaimable), theme),
            stat_line("Unreclaimable", format_mb(slab.slab_unreclaimable), theme),
        ],
        None => vec![Line::raw("unavailable")],
    };
    frame.render_widget(Paragraph::new(lines).block(block(" Slab ", theme)), area);
}

fn render_mlocked(frame: &mut Frame, area: Rect, latest: Option<&Snapshot>, theme: &Theme) {
    let mut processes: Vec<_> = latest
        .and_then(|s| s.unevictable.available())
        .map(|u| u.processes_with_mlocked.iter().collect())
        .unwrap_or_default();
    processes.sort_by(|a, b| b.mlocked_bytes.cmp(&a.mlocked_bytes));

    let rows: Vec<Row> = processes
        .iter()
        .take(MLOCKED_ROWS)
        .map(|p| {
            Row::new(vec![
                Cell::from(p.pid.to_string()),
                Cell::from(truncate_unicode(&p.name, 16)),
                Cell::from(format_mb(p.mlocked_bytes)),
            ])
            .style(Style::default().fg(theme.text_primary))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(16),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["PID", "Name", "Mlocked"], theme))
    .block(block(" Mlocked Processes ", theme));
    frame.render_widget(table, area);
}
