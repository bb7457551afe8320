use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};

use crate::analysis::Metric;
use crate::format::BYTES_PER_MB;
use crate::system::snapshot::{Sample, SystemMemory};
use crate::ui::theme::Theme;

pub struct HeaderInfo<'a> {
    pub metric: Metric,
    pub points: usize,
    pub capacity: Option<usize>,
    pub system_memory: Option<&'a Sample<SystemMemory>>,
}

pub fn render(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_branding(frame, chunks[0], info, theme);
    render_ram_gauge(frame, chunks[1], info.system_memory, theme);
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
}

fn render_branding(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>, theme: &Theme) {
    let block = bordered(theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let points = match info.capacity {
        Some(cap) => format!("Points: {}/{cap}", info.points),
        None => format!("Points: {}", info.points),
    };

    let line = Line::from(vec![
        Span::styled(
            " memtrend ",
            Style::default()
                .fg(theme.header_accent_fg)
                .bg(theme.header_accent_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            info.metric.label(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(points, Style::default().fg(theme.text_secondary)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_ram_gauge(
    frame: &mut Frame,
    area: Rect,
    system_memory: Option<&Sample<SystemMemory>>,
    theme: &Theme,
) {
    let block = bordered(theme).title(Span::styled(
        " RAM ",
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    ));

    let Some(memory) = system_memory.and_then(Sample::available) else {
        let reason = system_memory
            .and_then(Sample::reason)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "no data yet".to_string());
        frame.render_widget(
            Paragraph::new(Span::styled(reason, Style::default().fg(theme.text_secondary)))
                .block(block),
            area,
        );
        return;
    };

    let ratio = (memory.percent / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio(ratio)
        .label(format!(
            "{:.0}/{:.0} MB ({:.1}%)",
            memory.total.saturating_sub(memory.available) as f64 / BYTES_PER_MB,
            memory.total as f64 / BYTES_PER_MB,
            memory.percent
        ));
    frame.render_widget(gauge, area);
}
