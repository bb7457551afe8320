use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::analysis::Metric;
use crate::chart::{self, ChartError, ChartPoint};
use crate::ui::theme::Theme;

/// Rows under the plot: the axis and the time line.
const FOOTER_ROWS: u16 = 2;

pub fn render(frame: &mut Frame, area: Rect, metric: Metric, points: &[ChartPoint], theme: &Theme) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let plot_height = area.height.saturating_sub(2 + FOOTER_ROWS) as usize;

    let result = chart::render(points, inner_width, plot_height);
    let title = match &result {
        Ok(grid) => format!(
            " {} ({}) {:.1} \u{2013} {:.1} ",
            metric.label(),
            metric.unit(),
            grid.min,
            grid.max
        ),
        Err(_) => format!(" {} ({}) ", metric.label(), metric.unit()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            title,
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ));

    let paragraph = match result {
        Ok(grid) => {
            let plot_style = Style::default().fg(theme.chart_line);
            let axis_style = Style::default().fg(theme.text_secondary);
            let mut lines: Vec<Line> = grid
                .rows
                .iter()
                .map(|row| {
                    let split = row
                        .char_indices()
                        .nth(grid.label_width)
                        .map(|(idx, _)| idx)
                        .unwrap_or(row.len());
                    let (label, plot) = row.split_at(split);
                    Line::from(vec![
                        Span::styled(label.to_string(), axis_style),
                        Span::styled(plot.to_string(), plot_style),
                    ])
                })
                .collect();
            lines.push(Line::styled(grid.axis.clone(), axis_style));
            lines.push(Line::styled(grid.time_axis.clone(), axis_style));
            Paragraph::new(lines)
        }
        Err(err) => {
            let message = match err {
                ChartError::InsufficientData { points } => {
                    format!("Collecting data... ({points} of 2 points)")
                }
                ChartError::TooSmall { .. } => "Terminal too small for chart".to_string(),
            };
            Paragraph::new(Span::styled(
                message,
                Style::default().fg(theme.text_secondary),
            ))
        }
    };

    frame.render_widget(paragraph.block(block), area);
}
