pub mod chart_panel;
pub mod header;
pub mod help;
pub mod sidebar;
pub mod statusbar;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::App;

const SIDEBAR_WIDTH: u16 = 40;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let info = header::HeaderInfo {
        metric: app.metric,
        points: app.store.len(),
        capacity: app.store.capacity(),
        system_memory: app.latest().map(|s| &s.system_memory),
    };
    header::render(frame, chunks[0], &info, &app.theme);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
        .split(chunks[1]);

    chart_panel::render(frame, body[0], app.metric, &app.series(), &app.theme);
    sidebar::render(frame, body[1], &app.store, &app.theme);

    statusbar::render(
        frame,
        chunks[2],
        &app.keybinds,
        app.status_message.as_ref(),
        &app.theme,
    );

    // Help overlay last so it sits on top
    if app.show_help() {
        help::render(frame, frame.area(), &app.help_entries(), &app.theme);
    }
}

#[cfg(test)]
mod tests;
