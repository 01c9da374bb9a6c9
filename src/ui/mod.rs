pub mod header;
pub mod process_table;
pub mod statusbar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::App;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header::HEIGHT),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    header::render(frame, chunks[0], &app.snapshot);

    // Header row and borders take three lines.
    app.page_size = usize::from(chunks[1].height.saturating_sub(3)).max(1);
    process_table::render(frame, chunks[1], app.visible_processes(), app.scroll);

    statusbar::render(
        frame,
        chunks[2],
        app.collector.convention(),
        app.status_message.as_ref(),
    );
}
