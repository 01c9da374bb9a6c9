use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Row, Table};

use crate::format::{elapsed_time, percent, truncate_unicode};
use crate::system::process::ProcessSnapshot;

pub const COLUMNS: [&str; 6] = ["PID", "USER", "CPU[%]", "RAM[MB]", "TIME+", "COMMAND"];

const USER_WIDTH: u16 = 10;

/// One table row as text, in [`COLUMNS`] order.
pub fn row_cells(process: &ProcessSnapshot) -> [String; 6] {
    [
        process.pid().to_string(),
        truncate_unicode(process.user(), USER_WIDTH as usize),
        percent(process.cpu_utilization()),
        process.ram(),
        elapsed_time(process.uptime_seconds()),
        process.command().to_string(),
    ]
}

pub fn render(frame: &mut Frame, area: Rect, processes: &[ProcessSnapshot], scroll: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" Processes ({}) ", processes.len()),
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        ));

    let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c))).style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let rows = processes
        .iter()
        .skip(scroll)
        .map(|p| Row::new(row_cells(p).map(Cell::from)));

    let widths = [
        Constraint::Length(7),
        Constraint::Length(USER_WIDTH),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);
    frame.render_widget(table, area);
}
