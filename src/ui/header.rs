use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};

use crate::format::elapsed_time;
use crate::system::snapshot::SystemSnapshot;

pub const HEIGHT: u16 = 6;

const BORDER: Color = Color::DarkGray;
const LABEL: Color = Color::Gray;
const ACCENT: Color = Color::Cyan;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &SystemSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    render_system_info(frame, chunks[0], snapshot);

    let cpu_label = format!("{:.1}%", snapshot.cpu_utilization * 100.0);
    render_gauge(frame, chunks[1], " CPU ", snapshot.cpu_utilization, cpu_label);

    let memory_label = match snapshot.memory {
        Some(memory) => format!(
            "{:.1}% of {} MB",
            snapshot.memory_utilization * 100.0,
            memory.total_kb / 1000
        ),
        None => "n/a".to_string(),
    };
    render_gauge(
        frame,
        chunks[2],
        " Memory ",
        snapshot.memory_utilization,
        memory_label,
    );
}

fn render_system_info(frame: &mut Frame, area: Rect, snapshot: &SystemSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            " proctop ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        info_line("OS", display_or_unknown(&snapshot.os_name)),
        info_line("Kernel", display_or_unknown(&snapshot.kernel)),
        info_line(
            "Procs",
            format!(
                "{} total, {} running",
                snapshot.total_processes, snapshot.running_processes
            ),
        ),
        info_line("Up", elapsed_time(snapshot.uptime_seconds)),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_gauge(frame: &mut Frame, area: Rect, title: &str, ratio: f64, label: String) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(LABEL).add_modifier(Modifier::BOLD),
        ));

    // The raw ratios are not clamped at the source.
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(ACCENT).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, area);
}

fn info_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label:<7}"),
            Style::default().fg(LABEL).add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

fn display_or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}
