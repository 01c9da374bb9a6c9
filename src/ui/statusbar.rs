use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::system::collector::CpuConvention;

const PILL_KEY_FG: Color = Color::Black;
const PILL_KEY_BG: Color = Color::Cyan;
const PILL_DESC_FG: Color = Color::Gray;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    convention: CpuConvention,
    status_message: Option<&(String, std::time::Instant)>,
) {
    let bg_style = Style::default().bg(Color::Black);

    // Status message takes priority
    if let Some((msg, _)) = status_message {
        let line = Line::from(Span::styled(
            format!(" {msg}"),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line).style(bg_style), area);
        return;
    }

    let mut spans = Vec::new();
    spans.extend(pill_spans("q", "Quit"));
    spans.extend(pill_spans("r", "Refresh"));
    spans.extend(pill_spans("\u{2191}\u{2193}", "Scroll"));
    spans.extend(pill_spans("PgUp/PgDn", "Page"));
    spans.push(Span::styled(
        format!("  cpu: {}", convention.label()),
        Style::default().fg(PILL_DESC_FG),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
}

fn pill_spans<'a>(key: &'a str, desc: &'a str) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(PILL_KEY_FG)
                .bg(PILL_KEY_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {desc}"), Style::default().fg(PILL_DESC_FG)),
    ]
}
