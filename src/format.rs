use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const HOUR: u64 = 3600;
const MINUTE: u64 = 60;

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// `HH:MM:SS`; hours keep growing past 99.
pub fn elapsed_time(seconds: u64) -> String {
    let hours = seconds / HOUR;
    let minutes = (seconds % HOUR) / MINUTE;
    let secs = seconds % MINUTE;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// A utilization fraction as a percentage with one decimal.
pub fn percent(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}
