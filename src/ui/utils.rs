use std::sync::LazyLock;

use ratatui::style::Color;
use regex::Regex;

static RGB_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[\d.]+\s*)?\)\s*$")
        .expect("static colour pattern")
});

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})\s*$")
        .expect("static colour pattern")
});

/// Colours cycled through when the server palette is short or unreadable.
pub const FALLBACK_COLORS: [Color; 8] = [
    Color::Red,
    Color::Blue,
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::LightRed,
    Color::LightGreen,
    Color::LightBlue,
];

/// Parse a CSS colour string (`rgb(..)`, `rgba(..)` or `#rrggbb`) into a terminal colour.
/// The alpha channel is dropped: terminals have no translucency.
pub fn parse_css_color(input: &str) -> Option<Color> {
    if let Some(caps) = RGB_FUNCTION.captures(input) {
        let channel = |i: usize| caps[i].parse::<u16>().ok().filter(|v| *v <= 255).map(|v| v as u8);
        return Some(Color::Rgb(channel(1)?, channel(2)?, channel(3)?));
    }
    if let Some(caps) = HEX_COLOR.captures(input) {
        let channel = |i: usize| u8::from_str_radix(&caps[i], 16).ok();
        return Some(Color::Rgb(channel(1)?, channel(2)?, channel(3)?));
    }
    None
}

/// Colour of slot `index` in `palette`, falling back to the fixed cycle.
pub fn palette_color(palette: &[String], index: usize) -> Color {
    palette
        .get(index)
        .and_then(|css| parse_css_color(css))
        .unwrap_or(FALLBACK_COLORS[index % FALLBACK_COLORS.len()])
}

/// Format a vote value: whole numbers without decimals, weighted shares with two.
pub fn format_vote_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else if max_len <= 3 {
        label.chars().take(max_len).collect()
    } else {
        let head: String = label.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
