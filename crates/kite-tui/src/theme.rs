use ratatui::style::{Color, Modifier, Style};

pub const TITLE_COLOR: Color = Color::LightCyan;
pub const BORDER_COLOR: Color = Color::Gray;
pub const FOOTER_TEXT_COLOR: Color = Color::DarkGray;
pub const INFO_TEXT_COLOR: Color = Color::Rgb(119, 136, 153);
pub const ERROR_TEXT_COLOR: Color = Color::Red;
pub const PROMPT_TEXT_COLOR: Color = Color::LightGreen;
pub const LOGGER_TEXT_COLOR: Color = Color::Green;
pub const TERMINAL_FOOTER_COLOR: Color = Color::Green;
pub const TERMINAL_ESCAPE_COLOR: Color = Color::Rgb(0, 100, 0);

pub const TITLE_STYLE: Style = Style::new().fg(TITLE_COLOR).add_modifier(Modifier::BOLD);
pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);
pub const CURSOR_STYLE: Style = Style::new().add_modifier(Modifier::REVERSED);
/// Marked rows stay distinguishable without color: bold, underlined and a `[x]` marker.
pub const MARKED_STYLE: Style = Style::new()
    .fg(Color::LightGreen)
    .add_modifier(Modifier::BOLD)
    .add_modifier(Modifier::UNDERLINED);
pub const ACTIVE_TAB_STYLE: Style = Style::new()
    .fg(Color::Black)
    .bg(TERMINAL_FOOTER_COLOR)
    .add_modifier(Modifier::BOLD);

pub mod icons {
    pub const MARKED: &str = "[x]";
    pub const UNMARKED: &str = "[ ]";
    pub const CURSOR: &str = ">> ";
}

pub fn severity_color(severity: &str) -> Color {
    match severity.to_lowercase().as_str() {
        "critical" | "high" => Color::Red,
        "error" => Color::LightRed,
        "warning" | "medium" => Color::Yellow,
        "info" | "low" => Color::Cyan,
        _ => Color::Reset,
    }
}

pub fn status_color(status: &str) -> Color {
    match status.to_lowercase().as_str() {
        "triggered" => Color::LightRed,
        "acknowledged" => Color::Yellow,
        "resolved" => Color::Green,
        _ => Color::Reset,
    }
}
