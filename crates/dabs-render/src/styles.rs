//! Text styles shared by the bar chart, the details listing and the TUI

use ratatui::style::{Color, Modifier, Style};

/// Bar segment character
pub const BAR_CHAR: &str = "━";

/// Unfilled part of a details size bar
pub const BAR_GAP_CHAR: &str = "╴";

/// Installed size
pub fn installed() -> Style {
    Style::default().fg(Color::Yellow)
}

/// Recursive requirements
pub fn requires() -> Style {
    Style::default().fg(Color::Cyan)
}

/// Recursive complements
pub fn complements() -> Style {
    Style::default().fg(Color::Green)
}

/// Zero or missing values
pub fn off() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// De-emphasised variant of a style
pub fn low(style: Style) -> Style {
    style.add_modifier(Modifier::DIM)
}

/// Emphasised variant of a style
pub fn high(style: Style) -> Style {
    style.add_modifier(Modifier::BOLD)
}

/// Dimmed text without a colour
pub fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}
