//! TUI styles

use ratatui::style::{Modifier, Style};

/// Title bar style
pub fn title_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

/// Key names in the title bar and the help popup
pub fn key_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Selected row style
pub fn selected_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

/// Help popup border style
pub fn border_style() -> Style {
    Style::default()
}
