//! Layout calculations for the TUI

use ratatui::prelude::*;

/// Layout areas for the UI
pub struct LayoutAreas {
    pub title: Rect,
    pub body: Rect,
}

/// Calculate layout areas based on terminal size
pub fn calculate_layout(area: Rect) -> LayoutAreas {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(1),    // Bar chart or details
        ])
        .split(area);

    LayoutAreas {
        title: vertical[0],
        body: vertical[1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_takes_one_row() {
        let areas = calculate_layout(Rect::new(0, 0, 80, 24));
        assert_eq!(areas.title, Rect::new(0, 0, 80, 1));
        assert_eq!(areas.body, Rect::new(0, 1, 80, 23));
    }
}
