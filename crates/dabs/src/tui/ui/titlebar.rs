//! Title bar widget

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::tui::config;

/// Render the title bar
pub fn render(frame: &mut Frame, area: Rect) {
    let version = env!("CARGO_PKG_VERSION");
    let title = Line::from(vec![
        Span::raw(format!(
            "Dependency Abstractor {version} ~ Use the arrow keys to navigate, press "
        )),
        Span::styled("h", config::key_style()),
        Span::raw(" for help"),
    ]);

    let paragraph = Paragraph::new(title).style(config::title_style());
    frame.render_widget(paragraph, area);
}
