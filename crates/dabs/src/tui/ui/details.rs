//! Details view widget

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::tui::app::App;

/// Render the open details listing at its scroll position
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.details else {
        return;
    };

    let scroll = (
        u16::try_from(view.scroll).unwrap_or(u16::MAX),
        u16::try_from(view.shift).unwrap_or(u16::MAX),
    );
    let paragraph = Paragraph::new(view.lines.clone()).scroll(scroll);
    frame.render_widget(paragraph, area);
}
