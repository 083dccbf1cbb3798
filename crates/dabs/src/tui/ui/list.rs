//! Bar chart list widget

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::config;

/// Render the visible bar chart rows with the selection highlighted
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .rows
        .iter()
        .enumerate()
        .skip(app.offset)
        .take(usize::from(area.height))
        .map(|(i, row)| {
            if i == app.selected {
                row.line.clone().patch_style(config::selected_style())
            } else {
                row.line.clone()
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}
