//! Help popup widget

use dabs_render::styles::{self, BAR_CHAR};
use dabs_render::wrap;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::App;
use crate::tui::config;

const POPUP_WIDTH: u16 = 60;
const LEGEND_WIDTH: usize = 50;

const KEYS: [(&str, &str); 3] = [
    ("enter/space", "toggle details"),
    ("h", "help"),
    ("q", "quit"),
];

/// Key bindings followed by the bar chart legend
fn help_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];
    for (key, description) in KEYS {
        lines.push(Line::from(vec![
            Span::styled(format!("  {key:>11}"), config::key_style()),
            Span::raw(format!("  {description}")),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::default());

    let segment_styles = [styles::installed(), styles::requires(), styles::complements()];
    for (text, style) in app.legend.texts().into_iter().zip(segment_styles) {
        for (i, part) in wrap(text, LEGEND_WIDTH).into_iter().enumerate() {
            let line = if i == 0 {
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(BAR_CHAR, style),
                    Span::raw(format!(" {part}")),
                ])
            } else {
                Line::from(format!("    {part}"))
            };
            lines.push(line);
        }
    }
    lines
}

/// Render the help popup
pub fn render(frame: &mut Frame, app: &App) {
    let lines = help_lines(app);

    // Calculate popup area (centered)
    let area = frame.area();
    let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
    let popup_width = POPUP_WIDTH.min(area.width);
    let popup_height = height.min(area.height.saturating_sub(1));
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(config::border_style()),
    );

    frame.render_widget(paragraph, popup_area);
}
