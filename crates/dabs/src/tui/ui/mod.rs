//! UI rendering modules

mod details;
mod help;
mod layout;
mod list;
mod titlebar;

use ratatui::prelude::*;

use crate::tui::app::App;

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = layout::calculate_layout(frame.area());

    titlebar::render(frame, areas.title);
    if app.details.is_some() {
        details::render(frame, app, areas.body);
    } else {
        list::render(frame, app, areas.body);
    }

    if app.show_help {
        help::render(frame, app);
    }
}
