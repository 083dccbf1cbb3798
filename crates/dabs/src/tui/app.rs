//! Application state and logic

use color_eyre::Result;
use dabs_core::PackageCollection;
use dabs_render::{BarRow, Legend, OutputConfig, bar_chart, details};
use ratatui::text::Line;
use tracing::debug;

use crate::tui::action::Action;

/// Columns the details view moves per Left/Right
pub const SHIFT_STEP: usize = 20;

/// Details listing of one package
#[derive(Debug, Clone)]
pub struct DetailsView {
    /// Package identifier
    pub id: String,
    /// Rendered listing
    pub lines: Vec<Line<'static>>,
    /// First visible line
    pub scroll: usize,
    /// First visible column
    pub shift: usize,
    /// Width of the widest line
    width: usize,
}

impl DetailsView {
    fn new(id: String, lines: Vec<Line<'static>>) -> Self {
        let width = lines.iter().map(Line::width).max().unwrap_or(0);
        Self {
            id,
            lines,
            scroll: 0,
            shift: 0,
            width,
        }
    }

    fn max_scroll(&self, page: usize) -> usize {
        self.lines.len().saturating_sub(page)
    }
}

/// Application state
pub struct App {
    /// Packages being browsed
    collection: PackageCollection,
    /// Renderer settings
    output: OutputConfig,
    /// Should quit
    should_quit: bool,
    /// Bar chart rows, largest package first
    pub rows: Vec<BarRow>,
    /// Bar chart legend
    pub legend: Legend,
    /// Selected row index
    pub selected: usize,
    /// First visible row
    pub offset: usize,
    /// Open details view
    pub details: Option<DetailsView>,
    /// Show help popup
    pub show_help: bool,
    /// Body width in columns
    width: usize,
    /// Body height in rows
    page: usize,
}

impl App {
    /// Create a new application
    pub fn new(collection: PackageCollection, legend: Legend, output: OutputConfig) -> Self {
        let chart = bar_chart(&collection, legend, &output);
        Self {
            collection,
            output,
            should_quit: false,
            rows: chart.rows,
            legend,
            selected: 0,
            offset: 0,
            details: None,
            show_help: false,
            width: 0,
            page: 1,
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Record the size of the area below the title bar
    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.width = usize::from(width);
        self.page = usize::from(height).max(1);
        if self.selected >= self.offset + self.page {
            self.offset = self.selected + 1 - self.page;
        }
    }

    /// Get the currently selected package identifier
    pub fn selected_id(&self) -> Option<&str> {
        self.rows.get(self.selected).map(|row| row.id.as_str())
    }

    /// Handle an action
    ///
    /// While the help popup is shown, any key closes it; keys other than
    /// `h` then take effect as usual.
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        if self.show_help && !matches!(action, Action::Render | Action::None) {
            self.show_help = false;
            if action == Action::Help {
                return Ok(());
            }
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Help => {
                self.show_help = true;
            }
            Action::Toggle => {
                self.toggle_details()?;
            }
            Action::Render | Action::None => {}
            _ if self.details.is_some() => self.scroll_details(action),
            _ => self.move_selection(action),
        }
        Ok(())
    }

    fn toggle_details(&mut self) -> Result<()> {
        if let Some(view) = self.details.take() {
            debug!("closing details of {}", view.id);
            return Ok(());
        }
        let Some(id) = self.selected_id().map(str::to_string) else {
            return Ok(());
        };
        debug!("opening details of {id}");
        let lines = details(&self.collection, &id, &self.output)?;
        self.details = Some(DetailsView::new(id, lines));
        Ok(())
    }

    fn scroll_details(&mut self, action: Action) {
        let (page, width) = (self.page, self.width);
        let Some(view) = self.details.as_mut() else {
            return;
        };
        let max_scroll = view.max_scroll(page);
        match action {
            Action::Up => view.scroll = view.scroll.saturating_sub(1),
            Action::Down => view.scroll = (view.scroll + 1).min(max_scroll),
            Action::PageUp => view.scroll = view.scroll.saturating_sub(page),
            Action::PageDown => view.scroll = (view.scroll + page).min(max_scroll),
            Action::Left => view.shift = view.shift.saturating_sub(SHIFT_STEP),
            Action::Right => {
                if view.shift + width < view.width {
                    view.shift += SHIFT_STEP;
                }
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, action: Action) {
        let last = self.rows.len().saturating_sub(1);
        let page = self.page;
        match action {
            Action::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            Action::Down => {
                self.selected = (self.selected + 1).min(last);
            }
            Action::PageUp => {
                // First jump to the top of the view, then a page further
                if self.selected == self.offset {
                    self.selected = self.selected.saturating_sub(page);
                } else {
                    self.selected = self.offset;
                }
            }
            Action::PageDown => {
                let bottom = self.offset + page - 1;
                if self.selected == bottom {
                    self.selected = (self.selected + page).min(last);
                } else {
                    self.selected = bottom.min(last);
                }
            }
            _ => {}
        }

        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + page {
            self.offset = self.selected + 1 - page;
        }
    }
}
