//! User actions for the package browser

/// Actions that can be performed in the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application
    Quit,
    /// Redraw after a resize
    Render,
    /// Move the selection or scroll up
    Up,
    /// Move the selection or scroll down
    Down,
    /// One page up
    PageUp,
    /// One page down
    PageDown,
    /// Shift the details view left
    Left,
    /// Shift the details view right
    Right,
    /// Open or close the details of the selected package
    Toggle,
    /// Show help popup
    Help,
    /// No operation
    None,
}
