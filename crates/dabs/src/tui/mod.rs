//! Interactive package browser
//!
//! Lists the bar chart of the top-level packages; the details of the
//! selected package open in place of the list.

use std::io::{self, Stdout};
use std::time::Duration;

use color_eyre::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dabs_core::PackageCollection;
use dabs_render::{Legend, OutputConfig};
use ratatui::prelude::*;
use tracing::info;

mod action;
mod app;
mod config;
mod event;
mod ui;

use app::App;
use event::EventHandler;

/// Narrowest usable terminal
pub const MIN_WIDTH: u16 = 40;
/// Shortest usable terminal
pub const MIN_HEIGHT: u16 = 5;

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Browse the collection until the user quits
///
/// # Errors
/// Returns error if the terminal is too small or cannot be driven.
pub async fn run(
    collection: PackageCollection,
    legend: Legend,
    output: OutputConfig,
) -> Result<()> {
    let (width, height) = crossterm::terminal::size()?;
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        eyre::bail!(
            "terminal too small: {width}x{height}, at least {MIN_WIDTH}x{MIN_HEIGHT} needed"
        );
    }

    let mut app = App::new(collection, legend, output);

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Run the application main loop
async fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(POLL_TIMEOUT);
    events.start();
    info!(packages = app.rows.len(), "browser started");

    loop {
        let size = terminal.size()?;
        app.set_viewport(size.width, size.height.saturating_sub(1));
        terminal.draw(|frame| ui::render(frame, app))?;

        let Some(event) = events.next().await else {
            break;
        };
        let action = match event {
            event::Event::Key(key) => event::key_to_action(key),
            event::Event::Resize => action::Action::Render,
        };
        app.handle_action(action)?;

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
