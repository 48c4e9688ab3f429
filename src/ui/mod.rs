pub mod charts;
pub mod input;
pub mod renderers;
pub mod terminal;
pub mod utils;

use std::io;

use ratatui::{Terminal, backend::CrosstermBackend};

use crate::types::{App, AppMode};

pub use input::handle_key_event;
pub use terminal::{restore_terminal, run_then_restore, setup_terminal};

/// Draw the current mode
pub fn render_ui(
    app: &App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), io::Error> {
    terminal.draw(|f| match app.mode {
        AppMode::Results => renderers::results::render(f, app),
        AppMode::Settings => renderers::settings::render(f, app),
    })?;
    Ok(())
}
