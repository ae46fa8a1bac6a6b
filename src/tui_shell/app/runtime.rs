use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::{App, event_loop};

/// Owns raw mode and the alternate screen; dropping it hands the terminal
/// back, whether the shell quits, fails or panics.
struct RawTerminal;

impl RawTerminal {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let guard = RawTerminal;
        execute!(io::stdout(), EnterAlternateScreen).context("enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

pub(in crate::tui_shell) fn run(opts: crate::tui::TuiRunOptions) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("TUI requires an interactive terminal (TTY)");
    }

    // The first refresh is queued before the screen changes, so a broken
    // runtime or repository reports on a normal terminal.
    let mut app = App::load(opts)?;
    tracing::info!(root = %app.root.display(), "starting shell");

    let _raw = RawTerminal::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout())).context("create terminal")?;
    terminal.clear().context("clear terminal")?;

    let res = event_loop::run_loop(&mut terminal, &mut app);
    tracing::info!(ok = res.is_ok(), "shell stopped");
    res
}
