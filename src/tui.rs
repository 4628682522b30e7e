use std::io::{self, Stdout};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::warn;

use crate::error::Result;

/// Raw-mode alternate-screen terminal. Restored on `restore` or on drop,
/// whichever comes first.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse_captured: bool,
    active: bool,
}

impl Tui {
    /// Enter the alternate screen in raw mode, capturing the mouse if asked.
    pub fn new(capture_mouse: bool) -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        if capture_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            mouse_captured: capture_mouse,
            active: true,
        })
    }

    /// Give the terminal back to the shell. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        leave_terminal(self.mouse_captured)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "failed to restore terminal");
        }
    }
}

fn leave_terminal(mouse_captured: bool) -> io::Result<()> {
    let mut stdout = io::stdout();
    if mouse_captured {
        execute!(stdout, DisableMouseCapture)?;
    }
    terminal::disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)
}

/// Restore the terminal before the default hook prints the panic message.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Mouse capture may or may not be on; disabling it is harmless.
        let _ = leave_terminal(true);
        previous(info);
    }));
}
