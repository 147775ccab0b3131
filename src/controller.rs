//! Terminal session and main loop.
//!
//! [`run_app`] puts the terminal in raw mode on the alternate screen and
//! drives an [`App`] until the user quits. The loop itself is generic over
//! the ratatui backend so it can be stepped against a test backend.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::event::{apply_action, handle_event, poll_event, Action};
use crate::session::Session;
use crate::state::AppState;
use crate::ui::{calculate_visible_dimensions, render};

/// How long one poll waits for input before redrawing.
const TICK_RATE: Duration = Duration::from_millis(50);

/// Raw mode and alternate screen, restored when dropped.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

/// The explorer bound to a terminal.
pub struct App<B: Backend> {
    terminal: Terminal<B>,
    state: AppState,
}

impl<B: Backend> App<B> {
    /// Wraps `terminal` and sizes the panes to it.
    pub fn new(terminal: Terminal<B>, state: AppState) -> Result<Self> {
        let mut app = Self { terminal, state };
        app.fit_panes()?;
        Ok(app)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn draw(&mut self) -> Result<()> {
        let state = &self.state;
        self.terminal.draw(|frame| render(frame, state))?;
        Ok(())
    }

    /// Applies one terminal event. Returns `false` once the user quit.
    pub fn step(&mut self, event: Event) -> Result<bool> {
        let action = handle_event(event, &self.state.mode, self.state.overlay.is_some());
        if let Action::Resize(width, height) = action {
            log::debug!("Terminal resized to {}x{}", width, height);
            self.terminal.autoresize()?;
            self.fit_panes()?;
        }
        Ok(apply_action(&mut self.state, action))
    }

    /// Draws and handles events until the user quits.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.draw()?;
            if let Some(event) = poll_event(TICK_RATE) {
                if !self.step(event)? {
                    break;
                }
            }
        }
        log::info!("Leaving {}", self.state.session.dataset_name());
        Ok(())
    }

    fn fit_panes(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        self.state
            .update_viewport_size(calculate_visible_dimensions(size.height));
        Ok(())
    }
}

/// Runs the explorer on `session` in the current terminal.
pub fn run_app(session: Session) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut app = App::new(terminal, AppState::new(session))?;
    app.run()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use tempfile::tempdir;

    use super::*;
    use crate::formats::DatasetPaths;
    use crate::session::SessionConfig;

    fn press(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_steps_until_quit() {
        let dir = tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path().join("run1"));
        fs::create_dir_all(paths.gene_table().parent().unwrap()).unwrap();
        fs::write(
            paths.gene_table(),
            "g_name,c_name,fasta_header,bh_evalue,plot_label\ng1,c1,p1,1e-30,A\ng2,c1,p2,1e-20,B\n",
        )
        .unwrap();
        let session = Session::open(dir.path(), None, SessionConfig::default()).unwrap();

        let terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut app = App::new(terminal, AppState::new(session)).unwrap();
        assert_eq!(app.state().plot.visible_rows, 16);

        assert!(app.step(press('a')).unwrap());
        assert!(app.step(press('j')).unwrap());
        assert!(app
            .step(Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
            .unwrap());
        assert_eq!(app.state().session.selection().to_tokens(), vec!["g2"]);
        app.draw().unwrap();

        assert!(app.step(press(':')).unwrap());
        assert!(app.step(press('q')).unwrap());
        assert!(!app
            .step(Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
            .unwrap());
    }
}
