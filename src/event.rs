//! Keyboard event handling.
//!
//! Key bindings in normal mode:
//! - `j`/`k` or arrows: move the cursor of the focused pane
//! - `PageUp`/`PageDown`, `Ctrl+U`/`Ctrl+D`: page and half page
//! - `Home`/`End`: first/last row
//! - `Tab`/`Shift+Tab`: cycle the focused pane (plot, legend, selection, hits)
//! - `Enter`: click the plot row, the selection row, or toggle the legend entry
//! - `m`: matrix click on the plot row; `M`: box-select the visible plot rows
//! - `a`/`r`/`n`: selection mode add/remove/neutral
//! - `R`: reset the selection; `A`: add visible genes; `L`: reload the save file
//! - `+`/`-` and `}`/`{`: e-value slider by 1 and by 10
//! - `c`: restrict to the contigs of the selection; `X`: hide all contigs; `C`: all contigs
//! - `/`: search a gene
//! - `?`: help
//! - `:`: enter command mode
//!   - `:q` or `:quit`: quit the application
//!   - `:h` or `:help`: show help
//!   - `:open <name|number>`, `:datasets`, `:summary`
//!   - `:evalue <n>`, `:export [col,col]`, `:fasta`
//!   - `:columns [col,col]`: selection table columns, or list them

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::model::SelectionMode;
use crate::state::{AppMode, AppState, SLIDER_FAST_STEP};

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    /// Quit the application
    Quit,
    MoveUp,
    MoveDown,
    /// Move half page up (Ctrl+U)
    HalfPageUp,
    /// Move half page down (Ctrl+D)
    HalfPageDown,
    PageUp,
    PageDown,
    GotoFirstRow,
    GotoLastRow,
    FocusNext,
    FocusPrevious,
    /// Enter on the focused pane
    Activate,
    MatrixClick,
    MatrixSelectVisible,
    SetSelectionMode(SelectionMode),
    ResetSelection,
    AddVisible,
    ReloadSession,
    /// Move the e-value slider
    Slider(i64),
    RestrictContigs,
    ClearContigs,
    AllContigs,
    /// Enter command mode
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    /// Execute current command
    ExecuteCommand,
    /// Cancel command mode
    CancelCommand,
    /// Backspace in command mode
    CommandBackspace,
    EnterSearchMode,
    SearchChar(char),
    ExecuteSearch,
    CancelSearch,
    SearchBackspace,
    ShowHelp,
    /// Dismiss the help or summary overlay
    DismissOverlay,
    /// Resize event (terminal resized)
    Resize(u16, u16),
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, overlay_shown: bool) -> Action {
    match event {
        Event::Key(key_event) => handle_key_event(key_event, mode, overlay_shown),
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

/// Handles a key event based on the current application mode.
fn handle_key_event(key: KeyEvent, mode: &AppMode, overlay_shown: bool) -> Action {
    // If an overlay is shown, any key dismisses it
    if overlay_shown {
        return Action::DismissOverlay;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
        AppMode::Search(_) => handle_search_mode(key),
    }
}

/// Handles key events in normal mode.
fn handle_normal_mode(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('u') => Action::HalfPageUp,
            KeyCode::Char('d') => Action::HalfPageDown,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Home => Action::GotoFirstRow,
        KeyCode::End => Action::GotoLastRow,
        KeyCode::Tab => Action::FocusNext,
        KeyCode::BackTab => Action::FocusPrevious,

        KeyCode::Enter => Action::Activate,
        KeyCode::Char('m') => Action::MatrixClick,
        KeyCode::Char('M') => Action::MatrixSelectVisible,

        KeyCode::Char('a') => Action::SetSelectionMode(SelectionMode::Add),
        KeyCode::Char('r') => Action::SetSelectionMode(SelectionMode::Remove),
        KeyCode::Char('n') => Action::SetSelectionMode(SelectionMode::Neutral),
        KeyCode::Char('R') => Action::ResetSelection,
        KeyCode::Char('A') => Action::AddVisible,
        KeyCode::Char('L') => Action::ReloadSession,

        KeyCode::Char('+') | KeyCode::Char('=') => Action::Slider(1),
        KeyCode::Char('-') => Action::Slider(-1),
        KeyCode::Char('}') => Action::Slider(SLIDER_FAST_STEP as i64),
        KeyCode::Char('{') => Action::Slider(-(SLIDER_FAST_STEP as i64)),

        KeyCode::Char('c') => Action::RestrictContigs,
        KeyCode::Char('X') => Action::ClearContigs,
        KeyCode::Char('C') => Action::AllContigs,

        KeyCode::Char(':') => Action::EnterCommandMode,
        KeyCode::Char('/') => Action::EnterSearchMode,
        KeyCode::Char('?') => Action::ShowHelp,

        _ => Action::None,
    }
}

/// Handles key events in command mode.
fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Handles key events in search mode.
fn handle_search_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteSearch,
        KeyCode::Esc => Action::CancelSearch,
        KeyCode::Backspace => Action::SearchBackspace,
        KeyCode::Char(c) => Action::SearchChar(c),
        _ => Action::None,
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::None => {}
        Action::Quit => state.should_quit = true,
        Action::MoveUp => state.move_cursor(-1),
        Action::MoveDown => state.move_cursor(1),
        Action::HalfPageUp => state.move_cursor(-state.half_page()),
        Action::HalfPageDown => state.move_cursor(state.half_page()),
        Action::PageUp => state.move_cursor(-state.page()),
        Action::PageDown => state.move_cursor(state.page()),
        Action::GotoFirstRow => state.goto_first_row(),
        Action::GotoLastRow => state.goto_last_row(),
        Action::FocusNext => state.focus_next(),
        Action::FocusPrevious => state.focus_previous(),
        Action::Activate => state.activate(),
        Action::MatrixClick => state.matrix_click(),
        Action::MatrixSelectVisible => state.matrix_select_visible(),
        Action::SetSelectionMode(mode) => state.set_selection_mode(mode),
        Action::ResetSelection => state.reset_selection(),
        Action::AddVisible => state.add_visible(),
        Action::ReloadSession => state.reload_session(),
        Action::Slider(delta) => state.move_slider(delta),
        Action::RestrictContigs => state.restrict_contigs(),
        Action::ClearContigs => state.clear_contigs(),
        Action::AllContigs => state.all_contigs(),
        Action::EnterCommandMode => state.enter_command_mode(),
        Action::CommandChar(c) => state.command_input(c),
        Action::ExecuteCommand => state.execute_command(),
        Action::CancelCommand => state.cancel_command(),
        Action::CommandBackspace => state.command_backspace(),
        Action::EnterSearchMode => state.enter_search_mode(),
        Action::SearchChar(c) => state.search_input(c),
        Action::ExecuteSearch => state.execute_search(),
        Action::CancelSearch => state.cancel_search(),
        Action::SearchBackspace => state.search_backspace(),
        Action::ShowHelp => state.show_help(),
        Action::DismissOverlay => state.dismiss_overlay(),
        Action::Resize(_, _) => {
            // Resize is handled in the main loop with actual terminal dimensions
        }
    }

    !state.should_quit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Char('k')), &mode, false), Action::MoveUp);
        assert_eq!(handle_key_event(key(KeyCode::Down), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Tab), &mode, false), Action::FocusNext);
        assert_eq!(handle_key_event(key(KeyCode::End), &mode, false), Action::GotoLastRow);

        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(ctrl_d, &mode, false), Action::HalfPageDown);
    }

    #[test]
    fn test_selection_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::Activate);
        assert_eq!(handle_key_event(key(KeyCode::Char('m')), &mode, false), Action::MatrixClick);
        assert_eq!(
            handle_key_event(key(KeyCode::Char('M')), &mode, false),
            Action::MatrixSelectVisible
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('a')), &mode, false),
            Action::SetSelectionMode(SelectionMode::Add)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('r')), &mode, false),
            Action::SetSelectionMode(SelectionMode::Remove)
        );
        assert_eq!(handle_key_event(key(KeyCode::Char('R')), &mode, false), Action::ResetSelection);
        assert_eq!(handle_key_event(key(KeyCode::Char('A')), &mode, false), Action::AddVisible);
        assert_eq!(handle_key_event(key(KeyCode::Char('L')), &mode, false), Action::ReloadSession);
    }

    #[test]
    fn test_filter_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('+')), &mode, false), Action::Slider(1));
        assert_eq!(handle_key_event(key(KeyCode::Char('{')), &mode, false), Action::Slider(-10));
        assert_eq!(handle_key_event(key(KeyCode::Char('c')), &mode, false), Action::RestrictContigs);
        assert_eq!(handle_key_event(key(KeyCode::Char('X')), &mode, false), Action::ClearContigs);
        assert_eq!(handle_key_event(key(KeyCode::Char('C')), &mode, false), Action::AllContigs);
    }

    #[test]
    fn test_command_mode_input() {
        let mode = AppMode::Command(String::new());
        assert_eq!(handle_key_event(key(KeyCode::Char('q')), &mode, false), Action::CommandChar('q'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelCommand);
    }

    #[test]
    fn test_search_mode_input() {
        let mode = AppMode::Search(String::new());
        // Mode keys are plain text while searching
        assert_eq!(handle_key_event(key(KeyCode::Char('a')), &mode, false), Action::SearchChar('a'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteSearch);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelSearch);
        assert_eq!(handle_key_event(key(KeyCode::Backspace), &mode, false), Action::SearchBackspace);
    }

    #[test]
    fn test_ctrl_c_quit() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, &AppMode::Normal, false), Action::Quit);
    }

    #[test]
    fn test_dismiss_overlay() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), Action::DismissOverlay);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, true), Action::DismissOverlay);
    }
}
