//! Input handling for TUI key events.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use agenstock_core::{Error, RelayController, Transport, ViewUpdate};

use crate::app::App;

use super::TermEvent;

const HELP: &str = "AgenStock CLI - Available Commands

  /help                 Show this help message
  /clear                Clear the conversation view
  /exit                 Exit the CLI

Keyboard shortcuts:
  Enter                Send message
  Ctrl+C / Ctrl+D      Quit
  Up/Down              Input history
  Shift+Up/Down        Scroll messages
  PageUp/PageDown      Scroll messages (page)
  Shift+End            Jump to latest";

/// Process a terminal event, updating app state and submitting through the relay.
pub fn handle_term_event<T: Transport>(
    app: &mut App,
    relay: &mut RelayController<T>,
    event: TermEvent,
) {
    match event {
        TermEvent::Key(key) => {
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl && matches!(key.code, KeyCode::Char('c' | 'd')) {
                app.should_quit = true;
            } else {
                handle_input_key(app, relay, key);
            }
        }
        TermEvent::Resize(_, _) => { /* terminal auto-handles resize on next draw */ }
    }
}

/// Handle a key press in normal input mode.
fn handle_input_key<T: Transport>(app: &mut App, relay: &mut RelayController<T>, key: KeyEvent) {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Enter => submit(app, relay),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.move_left(),
        KeyCode::Right => app.move_right(),
        KeyCode::Home => app.move_home(),
        KeyCode::End if shift => app.scroll_to_bottom(),
        KeyCode::End => app.move_end(),
        KeyCode::Up if shift => app.scroll_up(1),
        KeyCode::Down if shift => app.scroll_down(1),
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),
        KeyCode::PageUp => app.scroll_up(app.viewport_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.viewport_height.max(1)),
        _ => {}
    }
}

fn submit<T: Transport>(app: &mut App, relay: &mut RelayController<T>) {
    let trimmed = app.input.trim();
    if trimmed == "?" {
        app.take_input();
        relay.notice(HELP);
        app.scroll_to_bottom();
        return;
    }
    if let Some(command) = trimmed.strip_prefix('/') {
        let command = command.trim().to_string();
        app.take_input();
        run_command(app, relay, &command);
        return;
    }
    if relay.is_busy() {
        app.status = "Waiting for the current reply to finish...".to_string();
        return;
    }

    match relay.submit(&app.input) {
        Ok(ViewUpdate::Unchanged) => {
            app.take_input();
        }
        Ok(_) => {
            app.take_input();
            app.scroll_to_bottom();
        }
        // The relay already appended a notice; keep the text so it can be resent.
        Err(Error::NotConnected) => app.scroll_to_bottom(),
        Err(e) => {
            warn!(error = %e, "Submit failed");
            app.status = format!("Error: {e}");
        }
    }
}

fn run_command<T: Transport>(app: &mut App, relay: &mut RelayController<T>, command: &str) {
    match command {
        "exit" | "quit" => app.should_quit = true,
        "help" => {
            relay.notice(HELP);
        }
        "clear" => relay.clear_conversation(),
        other => {
            relay.notice(format!("Unknown command: /{other}. Type /help for commands."));
        }
    }
    app.scroll_to_bottom();
}
