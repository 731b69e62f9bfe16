//! Two-thread TUI orchestration.
//!
//! Terminal I/O runs on a dedicated OS thread; the socket and the relay stay
//! on the tokio runtime. Communication via `tokio::sync::mpsc` channels.

mod input;

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::App;
use crate::session::ChatConnection;
use crate::ui;

pub use input::handle_term_event;

/// Terminal events forwarded from the UI reader thread.
pub enum TermEvent {
    Key(crossterm::event::KeyEvent),
    Resize(u16, u16),
}

/// Run the interactive TUI mode.
///
/// The chat session is already established, so submitting is possible from
/// the first frame. Enters raw mode, spawns a dedicated terminal reader
/// thread, and runs the main `select!` loop until the user quits.
pub async fn run(chat: ChatConnection) -> anyhow::Result<()> {
    let ChatConnection {
        username,
        mut relay,
        mut events,
    } = chat;

    // 1. Enter raw mode, create terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 2. Channels + cancellation token
    let cancel = CancellationToken::new();
    let (term_tx, mut term_rx) = tokio::sync::mpsc::channel::<TermEvent>(64);

    // 3. Spawn dedicated OS thread for crossterm::event::read()
    let cancel_clone = cancel.clone();
    let ui_thread = std::thread::spawn(move || {
        loop {
            if cancel_clone.is_cancelled() {
                break;
            }
            // Poll with 50ms timeout so we can check cancellation
            if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        // Filter out Release events (Windows emits Press + Release per keystroke)
                        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            continue;
                        }
                        if term_tx.blocking_send(TermEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        if term_tx.blocking_send(TermEvent::Resize(w, h)).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    });

    let mut app = App::new();
    app.username = username;
    app.scroll_to_bottom();
    let mut tick = tokio::time::interval(Duration::from_millis(50));

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = tick.tick() => {
                app.sync_status(&relay);
                if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app, &relay)) {
                    break Err(e.into());
                }
            }
            Some(term_event) = term_rx.recv() => {
                handle_term_event(&mut app, &mut relay, term_event);
            }
            Some(event) = events.recv() => {
                relay.handle_event(event);
            }
        }
        if app.should_quit {
            break Ok(());
        }
    };

    // 4. Shutdown: stop the reader thread, close the socket
    cancel.cancel();
    let _ = ui_thread.join(); // fast, <50ms due to poll timeout
    relay.close();
    info!(session_id = %relay.session().session_id(), "Chat session ended");

    // 5. Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}
