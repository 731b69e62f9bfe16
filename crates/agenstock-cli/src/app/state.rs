//! Application state and types.
//!
//! The conversation itself lives in the relay controller; `App` only holds
//! what the terminal needs around it: the input line, scroll position and
//! status text.

use std::collections::VecDeque;

use agenstock_core::{RelayController, Transport};

const HISTORY_LIMIT: usize = 100;

/// TUI application state.
pub struct App {
    pub input: String,
    /// Byte offset of the cursor in `input`, always on a char boundary.
    pub cursor_pos: usize,
    pub input_history: VecDeque<String>,
    pub history_index: Option<usize>,
    /// Manual scroll offset from the bottom (0 = pinned to bottom).
    pub scroll_offset: u16,
    /// Whether the view follows new output.
    pub scroll_pinned: bool,
    /// Height of the message viewport (set each frame by the renderer).
    pub viewport_height: u16,
    /// Total line count of rendered messages (set each frame by the renderer).
    pub total_lines: u16,
    pub should_quit: bool,
    pub status: String,
    pub username: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            cursor_pos: 0,
            input_history: VecDeque::with_capacity(HISTORY_LIMIT),
            history_index: None,
            scroll_offset: 0,
            scroll_pinned: true,
            viewport_height: 0,
            total_lines: 0,
            should_quit: false,
            status: "Connecting...".to_string(),
            username: String::new(),
        }
    }

    /// Scroll up by `n` lines.
    pub fn scroll_up(&mut self, n: u16) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.saturating_add(n).min(max_scroll);
        if self.scroll_offset > 0 {
            self.scroll_pinned = false;
        }
    }

    /// Scroll down by `n` lines.
    pub fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
        if self.scroll_offset == 0 {
            self.scroll_pinned = true;
        }
    }

    /// Snap scroll to the bottom (most recent messages).
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
        self.scroll_pinned = true;
    }

    /// Take the current input line, recording it in history.
    pub fn take_input(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.input);
        self.cursor_pos = 0;
        self.history_index = None;
        if text.trim().is_empty() {
            return None;
        }
        if self.input_history.front() != Some(&text) {
            self.input_history.push_front(text.clone());
            self.input_history.truncate(HISTORY_LIMIT);
        }
        Some(text)
    }

    /// Navigate input history (up).
    pub fn history_up(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        let idx = match self.history_index {
            None => 0,
            Some(i) => (i + 1).min(self.input_history.len().saturating_sub(1)),
        };
        self.history_index = Some(idx);
        self.input.clone_from(&self.input_history[idx]);
        self.cursor_pos = self.input.len();
    }

    /// Navigate input history (down).
    pub fn history_down(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                self.history_index = None;
                self.input.clear();
                self.cursor_pos = 0;
            }
            Some(i) => {
                let idx = i - 1;
                self.history_index = Some(idx);
                self.input.clone_from(&self.input_history[idx]);
                self.cursor_pos = self.input.len();
            }
        }
    }

    // -- Line editing --

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.input[..self.cursor_pos].char_indices().next_back() {
            self.input.remove(idx);
            self.cursor_pos = idx;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.input[..self.cursor_pos].char_indices().next_back() {
            self.cursor_pos = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.input[self.cursor_pos..].chars().next() {
            self.cursor_pos += c.len_utf8();
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub const fn move_end(&mut self) {
        self.cursor_pos = self.input.len();
    }

    /// Recompute the status line from the relay.
    pub fn sync_status<T: Transport>(&mut self, relay: &RelayController<T>) {
        let session = relay.session();
        let sid = session.session_id();
        let short = &sid[..sid.char_indices().nth(8).map_or(sid.len(), |(i, _)| i)];
        self.status = if !relay.is_connected() {
            format!("Disconnected | Session: {short}")
        } else if relay.is_busy() {
            format!("Thinking... | Session: {short}")
        } else {
            format!(
                "Connected as {} | Session: {short} | {} messages",
                self.username, session.message_count
            )
        };
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
