//! TUI rendering functions.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use agenstock_core::{ConversationEntry, RelayController, Role, Transport};

use crate::app::App;

const CURSOR: &str = "█";

/// Draw the full UI.
pub fn draw<T: Transport>(frame: &mut Frame<'_>, app: &mut App, relay: &RelayController<T>) {
    // Compute input height: wrap the input text to the available inner width.
    let frame_width = frame.area().width;
    let inner_input_width = frame_width.saturating_sub(2) as usize; // minus borders
    let input_lines = if inner_input_width == 0 || app.input.is_empty() {
        1
    } else {
        wrapped_rows(UnicodeWidthStr::width(app.input.as_str()), inner_input_width)
    };
    // +2 for borders, cap at a third of the screen so messages stay visible
    let max_input_height = frame.area().height / 3;
    let input_height = (input_lines + 2).min(max_input_height).max(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // Header
            Constraint::Min(5),               // Messages
            Constraint::Length(input_height), // Input (dynamic)
            Constraint::Length(1),            // Status bar
        ])
        .split(frame.area());

    draw_header(frame, relay, chunks[0]);
    draw_messages(frame, app, relay, chunks[1]);
    draw_input(frame, app, relay.is_busy(), chunks[2]);
    draw_status_bar(frame, app, chunks[3]);
}

fn draw_header<T: Transport>(frame: &mut Frame<'_>, relay: &RelayController<T>, area: Rect) {
    let session = relay.session();
    let title = if session.title.is_empty() {
        "AgenStock".to_string()
    } else {
        format!("AgenStock | {}", session.title)
    };
    let sid = session.session_id();
    let session_info = format!(" | Session: {}", short_id(sid));
    let busy = if relay.is_busy() { " [thinking...]" } else { "" };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(session_info),
        Span::styled(busy, Style::default().fg(Color::Yellow)),
    ]));

    frame.render_widget(header, area);
}

/// First eight characters of a session id.
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

/// Lines for one conversation entry: role prefix, hanging indent, cursor while streaming.
pub fn entry_lines(entry: &ConversationEntry) -> Vec<Line<'_>> {
    let (prefix, color) = match entry.role {
        Role::User => ("You: ", Color::Green),
        Role::Assistant => ("AgenStock: ", Color::Blue),
        Role::System => ("System: ", Color::Yellow),
    };
    let prefix_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    let cursor_style = Style::default().fg(Color::White);
    let content_lines: Vec<&str> = entry.text().split('\n').collect();
    let last = content_lines.len() - 1;
    let indent = " ".repeat(prefix.len());

    content_lines
        .iter()
        .enumerate()
        .map(|(i, content)| {
            let lead = if i == 0 {
                Span::styled(prefix, prefix_style)
            } else {
                Span::raw(indent.clone())
            };
            let cursor = if entry.is_streaming() && i == last {
                CURSOR
            } else {
                ""
            };
            let body = if entry.role == Role::System {
                Span::styled(*content, Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(*content)
            };
            Line::from(vec![lead, body, Span::styled(cursor, cursor_style)])
        })
        .collect()
}

fn draw_messages<T: Transport>(
    frame: &mut Frame<'_>,
    app: &mut App,
    relay: &RelayController<T>,
    area: Rect,
) {
    let mut lines: Vec<Line<'_>> = Vec::new();
    for (i, entry) in relay.conversation().entries().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.extend(entry_lines(entry));
    }

    let inner_height = area.height.saturating_sub(2); // minus borders
    let inner_width = area.width.saturating_sub(2) as usize; // minus borders

    // Count wrapped visual lines using unicode display width
    let total: u16 = lines
        .iter()
        .map(|line| {
            if inner_width == 0 {
                return 1u16;
            }
            let display_width: usize = line
                .spans
                .iter()
                .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
                .sum();
            wrapped_rows(display_width, inner_width)
        })
        .fold(0u16, u16::saturating_add);

    // Update app state so scroll methods know the bounds
    app.viewport_height = inner_height;
    app.total_lines = total;

    // Compute absolute scroll position from bottom-relative offset
    let max_scroll = total.saturating_sub(inner_height);
    app.scroll_offset = app.scroll_offset.min(max_scroll);
    let scroll = if app.scroll_pinned {
        max_scroll
    } else {
        max_scroll.saturating_sub(app.scroll_offset)
    };

    let title = if app.scroll_pinned {
        "Conversation".to_string()
    } else {
        format!("Conversation [scroll: {}/{}]", app.scroll_offset, max_scroll)
    };

    let messages = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(messages, area);
}

fn draw_input(frame: &mut Frame<'_>, app: &App, busy: bool, area: Rect) {
    let input = Paragraph::new(app.input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(if busy { "Waiting..." } else { "Input" }),
        )
        .style(if busy {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        })
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);

    // Position cursor accounting for text wrapping.
    let inner_width = area.width.saturating_sub(2) as usize; // minus borders
    let cursor_display_width =
        UnicodeWidthStr::width(&app.input[..app.cursor_pos.min(app.input.len())]);

    let (cursor_row, cursor_col) = if inner_width == 0 {
        (0u16, 0u16)
    } else {
        (
            u16::try_from(cursor_display_width / inner_width).unwrap_or(u16::MAX),
            u16::try_from(cursor_display_width % inner_width).unwrap_or(u16::MAX),
        )
    };

    let cursor_x = area.x.saturating_add(1).saturating_add(cursor_col);
    let cursor_y = area.y.saturating_add(1).saturating_add(cursor_row);
    // Clamp to stay within the input area
    let cursor_x = cursor_x.min(area.x.saturating_add(area.width.saturating_sub(2)));
    let cursor_y = cursor_y.min(area.y.saturating_add(area.height.saturating_sub(2)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(&app.status, Style::default().fg(Color::DarkGray)),
        Span::styled(
            " | Ctrl+C: quit | Enter: send | /help",
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    frame.render_widget(status, area);
}

/// Rows needed to show `width` columns wrapped at `inner_width` (at least one).
fn wrapped_rows(width: usize, inner_width: usize) -> u16 {
    let rows = width.saturating_add(inner_width - 1) / inner_width;
    u16::try_from(rows.max(1)).unwrap_or(u16::MAX)
}
