//! CLI session management subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use agenstock_core::Role;

use crate::api::{ApiClient, ApiError, SessionSummary, StoredMessage};

/// Session subcommand actions.
#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// List chat sessions, most recent first
    List {
        /// Maximum number of sessions to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the stored messages of a session
    Show {
        /// Session ID
        id: String,
    },
    /// Delete a session and its messages
    Delete {
        /// Session ID
        id: String,
    },
}

/// Execute a session subcommand.
pub async fn run(api: &ApiClient, action: SessionAction) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        SessionAction::List { limit } => {
            let sessions = api.list_sessions().await?;
            write_session_table(&mut out, &sessions, limit)?;
        }
        SessionAction::Show { id } => {
            let messages = api.session_messages(&id).await?;
            write_transcript(&mut out, &messages)?;
        }
        SessionAction::Delete { id } => match api.delete_session(&id).await {
            Ok(()) => writeln!(out, "Session {id} deleted.")?,
            Err(ApiError::NotFound { .. }) => writeln!(out, "Session {id} not found.")?,
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn write_session_table(
    out: &mut impl Write,
    sessions: &[SessionSummary],
    limit: usize,
) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "No sessions found.");
    }
    writeln!(
        out,
        "{:<24}  {:<30}  {:>4}  UPDATED",
        "ID", "TITLE", "MSGS"
    )?;
    for s in sessions.iter().take(limit) {
        writeln!(
            out,
            "{:<24}  {:<30}  {:>4}  {}",
            s.session_id,
            truncate(&s.title, 30),
            s.message_count,
            s.updated_at.as_deref().unwrap_or("-"),
        )?;
    }
    if sessions.len() > limit {
        writeln!(out, "\nShowing {limit} of {} session(s)", sessions.len())?;
    }
    Ok(())
}

fn write_transcript(out: &mut impl Write, messages: &[StoredMessage]) -> io::Result<()> {
    if messages.is_empty() {
        return writeln!(out, "No messages in this session.");
    }
    for message in messages {
        let who = match Role::from_message_type(&message.message_type) {
            Role::User => "You",
            Role::Assistant => "AgenStock",
            Role::System => "System",
        };
        match &message.timestamp {
            Some(ts) => writeln!(out, "[{ts}] {who}:")?,
            None => writeln!(out, "{who}:")?,
        }
        writeln!(out, "{}\n", message.content)?;
    }
    Ok(())
}

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max.saturating_sub(1)).collect::<String>())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    /// Test wrapper to parse CLI arguments.
    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        action: SessionAction,
    }

    fn summary(id: &str, title: &str, count: u64) -> SessionSummary {
        SessionSummary {
            session_id: id.into(),
            title: title.into(),
            message_count: count,
            updated_at: Some("2024-05-01T10:00:00".into()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_list_defaults() {
        let cli = TestCli::parse_from(["test", "list"]);
        match cli.action {
            SessionAction::List { limit } => assert_eq!(limit, 20),
            other => panic!("Expected List, got {other:?}"),
        }
    }

    #[test]
    fn parse_list_with_limit() {
        let cli = TestCli::parse_from(["test", "list", "--limit", "5"]);
        match cli.action {
            SessionAction::List { limit } => assert_eq!(limit, 5),
            other => panic!("Expected List, got {other:?}"),
        }
    }

    #[test]
    fn parse_show_and_delete() {
        match TestCli::parse_from(["test", "show", "sess-1"]).action {
            SessionAction::Show { id } => assert_eq!(id, "sess-1"),
            other => panic!("Expected Show, got {other:?}"),
        }
        match TestCli::parse_from(["test", "delete", "sess-1"]).action {
            SessionAction::Delete { id } => assert_eq!(id, "sess-1"),
            other => panic!("Expected Delete, got {other:?}"),
        }
    }

    #[test]
    fn table_lists_sessions_and_reports_limit() {
        let sessions = vec![
            summary("665f1c2a9b1e8a0012345678", "AAPL outlook", 4),
            summary("665f1c2a9b1e8a0012345679", "New Chat", 0),
        ];
        let mut out = Vec::new();
        write_session_table(&mut out, &sessions, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ID"));
        assert!(text.contains("AAPL outlook"));
        assert!(!text.contains("New Chat"));
        assert!(text.contains("Showing 1 of 2 session(s)"));
    }

    #[test]
    fn empty_table_says_so() {
        let mut out = Vec::new();
        write_session_table(&mut out, &[], 20).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No sessions found.\n");
    }

    #[test]
    fn transcript_labels_roles() {
        let messages = vec![
            StoredMessage {
                message_type: "user".into(),
                content: "What is AAPL trading at?".into(),
                timestamp: None,
            },
            StoredMessage {
                message_type: "ai".into(),
                content: "AAPL is $190".into(),
                timestamp: Some("2024-05-01T10:00:01".into()),
            },
        ];
        let mut out = Vec::new();
        write_transcript(&mut out, &messages).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("You:\nWhat is AAPL trading at?"));
        assert!(text.contains("[2024-05-01T10:00:01] AgenStock:\nAAPL is $190"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long session title", 10), "a very lo…");
    }
}
