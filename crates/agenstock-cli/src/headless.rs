//! Headless (non-interactive) mode.
//!
//! Sends one prompt and streams the reply to stdout. System notices go to
//! stderr so stdout carries only the assistant's answer.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use agenstock_core::{EntryRef, RelayController, Role, Transport, TransportEvent, ViewUpdate};

/// Headless mode configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Prompt to send.
    pub prompt: String,
    /// Maximum wait for the connection or the next frame of the reply.
    pub response_timeout: Duration,
}

/// Headless mode errors.
#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Relay(#[from] agenstock_core::Error),

    #[error("No response from the chat service within {0:?}")]
    Timeout(Duration),

    #[error("Connection lost before the reply finished")]
    ConnectionLost,

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run headless mode until the reply completes.
pub async fn run<T: Transport>(
    relay: &mut RelayController<T>,
    events: &mut mpsc::Receiver<TransportEvent>,
    config: HeadlessConfig,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<(), HeadlessError> {
    let mut printer = ReplyPrinter::default();

    while !relay.is_connected() {
        let event = next_event(events, config.response_timeout).await?;
        let update = relay.handle_event(event);
        printer.emit(relay, &update, out, err)?;
        if !relay.transport().is_open() {
            return Err(HeadlessError::ConnectionLost);
        }
    }

    let update = relay.submit(&config.prompt)?;
    printer.emit(relay, &update, out, err)?;
    info!(session_id = %relay.session().session_id(), "Prompt sent");

    while relay.is_busy() {
        let event = next_event(events, config.response_timeout).await?;
        let update = relay.handle_event(event);
        printer.emit(relay, &update, out, err)?;
        if !relay.is_connected() {
            out.flush()?;
            return Err(HeadlessError::ConnectionLost);
        }
    }

    out.flush()?;
    relay.close();
    Ok(())
}

async fn next_event(
    events: &mut mpsc::Receiver<TransportEvent>,
    timeout: Duration,
) -> Result<TransportEvent, HeadlessError> {
    match tokio::time::timeout(timeout, events.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(HeadlessError::ConnectionLost),
        Err(_) => Err(HeadlessError::Timeout(timeout)),
    }
}

/// Writes view updates as plain text, tracking how much of the reply is on screen.
#[derive(Default)]
struct ReplyPrinter {
    target: Option<EntryRef>,
    printed: String,
}

impl ReplyPrinter {
    fn emit<T: Transport>(
        &mut self,
        relay: &RelayController<T>,
        update: &ViewUpdate,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> std::io::Result<()> {
        let conversation = relay.conversation();
        match update {
            ViewUpdate::Unchanged => {}
            ViewUpdate::Appended(r) => {
                let Some(entry) = conversation.get(*r) else {
                    return Ok(());
                };
                match entry.role {
                    Role::User => {}
                    Role::System => writeln!(err, "[{}]", entry.text())?,
                    Role::Assistant => {
                        self.start(*r);
                        self.write_reply(entry.text(), out)?;
                        if !entry.is_streaming() {
                            self.end(out)?;
                        }
                    }
                }
            }
            ViewUpdate::Extended { target, text } => {
                if self.target != Some(*target) {
                    self.start(*target);
                }
                self.write_reply(text, out)?;
            }
            ViewUpdate::Replaced(r) => {
                let Some(entry) = conversation.get(*r) else {
                    return Ok(());
                };
                if self.target != Some(*r) {
                    self.start(*r);
                }
                let text = entry.text();
                if let Some(rest) = text.strip_prefix(self.printed.as_str()) {
                    out.write_all(rest.as_bytes())?;
                } else {
                    writeln!(out)?;
                    out.write_all(text.as_bytes())?;
                }
                self.end(out)?;
            }
            ViewUpdate::Finished(r) => {
                if self.target == Some(*r) {
                    self.end(out)?;
                }
            }
            ViewUpdate::Batch(updates) => {
                for update in updates {
                    self.emit(relay, update, out, err)?;
                }
            }
        }
        Ok(())
    }

    fn start(&mut self, target: EntryRef) {
        self.target = Some(target);
        self.printed.clear();
    }

    fn write_reply(&mut self, text: &str, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(text.as_bytes())?;
        out.flush()?;
        self.printed.push_str(text);
        Ok(())
    }

    fn end(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        if let Some(target) = self.target.take() {
            debug!(%target, bytes = self.printed.len(), "Reply finished");
            writeln!(out)?;
            out.flush()?;
        }
        self.printed.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::relay;

    fn frames(items: &[&str]) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(32);
        tx.try_send(TransportEvent::Open).unwrap();
        for item in items {
            tx.try_send(TransportEvent::Message((*item).to_string()))
                .unwrap();
        }
        (tx, rx)
    }

    fn config(prompt: &str) -> HeadlessConfig {
        HeadlessConfig {
            prompt: prompt.into(),
            response_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn streams_reply_to_stdout() {
        let mut relay = relay();
        let (_tx, mut rx) = frames(&[
            r#"{"type":"system","content":"Hello! I'm AGENSTOCK"}"#,
            r#"{"type":"stream","content":"AAPL "}"#,
            r#"{"type":"stream","content":"is $190"}"#,
            r#"{"type":"stream_end"}"#,
        ]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        run(&mut relay, &mut rx, config("What is AAPL trading at?"), &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "AAPL is $190\n");
        assert!(String::from_utf8(err).unwrap().contains("AGENSTOCK"));
        let sent: serde_json::Value = serde_json::from_str(&relay.transport().sent[0]).unwrap();
        assert_eq!(sent["content"], "What is AAPL trading at?");
        assert_eq!(sent["session_id"], relay.session().session_id());
    }

    #[tokio::test]
    async fn whole_message_reply_is_printed() {
        let mut relay = relay();
        let (_tx, mut rx) = frames(&[r#"{"type":"message","content":"Hello"}"#]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        run(&mut relay, &mut rx, config("hi"), &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Hello\n");
    }

    #[tokio::test]
    async fn message_after_partial_stream_completes_the_line() {
        let mut relay = relay();
        let (_tx, mut rx) = frames(&[
            r#"{"type":"stream","content":"AAPL "}"#,
            r#"{"type":"message","content":"AAPL is $190"}"#,
        ]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        run(&mut relay, &mut rx, config("price?"), &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "AAPL is $190\n");
    }

    #[tokio::test]
    async fn close_mid_stream_is_connection_lost() {
        let mut relay = relay();
        let (tx, mut rx) = frames(&[r#"{"type":"stream","content":"AAPL "}"#]);
        tx.try_send(TransportEvent::Closed).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let result = run(&mut relay, &mut rx, config("price?"), &mut out, &mut err).await;

        assert!(matches!(result, Err(HeadlessError::ConnectionLost)));
        assert!(String::from_utf8(out).unwrap().starts_with("AAPL "));
        assert!(String::from_utf8(err).unwrap().contains("Connection closed"));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let mut relay = relay();
        let (_tx, mut rx) = frames(&[]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let result = run(&mut relay, &mut rx, config("price?"), &mut out, &mut err).await;

        assert!(matches!(result, Err(HeadlessError::Timeout(_))));
    }

    #[tokio::test]
    async fn blank_prompt_sends_nothing() {
        let mut relay = relay();
        let (_tx, mut rx) = frames(&[]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        run(&mut relay, &mut rx, config("   "), &mut out, &mut err)
            .await
            .unwrap();

        assert!(relay.transport().sent.is_empty());
        assert!(out.is_empty());
    }
}
