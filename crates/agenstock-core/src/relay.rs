//! Streaming relay: turns transport frames into conversation mutations.
//!
//! The controller owns the transport handle, the session and the
//! conversation. All input arrives one event at a time from the owner's
//! event loop, so no locking is involved.

use tracing::{debug, error, info, warn};

use crate::conversation::{Conversation, EntryRef, Role};
use crate::error::{Error, Result};
use crate::frame::{self, ChatRequest, Frame, SessionSummary};

pub const NOT_CONNECTED_NOTICE: &str = "Not connected to chat service. Please wait or restart.";
pub const INVALID_FRAME_NOTICE: &str = "Received an invalid response from the server.";
pub const CONNECTION_CLOSED_NOTICE: &str =
    "Connection closed. Please restart the client to reconnect.";
pub const CONNECTION_ERROR_NOTICE: &str =
    "Unable to connect to the chat service. Please check your connection.";
pub const TARGET_LOST_NOTICE: &str = "The reply being streamed was lost. Please ask again.";

/// Outbound half of a bidirectional message stream.
pub trait Transport {
    /// Queue a text payload. Fails with [`Error::NotConnected`] unless open.
    fn send(&mut self, text: String) -> Result<()>;

    /// Close the stream. Calling this more than once is harmless.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Lifecycle events reported by a transport.
///
/// A transport emits exactly one `Open`, any number of `Message`s, then
/// exactly one of `Closed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Closed,
    Failed(String),
}

/// Relay state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    /// A user message was sent; its empty reply entry is waiting for text.
    AwaitingTarget(EntryRef),
    /// Text is being streamed into the target entry.
    Streaming(EntryRef),
}

impl RelayState {
    pub const fn target(self) -> Option<EntryRef> {
        match self {
            Self::Idle => None,
            Self::AwaitingTarget(target) | Self::Streaming(target) => Some(target),
        }
    }
}

/// Server-assigned session identity plus the last broadcast metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    session_id: String,
    pub title: String,
    pub message_count: u64,
}

impl StreamSession {
    pub fn new(session_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            title: title.into(),
            message_count: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// What a single event did to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Unchanged,
    /// A new entry was appended.
    Appended(EntryRef),
    /// Text was appended to a streaming entry.
    Extended { target: EntryRef, text: String },
    /// An entry's text was replaced wholesale and the entry finished.
    Replaced(EntryRef),
    /// A streaming entry was finished without new text.
    Finished(EntryRef),
    /// Several mutations happened (e.g. user entry plus reply placeholder).
    Batch(Vec<ViewUpdate>),
}

/// Routes frames to the conversation and tracks the streaming target.
pub struct RelayController<T: Transport> {
    transport: T,
    session: StreamSession,
    state: RelayState,
    conversation: Conversation,
    connected: bool,
}

impl<T: Transport> RelayController<T> {
    pub fn new(transport: T, session: StreamSession) -> Self {
        Self::with_conversation(transport, session, Conversation::new())
    }

    /// Start from an existing conversation (e.g. loaded history).
    pub fn with_conversation(
        transport: T,
        session: StreamSession,
        conversation: Conversation,
    ) -> Self {
        Self {
            transport,
            session,
            state: RelayState::Idle,
            conversation,
            connected: false,
        }
    }

    pub const fn state(&self) -> RelayState {
        self.state
    }

    pub const fn active_target(&self) -> Option<EntryRef> {
        self.state.target()
    }

    /// Whether a reply is pending or streaming.
    pub const fn is_busy(&self) -> bool {
        !matches!(self.state, RelayState::Idle)
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub const fn session(&self) -> &StreamSession {
        &self.session
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit user text: sends it and opens an empty assistant entry for the reply.
    ///
    /// Blank input is ignored. Rejected while a reply is pending or the
    /// transport is not open; the latter also appends a system notice.
    pub fn submit(&mut self, text: &str) -> Result<ViewUpdate> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(ViewUpdate::Unchanged);
        }
        if self.is_busy() {
            return Err(Error::TurnInProgress);
        }
        if !self.transport.is_open() {
            self.conversation.append(Role::System, NOT_CONNECTED_NOTICE);
            return Err(Error::NotConnected);
        }

        let payload = ChatRequest::chat(self.session.session_id(), text).to_json()?;
        let user = self.conversation.append(Role::User, text);
        if let Err(e) = self.transport.send(payload) {
            warn!(error = %e, "Failed to send chat request");
            self.conversation.append(Role::System, NOT_CONNECTED_NOTICE);
            return Err(e);
        }

        let reply = self.conversation.append_streaming(Role::Assistant, "");
        self.state = RelayState::AwaitingTarget(reply);
        debug!(session_id = %self.session.session_id(), "Chat request sent");
        Ok(ViewUpdate::Batch(vec![
            ViewUpdate::Appended(user),
            ViewUpdate::Appended(reply),
        ]))
    }

    /// Handle one transport lifecycle event.
    pub fn handle_event(&mut self, event: TransportEvent) -> ViewUpdate {
        match event {
            TransportEvent::Open => {
                self.connected = true;
                info!(session_id = %self.session.session_id(), "Chat transport open");
                ViewUpdate::Unchanged
            }
            TransportEvent::Message(raw) => self.handle_raw(&raw),
            TransportEvent::Closed => {
                info!("Chat transport closed");
                self.disconnect(CONNECTION_CLOSED_NOTICE)
            }
            TransportEvent::Failed(reason) => {
                warn!(%reason, "Chat transport failed");
                self.disconnect(CONNECTION_ERROR_NOTICE)
            }
        }
    }

    /// Decode and apply one raw text payload. Malformed payloads become a system notice.
    pub fn handle_raw(&mut self, raw: &str) -> ViewUpdate {
        match frame::decode(raw) {
            Ok(frame) => self.handle_frame(frame),
            Err(e) => {
                warn!(error = %e, "Discarding malformed frame");
                ViewUpdate::Appended(self.conversation.append(Role::System, INVALID_FRAME_NOTICE))
            }
        }
    }

    /// Apply one decoded frame.
    pub fn handle_frame(&mut self, frame: Frame) -> ViewUpdate {
        match frame {
            Frame::Stream { content } => self.on_stream(content),
            Frame::StreamEnd => self.on_stream_end(),
            Frame::System { content } => {
                ViewUpdate::Appended(self.conversation.append(Role::System, content))
            }
            Frame::Message { content } => self.on_message(content),
            Frame::SessionUpdate(summary) => {
                self.on_session_update(summary);
                ViewUpdate::Unchanged
            }
            Frame::Unknown {
                frame_type,
                content: Some(content),
            } if !content.is_empty() => {
                debug!(%frame_type, "Treating unknown frame with content as a message");
                self.on_message(content)
            }
            Frame::Unknown { frame_type, .. } => {
                debug!(%frame_type, "Ignoring unknown frame");
                ViewUpdate::Unchanged
            }
        }
    }

    /// Append a local system notice (help text, command feedback).
    pub fn notice(&mut self, text: impl Into<String>) -> ViewUpdate {
        ViewUpdate::Appended(self.conversation.append(Role::System, text))
    }

    /// Drop every entry. A reply still in flight moves to a fresh empty
    /// assistant entry so its remaining frames keep streaming into one place.
    pub fn clear_conversation(&mut self) {
        debug!(entries = self.conversation.len(), "Clearing conversation");
        self.conversation.clear();
        self.state = match self.state {
            RelayState::Idle => RelayState::Idle,
            RelayState::AwaitingTarget(_) => {
                RelayState::AwaitingTarget(self.conversation.append_streaming(Role::Assistant, ""))
            }
            RelayState::Streaming(_) => {
                RelayState::Streaming(self.conversation.append_streaming(Role::Assistant, ""))
            }
        };
    }

    /// Close the transport and reset to `Idle`. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.transport.close();
        if let Some(target) = self.state.target() {
            let _ = self.conversation.finish(target);
        }
        self.state = RelayState::Idle;
        self.connected = false;
    }

    fn on_stream(&mut self, content: String) -> ViewUpdate {
        match self.state.target() {
            Some(target) => match self.conversation.append_to_active(target, &content) {
                Ok(()) => {
                    self.state = RelayState::Streaming(target);
                    ViewUpdate::Extended {
                        target,
                        text: content,
                    }
                }
                Err(e) => {
                    error!(error = %e, "Streaming target lost, continuing in a new entry");
                    let target = self.conversation.append_streaming(Role::Assistant, content);
                    self.state = RelayState::Streaming(target);
                    ViewUpdate::Appended(target)
                }
            },
            None => {
                let target = self.conversation.append_streaming(Role::Assistant, content);
                self.state = RelayState::Streaming(target);
                ViewUpdate::Appended(target)
            }
        }
    }

    fn on_stream_end(&mut self) -> ViewUpdate {
        let Some(target) = self.state.target() else {
            return ViewUpdate::Unchanged;
        };
        self.state = RelayState::Idle;
        match self.conversation.finish(target) {
            Ok(()) => ViewUpdate::Finished(target),
            Err(e) => self.reset_after_fault(&e),
        }
    }

    fn on_message(&mut self, content: String) -> ViewUpdate {
        match self.state.target() {
            Some(target) => {
                self.state = RelayState::Idle;
                match self
                    .conversation
                    .replace_text(target, content)
                    .and_then(|()| self.conversation.finish(target))
                {
                    Ok(()) => ViewUpdate::Replaced(target),
                    Err(e) => self.reset_after_fault(&e),
                }
            }
            None => ViewUpdate::Appended(self.conversation.append(Role::Assistant, content)),
        }
    }

    fn on_session_update(&mut self, summary: SessionSummary) {
        if summary.session_id.is_empty() {
            debug!("Ignoring session update without a session id");
            return;
        }
        if summary.session_id != self.session.session_id() {
            debug!(other = %summary.session_id, "Ignoring update for another session");
            return;
        }
        if !summary.title.is_empty() {
            self.session.title = summary.title;
        }
        self.session.message_count = summary.message_count;
    }

    fn disconnect(&mut self, notice: &str) -> ViewUpdate {
        let finished = self.state.target();
        if let Some(target) = finished {
            let _ = self.conversation.finish(target);
        }
        self.state = RelayState::Idle;
        self.connected = false;
        self.transport.close();
        let notice = self.conversation.append(Role::System, notice);
        match finished {
            Some(target) => ViewUpdate::Batch(vec![
                ViewUpdate::Finished(target),
                ViewUpdate::Appended(notice),
            ]),
            None => ViewUpdate::Appended(notice),
        }
    }

    fn reset_after_fault(&mut self, err: &Error) -> ViewUpdate {
        error!(error = %err, state = ?self.state, "Streaming target lost, resetting relay");
        self.state = RelayState::Idle;
        ViewUpdate::Appended(self.conversation.append(Role::System, TARGET_LOST_NOTICE))
    }
}

impl<T: Transport> Drop for RelayController<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
