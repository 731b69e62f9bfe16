//! Frame types for the chat WebSocket protocol.

use serde::{Deserialize, Serialize};

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental assistant text.
    Stream { content: String },
    /// End of the current streamed reply.
    StreamEnd,
    /// Independent notice from the server (welcome text, warnings).
    System { content: String },
    /// Complete, non-streamed assistant reply.
    Message { content: String },
    /// Session metadata broadcast after each stored message.
    SessionUpdate(SessionSummary),
    /// Any other frame type.
    Unknown {
        frame_type: String,
        content: Option<String>,
    },
}

impl Frame {
    /// Wire name of this frame's `type` field.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Stream { .. } => "stream",
            Self::StreamEnd => "stream_end",
            Self::System { .. } => "system",
            Self::Message { .. } => "message",
            Self::SessionUpdate(_) => "session_update",
            Self::Unknown { frame_type, .. } => frame_type,
        }
    }
}

/// Session summary as stored and broadcast by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Outbound chat request sent for each user submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChatRequest {
    /// A plain chat turn.
    pub fn chat(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
            kind: "chat".to_string(),
        }
    }

    /// Serialize to the JSON text sent over the transport.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
