//! Frame decoder for the chat WebSocket.

use serde_json::Value;

use super::types::{Frame, SessionSummary};
use crate::error::{Error, Result};

/// Decode one raw text payload.
pub fn decode(raw: &str) -> Result<Frame> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::FrameDecode(e.to_string()))?;
    decode_value(&value)
}

/// Decode an already-parsed JSON value.
pub fn decode_value(raw: &Value) -> Result<Frame> {
    if !raw.is_object() {
        return Err(Error::FrameDecode("Frame is not a JSON object".into()));
    }
    let frame_type = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::FrameDecode("Missing 'type' field".into()))?;

    let frame = match frame_type {
        "stream" => Frame::Stream {
            content: content_of(raw),
        },
        "stream_end" => Frame::StreamEnd,
        "system" => Frame::System {
            content: content_of(raw),
        },
        "message" => Frame::Message {
            content: content_of(raw),
        },
        "session_update" => Frame::SessionUpdate(parse_session(raw)),
        other => Frame::Unknown {
            frame_type: other.to_string(),
            content: raw
                .get("content")
                .and_then(Value::as_str)
                .map(String::from),
        },
    };
    Ok(frame)
}

fn content_of(raw: &Value) -> String {
    raw.get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn parse_session(raw: &Value) -> SessionSummary {
    let Some(session) = raw.get("session") else {
        return SessionSummary::default();
    };
    let mut summary: SessionSummary =
        serde_json::from_value(session.clone()).unwrap_or_default();
    // Older rows only carry the Mongo `_id`.
    if summary.session_id.is_empty() {
        if let Some(id) = session.get("_id").and_then(Value::as_str) {
            summary.session_id = id.to_string();
        }
    }
    summary
}
