//! Wire frames exchanged over the chat WebSocket.
//!
//! Inbound text payloads are decoded into [`Frame`] values with a tolerant
//! reader: unknown fields are ignored and unknown frame types are preserved
//! rather than rejected. Only structurally broken payloads fail.

mod decoder;
mod types;

pub use decoder::{decode, decode_value};
pub use types::*;
