//! `AgenStock` Core Library
//!
//! Shared functionality for the `AgenStock` chat client:
//! - Frame codec for the chat WebSocket protocol
//! - Ordered conversation model
//! - Streaming relay state machine
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod conversation;
pub mod error;
pub mod frame;
pub mod relay;
pub mod tracing_init;

pub use config::Config;
pub use conversation::{Conversation, ConversationEntry, EntryRef, Role};
pub use error::{Error, Result};
pub use relay::{RelayController, RelayState, StreamSession, Transport, TransportEvent, ViewUpdate};
