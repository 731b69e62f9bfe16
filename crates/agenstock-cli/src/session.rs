//! Chat session bootstrap.
//!
//! Resolves the user, creates or resumes a chat session, then opens the
//! socket. Nothing can be submitted until all three steps succeeded.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use agenstock_core::config::Config;
use agenstock_core::{Conversation, RelayController, Role, StreamSession, TransportEvent};

use crate::api::{ApiClient, ApiError, StoredMessage};
use crate::config::CliConfig;
use crate::transport::{self, TransportConfig, WsTransport};

/// How to pick the chat session.
#[derive(Debug, Clone)]
pub enum SessionTarget {
    /// Create a new session with this title.
    New { title: String },
    /// Reuse an existing session and load its stored messages.
    Resume { session_id: String },
}

/// A ready-to-use chat: relay plus the socket's event stream.
pub struct ChatConnection {
    pub username: String,
    pub relay: RelayController<WsTransport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Session bootstrap errors.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Could not open chat connection: {0}")]
    Transport(#[from] agenstock_core::Error),
}

/// Build an API client from the resolved config and stored login.
pub fn api_client(config: &Config, cli_config: &CliConfig) -> Result<ApiClient, ApiError> {
    ApiClient::new(&config.client.base_url, cli_config.access_token())
}

/// Run the full bootstrap sequence.
pub async fn establish(
    config: &Config,
    cli_config: &CliConfig,
    target: SessionTarget,
) -> Result<ChatConnection, SetupError> {
    let token = cli_config.access_token().ok_or(ApiError::Unauthorized)?;
    let api = api_client(config, cli_config)?;

    let profile = api.current_user().await?;
    let username = profile.username.unwrap_or_default();
    info!(%username, "Authenticated");

    let (session, conversation) = match target {
        SessionTarget::New { title } => {
            let created = api.create_session(&title).await?;
            let title = if created.title.is_empty() {
                title
            } else {
                created.title
            };
            (
                StreamSession::new(created.session_id, title),
                Conversation::new(),
            )
        }
        SessionTarget::Resume { session_id } => resume(&api, session_id).await?,
    };

    let (transport, events) = transport::connect(&TransportConfig {
        url: config.client.chat_ws_url(&username),
        access_token: Some(token.to_string()),
        connect_timeout: Duration::from_secs(config.client.connect_timeout_secs),
    })
    .await?;

    info!(session_id = %session.session_id(), "Chat session ready");
    Ok(ChatConnection {
        username,
        relay: RelayController::with_conversation(transport, session, conversation),
        events,
    })
}

async fn resume(
    api: &ApiClient,
    session_id: String,
) -> Result<(StreamSession, Conversation), ApiError> {
    let summary = api
        .list_sessions()
        .await?
        .into_iter()
        .find(|s| s.session_id == session_id)
        .ok_or_else(|| ApiError::NotFound {
            what: format!("Session {session_id}"),
        })?;

    let messages = match api.session_messages(&session_id).await {
        Ok(messages) => messages,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(e) => {
            warn!(error = %e, "Could not load session history");
            Vec::new()
        }
    };

    let mut session = StreamSession::new(session_id, summary.title);
    session.message_count = summary.message_count;
    Ok((session, history_conversation(&messages)))
}

/// Turn stored messages into a finished conversation.
pub fn history_conversation(messages: &[StoredMessage]) -> Conversation {
    let mut conversation = Conversation::new();
    for message in messages {
        conversation.append(Role::from_message_type(&message.message_type), &message.content);
    }
    conversation
}
