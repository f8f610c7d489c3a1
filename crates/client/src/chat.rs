//! HTTP client for the conversational agent webhook.
//!
//! The agent is best-effort: [`ChatAgent::try_send`] reports failures, but
//! callers normally go through [`ChatService::send`](crate::services::ChatService::send),
//! which turns any failure into the fallback reply.

use std::time::Duration;

use pension_core::chat::MessageType;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;

/// Body posted to the agent webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_message: String,
    pub message_type: MessageType,
    pub agent_name: String,
}

/// Agent reply. Older webhook versions answer with `message` instead of
/// `response`.
#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    #[serde(alias = "message")]
    response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat agent did not answer within {after:?}")]
    Timeout { after: Duration },

    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chat agent returned status {0}")]
    Status(u16),

    #[error("Chat agent returned an empty reply")]
    EmptyReply,

    #[error("No chat agent endpoint configured")]
    NotConfigured,
}

/// Client for the agent webhook.
#[derive(Debug, Clone)]
pub struct ChatAgent {
    client: reqwest::Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl ChatAgent {
    pub fn new(client: reqwest::Client, endpoint: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self::new(client, config.chat_webhook_url.clone(), config.chat_timeout)
    }

    /// Post one turn and wait for the agent's reply text.
    pub async fn try_send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let endpoint = self.endpoint.as_deref().ok_or(ChatError::NotConfigured)?;

        tracing::debug!(
            session_id = %request.session_id,
            message_type = ?request.message_type,
            "Sending chat turn to agent",
        );

        let exchange = async {
            let response = self.client.post(endpoint).json(request).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ChatError::Status(status.as_u16()));
            }
            let reply: ChatReply = response.json().await?;
            if reply.response.trim().is_empty() {
                return Err(ChatError::EmptyReply);
            }
            Ok(reply.response)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ChatError::Timeout {
                after: self.timeout,
            })?
    }
}
