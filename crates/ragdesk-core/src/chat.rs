//! Chat service — one retrieval-augmented exchange per call.
//!
//! For every message it:
//! 1. Resolves (or creates) the session
//! 2. Appends the user turn
//! 3. Assembles the combined prompt from instructions and history
//! 4. Attaches the retrieval tool when a vector store is configured
//! 5. Calls the completion provider
//! 6. Appends the assistant reply, trims to the cap, and returns the reply
//!    with the session id

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::error::RagDeskError;
use crate::message::Turn;
use crate::prompt::{build_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::provider::{CompletionProvider, CompletionRequest, ToolDefinition};
use crate::session::{Session, SessionStore};

const MSG_BAD_REQUEST: &str = "Message is required";
const MSG_AUTH: &str = "OpenAI API key not configured";
const MSG_FAILED: &str = "Failed to process chat request";

/// Failure kinds a chat exchange can end in.
///
/// `Display` carries the detail for logs; callers only ever see
/// [`ChatError::public_message`].
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),

    #[error("Upstream returned no reply text")]
    UpstreamEmpty,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::UpstreamAuth(_) | Self::UpstreamEmpty | Self::Internal(_) => 500,
        }
    }

    /// Fixed message returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => MSG_BAD_REQUEST,
            Self::UpstreamAuth(_) => MSG_AUTH,
            Self::UpstreamEmpty | Self::Internal(_) => MSG_FAILED,
        }
    }

    /// Classify a provider failure.
    ///
    /// The typed `Auth` variant is authoritative. Provider messages that
    /// mention an API key are also treated as credential problems, since some
    /// gateways report a bad key with a generic status.
    pub fn from_provider(err: RagDeskError) -> Self {
        match err {
            RagDeskError::Auth(detail) => Self::UpstreamAuth(detail),
            RagDeskError::Provider(detail) if detail.contains("API key") => {
                Self::UpstreamAuth(detail)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

/// A validated chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInput {
    pub message: String,
    pub session_id: Option<String>,
}

impl ChatInput {
    pub fn new(message: &str, session_id: Option<&str>) -> Self {
        Self {
            message: message.to_string(),
            session_id: session_id.map(|s| s.to_string()),
        }
    }

    /// Validate a raw JSON body.
    ///
    /// `message` must be a non-empty string. A `sessionId` that is null,
    /// empty, or not a string is treated as absent.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, ChatError> {
        let message = match body.get("message") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::String(_)) => {
                return Err(ChatError::BadRequest("message is empty".to_string()));
            }
            Some(serde_json::Value::Null) | None => {
                return Err(ChatError::BadRequest("message is missing".to_string()));
            }
            Some(other) => {
                return Err(ChatError::BadRequest(format!(
                    "message must be a string, got {}",
                    json_kind(other)
                )));
            }
        };

        let session_id = body
            .get("sessionId")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(Self { message, session_id })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub session_id: String,
}

/// Settings for the chat service.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Instructions placed at the top of every prompt.
    pub system_prompt: String,
    /// Model override (None = provider default).
    pub model: Option<String>,
    /// Vector store the retrieval tool searches. None disables retrieval.
    pub vector_store_id: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: None,
            vector_store_id: None,
        }
    }
}

/// Ties the session store to a completion provider.
pub struct ChatService {
    store: Arc<SessionStore>,
    provider: Arc<dyn CompletionProvider>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn CompletionProvider>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Tools for the next completion call: the retrieval tool when a
    /// non-blank vector store id is configured, nothing otherwise.
    pub fn retrieval_tools(&self) -> Vec<ToolDefinition> {
        match self.config.vector_store_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => vec![ToolDefinition::file_search(id)],
            _ => Vec::new(),
        }
    }

    /// Run one exchange.
    ///
    /// The prompt is built from the full history plus the new user turn, so
    /// a session at the cap sends one turn more than it stores. On failure
    /// an existing session keeps the user turn and a session created for
    /// this request is discarded, since its id never reaches the caller.
    pub async fn handle(&self, input: ChatInput) -> Result<ChatReply, ChatError> {
        if input.message.is_empty() {
            return Err(ChatError::BadRequest("message is empty".to_string()));
        }

        let (session_id, handle) = self.store.get_or_create(input.session_id.as_deref());
        let created = input.session_id.as_deref() != Some(session_id.as_str());
        let mut session = handle.lock().await;

        let outcome = self.exchange(&session_id, &mut session, &input.message).await;
        match outcome {
            Ok(reply) => Ok(ChatReply {
                message: reply,
                session_id,
            }),
            Err(err) => {
                if created {
                    self.store.remove(&session_id);
                    debug!(session = %session_id, "Discarded session after failed first exchange");
                } else {
                    session.trim();
                }
                Err(err)
            }
        }
    }

    async fn exchange(
        &self,
        session_id: &str,
        session: &mut Session,
        message: &str,
    ) -> Result<String, ChatError> {
        session.push(Turn::user(message));

        let prompt = build_prompt(&self.config.system_prompt, session.turns(), message);
        let tools = self.retrieval_tools();

        match tools.first() {
            Some(ToolDefinition::FileSearch { vector_store_ids }) => {
                info!(session = %session_id, stores = ?vector_store_ids, "Retrieval tool attached");
            }
            None => info!(session = %session_id, "No vector store configured, retrieval tool not attached"),
        }
        debug!(
            session = %session_id,
            turns = session.len(),
            prompt_len = prompt.len(),
            "Calling {}",
            self.provider.name()
        );

        let request = CompletionRequest {
            input: prompt,
            tools,
            model: self.config.model.clone(),
        };

        let response = self.provider.complete(request).await.map_err(|e| {
            let err = ChatError::from_provider(e);
            error!(session = %session_id, "Chat request failed: {}", err);
            err
        })?;

        let reply = match response.text() {
            Some(text) => text.to_string(),
            None => {
                error!(
                    session = %session_id,
                    model = %response.model,
                    "No reply text could be extracted from the completion"
                );
                return Err(ChatError::UpstreamEmpty);
            }
        };

        session.append(Turn::assistant(&reply));

        debug!(
            session = %session_id,
            turns = session.len(),
            tokens = response.usage.total_tokens,
            "Exchange stored"
        );

        Ok(reply)
    }
}
