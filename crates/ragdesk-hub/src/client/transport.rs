//! Transport between the chat client and the `/api/chat` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use ragdesk_core::chat::ChatReply;
use ragdesk_core::error::{RagDeskError, Result};

/// Sends one user message and returns the assistant reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    message: &'a str,
    session_id: Option<&'a str>,
}

/// HTTP transport posting JSON to the chat endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&RequestBody {
                message,
                session_id,
            })
            .send()
            .await?;

        let status = resp.status();
        debug!("Chat endpoint responded {}", status);

        if !status.is_success() {
            let detail = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_default();
            return Err(RagDeskError::Provider(format!(
                "chat endpoint returned {}: {}",
                status, detail
            )));
        }

        Ok(resp.json::<ChatReply>().await?)
    }
}
