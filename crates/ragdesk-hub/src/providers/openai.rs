//! OpenAI Responses API provider.
//!
//! Sends the combined prompt as the `input` of `POST /responses` and lets the
//! service run the `file_search` tool against a hosted vector store itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderConfig, TokenUsage,
    ToolDefinition,
};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Provider for the OpenAI Responses API and compatible gateways.
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    api_url: String,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_url = format!("{}/responses", api_base.trim_end_matches('/'));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config,
            api_url,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Internal request body.
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

/// Internal response body.
#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<ApiOutputItem>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiOutputItem {
    r#type: String,
    #[serde(default)]
    content: Vec<ApiContentPart>,
}

#[derive(Deserialize)]
struct ApiContentPart {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ApiResponse {
    /// Reply text: the aggregated `output_text` when the service sends it,
    /// else every `output_text` part of every `message` item, concatenated.
    fn text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_ref().filter(|t| !t.is_empty()) {
            return Some(text.clone());
        }

        let joined: String = self
            .output
            .iter()
            .filter(|item| item.r#type == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.r#type == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect();

        if joined.is_empty() { None } else { Some(joined) }
    }
}

fn truncate(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.provider
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(RagDeskError::Auth(format!(
                    "{} API key not set",
                    self.config.provider
                )));
            }
        };

        let model = request.model.as_deref().unwrap_or(&self.config.model);

        info!(
            "Calling {} model: {} (tools: {})",
            self.config.provider,
            model,
            request.tools.len()
        );

        let body = ApiRequest {
            model,
            input: &request.input,
            tools: &request.tools,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let body_text = resp.text().await?;

        debug!("API response status: {}, body length: {}", status, body_text.len());

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body_text)
                .map(|err| err.error.message)
                .unwrap_or_else(|_| truncate(&body_text).to_string());

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(RagDeskError::Auth(format!(
                    "{} API error ({}): {}",
                    self.config.provider, status, detail
                )));
            }
            return Err(RagDeskError::Provider(format!(
                "{} API error ({}): {}",
                self.config.provider, status, detail
            )));
        }

        let api_resp: ApiResponse = serde_json::from_str(&body_text).map_err(|e| {
            RagDeskError::Provider(format!(
                "Failed to parse response: {} — body: {}",
                e,
                truncate(&body_text)
            ))
        })?;

        let usage = api_resp
            .usage
            .as_ref()
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens.unwrap_or(0),
                output_tokens: u.output_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            output_text: api_resp.text(),
            model: api_resp.model,
            usage,
        })
    }
}
