//! Completion provider trait — the abstraction over the hosted model API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A tool the completion service may invoke while generating.
///
/// Only document retrieval against a hosted vector store is supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    FileSearch { vector_store_ids: Vec<String> },
}

impl ToolDefinition {
    /// Retrieval tool bound to a single vector store.
    pub fn file_search(vector_store_id: &str) -> Self {
        Self::FileSearch {
            vector_store_ids: vec![vector_store_id.to_string()],
        }
    }
}

/// A single completion call: one combined prompt plus optional tools.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub input: String,
    pub tools: Vec<ToolDefinition>,
    pub model: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// What came back from the completion service.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Generated text. `None` is a legitimate outcome callers must handle.
    pub output_text: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Reply text, treating empty or whitespace-only output as no reply.
    pub fn text(&self) -> Option<&str> {
        self.output_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Completion provider trait — implement this to target another model API.
///
/// # Example
///
/// ```rust,ignore
/// struct Canned;
///
/// #[async_trait]
/// impl CompletionProvider for Canned {
///     fn name(&self) -> &str { "canned" }
///     fn default_model(&self) -> &str { "canned-1" }
///
///     async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
///         Ok(CompletionResponse {
///             output_text: Some("hello".into()),
///             ..Default::default()
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Model used when the request does not name one.
    fn default_model(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_search_wire_shape() {
        let tool = ToolDefinition::file_search("vs_123");
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "file_search", "vector_store_ids": ["vs_123"] })
        );
    }

    #[test]
    fn test_blank_output_counts_as_missing() {
        let mut resp = CompletionResponse::default();
        assert_eq!(resp.text(), None);

        resp.output_text = Some("   \n".to_string());
        assert_eq!(resp.text(), None);

        resp.output_text = Some("X is Y.".to_string());
        assert_eq!(resp.text(), Some("X is Y."));
    }
}
