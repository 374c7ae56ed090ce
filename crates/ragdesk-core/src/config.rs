//! Configuration management for RagDesk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::ChatConfig;
use crate::error::{RagDeskError, Result};
use crate::locale::Locale;
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::provider::ProviderConfig;
use crate::session::DEFAULT_MAX_TURNS;

/// Smallest usable history: one user turn and its reply.
pub const MIN_MAX_TURNS: usize = 2;

/// Environment variable holding the completion service key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the vector store id for retrieval.
pub const ENV_VECTOR_STORE_ID: &str = "OPENAI_VECTOR_STORE_ID";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "RAGDESK_MODEL";

/// Top-level RagDesk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagDeskConfig {
    /// Completion service settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Session and prompt settings.
    #[serde(default)]
    pub chat: ChatSettings,

    /// Document retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Chat client settings.
    #[serde(default)]
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Turns kept per session.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Custom system prompt (None = built-in instructions).
    pub system_prompt: Option<String>,
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub vector_store_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Display language. None = detect from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3000/api/chat".to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            locale: None,
        }
    }
}

impl RagDeskConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagDeskError::Config(format!("Failed to read config: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RagDeskError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the chat service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chat.max_turns < MIN_MAX_TURNS {
            return Err(RagDeskError::Config(format!(
                "chat.max_turns must be at least {}, got {}",
                MIN_MAX_TURNS, self.chat.max_turns
            )));
        }
        Ok(())
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RagDeskError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragdesk")
            .join("config.toml")
    }

    /// Directory for logs and client state.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragdesk")
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = present(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(id) = present(ENV_VECTOR_STORE_ID) {
            self.retrieval.vector_store_id = Some(id);
        }
        if let Some(model) = present(ENV_MODEL) {
            self.provider.model = model;
        }
    }

    /// Client display language: the configured one, else detected from
    /// `LC_ALL`, `LC_MESSAGES` or `LANG`.
    pub fn client_locale(&self) -> Locale {
        self.client_locale_with(|key| std::env::var(key).ok())
    }

    pub fn client_locale_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Locale {
        if let Some(locale) = self.client.locale {
            return locale;
        }
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| lookup(key))
            .find(|tag| !tag.trim().is_empty())
            .map(|tag| Locale::detect(&tag))
            .unwrap_or_default()
    }

    /// Settings for the chat service.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            system_prompt: self
                .chat
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            model: Some(self.provider.model.clone()),
            vector_store_id: self
                .retrieval
                .vector_store_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = RagDeskConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chat.max_turns, 20);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.server.port, 3000);
        assert!(config.retrieval.vector_store_id.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RagDeskConfig::default();
        config.retrieval.vector_store_id = Some("vs_1".to_string());
        config.client.locale = Some(Locale::Es);
        config.save(&path).unwrap();

        let loaded = RagDeskConfig::load(&path).unwrap();
        assert_eq!(loaded.retrieval.vector_store_id.as_deref(), Some("vs_1"));
        assert_eq!(loaded.client.locale, Some(Locale::Es));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\nvector_store_id = \"vs_9\"\n").unwrap();

        let config = RagDeskConfig::load(&path).unwrap();
        assert_eq!(config.retrieval.vector_store_id.as_deref(), Some("vs_9"));
        assert_eq!(config.provider.provider, "openai");
        assert_eq!(config.client.endpoint, "http://127.0.0.1:3000/api/chat");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chat\nmax_turns = ").unwrap();
        assert!(matches!(
            RagDeskConfig::load(&path),
            Err(RagDeskError::Config(_))
        ));
    }

    #[test]
    fn test_too_small_max_turns_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for bad in ["0", "1"] {
            std::fs::write(&path, format!("[chat]\nmax_turns = {}\n", bad)).unwrap();
            let err = RagDeskConfig::load(&path).unwrap_err();
            assert!(err.to_string().contains("max_turns"), "{}", err);
        }

        std::fs::write(&path, "[chat]\nmax_turns = 2\n").unwrap();
        assert_eq!(RagDeskConfig::load(&path).unwrap().chat.max_turns, 2);
    }

    #[test]
    fn test_client_locale_falls_back_to_environment() {
        let mut config = RagDeskConfig::default();
        let env = |key: &str| match key {
            "LC_ALL" => Some(String::new()),
            "LANG" => Some("es_MX.UTF-8".to_string()),
            _ => None,
        };
        assert_eq!(config.client_locale_with(env), Locale::Es);
        assert_eq!(config.client_locale_with(|_| None), Locale::En);

        config.client.locale = Some(Locale::En);
        assert_eq!(config.client_locale_with(env), Locale::En);
    }

    #[test]
    fn test_env_overlay_ignores_blank_values() {
        let mut config = RagDeskConfig::default();
        config.retrieval.vector_store_id = Some("vs_file".to_string());

        config.apply_env_with(|key| match key {
            ENV_API_KEY => Some("sk-test".to_string()),
            ENV_VECTOR_STORE_ID => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.retrieval.vector_store_id.as_deref(), Some("vs_file"));
        assert_eq!(config.provider.model, "gpt-4o");
    }

    #[test]
    fn test_chat_config_drops_blank_store() {
        let mut config = RagDeskConfig::default();
        config.retrieval.vector_store_id = Some(String::new());
        let chat = config.chat_config();
        assert!(chat.vector_store_id.is_none());
        assert_eq!(chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(chat.model.as_deref(), Some("gpt-4o"));
    }
}
