//! Client-local persistence for the remembered session id.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ragdesk_core::error::{RagDeskError, Result};

/// Key the session id is stored under.
pub const SESSION_KEY: &str = "chatbot-session-id";

/// Where the client keeps its session id between runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, session_id: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Storage that forgets everything when dropped.
#[derive(Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: &str) -> Self {
        Self {
            value: Mutex::new(Some(session_id.to_string())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn save(&self, session_id: &str) -> Result<()> {
        *self.slot() = Some(session_id.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// JSON key-value file, shared with any other client state kept beside it.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn read_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str(&content)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(RagDeskError::Other(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: serde_json::Map<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .read_map()?
            .get(SESSION_KEY)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()))
    }

    fn save(&self, session_id: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(SESSION_KEY.to_string(), session_id.into());
        self.write_map(map)
    }

    fn remove(&self) -> Result<()> {
        let mut map = self.read_map()?;
        if map.remove(SESSION_KEY).is_some() {
            self.write_map(map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_lifecycle() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(&dir.path().join("state").join("client.json"));

        assert_eq!(storage.load().unwrap(), None);

        storage.save("session_1").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("session_1"));

        storage.save("session_2").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("session_2"));

        storage.remove().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_file_storage_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{"locale":"es"}"#).unwrap();

        let storage = FileStorage::new(&path);
        storage.save("session_9").unwrap();
        storage.remove().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "locale": "es" }));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::with_session("abc");
        assert_eq!(storage.load().unwrap().as_deref(), Some("abc"));
        storage.remove().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
