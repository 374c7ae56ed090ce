//! Session store — per-visitor conversation history, kept in process memory.
//!
//! Every session sits behind its own async mutex. A chat exchange holds that
//! lock from the moment it reads the history until the reply is appended, so
//! two requests carrying the same session id are applied one after the other
//! instead of racing on the turn list. Sessions are never evicted and never
//! written to disk; they live as long as the store does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{RagDeskError, Result};
use crate::message::Turn;

/// Default cap on the number of turns a session retains.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Conversation state for a single session.
#[derive(Debug, Clone)]
pub struct Session {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Session {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Turns in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, then trim back down to the cap.
    pub fn append(&mut self, turn: Turn) {
        self.push(turn);
        self.trim();
    }

    /// Append a turn without trimming. The history may run one over the cap
    /// until the next [`Session::append`] or [`Session::trim`].
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop the oldest turns until at most `max_turns` remain.
    pub fn trim(&mut self) {
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }

    /// Replace the whole history. The cap still applies.
    pub fn save(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
        self.trim();
    }
}

/// Shared handle to one session's state.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Session store — maps session ids to their histories.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        // The map is only ever touched for inserts and lookups, so a panic
        // elsewhere cannot leave it half-updated.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve a session by id, creating a fresh one when the id is absent
    /// or not known to this store.
    ///
    /// Returns the effective id, which differs from the given one whenever a
    /// new session had to be created.
    pub fn get_or_create(&self, session_id: Option<&str>) -> (String, SessionHandle) {
        let mut sessions = self.map();

        if let Some(id) = session_id {
            if let Some(handle) = sessions.get(id) {
                return (id.to_string(), handle.clone());
            }
        }

        let id = generate_session_id();
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(self.max_turns)));
        sessions.insert(id.clone(), handle.clone());
        (id, handle)
    }

    /// Look up an existing session.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.map().get(session_id).cloned()
    }

    fn require(&self, session_id: &str) -> Result<SessionHandle> {
        self.get(session_id)
            .ok_or_else(|| RagDeskError::Other(format!("Unknown session: {}", session_id)))
    }

    /// Append a turn to an existing session.
    pub async fn append(&self, session_id: &str, turn: Turn) -> Result<()> {
        let handle = self.require(session_id)?;
        handle.lock().await.append(turn);
        Ok(())
    }

    /// Trim an existing session to the store's cap.
    pub async fn trim(&self, session_id: &str) -> Result<()> {
        let handle = self.require(session_id)?;
        handle.lock().await.trim();
        Ok(())
    }

    /// Replace the stored history of an existing session.
    pub async fn save(&self, session_id: &str, turns: Vec<Turn>) -> Result<()> {
        let handle = self.require(session_id)?;
        handle.lock().await.save(turns);
        Ok(())
    }

    /// Snapshot of a session's turns.
    pub async fn turns(&self, session_id: &str) -> Option<Vec<Turn>> {
        let handle = self.get(session_id)?;
        let session = handle.lock().await;
        Some(session.turns().to_vec())
    }

    /// Forget a session.
    pub fn remove(&self, session_id: &str) -> bool {
        self.map().remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.map().contains_key(session_id)
    }

    /// Total number of sessions held.
    pub fn count(&self) -> usize {
        self.map().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a new session id: creation time in millis plus a random suffix.
fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_trim_keeps_newest_in_order() {
        let mut session = Session::new(3);
        for i in 0..5 {
            session.append(Turn::user(&format!("m{}", i)));
        }
        let contents: Vec<&str> = session.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_push_defers_trim_to_next_append() {
        let mut session = Session::new(2);
        session.append(Turn::user("q1"));
        session.append(Turn::assistant("a1"));
        session.push(Turn::user("q2"));
        assert_eq!(session.len(), 3);

        session.append(Turn::assistant("a2"));
        let contents: Vec<&str> = session.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a2"]);
    }

    #[test]
    fn test_session_save_applies_cap() {
        let mut session = Session::new(2);
        session.save(vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")]);
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0], Turn::assistant("b"));
    }

    #[test]
    fn test_get_or_create_without_id_creates_session() {
        let store = SessionStore::new();
        let (id, _) = store.get_or_create(None);
        assert!(id.starts_with("session_"));
        assert!(store.contains(&id));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_get_or_create_reuses_known_id() {
        let store = SessionStore::new();
        let (id, first) = store.get_or_create(None);
        let (again, second) = store.get_or_create(Some(&id));
        assert_eq!(id, again);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_get_or_create_replaces_unknown_id() {
        let store = SessionStore::new();
        let (id, _) = store.get_or_create(Some("session_stale"));
        assert_ne!(id, "session_stale");
        assert!(!store.contains("session_stale"));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[tokio::test]
    async fn test_store_operations() {
        let store = SessionStore::with_max_turns(4);
        let (id, _) = store.get_or_create(None);

        store.append(&id, Turn::user("q1")).await.unwrap();
        store.append(&id, Turn::assistant("a1")).await.unwrap();
        assert_eq!(store.turns(&id).await.unwrap().len(), 2);

        store
            .save(&id, (0..6).map(|i| Turn::user(&i.to_string())).collect())
            .await
            .unwrap();
        let turns = store.turns(&id).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "2");

        store.trim(&id).await.unwrap();
        assert_eq!(store.turns(&id).await.unwrap().len(), 4);

        assert!(store.remove(&id));
        assert!(store.append(&id, Turn::user("late")).await.is_err());
    }
}
