//! Chat client controller — owns the visible transcript and the
//! submit lifecycle of the chat widget.
//!
//! A submission goes `Idle → Submitting → Idle`. While one is in flight any
//! further submit is refused. Failures never surface raw detail: they add a
//! localized fallback message to the transcript instead of a reply.

pub mod storage;
pub mod transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tracing::warn;
use uuid::Uuid;

use ragdesk_core::locale::Locale;
use ragdesk_core::message::Role;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, SESSION_KEY};
pub use transport::{ChatTransport, HttpTransport};

/// One entry in the on-screen transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl DisplayMessage {
    fn new(role: Role, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.to_string(),
            timestamp: Local::now(),
        }
    }

    /// `HH:MM` label shown under the message.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Submitting,
}

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The server answered; the reply was appended.
    Replied(DisplayMessage),
    /// The exchange failed; the fallback message was appended.
    Failed(DisplayMessage),
    /// Nothing to send, or a submission is already in flight.
    Ignored,
}

/// Clears the in-flight flag however `submit` exits.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatController<T: ChatTransport, S: SessionStorage> {
    transport: T,
    storage: S,
    locale: Locale,
    transcript: Mutex<Vec<DisplayMessage>>,
    session_id: Mutex<Option<String>>,
    draft: Mutex<String>,
    submitting: AtomicBool,
}

fn lock<V>(m: &Mutex<V>) -> MutexGuard<'_, V> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: ChatTransport, S: SessionStorage> ChatController<T, S> {
    pub fn new(transport: T, storage: S, locale: Locale) -> Self {
        Self {
            transport,
            storage,
            locale,
            transcript: Mutex::new(Vec::new()),
            session_id: Mutex::new(None),
            draft: Mutex::new(String::new()),
            submitting: AtomicBool::new(false),
        }
    }

    /// Called when the widget opens: resume a remembered session id if the
    /// controller does not hold one yet.
    pub fn open(&self) {
        let mut current = lock(&self.session_id);
        if current.is_some() {
            return;
        }
        match self.storage.load() {
            Ok(saved) => *current = saved,
            Err(e) => warn!("Could not read saved session id: {}", e),
        }
    }

    pub fn transcript(&self) -> Vec<DisplayMessage> {
        lock(&self.transcript).clone()
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.session_id).clone()
    }

    pub fn state(&self) -> ClientState {
        if self.submitting.load(Ordering::Acquire) {
            ClientState::Submitting
        } else {
            ClientState::Idle
        }
    }

    /// Replace the text in the input field.
    pub fn set_draft(&self, text: &str) {
        *lock(&self.draft) = text.to_string();
    }

    pub fn draft(&self) -> String {
        lock(&self.draft).clone()
    }

    /// Submit whatever is in the input field.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let text = self.draft();
        self.submit(&text).await
    }

    /// Send a message and append the outcome to the transcript.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SubmitOutcome::Ignored;
        }
        let _in_flight = InFlight(&self.submitting);

        lock(&self.transcript).push(DisplayMessage::new(Role::User, text));
        lock(&self.draft).clear();

        let session_id = self.session_id();
        let result = self.transport.send(text, session_id.as_deref()).await;

        match result {
            Ok(reply) => {
                self.adopt_session(&reply.session_id);
                let message = DisplayMessage::new(Role::Assistant, &reply.message);
                lock(&self.transcript).push(message.clone());
                SubmitOutcome::Replied(message)
            }
            Err(e) => {
                warn!("Chat error: {}", e);
                let message = DisplayMessage::new(Role::Assistant, self.locale.text("chatbot.error"));
                lock(&self.transcript).push(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn adopt_session(&self, returned: &str) {
        if returned.is_empty() {
            return;
        }
        let mut current = lock(&self.session_id);
        if current.as_deref() == Some(returned) {
            return;
        }
        *current = Some(returned.to_string());
        if let Err(e) = self.storage.save(returned) {
            warn!("Could not persist session id: {}", e);
        }
    }

    /// Empty the transcript and forget the session, including the saved id.
    pub fn clear(&self) {
        lock(&self.transcript).clear();
        *lock(&self.session_id) = None;
        if let Err(e) = self.storage.remove() {
            warn!("Could not remove saved session id: {}", e);
        }
    }
}
