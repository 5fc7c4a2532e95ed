//! Debounced autosave scheduling
//!
//! Interactive sessions mutate the message list turn by turn; committing
//! the whole document on every turn is correct but wasteful against a
//! quota-bounded store. The scheduler batches mutations behind an idle
//! window: every observed mutation re-arms the deadline, and only an
//! uninterrupted window triggers a repository commit.

use crate::error::is_not_found;
use crate::history::repository::ConversationRepository;
use crate::history::types::Message;
use crate::store::BlobStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Latest observed session state, shared with the deadline task
struct SessionState {
    active_id: Option<String>,
    messages: Vec<Message>,
    character_description: Option<String>,
    dirty: bool,
}

struct SchedulerShared<S: BlobStore> {
    repository: Arc<Mutex<ConversationRepository<S>>>,
    session: Mutex<SessionState>,
}

/// Debounced commit coordinator sitting above the repository
///
/// Two states: idle, or pending commit with an armed deadline. Each
/// mutation replaces the pending snapshot and re-arms the deadline;
/// when the deadline elapses uninterrupted, the snapshot is committed
/// via `update` (falling back to `create` when there is no active
/// conversation yet) and the active session pointer is refreshed.
///
/// Must be used from within a tokio runtime; the deadline is a spawned
/// `tokio::time::sleep` task.
pub struct AutosaveScheduler<S: BlobStore + Send + 'static> {
    shared: Arc<SchedulerShared<S>>,
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl<S: BlobStore + Send + 'static> AutosaveScheduler<S> {
    /// Create an idle scheduler over the shared repository
    pub fn new(repository: Arc<Mutex<ConversationRepository<S>>>, window: Duration) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                repository,
                session: Mutex::new(SessionState {
                    active_id: None,
                    messages: Vec::new(),
                    character_description: None,
                    dirty: false,
                }),
            }),
            window,
            pending: None,
        }
    }

    /// Adopt an existing conversation as the active session
    ///
    /// Subsequent commits update that record instead of creating a new
    /// one. Passing `None` starts a fresh session.
    pub fn set_active(&mut self, id: Option<String>) {
        let mut session = self.shared.session.lock().unwrap();
        session.active_id = id;
        session.dirty = false;
    }

    /// Id of the conversation the session is bound to, if any
    pub fn active_id(&self) -> Option<String> {
        self.shared.session.lock().unwrap().active_id.clone()
    }

    /// Observe a mutation of the in-memory message list
    ///
    /// Replaces the pending snapshot with the given state and re-arms
    /// the debounce deadline.
    pub fn record_mutation(&mut self, messages: &[Message], character_description: Option<&str>) {
        {
            let mut session = self.shared.session.lock().unwrap();
            session.messages = messages.to_vec();
            session.character_description = character_description.map(|s| s.to_string());
            session.dirty = true;
        }
        self.rearm();
    }

    /// Cancel any pending deadline without committing
    ///
    /// Used when the session is being abandoned or replaced.
    pub fn disable(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Cancel the pending deadline and commit immediately
    ///
    /// For explicit save actions; a no-op when nothing changed since
    /// the last commit.
    pub fn flush_now(&mut self) {
        self.disable();
        Self::commit(&self.shared);
    }

    /// True while a deadline is armed and has not fired
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn rearm(&mut self) {
        self.disable();
        let shared = Arc::clone(&self.shared);
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            Self::commit(&shared);
        }));
    }

    /// Commit the pending snapshot through the repository.
    ///
    /// Holds the session lock for the whole commit so a concurrent
    /// mutation cannot be marked clean without being persisted. Failures
    /// are logged, never propagated; the next mutation re-arms and
    /// retries naturally.
    fn commit(shared: &SchedulerShared<S>) {
        let mut session = shared.session.lock().unwrap();
        if !session.dirty || session.messages.is_empty() {
            return;
        }

        let mut repository = shared.repository.lock().unwrap();
        let character_description = session.character_description.clone();

        let committed = match &session.active_id {
            Some(id) => {
                match repository.update(id, &session.messages, character_description.as_deref()) {
                    Err(err) if is_not_found(&err) => {
                        // The active record was deleted or evicted under
                        // us: fall back to a fresh conversation.
                        tracing::debug!("Active conversation {} vanished, recreating", id);
                        repository.create(&session.messages, character_description.as_deref())
                    }
                    other => other,
                }
            }
            None => repository.create(&session.messages, character_description.as_deref()),
        };

        match committed {
            Ok(conversation) => {
                if let Err(err) = repository.set_current(&conversation.id) {
                    tracing::warn!("Failed to update session pointer: {}", err);
                }
                session.active_id = Some(conversation.id);
                session.dirty = false;
            }
            Err(err) => {
                tracing::warn!("Autosave commit failed, keeping state for retry: {}", err);
            }
        }
    }
}

impl<S: BlobStore + Send + 'static> Drop for AutosaveScheduler<S> {
    fn drop(&mut self) {
        self.disable();
    }
}
