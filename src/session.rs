//! In-memory session registry
//!
//! Sessions are created lazily on first reference and live for the lifetime
//! of the process. The registry map lock only covers the existence check and
//! insert; each entry carries its own history lock so that at most one agent
//! run mutates a session at a time while other sessions proceed freely.

use crate::conversation::{Conversation, MessageCount};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, RwLock};

/// Scratch values remembered alongside a session's history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionScratch {
    /// Reference of the artifact most recently analyzed in this session
    pub last_artifact: Option<String>,
}

/// Shared handle to a session's scratch values
#[derive(Debug, Clone, Default)]
pub struct ScratchHandle(Arc<Mutex<SessionScratch>>);

impl ScratchHandle {
    pub fn snapshot(&self) -> SessionScratch {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn record_artifact(&self, artifact: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_artifact = Some(artifact.into());
    }
}

/// One conversation session
#[derive(Debug)]
pub struct SessionEntry {
    id: String,
    created_at: DateTime<Utc>,
    conversation: AsyncMutex<Conversation>,
    message_count: MessageCount,
    scratch: ScratchHandle,
}

impl SessionEntry {
    fn new(id: String) -> Self {
        let conversation = Conversation::new();
        Self {
            id,
            created_at: Utc::now(),
            message_count: conversation.count(),
            conversation: AsyncMutex::new(conversation),
            scratch: ScratchHandle::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Exclusive access to the history. Held for a whole agent run, so
    /// concurrent requests for the same session queue here.
    pub async fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.conversation.lock().await
    }

    /// Current history length, readable while a run holds the lock
    pub fn message_count(&self) -> usize {
        self.message_count.get()
    }

    pub fn scratch(&self) -> &ScratchHandle {
        &self.scratch
    }
}

/// Registry of live sessions, keyed by session id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a session, creating it if the id is absent or unknown.
    ///
    /// A missing id gets a fresh UUID. Concurrent calls for the same new id
    /// create exactly one entry.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> (String, Arc<SessionEntry>) {
        let id = session_id.map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string);

        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(&id) {
                return (id, Arc::clone(entry));
            }
        }

        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "Created session");
                Arc::new(SessionEntry::new(id.clone()))
            })
            .clone();
        let count = sessions.len();
        drop(sessions);

        tracing::debug!(session_id = %id, sessions = count, "Resolved session");
        (id, entry)
    }

    /// Look up an existing session without creating it
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Number of live sessions. Sessions are never evicted, so this only grows.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
