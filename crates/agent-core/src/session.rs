//! Session Management
//!
//! Per-invocation loop state, plus thread checkpoints for multi-turn conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::message::History;

/// State owned by exactly one in-flight loop execution
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation history
    pub history: History,

    /// Assistant turns that requested tools during this invocation
    pub iteration: u32,

    /// Index of the first entry appended by this invocation
    #[serde(default)]
    pub turn_start: usize,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a checkpointed history; the iteration budget starts fresh.
    pub fn resume(history: History) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }
}

/// Unique session identifier (conversation thread id)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A checkpointed conversation thread
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history as of the last completed invocation
    pub history: History,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: History::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the checkpointed history and update the activity timestamp
    pub fn checkpoint(&mut self, history: History) {
        self.history = history;
        self.updated_at = Utc::now();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.history.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
///
/// Stores do not serialize concurrent runs against one id; callers must.
pub trait SessionStore: Send + Sync {
    /// Save a session
    fn save(&self, session: &Session) -> crate::Result<()>;

    /// Load a session by ID
    fn load(&self, id: &SessionId) -> crate::Result<Option<Session>>;

    /// Delete a session
    fn delete(&self, id: &SessionId) -> crate::Result<()>;
}

/// In-memory session store (for development/testing)
///
/// Holds at most `capacity` threads; saving a new thread into a full store
/// evicts the least recently updated one.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    capacity: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> crate::Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if !sessions.contains_key(&session.id) && sessions.len() >= self.capacity {
            let oldest = sessions
                .values()
                .min_by_key(|s| s.updated_at)
                .map(|s| s.id.clone());
            if let Some(id) = oldest {
                sessions.remove(&id);
                tracing::debug!(session = %id, "Evicted least recently updated session");
            }
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> crate::Result<Option<Session>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(id).cloned())
    }

    fn delete(&self, id: &SessionId) -> crate::Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id);
        Ok(())
    }
}
