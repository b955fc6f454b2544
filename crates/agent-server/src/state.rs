//! Application State

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use agent_core::{Agent, LlmProvider, MemorySessionStore};

type ThreadLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The agent loop, with its tool box
    pub agent: Arc<Agent>,

    /// Model backend, for health and model listing
    pub provider: Arc<dyn LlmProvider>,

    /// Conversation threads keyed by thread id
    pub sessions: Arc<MemorySessionStore>,

    thread_locks: ThreadLocks,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_session_capacity(agent, provider, MemorySessionStore::DEFAULT_CAPACITY)
    }

    pub fn with_session_capacity(agent: Arc<Agent>, provider: Arc<dyn LlmProvider>, capacity: usize) -> Self {
        Self {
            agent,
            provider,
            sessions: Arc::new(MemorySessionStore::with_capacity(capacity)),
            thread_locks: Arc::default(),
        }
    }

    /// Serialize loop runs against one thread. The entry is dropped from the
    /// lock table once the last holder or waiter lets go.
    pub async fn lock_thread(&self, thread_id: &str) -> ThreadGuard {
        let lock = self
            .thread_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread_id.to_string())
            .or_default()
            .clone();

        ThreadGuard {
            thread_id: thread_id.to_string(),
            guard: Some(lock.lock_owned().await),
            locks: self.thread_locks.clone(),
        }
    }

    /// Threads with a request in flight or queued
    pub fn active_threads(&self) -> usize {
        self.thread_locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct ThreadGuard {
    thread_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: ThreadLocks,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // only the table still references the lock: nobody is waiting on it
        if locks.get(&self.thread_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.thread_id);
        }
    }
}
