use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::run::RunContext;

/// One item of a conversation exchanged with the agent runtime. History is
/// opaque data to this layer; the runtime produces it, the store keeps it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HistoryItem {
    Message { role: String, content: String },
    ToolCall { name: String, arguments: Value, output: Option<Value> },
}

impl HistoryItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message { role: "assistant".to_string(), content: content.into() }
    }
}

/// Per-thread conversation state: the history so far and the context of the
/// most recent run on the thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub history: Vec<HistoryItem>,
    pub context: RunContext,
}

/// Process-wide map from thread id to session. Lookups are total: every
/// thread id either resolves to an existing session or creates one.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a thread id to its session, creating the session (and the id,
    /// when absent) as needed. Never fails; two sessions never share an id.
    pub fn get_or_create(&self, thread_id: Option<&str>, context: &RunContext) -> (String, Session) {
        let id = match thread_id {
            Some(existing) => existing.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.lock_sessions();
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session { history: Vec::new(), context: context.clone() })
            .clone();

        (id, session)
    }

    /// Replaces the session's history wholesale. Silently no-ops on an
    /// unknown id; a stale thread id must never fail the request.
    pub fn update_history(&self, thread_id: &str, items: Vec<HistoryItem>) {
        let mut sessions = self.lock_sessions();
        if let Some(session) = sessions.get_mut(thread_id) {
            session.history = items;
        }
    }

    /// Records the context of the latest run on the thread. Same stale-id
    /// semantics as `update_history`.
    pub fn update_context(&self, thread_id: &str, context: &RunContext) {
        let mut sessions = self.lock_sessions();
        if let Some(session) = sessions.get_mut(thread_id) {
            session.context = context.clone();
        }
    }

    pub fn get(&self, thread_id: &str) -> Option<Session> {
        self.lock_sessions().get(thread_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_sessions().is_empty()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        match self.inner.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
