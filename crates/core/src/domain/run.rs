use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of one logical generation attempt. Immutable once created; the
/// builder methods consume and return a new context rather than mutating.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    pub run_id: String,
    pub thread_id: Option<String>,
    pub workflow_id: String,
    pub intent: String,
    pub created_at: DateTime<Utc>,
    pub payload: Option<Value>,
}

impl RunContext {
    pub fn new(workflow_id: impl Into<String>, intent: impl Into<String>) -> Self {
        Self::with_run_id(Uuid::new_v4().to_string(), workflow_id, intent)
    }

    /// Used when the caller supplies its own run id, e.g. an idempotent retry
    /// of a previous attempt.
    pub fn with_run_id(
        run_id: impl Into<String>,
        workflow_id: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            thread_id: None,
            workflow_id: workflow_id.into(),
            intent: intent.into(),
            created_at: Utc::now(),
            payload: None,
        }
    }

    pub fn for_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Per-run record of which cache key an attempt resolved to and whether it
/// repeated prior work. Replaced wholesale when the same run id is recorded
/// again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: String,
    pub cache_key: String,
    pub identical_to_existing: bool,
    pub recorded_at: DateTime<Utc>,
}
