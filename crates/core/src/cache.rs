use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::domain::deliverable::{DraftMetadata, EmailDraftDeliverable};
use crate::domain::run::RunOutcome;

/// Deterministic fingerprint over run identity plus input metadata.
///
/// The digest input is rebuilt through `serde_json::to_value`, whose object
/// map keeps keys sorted, so source-level field ordering can never change the
/// key. Two attempts with the same run id and semantically equal metadata
/// always collide; the draft text itself is deliberately excluded, making
/// this a run-identity dedup rather than a text-content dedup.
pub fn compute_cache_key(run_id: &str, metadata: &DraftMetadata) -> String {
    let canonical = json!({
        "metadata": serde_json::to_value(metadata).unwrap_or(Value::Null),
        "runId": run_id,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hasher.finalize().iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Result of a `record` call: the canonical deliverable for the fingerprint
/// (the previously stored one on a hit), whether the call repeated prior
/// work, and the key it resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedDeliverable {
    pub deliverable: EmailDraftDeliverable,
    pub identical_to_existing: bool,
    pub cache_key: String,
}

/// Content-addressed deliverable store. Entries are never updated in place;
/// once a fingerprint is recorded it stays bound to its first deliverable.
pub trait DeliverableStore: Send + Sync {
    fn record(&self, run_id: &str, deliverable: EmailDraftDeliverable) -> RecordedDeliverable;
    fn get(&self, cache_key: &str) -> Option<EmailDraftDeliverable>;
    fn get_outcome(&self, run_id: &str) -> Option<RunOutcome>;
    /// Clears all entries and outcomes. Test isolation only.
    fn reset(&self);
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, EmailDraftDeliverable>,
    outcomes: HashMap<String, RunOutcome>,
}

/// Process-wide in-memory store shared across requests by cloning the handle.
#[derive(Clone, Default)]
pub struct InMemoryDeliverableCache {
    inner: Arc<Mutex<CacheState>>,
}

impl InMemoryDeliverableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.lock_state().entries.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DeliverableStore for InMemoryDeliverableCache {
    fn record(&self, run_id: &str, deliverable: EmailDraftDeliverable) -> RecordedDeliverable {
        let cache_key = compute_cache_key(run_id, &deliverable.metadata);
        let mut state = self.lock_state();

        if let Some(previous) = state.outcomes.get(run_id) {
            if previous.cache_key != cache_key {
                warn!(
                    event_name = "cache.run_key_divergence",
                    run_id,
                    previous_key = %previous.cache_key,
                    cache_key = %cache_key,
                    "run id re-recorded with different metadata; earlier entry retained"
                );
            }
        }

        let (stored, identical_to_existing) = match state.entries.get(&cache_key) {
            Some(existing) => (existing.clone(), true),
            None => {
                state.entries.insert(cache_key.clone(), deliverable.clone());
                (deliverable, false)
            }
        };

        // Outcome is replaced even on a cache hit; latest invocation wins.
        state.outcomes.insert(
            run_id.to_string(),
            RunOutcome {
                run_id: run_id.to_string(),
                cache_key: cache_key.clone(),
                identical_to_existing,
                recorded_at: Utc::now(),
            },
        );

        RecordedDeliverable { deliverable: stored, identical_to_existing, cache_key }
    }

    fn get(&self, cache_key: &str) -> Option<EmailDraftDeliverable> {
        self.lock_state().entries.get(cache_key).cloned()
    }

    fn get_outcome(&self, run_id: &str) -> Option<RunOutcome> {
        self.lock_state().outcomes.get(run_id).cloned()
    }

    fn reset(&self) {
        let mut state = self.lock_state();
        state.entries.clear();
        state.outcomes.clear();
    }
}
