use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use draftsmith_core::cache::{DeliverableStore, RecordedDeliverable};
use draftsmith_core::domain::deliverable::{DraftContent, DraftMetadata, EmailDraftDeliverable};
use draftsmith_core::domain::request::{EmailDraftAgentInput, EmailDraftRequest};
use draftsmith_core::domain::run::RunContext;
use draftsmith_core::errors::OrchestrationFailure;
use draftsmith_core::fallback::FallbackGenerator;
use draftsmith_core::guardrail::GuardrailPolicy;
use draftsmith_core::session::{HistoryItem, SessionStore};

use crate::runtime::AgentRuntime;

pub const WORKFLOW_ID: &str = "email-draft";
const INTENT: &str = "email-draft.generate";

/// Successful result envelope. Uniform regardless of which path produced the
/// deliverable; never partial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEnvelope {
    pub draft: DraftContent,
    pub metadata: DraftMetadata,
    pub cache_key: String,
    pub run_id: String,
    pub thread_id: String,
    pub identical_to_existing: bool,
    pub provider_configured: bool,
    pub fallback_used: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRejection {
    pub error: String,
    pub provider_configured: bool,
}

/// Terminal state of one driver invocation. The caller can always tell
/// "your input was wrong" from "a deliverable was produced"; there is no
/// state in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftOutcome {
    Delivered(DraftEnvelope),
    Rejected(DraftRejection),
}

/// Single entry point for the email-draft flow: validates, runs guardrails,
/// dispatches to the orchestrated or fallback path, and records the result
/// in the shared deliverable cache.
pub struct DraftOrchestrator {
    store: Arc<dyn DeliverableStore>,
    sessions: SessionStore,
    guardrails: GuardrailPolicy,
    generator: FallbackGenerator,
    runtime: Option<Arc<dyn AgentRuntime>>,
    provider_configured: bool,
}

impl DraftOrchestrator {
    pub fn new(store: Arc<dyn DeliverableStore>, sessions: SessionStore) -> Self {
        Self {
            store,
            sessions,
            guardrails: GuardrailPolicy::default(),
            generator: FallbackGenerator::new(),
            runtime: None,
            provider_configured: false,
        }
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn AgentRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_provider_configured(mut self, configured: bool) -> Self {
        self.provider_configured = configured;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Validate -> Guard -> Dispatch -> (Orchestrated | Fallback) -> record,
    /// strictly in that order. An `Err` from this method is a
    /// programming-error-class failure (an invalid fallback deliverable),
    /// not a runtime condition.
    pub async fn handle(&self, request: EmailDraftRequest) -> Result<DraftOutcome> {
        let provider_configured = self.provider_configured;

        let input = match request.validate() {
            Ok(input) => input,
            Err(error) => {
                return Ok(DraftOutcome::Rejected(DraftRejection {
                    error: error.to_string(),
                    provider_configured,
                }));
            }
        };

        if let Err(violation) = self.guardrails.evaluate(&input) {
            return Ok(DraftOutcome::Rejected(DraftRejection {
                error: violation.reason,
                provider_configured,
            }));
        }

        let base_context = match &request.run_id {
            Some(run_id) => RunContext::with_run_id(run_id, WORKFLOW_ID, INTENT),
            None => RunContext::new(WORKFLOW_ID, INTENT),
        };
        let (thread_id, session) =
            self.sessions.get_or_create(request.thread_id.as_deref(), &base_context);
        let context = base_context
            .for_thread(thread_id.clone())
            .with_payload(serde_json::to_value(&input).unwrap_or(Value::Null));
        self.sessions.update_context(&thread_id, &context);

        if let (Some(runtime), true) = (&self.runtime, provider_configured) {
            match self.orchestrated(runtime.as_ref(), &input, &context, &thread_id, session.history).await
            {
                Ok(envelope) => return Ok(DraftOutcome::Delivered(envelope)),
                Err(failure) => {
                    // Deliberate partial-failure masking: the original error
                    // is logged here and never surfaced to the caller.
                    warn!(
                        event_name = "orchestration.fallback_engaged",
                        run_id = %context.run_id,
                        thread_id = %thread_id,
                        reason = %failure,
                        "orchestrated path failed; retrying via fallback generator"
                    );
                }
            }
        }

        let recorded = self
            .generator
            .generate_and_record(&input, &context, self.store.as_ref())
            .map_err(|error| {
                anyhow!("fallback generator produced an invalid deliverable: {error}")
            })?;

        info!(
            event_name = "orchestration.delivered",
            run_id = %context.run_id,
            thread_id = %thread_id,
            cache_key = %recorded.cache_key,
            identical_to_existing = recorded.identical_to_existing,
            fallback_used = true,
            "deliverable recorded via fallback path"
        );

        Ok(DraftOutcome::Delivered(envelope_from(
            recorded,
            context.run_id,
            thread_id,
            provider_configured,
            true,
        )))
    }

    async fn orchestrated(
        &self,
        runtime: &dyn AgentRuntime,
        input: &EmailDraftAgentInput,
        context: &RunContext,
        thread_id: &str,
        mut conversation: Vec<HistoryItem>,
    ) -> std::result::Result<DraftEnvelope, OrchestrationFailure> {
        conversation.push(HistoryItem::user(describe_request(input)));

        // Snapshot before the call: an outcome left behind by an earlier
        // invocation of the same run id must not pass for a fresh recording.
        let prior_outcome = self.store.get_outcome(&context.run_id);

        // The single suspension point of the whole flow.
        let history = runtime
            .run(&conversation, context)
            .await
            .map_err(|error| OrchestrationFailure::Runtime(error.to_string()))?;

        self.sessions.update_history(thread_id, history);

        let outcome = self
            .store
            .get_outcome(&context.run_id)
            .filter(|outcome| prior_outcome.as_ref() != Some(outcome))
            .ok_or_else(|| OrchestrationFailure::NoDeliverable(context.run_id.clone()))?;
        let deliverable = self
            .store
            .get(&outcome.cache_key)
            .ok_or_else(|| OrchestrationFailure::NoDeliverable(context.run_id.clone()))?;

        info!(
            event_name = "orchestration.delivered",
            run_id = %context.run_id,
            thread_id = %thread_id,
            cache_key = %outcome.cache_key,
            identical_to_existing = outcome.identical_to_existing,
            fallback_used = false,
            "deliverable recorded via orchestrated path"
        );

        Ok(envelope_from(
            RecordedDeliverable {
                deliverable,
                identical_to_existing: outcome.identical_to_existing,
                cache_key: outcome.cache_key,
            },
            context.run_id.clone(),
            thread_id.to_string(),
            self.provider_configured,
            false,
        ))
    }
}

fn envelope_from(
    recorded: RecordedDeliverable,
    run_id: String,
    thread_id: String,
    provider_configured: bool,
    fallback_used: bool,
) -> DraftEnvelope {
    let EmailDraftDeliverable { draft, metadata, .. } = recorded.deliverable;
    DraftEnvelope {
        draft,
        metadata,
        cache_key: recorded.cache_key,
        run_id,
        thread_id,
        identical_to_existing: recorded.identical_to_existing,
        provider_configured,
        fallback_used,
    }
}

fn describe_request(input: &EmailDraftAgentInput) -> String {
    let mut description = format!(
        "Draft an email to {} in a {} tone covering: {}.",
        input.recipient,
        input.tone,
        input.key_points.join("; ")
    );
    if let Some(context) = &input.additional_context {
        description.push_str(&format!(" Additional context: {context}"));
    }
    description
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use draftsmith_core::cache::{DeliverableStore, InMemoryDeliverableCache};
    use draftsmith_core::domain::deliverable::{DraftContent, EmailDraftDeliverable};
    use draftsmith_core::domain::request::{EmailDraftAgentInput, EmailDraftRequest};
    use draftsmith_core::domain::run::RunContext;
    use draftsmith_core::session::{HistoryItem, SessionStore};

    use super::{DraftOrchestrator, DraftOutcome};
    use crate::runtime::AgentRuntime;

    /// Stand-in for the external agent framework: records a deliverable into
    /// the shared store under the run id, like a real tool call would.
    struct RecordingRuntime {
        store: InMemoryDeliverableCache,
    }

    #[async_trait]
    impl AgentRuntime for RecordingRuntime {
        async fn run(
            &self,
            conversation: &[HistoryItem],
            context: &RunContext,
        ) -> Result<Vec<HistoryItem>> {
            let payload = context.payload.clone().ok_or_else(|| anyhow!("payload missing"))?;
            let input: EmailDraftAgentInput = serde_json::from_value(payload)?;

            let deliverable = EmailDraftDeliverable::new(
                DraftContent {
                    subject: format!("Model draft for {}", input.recipient),
                    body: "A model-produced body with plenty of detail to satisfy checks."
                        .to_string(),
                    variants: Vec::new(),
                },
                input.metadata(),
            );
            self.store.record(&context.run_id, deliverable);

            let mut history = conversation.to_vec();
            history.push(HistoryItem::assistant("Drafted the email."));
            Ok(history)
        }
    }

    struct FailingRuntime;

    #[async_trait]
    impl AgentRuntime for FailingRuntime {
        async fn run(&self, _: &[HistoryItem], _: &RunContext) -> Result<Vec<HistoryItem>> {
            Err(anyhow!("model provider unavailable"))
        }
    }

    /// Completes without recording any deliverable.
    struct SilentRuntime;

    #[async_trait]
    impl AgentRuntime for SilentRuntime {
        async fn run(
            &self,
            conversation: &[HistoryItem],
            _: &RunContext,
        ) -> Result<Vec<HistoryItem>> {
            Ok(conversation.to_vec())
        }
    }

    fn request() -> EmailDraftRequest {
        EmailDraftRequest {
            recipient: "Alex Rivera".to_string(),
            tone: "friendly".to_string(),
            key_points: vec![
                "Confirm deployment timeline".to_string(),
                "Highlight compliance summary".to_string(),
            ],
            additional_context: Some(
                "Reference the updated pricing schedule from 11/10.".to_string(),
            ),
            variants: Some(2),
            thread_id: None,
            run_id: None,
        }
    }

    fn fallback_only() -> (DraftOrchestrator, InMemoryDeliverableCache) {
        let cache = InMemoryDeliverableCache::new();
        let orchestrator =
            DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new());
        (orchestrator, cache)
    }

    fn envelope(outcome: DraftOutcome) -> super::DraftEnvelope {
        match outcome {
            DraftOutcome::Delivered(envelope) => envelope,
            DraftOutcome::Rejected(rejection) => {
                panic!("expected delivery, got rejection: {}", rejection.error)
            }
        }
    }

    #[tokio::test]
    async fn validation_failure_rejects_with_joined_messages() {
        let (orchestrator, cache) = fallback_only();
        let mut bad = request();
        bad.key_points.clear();
        bad.recipient = "A".to_string();

        let outcome = orchestrator.handle(bad).await.expect("driver must not error");
        match outcome {
            DraftOutcome::Rejected(rejection) => {
                assert!(rejection.error.contains("key point"));
                assert!(rejection.error.contains("recipient"));
                assert!(!rejection.provider_configured);
            }
            DraftOutcome::Delivered(_) => panic!("invalid input must be rejected"),
        }
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn guardrail_violation_rejects_and_caches_nothing() {
        let (orchestrator, cache) = fallback_only();
        let mut disallowed = request();
        disallowed.key_points = vec!["Share password details".to_string()];

        let outcome = orchestrator.handle(disallowed).await.expect("driver must not error");
        match outcome {
            DraftOutcome::Rejected(rejection) => {
                assert!(rejection.error.to_lowercase().contains("sensitive information"));
            }
            DraftOutcome::Delivered(_) => panic!("disallowed input must be rejected"),
        }
        assert_eq!(cache.entry_count(), 0);
        assert!(orchestrator.sessions().is_empty());
    }

    #[tokio::test]
    async fn no_provider_routes_to_fallback() {
        let (orchestrator, _) = fallback_only();

        let envelope = envelope(orchestrator.handle(request()).await.expect("delivery"));
        assert!(envelope.fallback_used);
        assert!(!envelope.provider_configured);
        assert!(!envelope.identical_to_existing);
        assert_eq!(envelope.cache_key.len(), 64);
        assert!(!envelope.thread_id.is_empty());
    }

    #[tokio::test]
    async fn orchestrated_path_delivers_without_fallback() {
        let cache = InMemoryDeliverableCache::new();
        let orchestrator = DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new())
            .with_runtime(Arc::new(RecordingRuntime { store: cache.clone() }))
            .with_provider_configured(true);

        let envelope = envelope(orchestrator.handle(request()).await.expect("delivery"));
        assert!(!envelope.fallback_used);
        assert!(envelope.provider_configured);
        assert_eq!(envelope.draft.subject, "Model draft for Alex Rivera");
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn runtime_error_is_masked_by_fallback() {
        let cache = InMemoryDeliverableCache::new();
        let orchestrator = DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new())
            .with_runtime(Arc::new(FailingRuntime))
            .with_provider_configured(true);

        let envelope = envelope(orchestrator.handle(request()).await.expect("delivery"));
        assert!(envelope.fallback_used);
        assert!(envelope.provider_configured);
    }

    #[tokio::test]
    async fn run_without_recorded_deliverable_falls_back() {
        let cache = InMemoryDeliverableCache::new();
        let orchestrator = DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new())
            .with_runtime(Arc::new(SilentRuntime))
            .with_provider_configured(true);

        let envelope = envelope(orchestrator.handle(request()).await.expect("delivery"));
        assert!(envelope.fallback_used);
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn repeated_run_id_is_identical_on_second_call() {
        let (orchestrator, _) = fallback_only();
        let mut fixed = request();
        fixed.run_id = Some("cached-run".to_string());

        let first = envelope(orchestrator.handle(fixed.clone()).await.expect("delivery"));
        let second = envelope(orchestrator.handle(fixed).await.expect("delivery"));

        assert!(!first.identical_to_existing);
        assert!(second.identical_to_existing);
        assert_eq!(second.cache_key, first.cache_key);
        assert_eq!(second.draft.body, first.draft.body);
    }

    #[tokio::test]
    async fn stale_outcome_from_earlier_run_does_not_pass_for_a_recording() {
        // First call lands a deliverable via fallback under a fixed run id.
        // The second call runs orchestrated with a runtime that records
        // nothing; the leftover outcome must not be mistaken for a fresh
        // recording, and the retry must converge on the cached deliverable.
        let cache = InMemoryDeliverableCache::new();
        let sessions = SessionStore::new();
        let degraded = DraftOrchestrator::new(Arc::new(cache.clone()), sessions.clone());
        let orchestrated = DraftOrchestrator::new(Arc::new(cache.clone()), sessions)
            .with_runtime(Arc::new(SilentRuntime))
            .with_provider_configured(true);

        let mut fixed = request();
        fixed.run_id = Some("retry-run".to_string());

        let first = envelope(degraded.handle(fixed.clone()).await.expect("delivery"));
        let second = envelope(orchestrated.handle(fixed).await.expect("delivery"));

        assert!(!first.identical_to_existing);
        assert!(second.fallback_used);
        assert!(second.identical_to_existing);
        assert_eq!(second.cache_key, first.cache_key);
        assert_eq!(second.draft.body, first.draft.body);
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn second_call_converges_across_paths() {
        // First call runs orchestrated, second has no provider; both share
        // the store and key derivation, so the second repeats the first.
        let cache = InMemoryDeliverableCache::new();
        let sessions = SessionStore::new();
        let orchestrated =
            DraftOrchestrator::new(Arc::new(cache.clone()), sessions.clone())
                .with_runtime(Arc::new(RecordingRuntime { store: cache.clone() }))
                .with_provider_configured(true);
        let degraded = DraftOrchestrator::new(Arc::new(cache.clone()), sessions);

        let mut fixed = request();
        fixed.run_id = Some("shared-run".to_string());

        let first = envelope(orchestrated.handle(fixed.clone()).await.expect("delivery"));
        let second = envelope(degraded.handle(fixed).await.expect("delivery"));

        assert!(!first.fallback_used);
        assert!(second.fallback_used);
        assert!(second.identical_to_existing);
        assert_eq!(second.cache_key, first.cache_key);
        // The stored orchestrated deliverable wins over the fallback text.
        assert_eq!(second.draft.subject, "Model draft for Alex Rivera");
    }

    #[tokio::test]
    async fn rerecording_run_id_on_orchestrated_path_stays_orchestrated() {
        // A runtime that does record again under a reused run id is a fresh
        // recording: the cache hit is reported, not a fallback.
        let cache = InMemoryDeliverableCache::new();
        let orchestrator = DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new())
            .with_runtime(Arc::new(RecordingRuntime { store: cache.clone() }))
            .with_provider_configured(true);

        let mut fixed = request();
        fixed.run_id = Some("replay-run".to_string());

        let first = envelope(orchestrator.handle(fixed.clone()).await.expect("delivery"));
        let second = envelope(orchestrator.handle(fixed).await.expect("delivery"));

        assert!(!second.fallback_used);
        assert!(second.identical_to_existing);
        assert_eq!(second.cache_key, first.cache_key);
    }

    #[tokio::test]
    async fn orchestrated_run_replaces_session_history() {
        let cache = InMemoryDeliverableCache::new();
        let orchestrator = DraftOrchestrator::new(Arc::new(cache.clone()), SessionStore::new())
            .with_runtime(Arc::new(RecordingRuntime { store: cache }))
            .with_provider_configured(true);

        let mut threaded = request();
        threaded.thread_id = Some("thread-1".to_string());

        let envelope = envelope(orchestrator.handle(threaded).await.expect("delivery"));
        assert_eq!(envelope.thread_id, "thread-1");

        let session = orchestrator.sessions().get("thread-1").expect("session exists");
        assert_eq!(session.history.len(), 2);
        assert!(matches!(
            session.history.last(),
            Some(HistoryItem::Message { role, .. }) if role == "assistant"
        ));
    }
}
