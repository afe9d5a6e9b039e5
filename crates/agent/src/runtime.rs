use anyhow::Result;
use async_trait::async_trait;

use draftsmith_core::domain::run::RunContext;
use draftsmith_core::session::HistoryItem;

/// The external agent capability: given the conversation so far and the run
/// context, produce the updated history. Implementations are expected to
/// record any deliverable they produce into the shared deliverable store
/// under `context.run_id`; the driver checks for that record afterwards.
///
/// This is the single suspension point of the whole flow and the only place
/// a slow or failure-prone external call happens.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(
        &self,
        conversation: &[HistoryItem],
        context: &RunContext,
    ) -> Result<Vec<HistoryItem>>;
}
