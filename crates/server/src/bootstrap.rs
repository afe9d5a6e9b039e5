use std::sync::Arc;

use tracing::info;

use draftsmith_agent::{AgentRuntime, DraftOrchestrator};
use draftsmith_core::cache::InMemoryDeliverableCache;
use draftsmith_core::config::AppConfig;
use draftsmith_core::session::SessionStore;

pub struct Application {
    pub config: AppConfig,
    pub orchestrator: Arc<DraftOrchestrator>,
}

/// Wires the shared stores and the driver. The agent runtime is injected by
/// the embedder; without one, a configured provider still routes through the
/// fallback generator.
pub fn bootstrap_with_config(
    config: AppConfig,
    runtime: Option<Arc<dyn AgentRuntime>>,
) -> Application {
    let provider_configured = config.provider_configured();

    let mut orchestrator =
        DraftOrchestrator::new(Arc::new(InMemoryDeliverableCache::new()), SessionStore::new())
            .with_provider_configured(provider_configured);

    let runtime_registered = runtime.is_some();
    if let Some(runtime) = runtime {
        orchestrator = orchestrator.with_runtime(runtime);
    }

    info!(
        event_name = "system.bootstrap.ready",
        provider_configured,
        runtime_registered,
        "draft orchestrator wired"
    );

    if provider_configured && !runtime_registered {
        info!(
            event_name = "system.bootstrap.fallback_only",
            "provider credential present but no agent runtime registered; all requests use the fallback path"
        );
    }

    Application { config, orchestrator: Arc::new(orchestrator) }
}
