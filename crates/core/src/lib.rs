pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fallback;
pub mod guardrail;
pub mod session;

pub use cache::{compute_cache_key, DeliverableStore, InMemoryDeliverableCache, RecordedDeliverable};
pub use domain::deliverable::{DraftContent, DraftMetadata, DraftVariant, EmailDraftDeliverable};
pub use domain::request::{EmailDraftAgentInput, EmailDraftRequest};
pub use domain::run::{RunContext, RunOutcome};
pub use errors::{GuardrailViolation, OrchestrationFailure, ValidationError};
pub use fallback::FallbackGenerator;
pub use guardrail::GuardrailPolicy;
pub use session::{HistoryItem, Session, SessionStore};
