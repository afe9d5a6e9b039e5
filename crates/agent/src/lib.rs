//! Orchestration layer for the email-drafting agent flow.
//!
//! This crate turns a raw draft request into a uniform result envelope:
//! 1. **Validation** - parse the payload into a typed input
//! 2. **Guardrails** - reject disallowed content before any generation work
//! 3. **Dispatch** - orchestrated (model-backed) path when a provider is
//!    configured, deterministic fallback otherwise
//! 4. **Recording** - every produced deliverable funnels through the shared
//!    deliverable cache, so repeated runs converge on one canonical artifact
//!
//! # Key Types
//!
//! - `DraftOrchestrator` - the single entry point (see `driver`)
//! - `AgentRuntime` - pluggable trait for the external agent capability
//!
//! # Failure Masking
//!
//! An orchestrated-path failure is logged and transparently retried through
//! the fallback generator; the caller only ever sees `fallback_used = true`.
//! This masking is confined to that one step.

pub mod driver;
pub mod runtime;

pub use driver::{DraftEnvelope, DraftOrchestrator, DraftOutcome, DraftRejection};
pub use runtime::AgentRuntime;
