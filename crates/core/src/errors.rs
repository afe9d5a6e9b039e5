use thiserror::Error;

/// Malformed or missing required input fields. Surfaced to the caller as a
/// rejected result with the joined field-level messages; never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("validation failed: {}", .messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// Well-formed but policy-disallowed input. Surfaced as a distinct rejection
/// reason; never downgraded to the fallback path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct GuardrailViolation {
    pub reason: String,
}

impl GuardrailViolation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The orchestrated path failed. Logged and masked by the driver, which
/// retries through the fallback generator; never crosses the driver boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrchestrationFailure {
    #[error("agent runtime call failed: {0}")]
    Runtime(String),
    #[error("agent run `{0}` completed without recording a deliverable")]
    NoDeliverable(String),
}
