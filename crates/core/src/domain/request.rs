use serde::{Deserialize, Serialize};

use crate::domain::deliverable::DraftMetadata;
use crate::errors::ValidationError;

pub const MIN_RECIPIENT_CHARS: usize = 2;
pub const MIN_TONE_CHARS: usize = 3;
pub const MIN_KEY_POINT_CHARS: usize = 3;
pub const MAX_ADDITIONAL_CONTEXT_CHARS: usize = 2000;
pub const MIN_VARIANTS: i64 = 1;
pub const MAX_VARIANTS: i64 = 3;
pub const DEFAULT_VARIANTS: u8 = 2;

/// Raw request payload as received from the transport layer. Nothing here is
/// trusted until `validate` has produced an `EmailDraftAgentInput`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailDraftRequest {
    pub recipient: String,
    pub tone: String,
    pub key_points: Vec<String>,
    pub additional_context: Option<String>,
    pub variants: Option<i64>,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
}

impl EmailDraftRequest {
    /// Field-by-field validation. Collects every failure rather than stopping
    /// at the first so the caller sees the full list in one rejection.
    pub fn validate(&self) -> Result<EmailDraftAgentInput, ValidationError> {
        let mut messages = Vec::new();

        let recipient = self.recipient.trim();
        if recipient.chars().count() < MIN_RECIPIENT_CHARS {
            messages.push(format!("recipient must be at least {MIN_RECIPIENT_CHARS} characters"));
        }

        let tone = self.tone.trim();
        if tone.chars().count() < MIN_TONE_CHARS {
            messages.push(format!("tone must be at least {MIN_TONE_CHARS} characters"));
        }

        if self.key_points.is_empty() {
            messages.push("at least one key point is required".to_string());
        }
        for (index, point) in self.key_points.iter().enumerate() {
            if point.trim().chars().count() < MIN_KEY_POINT_CHARS {
                messages.push(format!(
                    "key point {index} must be at least {MIN_KEY_POINT_CHARS} characters"
                ));
            }
        }

        if let Some(context) = &self.additional_context {
            if context.chars().count() > MAX_ADDITIONAL_CONTEXT_CHARS {
                messages.push(format!(
                    "additional context must be at most {MAX_ADDITIONAL_CONTEXT_CHARS} characters"
                ));
            }
        }

        let variants = match self.variants {
            None => DEFAULT_VARIANTS,
            Some(requested) if (MIN_VARIANTS..=MAX_VARIANTS).contains(&requested) => {
                requested as u8
            }
            Some(requested) => {
                messages.push(format!(
                    "variants must be between {MIN_VARIANTS} and {MAX_VARIANTS}, got {requested}"
                ));
                DEFAULT_VARIANTS
            }
        };

        if !messages.is_empty() {
            return Err(ValidationError::new(messages));
        }

        Ok(EmailDraftAgentInput {
            recipient: recipient.to_string(),
            tone: tone.to_string(),
            key_points: self.key_points.iter().map(|point| point.trim().to_string()).collect(),
            additional_context: self
                .additional_context
                .as_deref()
                .map(str::trim)
                .filter(|context| !context.is_empty())
                .map(ToString::to_string),
            variants,
        })
    }
}

/// Validated structured request. Only ever produced via
/// `EmailDraftRequest::validate`; invalid input never reaches generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraftAgentInput {
    pub recipient: String,
    pub tone: String,
    pub key_points: Vec<String>,
    pub additional_context: Option<String>,
    pub variants: u8,
}

impl EmailDraftAgentInput {
    pub fn metadata(&self) -> DraftMetadata {
        DraftMetadata {
            recipient: self.recipient.clone(),
            tone: self.tone.clone(),
            key_points: self.key_points.clone(),
            additional_context: self.additional_context.clone(),
        }
    }
}
