use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

pub const DELIVERABLE_TYPE: &str = "email-draft";

pub const MIN_SUBJECT_CHARS: usize = 3;
pub const MIN_BODY_CHARS: usize = 25;
pub const MIN_VARIANT_BODY_CHARS: usize = 10;
pub const MAX_DELIVERABLE_VARIANTS: usize = 4;

/// Echo of the originating input, carried on every deliverable and used as
/// one half of the cache fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    pub recipient: String,
    pub tone: String,
    pub key_points: Vec<String>,
    pub additional_context: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftVariant {
    pub label: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftContent {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub variants: Vec<DraftVariant>,
}

/// The generated artifact returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraftDeliverable {
    #[serde(rename = "type")]
    pub kind: String,
    pub draft: DraftContent,
    pub metadata: DraftMetadata,
}

impl EmailDraftDeliverable {
    pub fn new(draft: DraftContent, metadata: DraftMetadata) -> Self {
        Self { kind: DELIVERABLE_TYPE.to_string(), draft, metadata }
    }

    /// Schema check over an assembled deliverable. Generators re-validate
    /// their own output through this; a failure there is a defect in the
    /// generator, not a runtime condition.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut messages = Vec::new();

        if self.kind != DELIVERABLE_TYPE {
            messages.push(format!("deliverable type must be `{DELIVERABLE_TYPE}`"));
        }
        if self.draft.subject.trim().chars().count() < MIN_SUBJECT_CHARS {
            messages.push(format!("subject must be at least {MIN_SUBJECT_CHARS} characters"));
        }
        if self.draft.body.trim().chars().count() < MIN_BODY_CHARS {
            messages.push(format!("body must be at least {MIN_BODY_CHARS} characters"));
        }
        if self.draft.variants.len() > MAX_DELIVERABLE_VARIANTS {
            messages.push(format!("at most {MAX_DELIVERABLE_VARIANTS} variants are allowed"));
        }
        for (index, variant) in self.draft.variants.iter().enumerate() {
            if variant.body.trim().chars().count() < MIN_VARIANT_BODY_CHARS {
                messages.push(format!(
                    "variant {index} body must be at least {MIN_VARIANT_BODY_CHARS} characters"
                ));
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(messages))
        }
    }
}
