use crate::domain::request::EmailDraftAgentInput;
use crate::errors::GuardrailViolation;

/// One disallowed-content class: the lowercase marker searched for and the
/// human-readable category reported on a match. Whole-word markers only
/// match complete alphanumeric tokens, so short markers cannot fire inside
/// longer words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailMarker {
    pub pattern: &'static str,
    pub category: &'static str,
    pub whole_word: bool,
}

/// Pre-flight policy check over validated input. Synchronous and
/// side-effect-free; runs before any cache or session interaction so a
/// violating request never leaves a trace in shared state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    markers: Vec<GuardrailMarker>,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            markers: vec![
                GuardrailMarker {
                    pattern: "social security",
                    category: "a social security number",
                    whole_word: false,
                },
                GuardrailMarker {
                    pattern: "ssn",
                    category: "a social security number",
                    whole_word: true,
                },
                GuardrailMarker { pattern: "password", category: "a password", whole_word: false },
                GuardrailMarker {
                    pattern: "credit card",
                    category: "a credit card",
                    whole_word: false,
                },
                GuardrailMarker {
                    pattern: "card number",
                    category: "a card number",
                    whole_word: false,
                },
            ],
        }
    }
}

impl GuardrailPolicy {
    pub fn new(markers: Vec<GuardrailMarker>) -> Self {
        Self { markers }
    }

    pub fn evaluate(&self, input: &EmailDraftAgentInput) -> Result<(), GuardrailViolation> {
        let blob = self.searchable_text(input);
        for marker in &self.markers {
            let matched = if marker.whole_word {
                blob.split(|c: char| !c.is_alphanumeric()).any(|token| token == marker.pattern)
            } else {
                blob.contains(marker.pattern)
            };
            if matched {
                return Err(GuardrailViolation::new(format!(
                    "request contains sensitive information ({}); remove it and resubmit",
                    marker.category
                )));
            }
        }
        Ok(())
    }

    fn searchable_text(&self, input: &EmailDraftAgentInput) -> String {
        let mut parts = vec![input.recipient.as_str(), input.tone.as_str()];
        if let Some(context) = &input.additional_context {
            parts.push(context.as_str());
        }
        parts.extend(input.key_points.iter().map(String::as_str));
        parts.join("\n").to_lowercase()
    }
}
