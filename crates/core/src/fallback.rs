use crate::cache::{DeliverableStore, RecordedDeliverable};
use crate::domain::deliverable::{DraftContent, DraftVariant, EmailDraftDeliverable};
use crate::domain::request::EmailDraftAgentInput;
use crate::domain::run::RunContext;
use crate::errors::ValidationError;

pub const FALLBACK_MAX_VARIANTS: usize = 3;

const EMPTY_SUBJECT_FALLBACK: &str = "Next steps";
const DEFAULT_PURPOSE: &str = "This note covers the key points we need to align on.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneVoice {
    Friendly,
    Formal,
    Direct,
    Enthusiastic,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TonePreset {
    pub greeting: &'static str,
    pub sign_off: &'static str,
    pub voice: ToneVoice,
}

/// Maps a requested tone to a preset. Total: unmatched tones take the
/// neutral preset, so generation never fails on tone.
pub fn tone_preset(tone: &str) -> TonePreset {
    match tone.trim().to_lowercase().as_str() {
        "friendly" | "warm" => {
            TonePreset { greeting: "Hi", sign_off: "Best,", voice: ToneVoice::Friendly }
        }
        "formal" => TonePreset { greeting: "Dear", sign_off: "Sincerely,", voice: ToneVoice::Formal },
        "direct" => TonePreset { greeting: "Hello", sign_off: "Thanks,", voice: ToneVoice::Direct },
        "enthusiastic" => {
            TonePreset { greeting: "Hey", sign_off: "Cheers,", voice: ToneVoice::Enthusiastic }
        }
        _ => TonePreset { greeting: "Hello", sign_off: "Best regards,", voice: ToneVoice::Neutral },
    }
}

/// Deterministic, template-based deliverable builder. No I/O, no randomness:
/// the same input and run id produce byte-identical output on every call.
#[derive(Clone, Debug, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Builds the deliverable and re-validates it against the deliverable
    /// schema. A validation failure here is a defect in this generator, not a
    /// user-input condition, and is propagated rather than recovered.
    pub fn generate(
        &self,
        input: &EmailDraftAgentInput,
    ) -> Result<EmailDraftDeliverable, ValidationError> {
        let preset = tone_preset(&input.tone);

        let draft = DraftContent {
            subject: derive_subject(&input.recipient, &input.key_points),
            body: build_body(input, preset),
            variants: build_variants(input),
        };

        let deliverable = EmailDraftDeliverable::new(draft, input.metadata());
        deliverable.validate()?;
        Ok(deliverable)
    }

    /// Generates and hands the deliverable to the cache under the supplied
    /// run context, returning the cache's verdict on novelty.
    pub fn generate_and_record<S>(
        &self,
        input: &EmailDraftAgentInput,
        context: &RunContext,
        store: &S,
    ) -> Result<RecordedDeliverable, ValidationError>
    where
        S: DeliverableStore + ?Sized,
    {
        let deliverable = self.generate(input)?;
        Ok(store.record(&context.run_id, deliverable))
    }
}

fn derive_subject(recipient: &str, key_points: &[String]) -> String {
    let first = key_points.first().map(String::as_str).unwrap_or("");
    let cleaned = clean_key_point(first);
    let topic =
        if cleaned.is_empty() { EMPTY_SUBJECT_FALLBACK.to_string() } else { cleaned };

    let recipient = recipient.trim();
    if recipient.is_empty() {
        topic
    } else {
        format!("For {recipient}: {topic}")
    }
}

/// Strips leading non-alphanumeric characters and trailing punctuation from a
/// key point so it reads as a subject topic.
fn clean_key_point(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(['.', '!', '?', ',', ';', ':'])
        .trim()
        .to_string()
}

/// Capitalizes the first letter and enforces terminal punctuation.
fn sentence_case(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut chars = trimmed.chars();
    let mut sentence = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    if !sentence.ends_with(['.', '!', '?']) {
        sentence.push('.');
    }
    sentence
}

fn intro_sentence(voice: ToneVoice) -> &'static str {
    match voice {
        ToneVoice::Friendly => {
            "Hope your week is going well! I wanted to touch base on a few things."
        }
        ToneVoice::Formal => "I am writing to follow up on the items outlined below.",
        ToneVoice::Direct => "Here is a quick summary of the items that need your attention.",
        ToneVoice::Enthusiastic => "Great news! I have a few updates I could not wait to share.",
        ToneVoice::Neutral => "I wanted to share a brief update on the items below.",
    }
}

fn closing_prompt(voice: ToneVoice) -> &'static str {
    match voice {
        ToneVoice::Direct => "Let me know what needs immediate adjustment.",
        _ => "Let me know if you would like any adjustments.",
    }
}

fn purpose_sentence(input: &EmailDraftAgentInput) -> String {
    match &input.additional_context {
        Some(context) if !context.trim().is_empty() => sentence_case(context),
        _ => DEFAULT_PURPOSE.to_string(),
    }
}

fn bullet_lines(key_points: &[String]) -> String {
    key_points
        .iter()
        .map(|point| format!("- {}", sentence_case(point)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_body(input: &EmailDraftAgentInput, preset: TonePreset) -> String {
    [
        format!("{} {},", preset.greeting, input.recipient),
        String::new(),
        format!("{} {}", intro_sentence(preset.voice), purpose_sentence(input)),
        String::new(),
        bullet_lines(&input.key_points),
        String::new(),
        closing_prompt(preset.voice).to_string(),
        String::new(),
        preset.sign_off.to_string(),
    ]
    .join("\n")
}

fn build_variants(input: &EmailDraftAgentInput) -> Vec<DraftVariant> {
    let all = [
        DraftVariant {
            label: "Concise recap".to_string(),
            body: [
                format!("Hi {},", input.recipient),
                String::new(),
                "Quick recap:".to_string(),
                bullet_lines(&input.key_points),
                String::new(),
                "Reply if anything above looks off.".to_string(),
                String::new(),
                "Thanks,".to_string(),
            ]
            .join("\n"),
        },
        DraftVariant {
            label: "Action-focused".to_string(),
            body: [
                format!("Hello {},", input.recipient),
                String::new(),
                "Here is what needs to happen next:".to_string(),
                numbered_lines(&input.key_points),
                String::new(),
                "Please confirm once each item is in motion.".to_string(),
                String::new(),
                "Thanks,".to_string(),
            ]
            .join("\n"),
        },
        DraftVariant {
            label: "Relationship-first".to_string(),
            body: [
                format!("Hi {},", input.recipient),
                String::new(),
                "It has been great working with you on this.".to_string(),
                purpose_sentence(input),
                String::new(),
                bullet_lines(&input.key_points),
                String::new(),
                "Looking forward to your thoughts.".to_string(),
                String::new(),
                "Warm regards,".to_string(),
            ]
            .join("\n"),
        },
    ];

    let count = (input.variants as usize).min(FALLBACK_MAX_VARIANTS);
    all.into_iter().take(count).collect()
}

fn numbered_lines(key_points: &[String]) -> String {
    key_points
        .iter()
        .enumerate()
        .map(|(index, point)| format!("{}. {}", index + 1, sentence_case(point)))
        .collect::<Vec<_>>()
        .join("\n")
}
