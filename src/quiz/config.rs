//! Quiz document structures and validation
//!
//! This module defines the quiz document as it arrives from the
//! quiz-storage collaborator: the quiz-level gating flags, the ordered
//! item list, and the closed set of item kinds. Documents are immutable
//! after load; [`Quiz::from_json`] parses and validates in one step so a
//! malformed document can never reach the engine.

use std::collections::{HashMap, HashSet};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::Duration;

use crate::constants::quiz::*;

/// Validation result type for custom validators
type ValidationResult = garde::Result;

/// Validates that an item trigger time is a non-negative finite number
fn validate_trigger(val: &f64) -> ValidationResult {
    if val.is_finite() && *val >= 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new(
            "trigger time must be a non-negative finite number of seconds",
        ))
    }
}

/// Validates the authored cut-off time, when present
fn validate_end_at(val: &Option<f64>) -> ValidationResult {
    match val {
        Some(end_at) if !(end_at.is_finite() && *end_at > 0.0) => Err(garde::Error::new(
            "endAt must be a positive finite number of seconds",
        )),
        _ => Ok(()),
    }
}

/// Validates the feedback delay before an overlay auto-closes
fn validate_feedback_delay(val: &Duration) -> ValidationResult {
    if val.as_secs_f64() <= MAX_FEEDBACK_DELAY {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "feedbackDelaySeconds is outside of the bounds [0,{MAX_FEEDBACK_DELAY}]",
        )))
    }
}

/// Validates that item ids are unique within the quiz
fn validate_unique_item_ids(items: &[Item]) -> ValidationResult {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(garde::Error::new(format!(
                "duplicate item id: {}",
                item.id
            )));
        }
    }
    Ok(())
}

/// Validates the authorable free-response character limit
fn validate_free_response_limit(val: &usize) -> ValidationResult {
    if (1..=MAX_FREE_RESPONSE_LIMIT).contains(val) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "maxLen is outside of the bounds [1,{MAX_FREE_RESPONSE_LIMIT}]",
        )))
    }
}

/// Default free-response character limit
fn default_free_response_limit() -> usize {
    DEFAULT_FREE_RESPONSE_LIMIT
}

/// Errors produced while loading a quiz document
///
/// Any of these is fatal for the session: the host surfaces a blocking
/// status message and no gating logic runs.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The document is not valid JSON
    #[error("quiz document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document parsed but failed validation
    #[error("quiz document failed validation: {0}")]
    Invalid(#[from] garde::Report),
    /// No document exists under the requested id
    #[error("quiz not found: {0}")]
    NotFound(String),
}

/// A complete quiz document
///
/// Owned by the session and fetched once at boot. The gating flags
/// control overlay behavior for every item; `end_at` moves the effective
/// end of the video for all coverage decisions.
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// Identifier of this quiz, injected by the storage collaborator
    #[serde(default)]
    #[garde(skip)]
    pub id: Option<String>,
    /// Display title
    #[serde(default)]
    #[garde(length(max = MAX_TITLE_LENGTH))]
    pub title: String,
    /// Grouping category carried through to the attempt record
    #[serde(default)]
    #[garde(skip)]
    pub category: Option<String>,
    /// Coarser grouping label (e.g. by week)
    #[serde(default)]
    #[garde(skip)]
    pub group: Option<String>,
    /// Identifier of the video this quiz runs over
    #[serde(default)]
    #[garde(skip)]
    pub video_id: Option<String>,
    /// Authored cut-off time in seconds; coverage is measured against it
    #[serde(default)]
    #[garde(custom(|v, _| validate_end_at(v)))]
    pub end_at: Option<f64>,
    /// Whether free seeking is allowed (disables the corrective rewind and ceiling)
    #[serde(default)]
    #[garde(skip)]
    pub allow_seeking: bool,
    /// Whether the viewer must identify themselves before the attempt is recorded
    #[serde(default)]
    #[garde(skip)]
    pub require_identity: bool,
    /// Whether reaching full coverage (rather than natural end) finishes the session
    #[serde(default)]
    #[garde(skip)]
    pub require_watch_to_end: bool,
    /// Whether submitted items wait for an explicit continue instead of auto-closing
    #[serde(default)]
    #[garde(skip)]
    pub require_continue: bool,
    /// Whether answered items are re-shown read-only when the viewer rewinds
    #[serde(default)]
    #[garde(skip)]
    pub review_on_rewatch: bool,
    /// Prompt text for the identity-capture surface
    #[serde(default)]
    #[garde(skip)]
    pub identity_prompt: Option<String>,
    /// Pause before a submitted overlay auto-closes
    #[serde(default, rename = "feedbackDelaySeconds")]
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    #[garde(custom(|v, _| validate_feedback_delay(v)))]
    pub feedback_delay: Duration,
    /// The ordered item list; order is the trigger tie-break
    #[garde(length(max = MAX_ITEMS), custom(|v, _| validate_unique_item_ids(v)), dive)]
    pub items: Vec<Item>,
}

impl Quiz {
    /// Parses and validates a quiz document from JSON
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Parse`] for malformed JSON and
    /// [`QuizError::Invalid`] for a document that parses but violates the
    /// authoring limits.
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        let quiz: Self = serde_json::from_str(json)?;
        quiz.validate()?;
        Ok(quiz)
    }

    /// Returns the number of items in this quiz
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if this quiz contains any items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by id
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// A single timestamp-triggered item
///
/// Items are immutable; the kind-specific fields live in the closed
/// [`ItemKind`] enum so grading and rendering dispatch exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Item {
    /// Identifier, unique within the quiz
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub id: String,
    /// Trigger second: the item is due once the playhead reaches this time
    #[garde(custom(|v, _| validate_trigger(v)))]
    pub t: f64,
    /// Question or notice text shown to the viewer
    #[serde(default)]
    #[garde(length(max = MAX_PROMPT_LENGTH))]
    pub prompt: String,
    /// Kind-specific configuration
    #[serde(flatten)]
    #[garde(dive)]
    pub kind: ItemKind,
}

/// The closed set of item kinds
///
/// Adding a kind is a compile-time-checked change: grading, answer
/// construction, and validation all match exhaustively on this enum.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    /// Single-selection multiple choice, scored by set equality
    Mcq(#[garde(dive)] ChoiceItem),
    /// Check-all-that-apply, scored with three-tier partial credit
    Checkbox(#[garde(dive)] ChoiceItem),
    /// Fill-in-blank, scored against a list of accepted strings
    Fib(#[garde(dive)] FibItem),
    /// Free response, recorded but never scored
    Fr(#[garde(dive)] FreeResponseItem),
    /// Non-scored selection recorded for aggregation
    Poll(#[garde(dive)] PollItem),
    /// Informational pause with no input
    Pause(#[garde(dive)] PauseItem),
}

impl ItemKind {
    /// Whether this kind contributes to the score maximum
    pub fn is_scorable(&self) -> bool {
        matches!(self, Self::Mcq(_) | Self::Checkbox(_) | Self::Fib(_))
    }

    /// Whether this kind collects a choice selection
    pub fn is_choice_based(&self) -> bool {
        matches!(self, Self::Mcq(_) | Self::Checkbox(_) | Self::Poll(_))
    }
}

/// A single selectable choice
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Choice {
    /// Choice identifier, referenced by `correct` and by stored answers
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub id: String,
    /// Display text
    #[garde(length(max = MAX_CHOICE_TEXT_LENGTH))]
    pub text: String,
}

/// Configuration shared by mcq and checkbox items
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChoiceItem {
    /// The selectable choices
    #[garde(length(min = 1, max = MAX_CHOICE_COUNT), dive)]
    pub choices: Vec<Choice>,
    /// Ids of the correct choices
    #[garde(length(min = 1))]
    pub correct: Vec<String>,
    /// Optional per-choice feedback shown after submission
    #[serde(default)]
    #[garde(skip)]
    pub feedback: Option<HashMap<String, String>>,
}

/// Configuration for a fill-in-blank item
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FibItem {
    /// Accepted answer strings
    #[garde(length(min = 1, max = MAX_ACCEPT_COUNT), inner(length(max = MAX_ACCEPT_LENGTH)))]
    pub accept: Vec<String>,
    /// Whether matching preserves case (default false)
    #[serde(default)]
    #[garde(skip)]
    pub case_sensitive: bool,
    /// Optional UI hint shown in the empty input
    #[serde(default)]
    #[garde(skip)]
    pub placeholder: Option<String>,
}

/// Configuration for a free-response item
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FreeResponseItem {
    /// Character limit applied to the recorded text
    #[serde(default = "default_free_response_limit")]
    #[garde(custom(|v, _| validate_free_response_limit(v)))]
    pub max_len: usize,
    /// Optional UI hint shown in the empty input
    #[serde(default)]
    #[garde(skip)]
    pub placeholder: Option<String>,
}

/// Configuration for a poll item
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PollItem {
    /// The selectable choices; polls have no correct set
    #[garde(length(min = 1, max = MAX_CHOICE_COUNT), dive)]
    pub choices: Vec<Choice>,
}

/// Configuration for an informational pause
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PauseItem {
    /// Optional smaller note shown under the prompt
    #[serde(default)]
    #[garde(skip)]
    pub note: Option<String>,
}
