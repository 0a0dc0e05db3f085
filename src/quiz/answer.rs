//! Viewer answers
//!
//! This module defines the tagged answer union stored per item id. An
//! answer is created when the viewer submits an overlay and is never
//! mutated afterwards; re-shows in review mode render it read-only.
//! The serialized shape (a `kind` tag plus `selected`/`text` fields)
//! matches what the attempt-storage collaborator records.

use serde::{Deserialize, Serialize};

use crate::quiz::config::ItemKind;
use crate::surface::ResponseInput;

/// A viewer's response to a single item, tagged by item kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Answer {
    /// Selection for a multiple choice item
    Mcq {
        /// Ids of the selected choices
        selected: Vec<String>,
    },
    /// Selection for a check-all-that-apply item
    Checkbox {
        /// Ids of the selected choices
        selected: Vec<String>,
    },
    /// Text entry for a fill-in-blank item
    Fib {
        /// The entered text
        text: String,
    },
    /// Text entry for a free-response item
    Fr {
        /// The entered text, truncated to the item's limit
        text: String,
        /// The character limit that was applied
        #[serde(rename = "maxLen")]
        max_len: usize,
    },
    /// Selection for a poll item
    Poll {
        /// Ids of the selected choices
        selected: Vec<String>,
    },
    /// Acknowledgement of an informational pause
    Pause,
}

impl Answer {
    /// Builds an answer of the right shape for `kind` from surface input
    ///
    /// Free-response text is truncated to the item's character limit at
    /// the character boundary, mirroring what storage would enforce.
    pub fn from_input(kind: &ItemKind, input: ResponseInput) -> Self {
        match kind {
            ItemKind::Mcq(_) => Self::Mcq {
                selected: input.selected,
            },
            ItemKind::Checkbox(_) => Self::Checkbox {
                selected: input.selected,
            },
            ItemKind::Fib(_) => Self::Fib { text: input.text },
            ItemKind::Fr(fr) => Self::Fr {
                text: input.text.chars().take(fr.max_len).collect(),
                max_len: fr.max_len,
            },
            ItemKind::Poll(_) => Self::Poll {
                selected: input.selected,
            },
            ItemKind::Pause(_) => Self::Pause,
        }
    }

    /// Returns the selected choice ids, for choice-based answers
    pub fn selected(&self) -> Option<&[String]> {
        match self {
            Self::Mcq { selected } | Self::Checkbox { selected } | Self::Poll { selected } => {
                Some(selected)
            }
            _ => None,
        }
    }

    /// Returns the entered text, for text-based answers
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Fib { text } | Self::Fr { text, .. } => Some(text),
            _ => None,
        }
    }
}
