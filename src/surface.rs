//! Rendering collaborator interface
//!
//! This module defines the trait through which the engine requests
//! interactive surfaces (question overlays, identity capture, the
//! terminal thanks screen) and reads the viewer's current input back on
//! demand. The engine never manipulates presentation directly: it sends
//! structured render messages and receives structured input.

use serde::Serialize;
use serde_with::skip_serializing_none;
use std::fmt::Display;

use crate::quiz::{
    answer::Answer,
    config::Item,
    grading::{GradeTier, ScoreSummary},
};

/// The viewer's current input as read back from the rendered surface
///
/// Choice-based surfaces fill `selected` with choice ids; text surfaces
/// fill `text`. Both default to empty so a surface only populates the
/// field its item kind uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInput {
    /// Ids of the currently selected choices, in selection order
    pub selected: Vec<String>,
    /// The current text entry
    pub text: String,
}

/// Render messages sent to the rendering collaborator
///
/// Each message describes what the viewer should now see. The rendering
/// collaborator owns all presentation decisions; the engine only states
/// the content.
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SurfaceMessage {
    /// Open an item's interactive surface, pausing the video behind it
    ItemOpen {
        /// The item to render
        item: Item,
        /// A previously stored answer to pre-fill, if any
        stored: Option<Answer>,
        /// Whether the surface is read-only (review of an answered item)
        read_only: bool,
    },
    /// Show grading feedback for the item that was just submitted
    Feedback {
        /// Id of the graded item
        item_id: String,
        /// Grade tier, absent for unscored item kinds
        tier: Option<GradeTier>,
        /// Viewer-facing feedback text
        text: String,
        /// Whether a continue affordance should be shown instead of auto-closing
        show_continue: bool,
    },
    /// Close whatever overlay is open and reveal the video again
    OverlayClosed,
    /// Open the identity-capture surface
    IdentityOpen {
        /// Prompt text shown above the input
        prompt: String,
    },
    /// Open the terminal thanks surface with the final score
    ThanksOpen {
        /// Final score totals for the session
        score: ScoreSummary,
    },
    /// Show a transient notice without changing the current surface
    #[from]
    Notice(Notice),
}

impl SurfaceMessage {
    /// Converts the render message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Transient viewer-facing notices
///
/// These accompany local validation failures, blocked seeks, and
/// submission retries. They never change overlay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notice {
    /// A forward seek was blocked and the playhead was moved back
    SeekBlocked,
    /// A choice item was submitted without any selection
    EmptySelection,
    /// The identity surface was submitted without a usable name
    IdentityRequired,
    /// The attempt submission failed and can be retried
    SubmissionFailed,
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SeekBlocked => {
                "Seeking ahead is disabled for this video. Returning to where you left off."
            }
            Self::EmptySelection => "Please select an answer before submitting.",
            Self::IdentityRequired => "Please enter your name to record your attempt.",
            Self::SubmissionFailed => {
                "Could not record your attempt. Check your connection and try again."
            }
        })
    }
}

/// Trait for the rendering collaborator
///
/// Implementations render the requested surfaces and report the viewer's
/// current input when asked. Rendering is fire-and-forget from the
/// engine's point of view.
pub trait Surface {
    /// Renders the given message
    fn render(&self, message: &SurfaceMessage);

    /// Reads the viewer's current input from the open surface
    ///
    /// Called when the engine processes a submit action. Surfaces with no
    /// open input return the default (empty) response.
    fn read_response(&self) -> ResponseInput;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_notice_converts_into_surface_message() {
        let message: SurfaceMessage = Notice::SeekBlocked.into();
        assert!(matches!(message, SurfaceMessage::Notice(Notice::SeekBlocked)));
    }

    #[test]
    fn test_notice_text_is_viewer_facing() {
        assert!(Notice::EmptySelection.to_string().contains("select an answer"));
        assert!(Notice::SubmissionFailed.to_string().contains("try again"));
    }

    #[test]
    fn test_to_message_serializes_variant_name() {
        let json = SurfaceMessage::OverlayClosed.to_message();
        assert!(json.contains("OverlayClosed"));
    }
}
