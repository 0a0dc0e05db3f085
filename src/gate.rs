//! Gate scheduling
//!
//! This module decides, from the playback position and the quiz's item
//! list, which item (if any) must be shown now and how far ahead the
//! playhead may travel before an ungated item would be vaulted. It also
//! holds the review-pass bookkeeping used when a quiz re-shows answered
//! items on rewatch.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::gate::REVIEW_EXIT_TOLERANCE;
use crate::quiz::answer::Answer;
use crate::quiz::config::{Item, Quiz};

/// Playhead and review-pass bookkeeping owned by the engine
///
/// `last_now` is the position of the previous sample and the anchor for
/// all jump and ceiling decisions; `peak_time` is the highest position
/// ever legitimately reached, which becomes the exit target of a review
/// pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateState {
    /// Highest playhead position ever reached this session
    pub peak_time: f64,
    /// Whether a review pass is active
    pub review_mode: bool,
    /// Position at which the current review pass ends
    pub review_exit_time: f64,
    /// Ids of answered items already re-shown during this pass
    pub reviewed_this_pass: HashSet<String>,
    /// Playhead position of the previous sample, once one exists
    pub last_now: Option<f64>,
}

impl GateState {
    /// Records a legitimately reached playhead position
    pub fn note_position(&mut self, now: f64) {
        if now > self.peak_time {
            self.peak_time = now;
        }
    }

    /// Enters a review pass ending at the current peak position
    pub fn enter_review(&mut self) {
        self.review_mode = true;
        self.review_exit_time = self.peak_time;
        self.reviewed_this_pass.clear();
    }

    /// Exits review once the playhead catches back up to the exit target
    ///
    /// Returns `true` when the pass ended on this call.
    pub fn maybe_exit_review(&mut self, now: f64) -> bool {
        if self.review_mode && now >= self.review_exit_time - REVIEW_EXIT_TOLERANCE {
            self.review_mode = false;
            self.reviewed_this_pass.clear();
            true
        } else {
            false
        }
    }
}

/// Whether an item can still demand an overlay
///
/// Unanswered items always can. Answered items can only during a review
/// pass of a quiz that re-shows on rewatch, and then once per pass.
fn eligible(
    item: &Item,
    quiz: &Quiz,
    answered: &BTreeMap<String, Answer>,
    gate: &GateState,
) -> bool {
    if !answered.contains_key(&item.id) {
        return true;
    }
    quiz.review_on_rewatch && gate.review_mode && !gate.reviewed_this_pass.contains(&item.id)
}

/// The earliest eligible gate time at or after `now`
///
/// Returns positive infinity when nothing gates the rest of the video.
/// This is the playback ceiling: positions past it (plus grace) have
/// vaulted an obligation.
pub fn next_gate_time_after(
    quiz: &Quiz,
    answered: &BTreeMap<String, Answer>,
    gate: &GateState,
    now: f64,
) -> f64 {
    quiz.items
        .iter()
        .filter(|item| item.t >= now && eligible(item, quiz, answered, gate))
        .map(|item| item.t)
        .fold(f64::INFINITY, f64::min)
}

/// The first item due at `now`, in declaration order
///
/// Scans the item list in its defined order and returns the first item
/// whose trigger has passed and that is still eligible; declaration
/// order is therefore the tie-break for simultaneous triggers.
pub fn first_due_item<'a>(
    quiz: &'a Quiz,
    answered: &BTreeMap<String, Answer>,
    gate: &GateState,
    now: f64,
) -> Option<(usize, &'a Item)> {
    quiz.items
        .iter()
        .enumerate()
        .find(|(_, item)| item.t <= now && eligible(item, quiz, answered, gate))
}
