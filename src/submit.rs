//! Attempt submission protocol
//!
//! This module makes attempt delivery idempotent and retry-safe. Every
//! session draws one random nonce; storage deduplicates on it, so a
//! retried or duplicated request can only ever record one attempt. A
//! guard flag keeps a second dispatch from going out while one is in
//! flight, and a sticky success flag keeps anything from going out once
//! one has landed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::constants::identity::MAX_VIEWER_LENGTH;
use crate::quiz::{answer::Answer, config::Quiz, grading};
use crate::store::SubmitOutcome;

/// Reserved answers-map key holding the watch measurements
pub const META_KEY: &str = "__meta";
/// Reserved answers-map key holding the captured identity
pub const IDENTITY_KEY: &str = "__identity";

/// Per-session submission bookkeeping
///
/// Invariant: at most one outbound submission is in flight, and once one
/// succeeds (including by duplicate conflict) nothing is dispatched
/// again for the rest of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionState {
    /// Random token tagging every dispatch from this session
    nonce: Uuid,
    /// Whether a dispatch is currently outstanding
    submitting: bool,
    /// Whether a dispatch has terminally succeeded; sticky
    submitted_once: bool,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self {
            nonce: Uuid::new_v4(),
            submitting: false,
            submitted_once: false,
        }
    }
}

impl SubmissionState {
    /// The session nonce; fixed at construction
    pub fn nonce(&self) -> Uuid {
        self.nonce
    }

    /// Whether a dispatch is currently outstanding
    pub fn submitting(&self) -> bool {
        self.submitting
    }

    /// Whether a dispatch has terminally succeeded
    pub fn submitted_once(&self) -> bool {
        self.submitted_once
    }

    /// Claims the right to dispatch a submission
    ///
    /// Returns `false` while one is outstanding or after one has
    /// succeeded; the caller must not dispatch in that case.
    pub fn begin(&mut self) -> bool {
        if self.submitting || self.submitted_once {
            false
        } else {
            self.submitting = true;
            true
        }
    }

    /// Records the outcome of the outstanding dispatch
    ///
    /// A success or duplicate conflict marks the session terminally
    /// submitted; a failure merely releases the guard so the viewer can
    /// retry. Returns `true` exactly once, on the first terminal
    /// success, so the caller fires the success path a single time.
    pub fn resolve(&mut self, outcome: &SubmitOutcome) -> bool {
        self.submitting = false;
        if outcome.is_success() && !self.submitted_once {
            self.submitted_once = true;
            true
        } else {
            false
        }
    }
}

/// The watch measurements recorded under [`META_KEY`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchMeta {
    /// Seconds of the video actually watched
    pub watch_seconds: f64,
    /// Coverage percentage against the effective end
    pub watch_percent: f64,
}

/// The captured identity recorded under [`IDENTITY_KEY`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityRecord {
    /// Record discriminator, always `"identity"`
    pub kind: &'static str,
    /// The sanitized viewer name
    pub text: String,
}

impl IdentityRecord {
    /// Wraps a sanitized viewer name
    pub fn new(text: String) -> Self {
        Self {
            kind: "identity",
            text,
        }
    }
}

/// One entry of the attempt's answers map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerRecord {
    /// An ordinary item response
    Response(Answer),
    /// The reserved identity entry
    Identity(IdentityRecord),
    /// The reserved watch-measurement entry
    Meta(WatchMeta),
}

/// The aggregate attempt sent to the storage collaborator
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptPayload {
    /// Sanitized viewer identifier; empty when identity was not captured
    pub viewer: String,
    /// Points earned
    pub points: f64,
    /// Maximum points across all scorable items
    pub max_points: f64,
    /// One record per answered item plus the reserved entries
    pub answers: BTreeMap<String, AnswerRecord>,
    /// Quiz category, when authored
    pub category: Option<String>,
    /// The session nonce that makes delivery idempotent
    pub nonce: Uuid,
}

/// Sanitizes a viewer identifier
///
/// Keeps alphanumerics, dots, underscores, and hyphens, and caps the
/// length — the same normalization storage applies, done here so the
/// payload already carries the canonical form.
pub fn sanitize_viewer(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_VIEWER_LENGTH)
        .collect()
}

/// Builds the attempt payload for the current session state
///
/// The answers map carries every stored item answer, the watch
/// measurements under [`META_KEY`], and — when an identity was
/// captured — the identity under [`IDENTITY_KEY`].
pub fn build_payload(
    quiz: &Quiz,
    answered: &BTreeMap<String, Answer>,
    viewer: Option<&str>,
    meta: WatchMeta,
    nonce: Uuid,
) -> AttemptPayload {
    let summary = grading::totals(&quiz.items, |id| answered.get(id));

    let mut answers: BTreeMap<String, AnswerRecord> = answered
        .iter()
        .map(|(id, answer)| (id.clone(), AnswerRecord::Response(answer.clone())))
        .collect();
    answers.insert(META_KEY.to_owned(), AnswerRecord::Meta(meta));
    if let Some(viewer) = viewer {
        answers.insert(
            IDENTITY_KEY.to_owned(),
            AnswerRecord::Identity(IdentityRecord::new(viewer.to_owned())),
        );
    }

    AttemptPayload {
        viewer: viewer.unwrap_or_default().to_owned(),
        points: summary.points,
        max_points: summary.max_points,
        answers,
        category: quiz.category.clone(),
        nonce,
    }
}
