//! Quiz-storage collaborator interface
//!
//! This module defines the traits the engine consumes from the storage
//! side of the system: fetching a quiz document by id at boot, and
//! dispatching the aggregate attempt at the end of a session. Attempt
//! persistence itself lives behind these traits and is out of the
//! engine's hands.

use crate::quiz::config::QuizError;
use crate::submit::AttemptPayload;

/// Trait for fetching quiz documents by id
///
/// Implementations might read from an HTTP API, the local filesystem, or
/// a fixture in tests. The returned document must already be validated;
/// [`crate::quiz::config::Quiz::from_json`] does both steps for JSON
/// sources.
pub trait QuizStore {
    /// Fetches and validates the quiz document with the given id
    ///
    /// # Errors
    ///
    /// Returns a [`QuizError`] when the document is missing, unparseable,
    /// or fails validation. Any of these is fatal for the session: no
    /// engine is constructed and no gating logic runs.
    fn fetch_quiz(&self, quiz_id: &str) -> Result<crate::quiz::config::Quiz, QuizError>;
}

/// Outcome of a dispatched attempt submission
///
/// The storage collaborator reports exactly one of these per dispatch.
/// A conflict means the nonce was already recorded and is success from
/// the viewer's perspective, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The attempt was recorded
    Accepted,
    /// An attempt with this nonce was already recorded (idempotent success)
    AlreadyRecorded,
    /// The attempt could not be delivered; the viewer may retry
    Failed(String),
}

impl SubmitOutcome {
    /// Whether this outcome terminates the submission protocol successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Accepted | Self::AlreadyRecorded)
    }
}

/// Trait for dispatching attempt submissions
///
/// Dispatch is fire-and-forget: the host performs the network round trip
/// and later reports the result through
/// [`crate::engine::Engine::receive_submission`]. The engine's
/// re-entrancy guard guarantees at most one dispatch is outstanding.
pub trait AttemptSink {
    /// Sends the attempt payload for the given quiz toward storage
    fn dispatch(&mut self, quiz_id: &str, payload: &AttemptPayload);
}
