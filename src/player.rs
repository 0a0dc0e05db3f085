//! Video playback provider interface
//!
//! This module defines the trait through which the engine observes and
//! controls the external video player. The abstraction mirrors the
//! surface of embedded web players: the engine reads the playhead,
//! duration, and play state once per sample, and issues best-effort
//! play/pause/seek commands around overlay transitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Play state reported by the playback provider
///
/// The engine only needs to distinguish active playback, the various
/// not-playing states, and the natural end of the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// The player is loaded but playback has not started yet
    Unstarted,
    /// The media is actively playing
    Playing,
    /// Playback is paused
    Paused,
    /// The player is buffering
    Buffering,
    /// The media has played to its natural end
    Ended,
    /// A video is cued but not playing
    Cued,
}

impl PlayerState {
    /// Whether this state accumulates watched coverage
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Errors reported by playback-control calls
///
/// Control calls are best-effort: the engine logs these and continues,
/// since a transient provider failure must never abort a sampling tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// The underlying player is not ready to accept commands
    #[error("the player is not ready")]
    NotReady,
    /// The provider rejected the command
    #[error("playback control rejected: {0}")]
    Rejected(String),
}

/// Trait for observing and controlling the external video player
///
/// Implementations might wrap an embedded web player, a native media
/// framework, or a scripted fake in tests. Getters are called once per
/// sampling tick; control calls happen only around overlay transitions
/// and corrective seeks.
pub trait PlaybackProvider {
    /// Returns the current playhead position in seconds
    fn current_time(&self) -> f64;

    /// Returns the media duration in seconds, or a non-positive value if unknown
    fn duration(&self) -> f64;

    /// Returns the current play state
    fn player_state(&self) -> PlayerState;

    /// Resumes playback
    ///
    /// # Errors
    ///
    /// Returns a [`PlayerError`] if the provider cannot resume; the engine
    /// treats this as best-effort and continues.
    fn play(&mut self) -> Result<(), PlayerError>;

    /// Pauses playback
    ///
    /// # Errors
    ///
    /// Returns a [`PlayerError`] if the provider cannot pause; the engine
    /// treats this as best-effort and continues.
    fn pause(&mut self) -> Result<(), PlayerError>;

    /// Moves the playhead to `seconds`
    ///
    /// `allow_seek_ahead` matches the embedded-player convention of
    /// permitting seeks into unbuffered regions.
    ///
    /// # Errors
    ///
    /// Returns a [`PlayerError`] if the provider cannot seek; the engine
    /// treats this as best-effort and continues.
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError>;
}
