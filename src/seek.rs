//! Seek anomaly detection
//!
//! This module classifies the position delta between two consecutive
//! playback samples and owns the one-shot corrective rewind: the first
//! forward jump of a session is undone and warned about, every later
//! one is merely tolerated (the gate ceiling still applies).

use serde::{Deserialize, Serialize};

use crate::constants::seek::{BACKWARD_JUMP, FORWARD_JUMP};

/// Classification of the position delta between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    /// Normal playback progression within tolerance
    Smooth,
    /// The playhead moved further ahead than playback could carry it
    Forward,
    /// The playhead moved backward beyond tolerance
    Backward,
}

/// Classifies the move from `last_now` to `now`
///
/// The forward threshold is wider than one sampling interval so ordinary
/// playback (plus timer slop) never trips it; the backward threshold is
/// tighter since playback never moves backward on its own.
pub fn classify_jump(now: f64, last_now: f64) -> Jump {
    if now > last_now + FORWARD_JUMP {
        Jump::Forward
    } else if now + BACKWARD_JUMP < last_now {
        Jump::Backward
    } else {
        Jump::Smooth
    }
}

/// One-shot corrective rewind state
///
/// A session gets exactly one forced rewind. Afterwards forward jumps
/// are left alone so a viewer who insists on scrubbing is not fought
/// forever; the gate ceiling remains the hard backstop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeekGuard {
    warned_once: bool,
}

impl SeekGuard {
    /// Claims the corrective rewind if it has not fired yet
    ///
    /// Returns `true` exactly once per session; the caller performs the
    /// rewind and the warning when it does.
    pub fn claim_corrective_rewind(&mut self) -> bool {
        if self.warned_once {
            false
        } else {
            self.warned_once = true;
            true
        }
    }

    /// Whether the corrective rewind has already fired this session
    pub fn has_warned(&self) -> bool {
        self.warned_once
    }
}
