//! # Vidgate Engine Library
//!
//! This library provides the playback-coverage and quiz-gating engine
//! for timestamp-triggered video quizzes. It turns a stream of player
//! position samples into a monotone watched-coverage measurement,
//! decides when question overlays must open and how far the playhead
//! may seek, and delivers the aggregate attempt exactly once even under
//! network retries.
//!
//! The engine is host-agnostic: the video player, the rendering layer,
//! and the attempt storage are traits ([`player::PlaybackProvider`],
//! [`surface::Surface`], [`store::AttemptSink`]) that the embedding
//! application implements. All coordination is single-threaded and
//! cooperative — one [`engine::Engine::tick`] per playback sample.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::wildcard_imports)]

use serde::{Deserialize, Serialize};

pub mod constants;

pub mod coverage;
pub mod engine;
pub mod gate;
pub mod overlay;
pub mod player;
pub mod quiz;
pub mod seek;
pub mod store;
pub mod submit;
pub mod surface;

pub use engine::Engine;
pub use quiz::config::Quiz;

/// Alarm messages for delayed engine work
///
/// The host's scheduler holds these for the requested delay and feeds
/// them back through [`engine::Engine::receive_alarm`]. Stale alarms
/// (for an overlay that has since changed) are ignored on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Auto-close the feedback overlay for the given item
    CloseOverlay {
        /// Id of the item whose overlay should close
        item_id: String,
    },
}

impl AlarmMessage {
    /// Converts the alarm message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_message_round_trips_through_json() {
        let alarm = AlarmMessage::CloseOverlay {
            item_id: "q1".to_owned(),
        };
        let json = alarm.to_message();
        assert!(json.contains("CloseOverlay"));
        assert!(json.contains("q1"));

        let parsed: AlarmMessage = serde_json::from_str(&json).unwrap();
        let AlarmMessage::CloseOverlay { item_id } = parsed;
        assert_eq!(item_id, "q1");
    }
}
