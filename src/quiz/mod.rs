//! Quiz document model, viewer answers, and grading
//!
//! This module groups everything that describes a quiz and the viewer's
//! responses to it: the immutable document loaded at boot
//! ([`config`]), the tagged answer union keyed by item id ([`answer`]),
//! and the pure grading functions ([`grading`]).

pub mod answer;
pub mod config;
pub mod grading;
