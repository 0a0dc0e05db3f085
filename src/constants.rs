//! Configuration constants for the gating engine
//!
//! This module contains the tolerances, limits, and defaults used
//! throughout the engine. The timing tolerances absorb player rounding
//! and buffering jitter and are load-bearing: changing them changes when
//! gates fire and when coverage counts as complete.

/// Coverage measurement constants
pub mod coverage {
    /// Two watched segments closer than this many seconds are coalesced into one
    pub const MERGE_TOLERANCE: f64 = 0.25;
    /// Coverage snaps to exactly 100 when the unwatched remainder is at most this many seconds
    pub const SNAP_REMAINDER: f64 = 1.0;
    /// Coverage snaps to exactly 100 when the raw percentage reaches this value
    pub const SNAP_PERCENT: f64 = 97.0;
}

/// Seek anomaly detection constants
pub mod seek {
    /// A sample further ahead than this many seconds past the previous one is a forward jump
    pub const FORWARD_JUMP: f64 = 1.25;
    /// A sample further behind than this many seconds before the previous one is a backward jump
    pub const BACKWARD_JUMP: f64 = 0.75;
}

/// Gate scheduling constants
pub mod gate {
    /// Grace in seconds past the next gate before the playhead is forced back
    pub const CEILING_GRACE: f64 = 0.4;
    /// Seconds before the gate that a forced seek lands on, so the gate still triggers
    pub const CEILING_SETBACK: f64 = 0.05;
    /// Review mode ends once the playhead is within this many seconds of the review exit time
    pub const REVIEW_EXIT_TOLERANCE: f64 = 0.1;
}

/// Quiz document limits
pub mod quiz {
    /// Maximum number of items allowed in a single quiz
    pub const MAX_ITEMS: usize = 200;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of an item prompt in characters
    pub const MAX_PROMPT_LENGTH: usize = 2000;
    /// Maximum length of an item id in characters
    pub const MAX_ID_LENGTH: usize = 64;
    /// Maximum number of choices on a choice-based item
    pub const MAX_CHOICE_COUNT: usize = 26;
    /// Maximum length of a single choice's display text
    pub const MAX_CHOICE_TEXT_LENGTH: usize = 500;
    /// Maximum number of accepted strings on a fill-in-blank item
    pub const MAX_ACCEPT_COUNT: usize = 16;
    /// Maximum length of a single accepted string
    pub const MAX_ACCEPT_LENGTH: usize = 200;
    /// Default character limit for free-response answers
    pub const DEFAULT_FREE_RESPONSE_LIMIT: usize = 500;
    /// Upper bound on the authorable free-response character limit
    pub const MAX_FREE_RESPONSE_LIMIT: usize = 4000;
    /// Maximum feedback delay in seconds before an overlay auto-closes
    pub const MAX_FEEDBACK_DELAY: f64 = 60.0;
}

/// Identity capture constants
pub mod identity {
    /// Maximum length of a viewer identifier in characters
    pub const MAX_VIEWER_LENGTH: usize = 120;
}

/// Sampling loop constants
pub mod sampling {
    /// Recommended interval in milliseconds between playback samples
    pub const INTERVAL_MILLIS: u64 = 250;
}
