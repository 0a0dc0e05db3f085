//! Overlay state machine
//!
//! This module holds the finite state machine governing what the viewer
//! currently sees over the video: nothing, an item surface, the identity
//! capture, or the terminal thanks screen. Transitions are guarded with
//! an explicit before/after check so a stale event can never move the
//! machine from a state it is no longer in.

use serde::{Deserialize, Serialize};

/// The overlay the viewer currently sees
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    /// No overlay; the video is visible
    #[default]
    Closed,
    /// An item's interactive surface is open
    ItemOpen,
    /// The identity-capture surface is open
    IdentityOpen,
    /// The terminal thanks surface is open
    ThanksOpen,
}

/// The item currently presented, while the stage is [`Stage::ItemOpen`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenItem {
    /// Index of the item in the quiz's item list
    pub index: usize,
    /// Id of the item
    pub id: String,
    /// Whether the surface is read-only (review of an answered item)
    pub read_only: bool,
    /// Whether the item was submitted and now waits for an explicit continue
    pub awaiting_continue: bool,
}

/// The overlay state machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overlay {
    /// Current stage
    stage: Stage,
    /// Item bound to the stage while an item surface is open
    current: Option<OpenItem>,
}

impl Overlay {
    /// Returns the current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether any overlay is open
    pub fn is_open(&self) -> bool {
        self.stage != Stage::Closed
    }

    /// The currently open item, if an item surface is open
    pub fn current(&self) -> Option<&OpenItem> {
        self.current.as_ref()
    }

    /// Mutable access to the currently open item
    pub fn current_mut(&mut self) -> Option<&mut OpenItem> {
        self.current.as_mut()
    }

    /// Attempts to transition from one stage to another
    ///
    /// Returns `true` if the transition happened, `false` if the current
    /// stage did not match the expected one.
    pub fn change_stage(&mut self, before: Stage, after: Stage) -> bool {
        if self.stage == before {
            self.stage = after;
            true
        } else {
            false
        }
    }

    /// Opens an item surface from the closed stage
    ///
    /// Returns `false` without any change when another overlay is open.
    pub fn open_item(&mut self, index: usize, id: String, read_only: bool) -> bool {
        if self.change_stage(Stage::Closed, Stage::ItemOpen) {
            self.current = Some(OpenItem {
                index,
                id,
                read_only,
                awaiting_continue: false,
            });
            true
        } else {
            false
        }
    }

    /// Closes whatever overlay is open
    pub fn close(&mut self) {
        self.stage = Stage::Closed;
        self.current = None;
    }
}
