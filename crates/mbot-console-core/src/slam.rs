//! SLAM mode state machine.
//!
//! ```text
//! INVALID → IDLE ⇄ LOCALIZATION_ONLY ⇄ FULL_SLAM
//! ```
//!
//! Two writers share the mode cell:
//!
//! - operator requests update it optimistically and return the reset
//!   command the caller must send to the robot;
//! - `SLAM_MODE` reports from the robot overwrite it unconditionally.
//!
//! The reported value always wins; the two are never merged. Entering
//! `FULL_SLAM` from localization and clearing the map in `FULL_SLAM` both
//! destroy map data and are gated behind [`Confirm`].

use serde::Serialize;

use crate::confirm::Confirm;
use crate::types::SlamMode;

pub const OVERWRITE_MAP_PROMPT: &str = "This will overwrite the current map. Are you sure?";
pub const CLEAR_MAP_PROMPT: &str = "This will clear the current map. Are you sure?";

/// Reset request to send to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlamCommand {
    pub mode: SlamMode,
    pub clear_map: bool,
}

/// Result of an operator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Send this command; local state was updated optimistically.
    Issued(SlamCommand),
    /// Operator declined the confirmation. Nothing changed.
    Declined,
    /// Already in the requested mode. Nothing changed.
    Unchanged,
    /// No such edge from the current mode. Nothing changed.
    Unsupported { from: SlamMode, to: SlamMode },
}

impl TransitionOutcome {
    pub fn command(&self) -> Option<SlamCommand> {
        match self {
            Self::Issued(cmd) => Some(*cmd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlamModeStateMachine {
    mode: SlamMode,
    request_map: bool,
}

impl SlamModeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SlamMode {
        self.mode
    }

    /// Whether map fetching should be active.
    pub fn request_map(&self) -> bool {
        self.request_map
    }

    /// Drop back to the pre-heartbeat defaults (new session).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Localization toggle: `IDLE → LOCALIZATION_ONLY`, anything active → `IDLE`.
    pub fn toggle_localization(&mut self) -> TransitionOutcome {
        match self.mode {
            SlamMode::Invalid => TransitionOutcome::Unsupported {
                from: SlamMode::Invalid,
                to: SlamMode::LocalizationOnly,
            },
            SlamMode::Idle => self.issue(SlamMode::LocalizationOnly, false),
            SlamMode::LocalizationOnly | SlamMode::FullSlam => self.issue(SlamMode::Idle, false),
        }
    }

    /// Mapping toggle: `LOCALIZATION_ONLY ⇄ FULL_SLAM`.
    ///
    /// Entering `FULL_SLAM` requires confirmation. Leaving it keeps the map
    /// built so far.
    pub fn toggle_mapping(&mut self, confirm: &impl Confirm) -> TransitionOutcome {
        match self.mode {
            SlamMode::FullSlam => self.issue(SlamMode::LocalizationOnly, false),
            SlamMode::LocalizationOnly => {
                if !confirm.confirm(OVERWRITE_MAP_PROMPT) {
                    return TransitionOutcome::Declined;
                }
                self.issue(SlamMode::FullSlam, false)
            }
            from => TransitionOutcome::Unsupported {
                from,
                to: SlamMode::FullSlam,
            },
        }
    }

    /// Clear the map while mapping. Mode is unchanged.
    pub fn reset_map(&mut self, confirm: &impl Confirm) -> TransitionOutcome {
        if self.mode != SlamMode::FullSlam {
            return TransitionOutcome::Unsupported {
                from: self.mode,
                to: SlamMode::FullSlam,
            };
        }
        if !confirm.confirm(CLEAR_MAP_PROMPT) {
            return TransitionOutcome::Declined;
        }
        TransitionOutcome::Issued(SlamCommand {
            mode: SlamMode::FullSlam,
            clear_map: true,
        })
    }

    /// Request a specific target mode.
    ///
    /// Requesting the current mode is a no-op and issues nothing.
    pub fn request(&mut self, target: SlamMode, confirm: &impl Confirm) -> TransitionOutcome {
        if target == self.mode {
            return TransitionOutcome::Unchanged;
        }
        match (self.mode, target) {
            (SlamMode::Idle, SlamMode::LocalizationOnly)
            | (SlamMode::LocalizationOnly | SlamMode::FullSlam, SlamMode::Idle) => {
                self.toggle_localization()
            }
            (SlamMode::LocalizationOnly, SlamMode::FullSlam)
            | (SlamMode::FullSlam, SlamMode::LocalizationOnly) => self.toggle_mapping(confirm),
            (from, to) => TransitionOutcome::Unsupported { from, to },
        }
    }

    /// Apply a mode reported on the `SLAM_MODE` channel.
    ///
    /// Returns the new mode when it differs from the local one. A report of
    /// `INVALID` after a real mode has been seen is ignored.
    pub fn apply_reported(&mut self, reported: SlamMode) -> Option<SlamMode> {
        if reported == self.mode {
            return None;
        }
        if reported == SlamMode::Invalid {
            return None;
        }
        self.mode = reported;
        self.request_map = reported.requests_map();
        Some(reported)
    }

    fn issue(&mut self, target: SlamMode, clear_map: bool) -> TransitionOutcome {
        self.mode = target;
        self.request_map = target.requests_map();
        TransitionOutcome::Issued(SlamCommand {
            mode: target,
            clear_map,
        })
    }
}
