//! Execution status state machine.
//!
//! Two independent pieces of state are tracked while a workflow runs:
//! - `NodeStatus`: per-node `idle -> running -> success | error`
//! - `ExecutionProgress`: a single whole-workflow percentage plus an
//!   "executing" flag, never persisted

use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentage at which an execution is complete.
pub const COMPLETE_PERCENT: u8 = 100;

/// The execution status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not part of any execution yet, or reset.
    #[default]
    Idle,
    /// Executing in the current pass.
    Running,
    /// Finished successfully in the last pass.
    Success,
    /// Failed in the last pass.
    Error,
}

impl NodeStatus {
    /// Returns true if the node finished its pass.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Returns true if moving to `next` is allowed.
    ///
    /// A new pass may start from any non-running state; any state may be
    /// reset to idle.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Idle)
                | (Self::Idle | Self::Success | Self::Error, Self::Running)
                | (Self::Running, Self::Success | Self::Error)
        )
    }

    /// Moves to `next`, or reports why it is not allowed.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::InvalidTransition` for disallowed moves such as
    /// `idle -> success`.
    pub fn transition(self, next: Self) -> Result<Self, ExecutionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ExecutionError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns the wire name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-workflow execution progress.
///
/// While executing, `percent` never decreases. Completion leaves it at 100
/// until the next start; failure and cancellation reset it to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionProgress {
    percent: u8,
    executing: bool,
}

impl ExecutionProgress {
    /// Creates idle progress.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            percent: 0,
            executing: false,
        }
    }

    /// Returns the current percentage (0-100).
    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.percent
    }

    /// Returns true while an execution is in flight.
    #[must_use]
    pub const fn is_executing(&self) -> bool {
        self.executing
    }

    /// Returns true once the percentage reached 100.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.percent >= COMPLETE_PERCENT
    }

    /// Begins a new execution at 0%.
    pub fn start(&mut self) {
        self.percent = 0;
        self.executing = true;
    }

    /// Raises the percentage to `percent`, clamped to 100.
    ///
    /// Lower values and updates outside an execution are ignored. Returns the
    /// resulting percentage.
    pub fn advance_to(&mut self, percent: u8) -> u8 {
        if self.executing {
            self.percent = self.percent.max(percent.min(COMPLETE_PERCENT));
        }
        self.percent
    }

    /// Raises the percentage by `step`, clamped to 100.
    pub fn advance_by(&mut self, step: u8) -> u8 {
        self.advance_to(self.percent.saturating_add(step))
    }

    /// Ends the execution successfully at 100%.
    pub fn complete(&mut self) {
        self.percent = COMPLETE_PERCENT;
        self.executing = false;
    }

    /// Ends the execution after a failure or cancellation.
    pub fn reset(&mut self) {
        self.percent = 0;
        self.executing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_happy_path() {
        let status = NodeStatus::Idle;
        let status = status.transition(NodeStatus::Running).unwrap();
        let status = status.transition(NodeStatus::Success).unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn terminal_states_restart_as_running() {
        assert!(NodeStatus::Success.can_transition_to(NodeStatus::Running));
        assert!(NodeStatus::Error.can_transition_to(NodeStatus::Running));
    }

    #[test]
    fn idle_cannot_jump_to_terminal() {
        let err = NodeStatus::Idle.transition(NodeStatus::Error).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::InvalidTransition {
                from: NodeStatus::Idle,
                to: NodeStatus::Error,
            }
        );
        assert!(!NodeStatus::Running.can_transition_to(NodeStatus::Running));
    }

    #[test]
    fn any_status_resets_to_idle() {
        for status in [
            NodeStatus::Idle,
            NodeStatus::Running,
            NodeStatus::Success,
            NodeStatus::Error,
        ] {
            assert!(status.can_transition_to(NodeStatus::Idle));
        }
    }

    #[test]
    fn progress_never_decreases_while_executing() {
        let mut progress = ExecutionProgress::new();
        progress.start();
        assert_eq!(progress.advance_to(40), 40);
        assert_eq!(progress.advance_to(30), 40);
        assert_eq!(progress.advance_by(250), 100);
        assert!(progress.is_complete());
    }

    #[test]
    fn progress_ignores_updates_when_idle() {
        let mut progress = ExecutionProgress::new();
        assert_eq!(progress.advance_to(50), 0);
        assert!(!progress.is_executing());
    }

    #[test]
    fn reset_clears_percent_and_flag() {
        let mut progress = ExecutionProgress::new();
        progress.start();
        progress.advance_by(70);
        progress.reset();
        assert_eq!(progress.percent(), 0);
        assert!(!progress.is_executing());
    }

    #[test]
    fn complete_keeps_full_percent() {
        let mut progress = ExecutionProgress::new();
        progress.start();
        progress.complete();
        assert_eq!(progress.percent(), 100);
        assert!(!progress.is_executing());
    }
}
