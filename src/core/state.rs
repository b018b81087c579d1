//! Execution state models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// State of a single step
///
/// `Pending -> Running -> {Success | Failed}`; terminal states are final,
/// there are no retries.
#[derive(Debug, Clone, Serialize)]
pub enum StepState {
    /// Step has not started
    Pending,
    /// Step is currently running
    Running { started_at: DateTime<Utc> },
    /// Step completed and satisfied every declared output
    Success {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed; the error is terminal for this run
    Failed {
        error: String,
        started_at: Option<DateTime<Utc>>,
        failed_at: DateTime<Utc>,
    },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Success { .. } | StepState::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepState::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepState::Failed { .. })
    }

    pub fn is_running(&self) -> bool {
        matches!(self, StepState::Running { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StepState::Pending)
    }
}

/// Aggregate pipeline state, derived from the step states
///
/// Never stored: computing it on demand keeps it from drifting out of sync
/// with the per-step states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Pending,
    Running,
    Success,
    Failed,
}

impl PipelineState {
    /// Derive the aggregate state from the contained steps' states.
    ///
    /// Failed wins over everything; Success requires every step to have
    /// succeeded; an empty step collection is Pending. A mix of Success and
    /// Pending counts as Running (execution is mid-flight between steps).
    pub fn derive<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = &'a StepState>,
    {
        let mut any_failed = false;
        let mut any_running = false;
        let mut any_pending = false;
        let mut any_success = false;
        let mut empty = true;

        for state in states {
            empty = false;
            match state {
                StepState::Failed { .. } => any_failed = true,
                StepState::Running { .. } => any_running = true,
                StepState::Pending => any_pending = true,
                StepState::Success { .. } => any_success = true,
            }
        }

        if any_failed {
            PipelineState::Failed
        } else if any_running {
            PipelineState::Running
        } else if empty || !any_success {
            PipelineState::Pending
        } else if !any_pending {
            PipelineState::Success
        } else {
            PipelineState::Running
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Pending => write!(f, "PENDING"),
            PipelineState::Running => write!(f, "RUNNING"),
            PipelineState::Success => write!(f, "SUCCESS"),
            PipelineState::Failed => write!(f, "FAILED"),
        }
    }
}
