//! Processing-status state machine.
//!
//! ```text
//! IN_PROGRESS ──► COMPLETED
//!      │
//!      └────────► FAILED
//! ```
//!
//! With reprocessing enabled, both terminal states may also return to
//! `IN_PROGRESS`.

use crate::{
    errors::{VideoError, VideoResult},
    models::video::ProcessingStatus,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleManager {
    allow_reprocessing: bool,
}

impl LifecycleManager {
    pub fn new(allow_reprocessing: bool) -> Self {
        Self { allow_reprocessing }
    }

    /// Canonicalize a transport token into a status.
    pub fn parse_status(&self, raw: &str) -> VideoResult<ProcessingStatus> {
        raw.parse()
    }

    pub fn is_valid_transition(
        &self,
        current: ProcessingStatus,
        requested: ProcessingStatus,
    ) -> bool {
        use ProcessingStatus::*;

        match (current, requested) {
            (InProgress, Completed) | (InProgress, Failed) => true,
            (from, InProgress) if from.is_terminal() => self.allow_reprocessing,
            _ => false,
        }
    }

    pub fn validate_transition(
        &self,
        current: ProcessingStatus,
        requested: ProcessingStatus,
    ) -> VideoResult<()> {
        if self.is_valid_transition(current, requested) {
            Ok(())
        } else {
            Err(VideoError::InvalidTransition {
                from: current,
                to: requested,
            })
        }
    }
}
