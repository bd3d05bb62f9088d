//! Typed error hierarchy for the pipeline board.
//!
//! - `BoardError`: policy errors and engine failures inside the board
//! - `SyncFailure`: a commit the backend did not accept
//!
//! None of these reach the view layer; the board logs them and the only
//! visible effect is a card snapping back.

use leadflow_common::{BackendError, LeadId};
use thiserror::Error;

use crate::board::command::ReorderCommand;

/// Errors from the board engine.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Lead {lead} has unknown status '{status}'")]
    UnknownStatus { lead: LeadId, status: String },

    #[error("Lead {id} reported more than once")]
    DuplicateLead { id: LeadId },

    #[error("Lead {id} not found in snapshot")]
    LeadNotFound { id: LeadId },

    #[error("Invalid drag transition: {event} while {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A reorder the backend refused or never acknowledged.
#[derive(Debug, Clone, Error)]
#[error(
    "Commit of {} to {}[{}] failed: {source}",
    .command.lead_id,
    .command.target_status,
    .command.target_index
)]
pub struct SyncFailure {
    pub command: ReorderCommand,
    #[source]
    pub source: BackendError,
}
