use leadflow_common::{LeadId, LeadStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::session::DiscardReason;
use super::store::{CommitTicket, ReplaceCause};

// ── Board notifications ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    SnapshotReplaced {
        version: u64,
        cause: ReplaceCause,
    },
    DragDiscarded {
        lead_id: LeadId,
        reason: DiscardReason,
    },
    CommitStarted {
        ticket: CommitTicket,
        lead_id: LeadId,
        target_status: LeadStatus,
        target_index: usize,
    },
    CommitSettled {
        ticket: CommitTicket,
        lead_id: LeadId,
        success: bool,
        reverted: bool,
    },
}

/// Send an event to every subscriber.
pub fn broadcast_event(tx: &broadcast::Sender<BoardEvent>, event: BoardEvent) {
    let _ = tx.send(event); // Ignore error if no receivers
}
