use leadflow_common::{LeadId, LeadStatus};
use serde::{Deserialize, Serialize};

use super::drop_target::DropTarget;
use super::snapshot::Snapshot;

/// Normalized reorder instruction: move `lead_id` to `target_index` of
/// `target_status`. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderCommand {
    pub lead_id: LeadId,
    pub target_status: LeadStatus,
    pub target_index: usize,
}

/// What to do with a resolved drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    Commit(ReorderCommand),
    /// The card would land where it already is.
    NoOp,
    /// The dragged card is not in the snapshot (e.g. a refetch removed it).
    MissingLead,
}

/// Turn a drop target into a command against `snapshot`.
pub fn plan(dragged: &LeadId, target: &DropTarget, snapshot: &Snapshot) -> CommandPlan {
    let Some((current_status, current_index)) = snapshot.locate(dragged) else {
        return CommandPlan::MissingLead;
    };

    let (target_status, target_index) = match target {
        DropTarget::Column(status) if *status == current_status => (*status, current_index),
        DropTarget::Column(status) => (*status, snapshot.column(*status).len()),
        DropTarget::BeforeCard(other) => match snapshot.locate(other) {
            Some(found) => found,
            None => (current_status, snapshot.column(current_status).len()),
        },
    };

    if target_status == current_status && target_index == current_index {
        return CommandPlan::NoOp;
    }

    CommandPlan::Commit(ReorderCommand {
        lead_id: dragged.clone(),
        target_status,
        target_index,
    })
}
