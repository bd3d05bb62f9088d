use std::str::FromStr;

use leadflow_common::{LeadId, LeadStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::Snapshot;

/// Raw drag-end notification from the drag framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEndEvent {
    /// The card being dragged.
    pub active: LeadId,
    /// What it was released over: a status value, a card id, or nothing.
    pub over: Option<String>,
}

impl DragEndEvent {
    pub fn new(active: impl Into<String>, over: Option<&str>) -> Self {
        Self {
            active: LeadId::new(active),
            over: over.map(str::to_string),
        }
    }
}

/// Where a card was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto a column's empty area.
    Column(LeadStatus),
    /// Onto another card: insert just before it.
    BeforeCard(LeadId),
}

/// Reasons a drop token could not be classified. The drag is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unresolved {
    #[error("dropped outside any target")]
    NoTarget,

    #[error("dropped onto itself")]
    OntoSelf,

    #[error("unrecognised drop token '{0}'")]
    UnknownToken(String),
}

/// Classify a drop token once, so nothing downstream re-parses it.
///
/// Status values win over card ids; a card id must name another lead present
/// in `snapshot`.
pub fn resolve(
    token: Option<&str>,
    dragged: &LeadId,
    snapshot: &Snapshot,
) -> Result<DropTarget, Unresolved> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Err(Unresolved::NoTarget),
    };

    if let Ok(status) = LeadStatus::from_str(token) {
        return Ok(DropTarget::Column(status));
    }

    if token == dragged.as_str() {
        return Err(Unresolved::OntoSelf);
    }

    let other = LeadId::from(token);
    if snapshot.contains(&other) {
        Ok(DropTarget::BeforeCard(other))
    } else {
        Err(Unresolved::UnknownToken(token.to_string()))
    }
}
