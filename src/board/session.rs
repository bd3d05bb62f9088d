use leadflow_common::{LeadId, LeadStatus};
use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use super::store::CommitTicket;
use crate::errors::BoardError;

/// The grabbed card and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grab {
    pub lead: LeadId,
    pub origin: LeadStatus,
    pub origin_index: usize,
}

impl Grab {
    /// Capture `lead`'s current place in `snapshot`.
    pub fn capture(lead: &LeadId, snapshot: &Snapshot) -> Result<Self, BoardError> {
        let (origin, origin_index) = snapshot
            .locate(lead)
            .ok_or_else(|| BoardError::LeadNotFound { id: lead.clone() })?;
        Ok(Self {
            lead: lead.clone(),
            origin,
            origin_index,
        })
    }
}

/// Why a finished drag produced no commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscardReason {
    /// The drop token could not be classified.
    Unresolved { detail: String },
    /// The card would land where it started.
    NoOp,
    /// The card is no longer on the board.
    MissingLead,
    /// Per-lead serialization is on and this lead has a commit outstanding.
    CommitInFlight,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved { detail } => write!(f, "unresolved drop target: {}", detail),
            Self::NoOp => f.write_str("no-op"),
            Self::MissingLead => f.write_str("lead missing from snapshot"),
            Self::CommitInFlight => f.write_str("commit already in flight"),
        }
    }
}

/// Lifecycle of one drag interaction:
/// `Idle → Grabbed → Hovering → (Discarded | Committing) → Settled → Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Grabbed(Grab),
    Hovering {
        grab: Grab,
        over: String,
    },
    Discarded(DiscardReason),
    Committing {
        lead: LeadId,
        ticket: CommitTicket,
    },
    Settled {
        lead: LeadId,
        ticket: CommitTicket,
        success: bool,
    },
}

/// Inputs that move a [`DragState`] forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragInput {
    Grab(Grab),
    Hover(String),
    Cancel,
    Discard(DiscardReason),
    Commit(CommitTicket),
    Settle { success: bool },
    Reset,
}

impl DragInput {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grab(_) => "grab",
            Self::Hover(_) => "hover",
            Self::Cancel => "cancel",
            Self::Discard(_) => "discard",
            Self::Commit(_) => "commit",
            Self::Settle { .. } => "settle",
            Self::Reset => "reset",
        }
    }
}

impl DragState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Grabbed(_) => "grabbed",
            Self::Hovering { .. } => "hovering",
            Self::Discarded(_) => "discarded",
            Self::Committing { .. } => "committing",
            Self::Settled { .. } => "settled",
        }
    }

    /// The grab behind a live pointer interaction.
    pub fn grab(&self) -> Option<&Grab> {
        match self {
            Self::Grabbed(grab) | Self::Hovering { grab, .. } => Some(grab),
            _ => None,
        }
    }

    /// Only `Committing` has a request outstanding.
    pub fn is_committing(&self) -> bool {
        matches!(self, Self::Committing { .. })
    }

    pub fn on(self, input: DragInput) -> Result<DragState, BoardError> {
        let from = self.name();
        let event = input.name();
        match (self, input) {
            (Self::Idle, DragInput::Grab(grab)) => Ok(Self::Grabbed(grab)),
            (Self::Grabbed(grab) | Self::Hovering { grab, .. }, DragInput::Hover(over)) => {
                Ok(Self::Hovering { grab, over })
            }
            (Self::Grabbed(_) | Self::Hovering { .. }, DragInput::Cancel) => Ok(Self::Idle),
            (Self::Grabbed(_) | Self::Hovering { .. }, DragInput::Discard(reason)) => {
                Ok(Self::Discarded(reason))
            }
            (Self::Grabbed(grab) | Self::Hovering { grab, .. }, DragInput::Commit(ticket)) => {
                Ok(Self::Committing {
                    lead: grab.lead,
                    ticket,
                })
            }
            (Self::Committing { lead, ticket }, DragInput::Settle { success }) => {
                Ok(Self::Settled {
                    lead,
                    ticket,
                    success,
                })
            }
            (Self::Discarded(_) | Self::Settled { .. }, DragInput::Reset) => Ok(Self::Idle),
            _ => Err(BoardError::InvalidTransition { from, event }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::snapshot::fixtures::board;
    use super::*;

    fn grab() -> Grab {
        Grab {
            lead: LeadId::from("lead-1"),
            origin: LeadStatus::New,
            origin_index: 0,
        }
    }

    #[test]
    fn test_commit_path() {
        let state = DragState::Idle
            .on(DragInput::Grab(grab()))
            .and_then(|s| s.on(DragInput::Hover("CONTACTED".into())))
            .and_then(|s| s.on(DragInput::Hover("lead-3".into())))
            .and_then(|s| s.on(DragInput::Commit(CommitTicket(4))))
            .unwrap();
        assert!(state.is_committing());

        let settled = state.on(DragInput::Settle { success: false }).unwrap();
        assert_eq!(
            settled,
            DragState::Settled {
                lead: LeadId::from("lead-1"),
                ticket: CommitTicket(4),
                success: false,
            }
        );
        assert_eq!(settled.on(DragInput::Reset).unwrap(), DragState::Idle);
    }

    #[test]
    fn test_discard_path_returns_to_idle() {
        let state = DragState::Idle
            .on(DragInput::Grab(grab()))
            .and_then(|s| s.on(DragInput::Discard(DiscardReason::NoOp)))
            .unwrap();
        assert_eq!(state, DragState::Discarded(DiscardReason::NoOp));
        assert_eq!(state.on(DragInput::Reset).unwrap(), DragState::Idle);
    }

    #[test]
    fn test_cancel_from_hovering() {
        let state = DragState::Grabbed(grab())
            .on(DragInput::Hover("WON".into()))
            .and_then(|s| s.on(DragInput::Cancel))
            .unwrap();
        assert_eq!(state, DragState::Idle);
    }

    #[test]
    fn test_hover_keeps_grab() {
        let state = DragState::Grabbed(grab())
            .on(DragInput::Hover("LOST".into()))
            .unwrap();
        assert_eq!(state.grab(), Some(&grab()));
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let err = DragState::Idle
            .on(DragInput::Hover("NEW".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::InvalidTransition {
                from: "idle",
                event: "hover"
            }
        ));
        assert!(DragState::Grabbed(grab()).on(DragInput::Grab(grab())).is_err());
        assert!(
            DragState::Committing {
                lead: LeadId::from("x"),
                ticket: CommitTicket(1)
            }
            .on(DragInput::Cancel)
            .is_err()
        );
    }

    #[test]
    fn test_capture_reads_origin() {
        let snapshot = board(&[("CONTACTED", &["a", "b"])]);
        let grab = Grab::capture(&LeadId::from("b"), &snapshot).unwrap();
        assert_eq!(grab.origin, LeadStatus::Contacted);
        assert_eq!(grab.origin_index, 1);
        assert!(matches!(
            Grab::capture(&LeadId::from("zz"), &snapshot),
            Err(BoardError::LeadNotFound { .. })
        ));
    }

    #[test]
    fn test_discard_reason_serde_is_tagged() {
        let json = serde_json::to_value(DiscardReason::Unresolved {
            detail: "dropped outside any target".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "unresolved");
        assert_eq!(json["detail"], "dropped outside any target");
    }
}
