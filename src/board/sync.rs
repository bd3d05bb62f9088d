use std::sync::Arc;

use leadflow_common::{LeadBackend, RawLeadRecord};

use super::command::ReorderCommand;
use crate::errors::SyncFailure;

/// Backend acknowledgement of a reorder. Informational only: positions are
/// taken from the refetch that follows, never from here.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitAck {
    pub command: ReorderCommand,
    pub record: RawLeadRecord,
}

/// Outcome of one commit.
pub type Settlement = Result<CommitAck, SyncFailure>;

/// Sends reorder commands to the backend, once each.
///
/// There is no retry: a failed reorder may have partially applied, so the
/// reconciler refetches instead.
#[derive(Clone)]
pub struct SyncClient {
    backend: Arc<dyn LeadBackend>,
}

impl SyncClient {
    pub fn new(backend: Arc<dyn LeadBackend>) -> Self {
        Self { backend }
    }

    pub async fn commit(&self, command: ReorderCommand) -> Settlement {
        tracing::info!(
            lead = %command.lead_id,
            status = %command.target_status,
            position = command.target_index,
            "committing reorder"
        );
        match self
            .backend
            .set_status_and_position(
                &command.lead_id,
                command.target_status,
                command.target_index,
            )
            .await
        {
            Ok(record) => Ok(CommitAck { command, record }),
            Err(source) => {
                tracing::warn!(lead = %command.lead_id, error = %source, "reorder rejected");
                Err(SyncFailure { command, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use leadflow_common::{BackendError, LeadId, LeadStatus};

    use super::*;
    use crate::backend::memory::InMemoryLeadBackend;
    use crate::board::snapshot::fixtures::raw;

    fn command(id: &str, status: LeadStatus, index: usize) -> ReorderCommand {
        ReorderCommand {
            lead_id: LeadId::from(id),
            target_status: status,
            target_index: index,
        }
    }

    #[tokio::test]
    async fn test_commit_sends_status_and_position() {
        let backend = Arc::new(InMemoryLeadBackend::with_records(vec![
            raw("lead-1", "NEW", 0),
            raw("lead-2", "WON", 0),
        ]));
        let client = SyncClient::new(backend.clone());

        let ack = client
            .commit(command("lead-1", LeadStatus::Won, 0))
            .await
            .unwrap();
        assert_eq!(ack.record.status, "WON");
        assert_eq!(ack.record.position, 0);
        assert_eq!(backend.move_calls(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_carries_command() {
        let backend = Arc::new(InMemoryLeadBackend::with_records(vec![raw(
            "lead-1", "NEW", 0,
        )]));
        backend.reject_moves(true);
        let client = SyncClient::new(backend.clone());

        let failure = client
            .commit(command("lead-1", LeadStatus::Lost, 0))
            .await
            .unwrap_err();
        assert_eq!(failure.command.lead_id.as_str(), "lead-1");
        assert!(matches!(failure.source, BackendError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_commit_is_not_retried() {
        let backend = Arc::new(InMemoryLeadBackend::new());
        let client = SyncClient::new(backend.clone());

        let failure = client
            .commit(command("missing", LeadStatus::New, 0))
            .await
            .unwrap_err();
        assert!(matches!(failure.source, BackendError::NotFound { .. }));
        assert_eq!(backend.move_calls(), 1);
    }
}
