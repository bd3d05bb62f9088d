use std::sync::Arc;

use leadflow_common::{BackendError, LeadBackend};
use tokio::sync::broadcast;

use super::events::{BoardEvent, broadcast_event};
use super::snapshot::{self, Snapshot};
use super::store::{CommitTicket, ReplaceCause, SnapshotStore};
use super::sync::Settlement;

/// What a settle does to the store before refetching.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleAction {
    /// Success: drop the optimistic snapshot by refetching.
    Refetch,
    /// Failure: put the pre-mutation snapshot back, then refetch.
    RevertThenRefetch(Snapshot),
}

/// Decide the settle action. `prior` is only used on failure.
pub fn settle_action(settlement: &Settlement, prior: Option<Snapshot>) -> SettleAction {
    match (settlement, prior) {
        (Err(_), Some(prior)) => SettleAction::RevertThenRefetch(snapshot::revert(prior)),
        _ => SettleAction::Refetch,
    }
}

/// What reconciliation did.
#[derive(Debug)]
pub struct ReconcileReport {
    pub reverted: bool,
    /// Store version after the authoritative replace, or why the refetch failed.
    pub refetch: Result<u64, BackendError>,
}

/// Replaces optimistic state with the backend's view after every settle.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn SnapshotStore>,
    backend: Arc<dyn LeadBackend>,
    events: Option<broadcast::Sender<BoardEvent>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SnapshotStore>, backend: Arc<dyn LeadBackend>) -> Self {
        Self {
            store,
            backend,
            events: None,
        }
    }

    /// Announce every store replacement on `events`.
    pub fn with_events(mut self, events: broadcast::Sender<BoardEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn replace(&self, snapshot: Snapshot, cause: ReplaceCause) -> u64 {
        let version = self.store.replace(snapshot, cause);
        if let Some(tx) = &self.events {
            broadcast_event(tx, BoardEvent::SnapshotReplaced { version, cause });
        }
        version
    }

    /// Fetch the authoritative collection and make it the store's snapshot.
    pub async fn refresh(&self) -> Result<u64, BackendError> {
        let records = self.backend.fetch_collection().await?;
        let version = self.replace(snapshot::load(&records), ReplaceCause::Fetched);
        tracing::debug!(version, leads = records.len(), "snapshot refreshed");
        Ok(version)
    }

    /// Settle the commit identified by `ticket`.
    ///
    /// A refetch follows on both paths; on failure the prior snapshot is shown
    /// first so the card snaps back without waiting for the network.
    pub async fn reconcile(&self, ticket: CommitTicket, settlement: &Settlement) -> ReconcileReport {
        let prior = self.store.take_prior(ticket);
        let reverted = match settle_action(settlement, prior) {
            SettleAction::RevertThenRefetch(prior) => {
                self.replace(prior, ReplaceCause::Reverted);
                true
            }
            SettleAction::Refetch => {
                if settlement.is_err() {
                    tracing::warn!(%ticket, "no prior snapshot parked for failed commit");
                }
                false
            }
        };

        let refetch = self.refresh().await;
        if let Err(e) = &refetch {
            tracing::warn!(%ticket, error = %e, reverted, "refetch after settle failed");
        }
        ReconcileReport { reverted, refetch }
    }
}

#[cfg(test)]
mod tests {
    use leadflow_common::{LeadId, LeadStatus};

    use super::*;
    use crate::backend::memory::InMemoryLeadBackend;
    use crate::board::command::ReorderCommand;
    use crate::board::mutation::apply;
    use crate::board::snapshot::fixtures::{ids, raw};
    use crate::board::store::InMemorySnapshotStore;
    use crate::board::sync::SyncClient;

    fn command(id: &str, status: LeadStatus, index: usize) -> ReorderCommand {
        ReorderCommand {
            lead_id: LeadId::from(id),
            target_status: status,
            target_index: index,
        }
    }

    async fn seeded() -> (Arc<InMemorySnapshotStore>, Arc<InMemoryLeadBackend>, Reconciler) {
        let backend = Arc::new(InMemoryLeadBackend::with_records(vec![
            raw("lead-1", "NEW", 0),
            raw("lead-2", "NEW", 1),
            raw("lead-3", "CONTACTED", 0),
        ]));
        let store = Arc::new(InMemorySnapshotStore::new());
        let reconciler = Reconciler::new(store.clone(), backend.clone());
        reconciler.refresh().await.unwrap();
        (store, backend, reconciler)
    }

    #[test]
    fn test_settle_action_reverts_only_with_prior() {
        let settlement: Settlement = Err(crate::errors::SyncFailure {
            command: command("a", LeadStatus::New, 0),
            source: BackendError::Transport("reset".into()),
        });
        let prior = Snapshot::empty();
        assert_eq!(
            settle_action(&settlement, Some(prior.clone())),
            SettleAction::RevertThenRefetch(prior)
        );
        assert_eq!(settle_action(&settlement, None), SettleAction::Refetch);
    }

    #[tokio::test]
    async fn test_success_replaces_optimistic_with_backend_view() {
        let (store, backend, reconciler) = seeded().await;
        let cmd = command("lead-1", LeadStatus::Contacted, 1);
        let applied = apply(&store.current(), &cmd);
        store.stash_prior(CommitTicket(1), applied.prior);
        store.replace(applied.next, ReplaceCause::Optimistic);

        let settlement = SyncClient::new(backend.clone()).commit(cmd).await;
        assert!(settlement.is_ok());
        // Another user reorders before the refetch lands; the backend wins.
        backend
            .set_status_and_position(&LeadId::from("lead-3"), LeadStatus::Contacted, 1)
            .await
            .unwrap();

        let report = reconciler.reconcile(CommitTicket(1), &settlement).await;
        assert!(!report.reverted);
        assert!(report.refetch.is_ok());
        let current = store.current();
        assert_eq!(ids(&current, LeadStatus::Contacted), vec!["lead-1", "lead-3"]);
        assert_eq!(ids(&current, LeadStatus::New), vec!["lead-2"]);
        assert_eq!(store.pending_priors(), 0);
    }

    #[tokio::test]
    async fn test_failure_reverts_then_refetches() {
        let (store, backend, reconciler) = seeded().await;
        let before = store.current();
        let cmd = command("lead-2", LeadStatus::Won, 0);
        let applied = apply(&before, &cmd);
        store.stash_prior(CommitTicket(2), applied.prior);
        store.replace(applied.next, ReplaceCause::Optimistic);

        backend.reject_moves(true);
        let settlement = SyncClient::new(backend.clone()).commit(cmd).await;
        let fetches_before = backend.fetch_calls();

        let report = reconciler.reconcile(CommitTicket(2), &settlement).await;
        assert!(report.reverted);
        assert_eq!(backend.fetch_calls(), fetches_before + 1);
        assert_eq!(store.current(), before);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_reverted_snapshot() {
        let (store, backend, reconciler) = seeded().await;
        let before = store.current();
        let cmd = command("lead-1", LeadStatus::Lost, 0);
        let applied = apply(&before, &cmd);
        store.stash_prior(CommitTicket(3), applied.prior);
        store.replace(applied.next, ReplaceCause::Optimistic);

        backend.reject_moves(true);
        backend.fail_fetches(true);
        let settlement = SyncClient::new(backend.clone()).commit(cmd).await;
        let report = reconciler.reconcile(CommitTicket(3), &settlement).await;

        assert!(report.reverted);
        assert!(matches!(report.refetch, Err(BackendError::Unavailable(_))));
        assert_eq!(store.current(), before);
    }

    #[tokio::test]
    async fn test_replacements_are_announced() {
        let (store, backend, reconciler) = seeded().await;
        let (tx, mut rx) = broadcast::channel(8);
        let reconciler = reconciler.with_events(tx);

        let cmd = command("lead-3", LeadStatus::New, 0);
        let applied = apply(&store.current(), &cmd);
        store.stash_prior(CommitTicket(7), applied.prior);
        store.replace(applied.next, ReplaceCause::Optimistic);
        backend.reject_moves(true);
        let settlement = SyncClient::new(backend.clone()).commit(cmd).await;
        reconciler.reconcile(CommitTicket(7), &settlement).await;

        let causes: Vec<ReplaceCause> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| match event {
                BoardEvent::SnapshotReplaced { cause, .. } => cause,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(causes, vec![ReplaceCause::Reverted, ReplaceCause::Fetched]);
    }
}
