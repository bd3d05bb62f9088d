use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use leadflow_common::{LeadBackend, LeadId, LeadStatus};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::command::{self, CommandPlan, ReorderCommand};
use super::drop_target::{self, DragEndEvent};
use super::events::{BoardEvent, broadcast_event};
use super::mutation;
use super::reconcile::Reconciler;
use super::session::{DiscardReason, DragInput, DragState, Grab};
use super::snapshot::{Column, Snapshot};
use super::store::{CommitTicket, ReplaceCause, SnapshotStore};
use super::sync::SyncClient;
use crate::config::PipelineConfig;
use crate::errors::BoardError;

/// Result of a finished drag.
pub enum DragOutcome {
    /// Nothing was applied or sent.
    Discarded(DiscardReason),
    /// Applied locally; the commit runs in the background.
    Committing(CommitHandle),
}

impl DragOutcome {
    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded(_))
    }
}

/// Summary of a commit once it has settled and been reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub ticket: CommitTicket,
    pub lead_id: LeadId,
    pub success: bool,
    pub reverted: bool,
    /// Store version after the refetch, if it succeeded.
    pub refreshed_version: Option<u64>,
}

/// Handle to a commit running in the background.
pub struct CommitHandle {
    pub ticket: CommitTicket,
    pub command: ReorderCommand,
    join: JoinHandle<Option<Settled>>,
}

impl CommitHandle {
    /// Wait for the settle. `None` if the board was torn down first.
    pub async fn settled(self) -> Option<Settled> {
        self.join.await.ok().flatten()
    }
}

type InFlight = Arc<Mutex<HashMap<LeadId, usize>>>;

fn lock_in_flight(in_flight: &InFlight) -> MutexGuard<'_, HashMap<LeadId, usize>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a lead as committing for as long as it is alive.
struct InFlightGuard {
    in_flight: InFlight,
    lead: LeadId,
}

impl InFlightGuard {
    fn new(in_flight: &InFlight, lead: LeadId) -> Self {
        *lock_in_flight(in_flight).entry(lead.clone()).or_insert(0) += 1;
        Self {
            in_flight: in_flight.clone(),
            lead,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut map = lock_in_flight(&self.in_flight);
        if let Some(count) = map.get_mut(&self.lead) {
            *count -= 1;
            if *count == 0 {
                map.remove(&self.lead);
            }
        }
    }
}

/// The pipeline board a view talks to.
///
/// Drag events are handled synchronously up to the optimistic update; the
/// commit and reconciliation run as a Tokio task, so `on_drag_end` must be
/// called from within a runtime. Dropping the board (or calling `teardown`)
/// discards the results of every commit still in flight.
pub struct PipelineBoard {
    store: Arc<dyn SnapshotStore>,
    sync: SyncClient,
    reconciler: Reconciler,
    session: Mutex<DragState>,
    in_flight: InFlight,
    next_ticket: AtomicU64,
    cancel: CancellationToken,
    events: broadcast::Sender<BoardEvent>,
    serialize_per_lead: bool,
}

impl PipelineBoard {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        backend: Arc<dyn LeadBackend>,
        config: &PipelineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let reconciler = Reconciler::new(store.clone(), backend.clone()).with_events(events.clone());
        Self {
            store,
            sync: SyncClient::new(backend),
            reconciler,
            session: Mutex::new(DragState::Idle),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(1),
            cancel: CancellationToken::new(),
            events,
            serialize_per_lead: config.serialize_per_lead,
        }
    }

    // ── Read side ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        self.store.current()
    }

    /// Ordered records of one column.
    pub fn column(&self, status: LeadStatus) -> Column {
        self.store.current().column(status).clone()
    }

    /// True while a commit for `lead` is outstanding.
    pub fn is_committing(&self, lead: &LeadId) -> bool {
        lock_in_flight(&self.in_flight).contains_key(lead)
    }

    pub fn committing_leads(&self) -> Vec<LeadId> {
        let mut leads: Vec<LeadId> = lock_in_flight(&self.in_flight).keys().cloned().collect();
        leads.sort();
        leads
    }

    pub fn drag_state(&self) -> DragState {
        self.lock_session().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Load the authoritative snapshot.
    pub async fn refresh(&self) -> Result<u64, BoardError> {
        Ok(self.reconciler.refresh().await?)
    }

    /// Stop reacting to in-flight commits. Idempotent.
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(in_flight = self.committing_leads().len(), "pipeline board torn down");
            self.cancel.cancel();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Drag events ───────────────────────────────────────────────────

    pub fn on_drag_start(&self, lead: &LeadId) {
        let grab = match Grab::capture(lead, &self.store.current()) {
            Ok(grab) => grab,
            Err(e) => {
                tracing::debug!(error = %e, "drag start ignored");
                return;
            }
        };
        self.transition(DragInput::Grab(grab));
    }

    pub fn on_drag_over(&self, token: &str) {
        self.transition(DragInput::Hover(token.to_string()));
    }

    pub fn on_drag_cancel(&self) {
        self.transition(DragInput::Cancel);
    }

    /// Drive one drag-end through resolve → plan → apply → commit.
    pub fn on_drag_end(&self, event: DragEndEvent) -> DragOutcome {
        let lead = event.active.clone();
        let state = self.begin_release(&lead);

        if self.serialize_per_lead && self.is_committing(&lead) {
            return self.discard(state, &lead, DiscardReason::CommitInFlight);
        }

        let snapshot = self.store.current();
        let target = match drop_target::resolve(event.over.as_deref(), &lead, &snapshot) {
            Ok(target) => target,
            Err(e) => {
                let reason = DiscardReason::Unresolved {
                    detail: e.to_string(),
                };
                return self.discard(state, &lead, reason);
            }
        };

        let command = match command::plan(&lead, &target, &snapshot) {
            CommandPlan::Commit(command) => command,
            CommandPlan::NoOp => return self.discard(state, &lead, DiscardReason::NoOp),
            CommandPlan::MissingLead => {
                return self.discard(state, &lead, DiscardReason::MissingLead);
            }
        };

        let ticket = CommitTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst));
        let applied = mutation::apply(&snapshot, &command);
        self.store.stash_prior(ticket, applied.prior);
        let version = self.store.replace(applied.next, ReplaceCause::Optimistic);
        broadcast_event(
            &self.events,
            BoardEvent::SnapshotReplaced {
                version,
                cause: ReplaceCause::Optimistic,
            },
        );
        broadcast_event(
            &self.events,
            BoardEvent::CommitStarted {
                ticket,
                lead_id: lead.clone(),
                target_status: command.target_status,
                target_index: command.target_index,
            },
        );

        let committing = match state.on(DragInput::Commit(ticket)) {
            Ok(committing) => committing,
            Err(e) => {
                tracing::debug!(error = %e, "drag state out of step");
                DragState::Committing {
                    lead: lead.clone(),
                    ticket,
                }
            }
        };

        let join = self.spawn_commit(ticket, command.clone(), committing);
        DragOutcome::Committing(CommitHandle {
            ticket,
            command,
            join,
        })
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn lock_session(&self) -> MutexGuard<'_, DragState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, input: DragInput) {
        let mut session = self.lock_session();
        match std::mem::take(&mut *session).on(input.clone()) {
            Ok(next) => *session = next,
            Err(e) => {
                tracing::debug!(error = %e, "drag event ignored");
                // Re-grabbing mid-drag starts over from the new card.
                if let DragInput::Grab(grab) = input {
                    *session = DragState::Grabbed(grab);
                }
            }
        }
    }

    /// Take the pointer interaction out of the session, leaving it idle for
    /// the next drag. Frameworks that only report drag-end get a grab
    /// captured on the spot.
    fn begin_release(&self, lead: &LeadId) -> DragState {
        let state = std::mem::take(&mut *self.lock_session());
        if state.grab().is_some_and(|grab| &grab.lead == lead) {
            return state;
        }
        Grab::capture(lead, &self.store.current())
            .map(DragState::Grabbed)
            .unwrap_or_default()
    }

    fn discard(&self, state: DragState, lead: &LeadId, reason: DiscardReason) -> DragOutcome {
        tracing::debug!(lead = %lead, %reason, "drag discarded");
        let finished = state
            .on(DragInput::Discard(reason.clone()))
            .and_then(|s| s.on(DragInput::Reset));
        if let Err(e) = finished {
            tracing::debug!(error = %e, "drag state out of step");
        }
        broadcast_event(
            &self.events,
            BoardEvent::DragDiscarded {
                lead_id: lead.clone(),
                reason: reason.clone(),
            },
        );
        DragOutcome::Discarded(reason)
    }

    fn spawn_commit(
        &self,
        ticket: CommitTicket,
        command: ReorderCommand,
        committing: DragState,
    ) -> JoinHandle<Option<Settled>> {
        let lead = command.lead_id.clone();
        let guard = InFlightGuard::new(&self.in_flight, lead.clone());
        let store = self.store.clone();
        let sync = self.sync.clone();
        let reconciler = self.reconciler.clone();
        let cancel = self.cancel.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let work = async move {
                let settlement = sync.commit(command).await;
                // Committing ends with the backend's answer, not the refetch.
                drop(guard);
                let report = reconciler.reconcile(ticket, &settlement).await;
                (settlement.is_ok(), report)
            };
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = work => Some(outcome),
            };

            let Some((success, report)) = outcome else {
                // The store may outlive the board.
                store.take_prior(ticket);
                tracing::debug!(%ticket, lead = %lead, "commit result dropped after teardown");
                return None;
            };

            match committing
                .on(DragInput::Settle { success })
                .and_then(|s| s.on(DragInput::Reset))
            {
                Ok(_) => tracing::info!(
                    %ticket,
                    lead = %lead,
                    success,
                    reverted = report.reverted,
                    "commit settled"
                ),
                Err(e) => tracing::debug!(error = %e, "drag state out of step"),
            }
            broadcast_event(
                &events,
                BoardEvent::CommitSettled {
                    ticket,
                    lead_id: lead.clone(),
                    success,
                    reverted: report.reverted,
                },
            );
            Some(Settled {
                ticket,
                lead_id: lead,
                success,
                reverted: report.reverted,
                refreshed_version: report.refetch.ok(),
            })
        })
    }
}

impl Drop for PipelineBoard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
