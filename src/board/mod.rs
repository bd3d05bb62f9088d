//! Pipeline board: optimistic drag-and-drop reordering of leads.
//!
//! ## Overview
//!
//! Leads sit in six status columns, each a dense sequence `0..n-1`. A drag
//! is applied to the local snapshot at once, sent to the backend in the
//! background, and then replaced by an authoritative refetch. A failed send
//! puts the pre-drag snapshot back before refetching.
//!
//! ## Module Map
//!
//! ```text
//!  view ── DragEndEvent ──> engine.rs  (PipelineBoard)
//!                              │
//!                              │ drop_target::resolve() → DropTarget
//!                              │ command::plan()        → ReorderCommand
//!                              │ mutation::apply()      → next + prior Snapshot
//!                              v
//!                           store.rs   (SnapshotStore: optimistic replace,
//!                              │        prior parked per CommitTicket)
//!                              │
//!                    tokio task│ sync.rs      SyncClient::commit()
//!                              │ reconcile.rs Reconciler::reconcile()
//!                              v
//!                           LeadBackend (HTTP or in-memory)
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                         |
//! |-------------|--------------------------------------------------------|
//! | `snapshot`  | `Snapshot`, `load` from raw records, `revert`          |
//! | `session`   | `DragState` machine for one pointer interaction        |
//! | `events`    | `BoardEvent` enum + `broadcast_event()` helper         |
//!
//! ## Ordering
//!
//! Several commits may be in flight at once. Each settle refetches, so the
//! settle that finishes last decides what the board shows, regardless of
//! the order the drags were made in. `pipeline.serialize_per_lead` refuses
//! a second drag of a lead whose first commit has not settled.

pub mod command;
pub mod drop_target;
pub mod engine;
pub mod events;
pub mod mutation;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use command::{CommandPlan, ReorderCommand};
pub use drop_target::{DragEndEvent, DropTarget, Unresolved};
pub use engine::{CommitHandle, DragOutcome, PipelineBoard, Settled};
pub use events::BoardEvent;
pub use session::{DiscardReason, DragState};
pub use snapshot::{Column, Snapshot};
pub use store::{CommitTicket, InMemorySnapshotStore, ReplaceCause, SnapshotStore};
