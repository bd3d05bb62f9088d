//! Shared domain types for the leadflow pipeline board.
//!
//! `lead` holds the record and status types; `backend` holds the contract the
//! board uses to reach the authoritative server.

pub mod backend;
pub mod lead;

pub use backend::{BackendError, LeadBackend};
pub use lead::{LeadId, LeadRecord, LeadStatus, RawLeadRecord};
