pub mod backend;
pub mod board;
pub mod config;
pub mod errors;
pub mod telemetry;

pub use leadflow_common::{BackendError, LeadBackend, LeadId, LeadRecord, LeadStatus, RawLeadRecord};
