use async_trait::async_trait;
use thiserror::Error;

use crate::lead::{LeadId, LeadStatus, RawLeadRecord};

/// Failures reported by a lead backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Lead {id} not found")]
    NotFound { id: LeadId },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// The two backend operations the pipeline board depends on.
/// Real implementation: `HttpLeadBackend`. In-process: `InMemoryLeadBackend`.
#[async_trait]
pub trait LeadBackend: Send + Sync {
    /// Every lead visible to the current user. Positions may be sparse or unsorted.
    async fn fetch_collection(&self) -> Result<Vec<RawLeadRecord>, BackendError>;

    /// Move `id` into `status` at zero-based `position` (index at request time).
    /// The backend may recompute positions; the returned record is informational.
    async fn set_status_and_position(
        &self,
        id: &LeadId,
        status: LeadStatus,
        position: usize,
    ) -> Result<RawLeadRecord, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_rejected_carries_status() {
        let err = BackendError::Rejected {
            status: 422,
            message: "position out of range".to_string(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("position out of range"));
    }

    #[test]
    fn backend_error_not_found_names_lead() {
        let err = BackendError::NotFound {
            id: LeadId::from("lead-9"),
        };
        assert_eq!(err.to_string(), "Lead lead-9 not found");
    }

    #[test]
    fn backend_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BackendError::Transport("reset".into()));
    }
}
