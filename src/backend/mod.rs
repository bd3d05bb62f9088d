//! [`LeadBackend`] implementations: HTTP for real deployments, in-memory for
//! tests and `--demo` runs.

pub mod http;
pub mod memory;

use std::sync::Arc;

use leadflow_common::{BackendError, LeadBackend};

use crate::config::LeadflowConfig;

pub use http::HttpLeadBackend;
pub use memory::InMemoryLeadBackend;

/// Pick the backend the configuration asks for.
pub fn from_config(config: &LeadflowConfig) -> Result<Arc<dyn LeadBackend>, BackendError> {
    if config.demo {
        tracing::debug!("using seeded in-memory backend");
        return Ok(Arc::new(InMemoryLeadBackend::demo()));
    }
    tracing::debug!(base_url = %config.backend().base_url, "using HTTP backend");
    Ok(Arc::new(HttpLeadBackend::new(config.backend())?))
}
