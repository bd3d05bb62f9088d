use async_trait::async_trait;
use leadflow_common::{BackendError, LeadBackend, LeadId, LeadStatus, RawLeadRecord};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;

const USER_AGENT: &str = concat!("leadflow/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct MoveLeadRequest {
    status: LeadStatus,
    position: usize,
}

/// Error body returned by the lead API: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Lead collection served over HTTP.
///
/// - `GET  {base}/api/leads` returns every lead.
/// - `PATCH {base}/api/leads/{id}/move` with `{"status", "position"}` moves one.
#[derive(Debug, Clone)]
pub struct HttpLeadBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpLeadBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        let base = Url::parse(&config.base_url).map_err(|e| {
            BackendError::Transport(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "Invalid base URL '{}': cannot be a base",
                config.base_url
            )));
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `{base}/api/leads/{segments..}` with every segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "leads"]).extend(segments);
        }
        url
    }

    fn leads_url(&self) -> Url {
        self.api_url(&[])
    }

    /// Lead ids are opaque, so `?`, `#` and `/` stay inside the id segment.
    fn move_url(&self, id: &LeadId) -> Url {
        self.api_url(&[id.as_str(), "move"])
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else {
        BackendError::Transport(e.to_string())
    }
}

/// Turn a non-2xx response into a typed error.
async fn rejection(resp: reqwest::Response, id: Option<&LeadId>) -> BackendError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => BackendError::NotFound { id: id.clone() },
        _ => BackendError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl LeadBackend for HttpLeadBackend {
    async fn fetch_collection(&self) -> Result<Vec<RawLeadRecord>, BackendError> {
        let resp = self
            .client
            .get(self.leads_url())
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(rejection(resp, None).await);
        }
        let records: Vec<RawLeadRecord> = resp.json().await.map_err(transport)?;
        tracing::debug!(leads = records.len(), "fetched lead collection");
        Ok(records)
    }

    async fn set_status_and_position(
        &self,
        id: &LeadId,
        status: LeadStatus,
        position: usize,
    ) -> Result<RawLeadRecord, BackendError> {
        let resp = self
            .client
            .patch(self.move_url(id))
            .json(&MoveLeadRequest { status, position })
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(rejection(resp, Some(id)).await);
        }
        resp.json().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://crm.local:8080/".to_string(),
            ..BackendConfig::default()
        };
        let backend = HttpLeadBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://crm.local:8080");
        assert_eq!(backend.leads_url().as_str(), "http://crm.local:8080/api/leads");
        assert_eq!(
            backend.move_url(&LeadId::from("lead-7")).as_str(),
            "http://crm.local:8080/api/leads/lead-7/move"
        );
    }

    #[test]
    fn test_move_url_escapes_lead_id() {
        let backend = HttpLeadBackend::new(&BackendConfig::default()).unwrap();
        assert_eq!(
            backend.move_url(&LeadId::from("team/42")).as_str(),
            "http://127.0.0.1:8080/api/leads/team%2F42/move"
        );
        assert_eq!(
            backend.move_url(&LeadId::from("acme?q=1#x")).as_str(),
            "http://127.0.0.1:8080/api/leads/acme%3Fq=1%23x/move"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let config = BackendConfig {
            base_url: "http://crm.local/tenant-a/".to_string(),
            ..BackendConfig::default()
        };
        let backend = HttpLeadBackend::new(&config).unwrap();
        assert_eq!(
            backend.leads_url().as_str(),
            "http://crm.local/tenant-a/api/leads"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            ..BackendConfig::default()
        };
        assert!(matches!(
            HttpLeadBackend::new(&config),
            Err(BackendError::Transport(_))
        ));
    }

    #[test]
    fn test_move_request_body() {
        let body = serde_json::to_value(MoveLeadRequest {
            status: LeadStatus::InspectionScheduled,
            position: 3,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "INSPECTION_SCHEDULED", "position": 3})
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 1,
        };
        let backend = HttpLeadBackend::new(&config).unwrap();
        let err = backend.fetch_collection().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
