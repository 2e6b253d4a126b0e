//! Blocking HTTP implementation of [`ProcurementApi`] on `ureq`.
//!
//! One [`ureq::Agent`] is created per run and reused for every request, so
//! connections are pooled for the run's lifetime and released when the
//! client is dropped.

use std::time::Duration;

use poline_core::types::{PoId, RemoteLineId};
use poline_core::RunConfig;

use crate::api::{ApiResponse, ProcurementApi};
use crate::error::WorkflowError;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-COUPA-API-KEY";

const JSON: &str = "application/json";
const XML: &str = "application/xml";

/// Procurement API client bound to one base URL and API key.
pub struct HttpProcurementApi {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpProcurementApi {
    /// Build a client from the validated run configuration.
    pub fn new(config: &RunConfig) -> Self {
        Self::with_base_url(&config.base_url, &config.api_key, config.timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpProcurementApi {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, url: &str, accept: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("accept", accept)
            .set(API_KEY_HEADER, &self.api_key)
    }
}

impl ProcurementApi for HttpProcurementApi {
    fn get_purchase_order(&self, po_id: PoId) -> Result<ApiResponse, WorkflowError> {
        let url = self.url(&format!("/api/purchase_orders/{po_id}"));
        let result = self.request("GET", &url, JSON).call();
        into_api_response("GET", &url, result)
    }

    fn reopen_line(
        &self,
        line_id: &RemoteLineId,
        body: &str,
    ) -> Result<ApiResponse, WorkflowError> {
        let url = self.url(&format!(
            "/api/purchase_order_lines/{line_id}/reopen_for_receiving"
        ));
        let result = self
            .request("PUT", &url, JSON)
            .set("content-type", JSON)
            .send_string(body);
        into_api_response("PUT", &url, result)
    }

    fn put_purchase_order(&self, po_id: PoId, xml: &str) -> Result<ApiResponse, WorkflowError> {
        let url = self.url(&format!("/api/purchase_orders/{po_id}"));
        let result = self
            .request("PUT", &url, XML)
            .set("content-type", XML)
            .send_string(xml);
        into_api_response("PUT", &url, result)
    }
}

/// Fold ureq's status errors back into a plain response; only transport
/// failures stay errors.
fn into_api_response(
    method: &str,
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ApiResponse, WorkflowError> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            tracing::warn!(method, url, error = %transport, "request failed");
            return Err(WorkflowError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            });
        }
    };
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|e| WorkflowError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;
    tracing::debug!(method, url, status, "response received");
    Ok(ApiResponse { status, body })
}
