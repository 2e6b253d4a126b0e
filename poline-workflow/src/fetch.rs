//! Fetch the current remote state of one PO.

use thiserror::Error;

use poline_core::types::{PoId, RemotePoState};

use crate::api::{error_excerpt, ProcurementApi};

/// Why a PO's remote state could not be obtained. Fatal for that PO only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {excerpt}")]
    Status { status: u16, excerpt: String },

    #[error("unreadable PO document: {0}")]
    Decode(String),
}

/// `GET` the PO and decode its `order-lines`.
///
/// Called exactly once per PO, before any mutation; the result is never
/// reused for another PO.
pub fn fetch_po_state<A: ProcurementApi + ?Sized>(
    api: &A,
    po_id: PoId,
) -> Result<RemotePoState, FetchError> {
    let response = api
        .get_purchase_order(po_id)
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    if !response.is_ok() {
        return Err(FetchError::Status {
            status: response.status,
            excerpt: error_excerpt(&response.body),
        });
    }
    serde_json::from_str(&response.body).map_err(|e| FetchError::Decode(e.to_string()))
}
