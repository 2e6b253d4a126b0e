//! Batch Line Updater: one accounting update per PO.
//!
//! The API only accepts chart-of-accounts changes for a PO as a whole, so
//! every line being touched goes into a single `PUT`. The API accepts or
//! rejects the batch as a unit.

use poline_core::types::PoId;
use poline_renderer::{BodyRenderer, OrderUpdateContext};

use crate::api::{error_excerpt, ProcurementApi};

/// Typed result of the batched update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Accepted,
    /// `status` is `None` when no HTTP response was received.
    Rejected {
        status: Option<u16>,
        excerpt: String,
    },
}

impl UpdateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UpdateOutcome::Accepted)
    }
}

/// Render `batch` into one XML body and `PUT` it against `po_id`.
pub fn submit_batch<A: ProcurementApi + ?Sized>(
    api: &A,
    renderer: &BodyRenderer,
    po_id: PoId,
    batch: &OrderUpdateContext,
) -> UpdateOutcome {
    let xml = match renderer.order_update(batch) {
        Ok(xml) => xml,
        Err(e) => {
            return UpdateOutcome::Rejected {
                status: None,
                excerpt: e.to_string(),
            }
        }
    };
    tracing::info!(po_id = %po_id, lines = batch.len(), "putting batched update");
    match api.put_purchase_order(po_id, &xml) {
        Ok(response) if response.is_ok() => UpdateOutcome::Accepted,
        Ok(response) => UpdateOutcome::Rejected {
            status: Some(response.status),
            excerpt: error_excerpt(&response.body),
        },
        Err(e) => UpdateOutcome::Rejected {
            status: None,
            excerpt: e.to_string(),
        },
    }
}
