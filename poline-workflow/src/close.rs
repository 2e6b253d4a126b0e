//! Line Closer: return lines to `soft_closed_for_invoicing`.
//!
//! One request per line. A failure on one line never stops the others.

use poline_core::types::{PoId, RemoteLineId};
use poline_renderer::BodyRenderer;

use crate::api::{error_excerpt, ProcurementApi};

/// Result of one close attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    pub line_id: RemoteLineId,
    pub closed: bool,
    /// Empty on success; otherwise status + excerpt or transport error.
    pub detail: String,
}

/// Close every line in `line_ids`, in order.
pub fn close_lines<A: ProcurementApi + ?Sized>(
    api: &A,
    renderer: &BodyRenderer,
    po_id: PoId,
    line_ids: &[RemoteLineId],
) -> Vec<CloseOutcome> {
    line_ids
        .iter()
        .map(|line_id| close_line(api, renderer, po_id, line_id))
        .collect()
}

fn close_line<A: ProcurementApi + ?Sized>(
    api: &A,
    renderer: &BodyRenderer,
    po_id: PoId,
    line_id: &RemoteLineId,
) -> CloseOutcome {
    let failed = |detail: String| {
        tracing::warn!(po_id = %po_id, line_id = %line_id, %detail, "line NOT closed");
        CloseOutcome {
            line_id: line_id.clone(),
            closed: false,
            detail,
        }
    };
    let xml = match renderer.close_line(line_id) {
        Ok(xml) => xml,
        Err(e) => return failed(e.to_string()),
    };
    match api.put_purchase_order(po_id, &xml) {
        Ok(response) if response.is_ok() => {
            tracing::info!(po_id = %po_id, line_id = %line_id, "line closed");
            CloseOutcome {
                line_id: line_id.clone(),
                closed: true,
                detail: String::new(),
            }
        }
        Ok(response) => failed(format!(
            "HTTP {}: {}",
            response.status,
            error_excerpt(&response.body)
        )),
        Err(e) => failed(e.to_string()),
    }
}
