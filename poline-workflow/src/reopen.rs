//! Line Reopener: move a soft-closed line back to an editable status.

use poline_core::types::RemoteLineId;
use poline_renderer::BodyRenderer;

use crate::api::{error_excerpt, ProcurementApi};

/// Typed result of a reopen request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReopenOutcome {
    Reopened,
    Failed { reason: String },
}

impl ReopenOutcome {
    pub fn is_reopened(&self) -> bool {
        matches!(self, ReopenOutcome::Reopened)
    }
}

/// Issue one API-reasoned reopen for `line_id`.
pub fn reopen_line<A: ProcurementApi + ?Sized>(
    api: &A,
    renderer: &BodyRenderer,
    line_id: &RemoteLineId,
) -> ReopenOutcome {
    let body = match renderer.reopen() {
        Ok(body) => body,
        Err(e) => {
            return ReopenOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    match api.reopen_line(line_id, &body) {
        Ok(response) if response.is_ok() => {
            tracing::info!(line_id = %line_id, "line reopened");
            ReopenOutcome::Reopened
        }
        Ok(response) => {
            let reason = format!("HTTP {}: {}", response.status, error_excerpt(&response.body));
            tracing::warn!(line_id = %line_id, %reason, "reopen rejected");
            ReopenOutcome::Failed { reason }
        }
        Err(e) => {
            tracing::warn!(line_id = %line_id, error = %e, "reopen failed");
            ReopenOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
