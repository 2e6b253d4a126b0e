//! Procurement API seam.
//!
//! [`ProcurementApi`] is the only way the workflow talks to the remote
//! system. [`crate::http::HttpProcurementApi`] implements it over one
//! persistent `ureq` agent; tests substitute a recording fake.

use poline_core::types::{PoId, RemoteLineId};

use crate::error::WorkflowError;

/// Maximum length of an error excerpt written to the audit log.
pub const EXCERPT_LIMIT: usize = 200;

/// Any HTTP reply, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: body.into(),
        }
    }

    /// The procurement API signals success with exactly 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Remote operations the workflow depends on.
///
/// Implementations return `Ok` for every HTTP reply regardless of status and
/// reserve `Err` for transport failures.
pub trait ProcurementApi {
    /// `GET /api/purchase_orders/{po_id}` (JSON).
    fn get_purchase_order(&self, po_id: PoId) -> Result<ApiResponse, WorkflowError>;

    /// `PUT /api/purchase_order_lines/{line_id}/reopen_for_receiving` (JSON body).
    fn reopen_line(&self, line_id: &RemoteLineId, body: &str)
        -> Result<ApiResponse, WorkflowError>;

    /// `PUT /api/purchase_orders/{po_id}` (XML body).
    fn put_purchase_order(&self, po_id: PoId, xml: &str) -> Result<ApiResponse, WorkflowError>;
}

// ---------------------------------------------------------------------------
// Error excerpts
// ---------------------------------------------------------------------------

/// Pull a short, single-line explanation out of an error response body.
///
/// Preference order: text of the first `<error>` element, the fourth line of
/// the body (where the API's XML error documents carry the message), then the
/// first non-empty line. Capped at [`EXCERPT_LIMIT`] characters.
pub fn error_excerpt(body: &str) -> String {
    let excerpt = element_text(body, "error")
        .or_else(|| non_empty(body.lines().nth(3)))
        .or_else(|| non_empty(body.lines().find(|l| !l.trim().is_empty())))
        .unwrap_or_default();
    excerpt.chars().take(EXCERPT_LIMIT).collect()
}

fn non_empty(line: Option<&str>) -> Option<String> {
    line.map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Inner text of the first `<name>` / `<name attr=..>` element.
fn element_text(body: &str, name: &str) -> Option<String> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let mut from = 0;
    while let Some(pos) = body[from..].find(&open) {
        let tag_start = from + pos;
        let after_name = tag_start + open.len();
        from = after_name;
        // Reject longer names sharing the prefix, e.g. `<errors>`.
        match body[after_name..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => {}
            _ => continue,
        }
        let content_start = after_name + body[after_name..].find('>')? + 1;
        let content_end = content_start + body[content_start..].find(&close)?;
        let text = body[content_start..content_end].trim();
        if !text.is_empty() {
            return Some(text.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }
    None
}
