//! Template contexts: serializable payloads for the request-body templates.

use serde::{Deserialize, Serialize};

use poline_core::types::{LineRequest, LineStatus, RemoteLineId};

use crate::error::RenderError;

/// One `<order-line>` of a batched accounting update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineCtx {
    pub id: String,
    pub account_code: String,
    pub chart_of_accounts: String,
    /// Already zero-padded.
    pub segment_1: String,
    pub segment_2: String,
    pub segment_3: String,
    pub segment_4: String,
    pub segment_5: String,
}

impl OrderLineCtx {
    /// Pair a resolved remote line id with the requested accounting data.
    pub fn new(id: &RemoteLineId, request: &LineRequest) -> Self {
        let segments = &request.segments;
        OrderLineCtx {
            id: id.0.clone(),
            account_code: request.account_code.clone(),
            chart_of_accounts: request.chart_of_accounts.clone(),
            segment_1: segments.segment_1.padded(),
            segment_2: segments.segment_2.clone(),
            segment_3: segments.segment_3.clone(),
            segment_4: segments.segment_4.clone(),
            segment_5: segments.segment_5.clone(),
        }
    }
}

/// Context for `order_update.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateContext {
    pub lines: Vec<OrderLineCtx>,
}

impl OrderUpdateContext {
    pub fn push(&mut self, id: &RemoteLineId, request: &LineRequest) {
        self.lines.push(OrderLineCtx::new(id, request));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// Context for `line_status.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStatusContext {
    pub id: String,
    pub status: String,
}

impl LineStatusContext {
    pub fn new(id: &RemoteLineId, status: &LineStatus) -> Self {
        LineStatusContext {
            id: id.0.clone(),
            status: status.as_str().to_string(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// JSON body of `PUT /api/purchase_order_lines/{id}/reopen_for_receiving`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenRequest {
    #[serde(rename = "reason-insight-code")]
    pub reason_insight_code: String,
}

impl Default for ReopenRequest {
    /// Marks the reopen as API-driven.
    fn default() -> Self {
        ReopenRequest {
            reason_insight_code: "API".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poline_core::types::{AccountSegments, LineNumber, Segment1};

    fn request(segment_1: u32) -> LineRequest {
        LineRequest {
            line_number: LineNumber(1),
            account_code: "6100".to_string(),
            chart_of_accounts: "Corporate".to_string(),
            segments: AccountSegments {
                segment_1: Segment1(segment_1),
                segment_2: "A".to_string(),
                segment_3: "B".to_string(),
                segment_4: "C".to_string(),
                segment_5: "D".to_string(),
            },
        }
    }

    #[test]
    fn order_line_pads_first_segment() {
        let ctx = OrderLineCtx::new(&RemoteLineId::from("77"), &request(5));
        assert_eq!(ctx.id, "77");
        assert_eq!(ctx.segment_1, "05");
        assert_eq!(ctx.segment_5, "D");
    }

    #[test]
    fn reopen_request_uses_wire_field_name() {
        let json = serde_json::to_string(&ReopenRequest::default()).expect("serialize");
        assert_eq!(json, r#"{"reason-insight-code":"API"}"#);
    }

    #[test]
    fn to_tera_context_succeeds() {
        let mut ctx = OrderUpdateContext::default();
        ctx.push(&RemoteLineId::from("1"), &request(10));
        assert_eq!(ctx.len(), 1);
        ctx.to_tera_context().expect("context conversion");
    }
}
