//! Tera rendering engine: [`BodyKind`] enum and [`BodyRenderer`].
//!
//! | Body          | Endpoint                                              | Format |
//! |---------------|-------------------------------------------------------|--------|
//! | OrderUpdate   | `PUT /api/purchase_orders/{po_id}`                    | XML    |
//! | LineStatus    | `PUT /api/purchase_orders/{po_id}`                    | XML    |
//! | Reopen        | `PUT /api/purchase_order_lines/{id}/reopen_for_receiving` | JSON |
//!
//! XML templates are registered under `.xml` names so Tera auto-escapes every
//! interpolated value.

use tera::Tera;

use poline_core::types::{LineStatus, RemoteLineId};

use crate::context::{LineStatusContext, OrderUpdateContext, ReopenRequest};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("order_update.xml", include_str!("templates/order_update.xml.tera")),
    ("line_status.xml", include_str!("templates/line_status.xml.tera")),
];

fn build_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// BodyKind
// ---------------------------------------------------------------------------

/// Templated XML request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    OrderUpdate,
    LineStatus,
}

impl BodyKind {
    /// All templated bodies in a stable order.
    pub fn all() -> &'static [BodyKind] {
        &[BodyKind::OrderUpdate, BodyKind::LineStatus]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            BodyKind::OrderUpdate => "order_update.xml",
            BodyKind::LineStatus => "line_status.xml",
        }
    }
}

// ---------------------------------------------------------------------------
// BodyRenderer
// ---------------------------------------------------------------------------

/// Renders request bodies for the procurement API.
///
/// Create once with [`BodyRenderer::new`] and reuse for the whole run.
pub struct BodyRenderer {
    tera: Tera,
}

impl BodyRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(BodyRenderer { tera: build_tera()? })
    }

    /// One composite body carrying every line of a PO's accounting update.
    pub fn order_update(&self, ctx: &OrderUpdateContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self
            .tera
            .render(BodyKind::OrderUpdate.template_name(), &tera_ctx)?)
    }

    /// Minimal `id` + `status` body for a single line.
    pub fn line_status(&self, ctx: &LineStatusContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self
            .tera
            .render(BodyKind::LineStatus.template_name(), &tera_ctx)?)
    }

    /// Body that returns a line to `soft_closed_for_invoicing`.
    pub fn close_line(&self, id: &RemoteLineId) -> Result<String, RenderError> {
        self.line_status(&LineStatusContext::new(
            id,
            &LineStatus::SoftClosedForInvoicing,
        ))
    }

    /// JSON body for the reopen endpoint.
    pub fn reopen(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(&ReopenRequest::default())?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
