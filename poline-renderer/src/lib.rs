//! # poline-renderer
//!
//! Builds request bodies for the procurement API: Tera-rendered XML for
//! PO-level updates and line status changes, JSON for line reopens.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use poline_renderer::{BodyRenderer, OrderUpdateContext};
//!
//! fn render(ctx: &OrderUpdateContext) {
//!     if let Ok(renderer) = BodyRenderer::new() {
//!         if let Ok(xml) = renderer.order_update(ctx) {
//!             println!("{} bytes", xml.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{LineStatusContext, OrderLineCtx, OrderUpdateContext, ReopenRequest};
pub use engine::{BodyKind, BodyRenderer};
pub use error::RenderError;
