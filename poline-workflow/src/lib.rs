//! # poline-workflow
//!
//! Per-PO reconciliation against the procurement API.
//!
//! Call [`pipeline::run`] to process a whole input file, or drive an
//! [`Orchestrator`] directly with any [`ProcurementApi`] implementation.

pub mod api;
pub mod audit;
pub mod close;
pub mod error;
pub mod fetch;
pub mod http;
pub mod locator;
pub mod orchestrator;
pub mod pipeline;
pub mod reopen;
pub mod update;

pub use api::{error_excerpt, ApiResponse, ProcurementApi};
pub use audit::{AuditLog, AuditRow, AuditStatus};
pub use close::CloseOutcome;
pub use error::WorkflowError;
pub use fetch::FetchError;
pub use http::HttpProcurementApi;
pub use locator::Location;
pub use orchestrator::{Orchestrator, PoOutcome, PoReport, PoStage, RunSummary};
pub use reopen::ReopenOutcome;
pub use update::UpdateOutcome;
