//! Shared run entrypoint used by the CLI.
//!
//! Everything that can fail for the run as a whole (unreadable input, an
//! unwritable audit log, broken templates) is checked here before the first
//! PO is touched.

use poline_core::{input, RunConfig};
use poline_renderer::BodyRenderer;

use crate::api::ProcurementApi;
use crate::audit::AuditLog;
use crate::error::WorkflowError;
use crate::http::HttpProcurementApi;
use crate::orchestrator::{Orchestrator, PoReport, RunSummary};

/// Load the input, open the audit log and process every PO against the
/// configured environment.
pub fn run(
    config: &RunConfig,
    on_report: impl FnMut(&PoReport),
) -> Result<RunSummary, WorkflowError> {
    let api = HttpProcurementApi::new(config);
    run_with_api(config, &api, on_report)
}

/// Same as [`run`] with a caller-supplied API client.
pub fn run_with_api<A: ProcurementApi + ?Sized>(
    config: &RunConfig,
    api: &A,
    on_report: impl FnMut(&PoReport),
) -> Result<RunSummary, WorkflowError> {
    let records = input::load_po_records(&config.input, config.sheet.as_deref())?;
    tracing::info!(
        input = %config.input.display(),
        pos = records.len(),
        base_url = %config.base_url,
        policy = %config.partial_batch,
        "input loaded"
    );

    let renderer = BodyRenderer::new()?;
    let mut audit = AuditLog::open_append(&config.log_file)?;

    let summary =
        Orchestrator::new(api, &renderer, &mut audit, config.partial_batch).run(&records, on_report)?;
    tracing::info!(
        pos = summary.po_count(),
        updated = summary.updated(),
        failed = summary.failed(),
        rows = audit.rows_written(),
        log_file = %config.log_file.display(),
        "run complete"
    );
    Ok(summary)
}
