//! PO Workflow Orchestrator.
//!
//! ## Per-PO state machine
//!
//! ```text
//! FETCHED → LOCATING → (REOPENING)* → UPDATING → CLOSING → DONE
//! ```
//!
//! 1. Fetch remote state once. Failure abandons the PO.
//! 2. Locate every requested line. Locating is a pure lookup, so all lines
//!    are resolved before anything is mutated; an unresolved line is handled
//!    by the [`PartialBatchPolicy`].
//! 3. Reopen lines that are `soft_closed_for_invoicing`. A failed reopen
//!    drops that line from the batch but keeps it in the close set.
//! 4. Submit exactly one batched update for the accumulated lines.
//! 5. Close every line in the close set, whatever step 4 returned.
//! 6. Record one PO-level audit row plus one row per close attempt.
//!
//! A line number repeated within one PO is unresolved like a missing one.
//!
//! Nothing below a configuration error stops the run: every PO reaches
//! `DONE` (or is abandoned after a fetch failure) and the next PO starts.
//! Only an audit-log write failure aborts the run. Once the first line has
//! been reopened such a failure is held until the close step has run, so
//! no line is left open.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use poline_core::types::{LineNumber, LineRequest, LineStatus, PoId, PoRecord, RemoteLineId};
use poline_core::PartialBatchPolicy;
use poline_renderer::{BodyRenderer, OrderUpdateContext};

use crate::api::ProcurementApi;
use crate::audit::{AuditLog, AuditRow};
use crate::close::{close_lines, CloseOutcome};
use crate::error::WorkflowError;
use crate::fetch::fetch_po_state;
use crate::locator::{locate, Location};
use crate::reopen::{reopen_line, ReopenOutcome};
use crate::update::{submit_batch, UpdateOutcome};

// ---------------------------------------------------------------------------
// Stages and reports
// ---------------------------------------------------------------------------

/// Furthest point a PO's workflow reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoStage {
    /// The GET was attempted (and failed if the PO went no further).
    Fetched,
    Locating,
    Reopening,
    Updating,
    Closing,
    Done,
}

impl fmt::Display for PoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoStage::Fetched => write!(f, "FETCHED"),
            PoStage::Locating => write!(f, "LOCATING"),
            PoStage::Reopening => write!(f, "REOPENING"),
            PoStage::Updating => write!(f, "UPDATING"),
            PoStage::Closing => write!(f, "CLOSING"),
            PoStage::Done => write!(f, "DONE"),
        }
    }
}

/// PO-level result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoOutcome {
    /// Batched update accepted.
    Updated { lines: usize },
    /// Batched update rejected or not delivered.
    Rejected { lines: usize, excerpt: String },
    /// Remote state could not be fetched; nothing else was attempted.
    FetchFailed { reason: String },
    /// A line could not be resolved and the policy skipped the PO.
    Skipped { reason: String },
    /// No line was eligible for the update (no target lines, or every
    /// reopen failed).
    NothingToUpdate,
}

impl PoOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PoOutcome::Updated { .. })
    }
}

/// Everything that happened to one PO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoReport {
    pub po_id: PoId,
    pub stage: PoStage,
    pub outcome: PoOutcome,
    /// First line number that failed to resolve, if any.
    pub unresolved: Option<LineNumber>,
    pub reopened: Vec<RemoteLineId>,
    pub reopen_failures: Vec<RemoteLineId>,
    pub closes: Vec<CloseOutcome>,
}

impl PoReport {
    fn new(po_id: PoId) -> Self {
        PoReport {
            po_id,
            stage: PoStage::Fetched,
            outcome: PoOutcome::NothingToUpdate,
            unresolved: None,
            reopened: Vec::new(),
            reopen_failures: Vec::new(),
            closes: Vec::new(),
        }
    }

    pub fn lines_closed(&self) -> usize {
        self.closes.iter().filter(|c| c.closed).count()
    }

    pub fn close_failures(&self) -> usize {
        self.closes.iter().filter(|c| !c.closed).count()
    }
}

/// Reports for a whole run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<PoReport>,
}

impl RunSummary {
    pub fn po_count(&self) -> usize {
        self.reports.len()
    }

    pub fn updated(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.po_count() - self.updated()
    }

    pub fn lines_closed(&self) -> usize {
        self.reports.iter().map(PoReport::lines_closed).sum()
    }

    pub fn close_failures(&self) -> usize {
        self.reports.iter().map(PoReport::close_failures).sum()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct ResolvedLine<'r> {
    request: &'r LineRequest,
    id: RemoteLineId,
    status: LineStatus,
}

/// Drives POs through the workflow one at a time.
pub struct Orchestrator<'a, A: ProcurementApi + ?Sized, W: Write> {
    api: &'a A,
    renderer: &'a BodyRenderer,
    audit: &'a mut AuditLog<W>,
    policy: PartialBatchPolicy,
}

impl<'a, A: ProcurementApi + ?Sized, W: Write> Orchestrator<'a, A, W> {
    pub fn new(
        api: &'a A,
        renderer: &'a BodyRenderer,
        audit: &'a mut AuditLog<W>,
        policy: PartialBatchPolicy,
    ) -> Self {
        Orchestrator {
            api,
            renderer,
            audit,
            policy,
        }
    }

    /// Process every PO in order, calling `on_report` after each one.
    pub fn run(
        &mut self,
        records: &[PoRecord],
        mut on_report: impl FnMut(&PoReport),
    ) -> Result<RunSummary, WorkflowError> {
        let mut summary = RunSummary::default();
        for record in records {
            let report = self.process_po(record)?;
            on_report(&report);
            summary.reports.push(report);
        }
        Ok(summary)
    }

    /// Run the full state machine for one PO.
    pub fn process_po(&mut self, record: &PoRecord) -> Result<PoReport, WorkflowError> {
        let po_id = record.po_id;
        let span = tracing::info_span!("po", po_id = %po_id);
        let _enter = span.enter();
        let mut report = PoReport::new(po_id);

        if record.lines.is_empty() {
            tracing::info!("no target lines; nothing to do");
            self.audit.record(&AuditRow::po_without_lines(po_id))?;
            report.stage = PoStage::Done;
            return Ok(report);
        }

        // FETCHED
        tracing::info!("getting PO data");
        let state = match fetch_po_state(self.api, po_id) {
            Ok(state) => state,
            Err(e) => {
                let reason = format!("PO data not loaded: {e}");
                tracing::warn!(error = %e, "fetch failed; abandoning PO");
                self.audit.record(&AuditRow::po_skipped(po_id, None, &reason))?;
                report.outcome = PoOutcome::FetchFailed { reason };
                return Ok(report);
            }
        };

        // LOCATING
        report.stage = PoStage::Locating;
        let mut resolved = Vec::with_capacity(record.lines.len());
        let mut seen = HashSet::with_capacity(record.lines.len());
        let mut unresolved = None;
        for request in &record.lines {
            if !seen.insert(request.line_number) {
                unresolved = Some((request.line_number, "repeated in input".to_string()));
                break;
            }
            match locate(&state, request.line_number) {
                Location::Found { id, status } => resolved.push(ResolvedLine {
                    request,
                    id,
                    status,
                }),
                Location::NotFound => {
                    unresolved = Some((request.line_number, "not found on PO".to_string()));
                    break;
                }
                Location::Ambiguous { count } => {
                    unresolved = Some((
                        request.line_number,
                        format!("matches {count} remote lines"),
                    ));
                    break;
                }
            }
        }

        if let Some((line, reason)) = unresolved {
            report.unresolved = Some(line);
            tracing::warn!(line = %line, %reason, policy = %self.policy, "line not resolved");
            match self.policy {
                PartialBatchPolicy::Skip => {
                    let reason = format!("Line number {line} {reason}; PO skipped");
                    self.audit.record(&AuditRow::po_skipped(
                        po_id,
                        Some(record.lines.len()),
                        &reason,
                    ))?;
                    report.outcome = PoOutcome::Skipped { reason };
                    report.stage = PoStage::Done;
                    return Ok(report);
                }
                PartialBatchPolicy::SubmitResolved => {
                    let reason = format!("{reason}; later lines dropped");
                    self.audit
                        .record(&AuditRow::line_unresolved(po_id, line, &reason))?;
                }
            }
        }

        // From here on remote state changes, so audit failures are deferred
        // until every line in the close set has been attempted.
        let mut deferred: Option<WorkflowError> = None;

        // REOPENING
        let mut batch = OrderUpdateContext::default();
        let mut close_set = Vec::with_capacity(resolved.len());
        for line in resolved {
            if line.status.is_closed_for_invoicing() {
                report.stage = PoStage::Reopening;
                match reopen_line(self.api, self.renderer, &line.id) {
                    ReopenOutcome::Reopened => report.reopened.push(line.id.clone()),
                    ReopenOutcome::Failed { reason } => {
                        self.record_deferred(
                            &AuditRow::reopen_failed(po_id, &line.id, &reason),
                            &mut deferred,
                        );
                        report.reopen_failures.push(line.id.clone());
                        close_set.push(line.id);
                        continue;
                    }
                }
            }
            batch.push(&line.id, line.request);
            close_set.push(line.id);
        }

        // UPDATING
        report.stage = PoStage::Updating;
        if batch.is_empty() {
            tracing::warn!("no lines eligible for update");
            self.record_deferred(
                &AuditRow::po_skipped(po_id, Some(0), "No lines eligible for update"),
                &mut deferred,
            );
            report.outcome = PoOutcome::NothingToUpdate;
        } else {
            let lines = batch.len();
            match submit_batch(self.api, self.renderer, po_id, &batch) {
                UpdateOutcome::Accepted => {
                    tracing::info!(lines, "batched update accepted");
                    self.record_deferred(&AuditRow::po_updated(po_id, lines), &mut deferred);
                    report.outcome = PoOutcome::Updated { lines };
                }
                UpdateOutcome::Rejected { status, excerpt } => {
                    tracing::warn!(lines, ?status, %excerpt, "batched update rejected");
                    self.record_deferred(
                        &AuditRow::po_update_failed(po_id, lines, &excerpt),
                        &mut deferred,
                    );
                    report.outcome = PoOutcome::Rejected { lines, excerpt };
                }
            }
        }

        // CLOSING: unconditional.
        if !close_set.is_empty() {
            report.stage = PoStage::Closing;
            report.closes = close_lines(self.api, self.renderer, po_id, &close_set);
            for outcome in &report.closes {
                self.record_deferred(&AuditRow::line_closed(po_id, outcome), &mut deferred);
            }
        }

        if let Some(e) = deferred {
            return Err(e);
        }
        report.stage = PoStage::Done;
        Ok(report)
    }

    /// Record `row`, keeping the first failure in `deferred` instead of
    /// returning it. Later rows are still attempted.
    fn record_deferred(&mut self, row: &AuditRow, deferred: &mut Option<WorkflowError>) {
        if let Err(e) = self.audit.record(row) {
            tracing::error!(error = %e, "audit log write failed");
            deferred.get_or_insert(e);
        }
    }
}
