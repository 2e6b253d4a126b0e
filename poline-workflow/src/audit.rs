//! Audit Log Sink: append-only CSV record of per-PO and per-line outcomes.
//!
//! ```text
//! po_id,total_lines,line_id,status,response
//! 100,1,N/A,SUCCESS,Lines updated successfully
//! 100,N/A,5001,SUCCESS,Line closed successfully
//! 300,2,N/A,FAILURE,Account code is invalid
//! ```
//!
//! Every row is flushed as soon as it is recorded. Rows are never rewritten.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use poline_core::types::{LineNumber, PoId, RemoteLineId};

use crate::close::CloseOutcome;
use crate::error::{io_err, WorkflowError};

/// Fixed header row.
pub const AUDIT_HEADER: [&str; 5] = ["po_id", "total_lines", "line_id", "status", "response"];

/// Placeholder for fields that do not apply to a row.
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Failure,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Success => write!(f, "SUCCESS"),
            AuditStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One audit record. PO-level rows leave `line_id` empty; line rows leave
/// `total_lines` empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub po_id: PoId,
    pub total_lines: Option<usize>,
    pub line_id: Option<RemoteLineId>,
    pub status: AuditStatus,
    pub response: String,
}

impl AuditRow {
    pub fn po_updated(po_id: PoId, total_lines: usize) -> Self {
        AuditRow {
            po_id,
            total_lines: Some(total_lines),
            line_id: None,
            status: AuditStatus::Success,
            response: "Lines updated successfully".to_string(),
        }
    }

    pub fn po_update_failed(po_id: PoId, total_lines: usize, excerpt: &str) -> Self {
        AuditRow {
            po_id,
            total_lines: Some(total_lines),
            line_id: None,
            status: AuditStatus::Failure,
            response: excerpt.to_string(),
        }
    }

    /// The PO was not updated at all; `reason` says why.
    pub fn po_skipped(po_id: PoId, total_lines: Option<usize>, reason: &str) -> Self {
        AuditRow {
            po_id,
            total_lines,
            line_id: None,
            status: AuditStatus::Failure,
            response: reason.to_string(),
        }
    }

    pub fn po_without_lines(po_id: PoId) -> Self {
        AuditRow {
            po_id,
            total_lines: Some(0),
            line_id: None,
            status: AuditStatus::Success,
            response: "No lines to update".to_string(),
        }
    }

    /// A requested line number had no single remote counterpart.
    pub fn line_unresolved(po_id: PoId, line: LineNumber, reason: &str) -> Self {
        AuditRow {
            po_id,
            total_lines: None,
            line_id: None,
            status: AuditStatus::Failure,
            response: format!("Line number {line} {reason}"),
        }
    }

    pub fn reopen_failed(po_id: PoId, line_id: &RemoteLineId, reason: &str) -> Self {
        AuditRow {
            po_id,
            total_lines: None,
            line_id: Some(line_id.clone()),
            status: AuditStatus::Failure,
            response: format!("Line NOT reopened: {reason}"),
        }
    }

    pub fn line_closed(po_id: PoId, outcome: &CloseOutcome) -> Self {
        let (status, response) = if outcome.closed {
            (AuditStatus::Success, "Line closed successfully".to_string())
        } else {
            (
                AuditStatus::Failure,
                format!("Line NOT closed successfully: {}", outcome.detail),
            )
        };
        AuditRow {
            po_id,
            total_lines: None,
            line_id: Some(outcome.line_id.clone()),
            status,
            response,
        }
    }

    fn fields(&self) -> [String; 5] {
        [
            self.po_id.to_string(),
            self.total_lines
                .map_or_else(|| NOT_APPLICABLE.to_string(), |n| n.to_string()),
            self.line_id
                .as_ref()
                .map_or_else(|| NOT_APPLICABLE.to_string(), |id| id.to_string()),
            self.status.to_string(),
            self.response.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

/// Append-only CSV sink.
pub struct AuditLog<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl AuditLog<File> {
    /// Open `path` for appending, creating it if needed. The header is
    /// written only when the file is empty, so repeated runs share one header.
    pub fn open_append(path: &Path) -> Result<Self, WorkflowError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        let is_empty = file.metadata().map_err(|e| io_err(path, e))?.len() == 0;
        AuditLog::new(file, is_empty)
    }
}

impl<W: Write> AuditLog<W> {
    pub fn new(inner: W, write_header: bool) -> Result<Self, WorkflowError> {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        let mut log = AuditLog {
            writer,
            rows_written: 0,
        };
        if write_header {
            log.writer.write_record(AUDIT_HEADER)?;
            log.writer.flush().map_err(csv::Error::from)?;
        }
        Ok(log)
    }

    /// Append one row and flush it.
    pub fn record(&mut self, row: &AuditRow) -> Result<(), WorkflowError> {
        self.writer.write_record(row.fields())?;
        self.writer.flush().map_err(csv::Error::from)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Data rows recorded through this sink (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W, WorkflowError> {
        self.writer
            .into_inner()
            .map_err(|e| {
                let source = std::io::Error::new(e.error().kind(), e.error().to_string());
                WorkflowError::Audit(csv::Error::from(source))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
