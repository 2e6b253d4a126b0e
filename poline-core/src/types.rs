//! Domain types for PO line reconciliation.
//!
//! Input-side types (`InputRow`, `LineRequest`, `PoRecord`) come from the
//! spreadsheet and are immutable once read. Remote-side types (`RemotePoState`,
//! `RemoteLine`) are deserialized from the procurement API's JSON.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A purchase order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoId(pub u64);

impl fmt::Display for PoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PoId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

/// A line number, unique within one PO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineNumber(pub u32);

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for LineNumber {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

/// The procurement system's identifier for a PO line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLineId(pub String);

impl fmt::Display for RemoteLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteLineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteLineId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// First accounting segment. Numeric; rendered zero-padded to two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment1(pub u32);

impl Segment1 {
    /// `9` → `"09"`, `10` → `"10"`, `123` → `"123"`.
    pub fn padded(&self) -> String {
        format!("{:02}", self.0)
    }
}

impl fmt::Display for Segment1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.padded())
    }
}

// ---------------------------------------------------------------------------
// Line status
// ---------------------------------------------------------------------------

/// Wire value of the status that blocks changes until the line is reopened.
pub const SOFT_CLOSED_FOR_INVOICING: &str = "soft_closed_for_invoicing";

/// Lifecycle status of a remote PO line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineStatus {
    SoftClosedForInvoicing,
    /// Any open/active status; carried verbatim.
    Other(String),
}

impl LineStatus {
    pub fn is_closed_for_invoicing(&self) -> bool {
        matches!(self, LineStatus::SoftClosedForInvoicing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LineStatus::SoftClosedForInvoicing => SOFT_CLOSED_FOR_INVOICING,
            LineStatus::Other(s) => s,
        }
    }
}

impl From<String> for LineStatus {
    fn from(s: String) -> Self {
        if s == SOFT_CLOSED_FOR_INVOICING {
            LineStatus::SoftClosedForInvoicing
        } else {
            LineStatus::Other(s)
        }
    }
}

impl From<&str> for LineStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<LineStatus> for String {
    fn from(s: LineStatus) -> Self {
        s.as_str().to_owned()
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input side
// ---------------------------------------------------------------------------

/// Segments 2–5 are opaque identifiers and pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSegments {
    pub segment_1: Segment1,
    pub segment_2: String,
    pub segment_3: String,
    pub segment_4: String,
    pub segment_5: String,
}

/// Target accounting data for one PO line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub line_number: LineNumber,
    pub account_code: String,
    pub chart_of_accounts: String,
    pub segments: AccountSegments,
}

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    pub po_id: PoId,
    pub line: LineRequest,
}

/// All target lines for one PO, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoRecord {
    pub po_id: PoId,
    pub lines: Vec<LineRequest>,
}

/// Group rows by PO in order of first appearance. Lines keep input order.
pub fn group_by_po(rows: impl IntoIterator<Item = InputRow>) -> Vec<PoRecord> {
    let mut records: Vec<PoRecord> = Vec::new();
    for row in rows {
        match records.iter_mut().find(|r| r.po_id == row.po_id) {
            Some(record) => record.lines.push(row.line),
            None => records.push(PoRecord {
                po_id: row.po_id,
                lines: vec![row.line],
            }),
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Remote side
// ---------------------------------------------------------------------------

/// A line as reported by `GET /api/purchase_orders/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLine {
    #[serde(deserialize_with = "text_or_number")]
    pub id: String,
    #[serde(rename = "line-num", deserialize_with = "text_or_number")]
    pub line_num: String,
    pub status: LineStatus,
}

/// Fetched state of one PO. Fields other than `order-lines` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemotePoState {
    #[serde(rename = "order-lines", default)]
    pub order_lines: Vec<RemoteLine>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

/// The API is inconsistent about quoting ids and line numbers; keep the
/// canonical text either way.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => s.trim().to_owned(),
        TextOrNumber::Unsigned(n) => n.to_string(),
        TextOrNumber::Signed(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
