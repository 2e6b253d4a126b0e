//! Spreadsheet input reader.
//!
//! Produces one [`InputRow`] per non-blank data row. Workbooks
//! (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with calamine from a named
//! sheet; `.csv` files are read with the csv crate and have no sheets.
//!
//! Columns are located by header name (case-insensitive, any order):
//!
//! ```text
//! po_id, line_num, account_code, chart_of_accounts,
//! segment_1, segment_2, segment_3, segment_4, segment_5
//! ```

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::CoreError;
use crate::types::{
    group_by_po, AccountSegments, InputRow, LineNumber, LineRequest, PoId, PoRecord, Segment1,
};

/// Header names every input must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "po_id",
    "line_num",
    "account_code",
    "chart_of_accounts",
    "segment_1",
    "segment_2",
    "segment_3",
    "segment_4",
    "segment_5",
];

/// A cell normalised across CSV and workbook sources.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    fn raw(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Integral, non-negative value. Spreadsheet engines hand integers back
    /// as floats, so `5.0` is accepted.
    fn as_integer(&self) -> Option<u64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => integral(*n),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
        }
    }

    /// Opaque text; integral numbers lose their `.0`.
    fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => match integral(*n) {
                Some(i) => i.to_string(),
                None => n.to_string(),
            },
        }
    }
}

fn integral(n: f64) -> Option<u64> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
        Some(n as u64)
    } else {
        None
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Read every data row of the input file.
pub fn read_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<InputRow>, CoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let table = match extension.as_deref() {
        Some("csv") => read_csv_table(path)?,
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => {
            let sheet = sheet.ok_or_else(|| CoreError::SheetRequired {
                path: path.to_path_buf(),
            })?;
            read_workbook_table(path, sheet)?
        }
        _ => {
            return Err(CoreError::UnsupportedInput {
                path: path.to_path_buf(),
            })
        }
    };
    parse_table(table)
}

/// Read the input file and group its rows into PO records.
pub fn load_po_records(path: &Path, sheet: Option<&str>) -> Result<Vec<PoRecord>, CoreError> {
    Ok(group_by_po(read_rows(path, sheet)?))
}

fn read_csv_table(path: &Path) -> Result<Vec<Vec<Cell>>, CoreError> {
    let csv_err = |source| CoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let mut table = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        table.push(record.iter().map(|f| Cell::Text(f.to_string())).collect());
    }
    Ok(table)
}

fn read_workbook_table(path: &Path, sheet: &str) -> Result<Vec<Vec<Cell>>, CoreError> {
    let workbook_err = |source| CoreError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(CoreError::SheetNotFound {
            sheet: sheet.to_string(),
            path: path.to_path_buf(),
        });
    }
    let range = workbook.worksheet_range(sheet).map_err(workbook_err)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

struct Columns([usize; 9]);

impl Columns {
    /// Header names match case-insensitively. A leading UTF-8 byte order
    /// mark, as written by spreadsheet "CSV UTF-8" exports, is ignored.
    fn locate(header: &[Cell]) -> Result<Self, CoreError> {
        let names: Vec<String> = header
            .iter()
            .map(|c| {
                c.as_text()
                    .trim_start_matches('\u{feff}')
                    .to_ascii_lowercase()
            })
            .collect();
        let mut indices = [0usize; 9];
        for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = names
                .iter()
                .position(|n| n == column)
                .ok_or(CoreError::MissingColumn { column })?;
        }
        Ok(Columns(indices))
    }

    fn cell<'a>(&self, row: &'a [Cell], which: usize) -> &'a Cell {
        row.get(self.0[which]).unwrap_or(&Cell::Empty)
    }
}

/// Parse a header row plus data rows into [`InputRow`]s.
///
/// Rows whose cells are all blank are skipped.
pub fn parse_table(table: Vec<Vec<Cell>>) -> Result<Vec<InputRow>, CoreError> {
    let mut rows = table.into_iter();
    let Some(header) = rows.next() else {
        return Err(CoreError::MissingColumn {
            column: REQUIRED_COLUMNS[0],
        });
    };
    let columns = Columns::locate(&header)?;

    let mut out = Vec::new();
    // Row numbers are 1-based and count the header, matching what a user
    // sees in a spreadsheet.
    for (offset, row) in rows.enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let row_number = offset + 2;
        let integer = |which: usize| -> Result<u64, CoreError> {
            let cell = columns.cell(&row, which);
            cell.as_integer().ok_or_else(|| CoreError::InvalidCell {
                row: row_number,
                column: REQUIRED_COLUMNS[which],
                value: cell.raw(),
            })
        };
        let narrow = |which: usize, value: u64| -> Result<u32, CoreError> {
            u32::try_from(value).map_err(|_| CoreError::InvalidCell {
                row: row_number,
                column: REQUIRED_COLUMNS[which],
                value: value.to_string(),
            })
        };
        let text = |which: usize| columns.cell(&row, which).as_text();

        let po_id = PoId(integer(0)?);
        let line_number = LineNumber(narrow(1, integer(1)?)?);
        let segment_1 = Segment1(narrow(4, integer(4)?)?);

        out.push(InputRow {
            po_id,
            line: LineRequest {
                line_number,
                account_code: text(2),
                chart_of_accounts: text(3),
                segments: AccountSegments {
                    segment_1,
                    segment_2: text(5),
                    segment_3: text(6),
                    segment_4: text(7),
                    segment_5: text(8),
                },
            },
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
