//! Error types for poline-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building the run configuration or reading input.
///
/// Every variant is a configuration error: the run aborts before any PO is
/// processed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV input could not be parsed.
    #[error("failed to read CSV input {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Workbook could not be opened or a sheet could not be read.
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Input file extension is not one we know how to read.
    #[error("unsupported input file {path}; expected .csv, .xlsx, .xlsm, .xls or .ods")]
    UnsupportedInput { path: PathBuf },

    /// Workbook inputs need a sheet name.
    #[error("a sheet name is required to read workbook {path}")]
    SheetRequired { path: PathBuf },

    /// The named sheet does not exist in the workbook.
    #[error("sheet '{sheet}' not found in {path}")]
    SheetNotFound { sheet: String, path: PathBuf },

    /// A required column header is absent.
    #[error("input is missing required column '{column}'")]
    MissingColumn { column: &'static str },

    /// A cell value could not be interpreted. `row` is 1-based and counts the header.
    #[error("row {row}, column '{column}': invalid value '{value}'")]
    InvalidCell {
        row: usize,
        column: &'static str,
        value: String,
    },

    /// YAML settings file parse error.
    #[error("failed to parse settings at {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Environment name outside the fixed set.
    #[error("unknown environment '{0}'; expected: prod, test, dev")]
    UnknownEnvironment(String),

    /// A setting that has no default was not supplied.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
