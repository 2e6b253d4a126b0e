//! poline core library: domain types, run configuration, spreadsheet input.
//!
//! - [`types`]: newtypes, input rows, remote PO state
//! - [`config`]: environments, settings file, validated [`RunConfig`]
//! - [`input`]: CSV / workbook reader
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod input;
pub mod types;

pub use config::{Environment, PartialBatchPolicy, RunConfig, Settings};
pub use error::CoreError;
pub use types::{
    group_by_po, AccountSegments, InputRow, LineNumber, LineRequest, LineStatus, PoId, PoRecord,
    RemoteLine, RemoteLineId, RemotePoState, Segment1,
};
