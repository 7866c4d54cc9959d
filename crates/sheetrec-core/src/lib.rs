//! sheetrec-core: Core library for treating spreadsheet sheets as record stores
//!
//! This library provides functionality to:
//! - Decode a sheet's rows into records keyed by its header row, and encode
//!   records back into rows
//! - Keep a sheet's header row in line with an expected header list
//! - Write and append records, directly or through a header mapping
//! - Update matching rows in place, one row or every match of a join key
//! - Reconcile a sheet with a complete record set: update, insert, archive
//!
//! Sheets are reached through the [`Workbook`] trait. Two backends are
//! included: [`MemoryWorkbook`] and [`CsvWorkbook`], a directory of CSV files.

pub mod codec;
pub mod csv_store;
pub mod error;
pub mod grid;
pub mod headers;
pub mod memory;
pub mod options;
pub mod reconcile;
pub mod record;
pub mod rows;
pub mod status;
pub mod value;

#[cfg(test)]
mod testutil;

pub use codec::{decode_rows, decode_rows_numbered, encode_mapped_rows, encode_rows};
pub use csv_store::{CsvWorkbook, Manifest, SheetEntry};
pub use error::{Error, ErrorKind, Result, Side};
pub use grid::{sheet_by_id, Extents, Region, SheetId, Workbook, MAX_COLS, MAX_ROWS};
pub use headers::{read_header_row, upsert_headers, HeaderRow};
pub use memory::{MemorySheet, MemoryWorkbook};
pub use options::Options;
pub use reconcile::{
    archive_sheet_name, update_mapped_rows_data, update_mapped_rows_in_place, update_row_in_place,
    update_rows_data, update_rows_in_place,
};
pub use record::{HeaderMapping, Record};
pub use rows::{append_mapped_rows, append_rows, read_numbered_rows, read_rows, write_mapped_rows, write_records, write_rows};
pub use status::UpdateStatus;
pub use value::CellValue;
