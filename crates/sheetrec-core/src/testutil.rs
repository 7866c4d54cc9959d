//! Shared fixtures for unit tests

use crate::memory::MemoryWorkbook;
use crate::record::Record;
use crate::value::CellValue;

pub const SHEET: &str = "Records";

pub fn sample_headers() -> Vec<String> {
    ["Record ID 1", "Record ID 2", "test1", "Test 2", "Test2a", "Test 3"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn row(values: &[CellValue]) -> Vec<CellValue> {
    values.to_vec()
}

pub fn text(s: &str) -> CellValue {
    if s.is_empty() {
        CellValue::Empty
    } else {
        CellValue::from(s)
    }
}

pub fn int(i: i64) -> CellValue {
    CellValue::Integer(i)
}

/// Data rows below the header row
pub fn sample_rows() -> Vec<Vec<CellValue>> {
    vec![
        row(&[int(12345), int(123), int(0), text("Hello"), text(""), text("World")]),
        row(&[int(12346), int(123), int(1), text(""), text("Hello"), text("World")]),
        row(&[int(12347), int(125), int(2), text("Hello"), text(""), text("World")]),
    ]
}

/// Header row followed by the data rows
pub fn sample_sheet_rows() -> Vec<Vec<CellValue>> {
    let mut rows = vec![sample_headers().into_iter().map(CellValue::from).collect()];
    rows.extend(sample_rows());
    rows
}

pub fn sample_records() -> Vec<Record> {
    let headers = sample_headers();
    sample_rows()
        .into_iter()
        .map(|r| headers.iter().cloned().zip(r).collect())
        .collect()
}

pub fn sample_book() -> MemoryWorkbook {
    MemoryWorkbook::from_rows(SHEET, sample_sheet_rows())
}

pub fn record(pairs: &[(&str, CellValue)]) -> Record {
    pairs.iter().cloned().collect()
}
