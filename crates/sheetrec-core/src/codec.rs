//! Conversion between blocks of cell values and keyed records
//!
//! Everything here is pure: no workbook access.

use crate::record::{HeaderMapping, Record};
use crate::value::CellValue;

/// Decode a block of rows into records keyed by `headers`
///
/// Blank cells decode to `CellValue::Empty`. A row whose cells are all blank,
/// including any past the last header, produces no record. Rows shorter than `headers` are padded with blanks;
/// cells past the last header are ignored. If `headers` repeats a name, the
/// rightmost column wins.
pub fn decode_rows<S: AsRef<str>>(values: &[Vec<CellValue>], headers: &[S]) -> Vec<Record> {
    decode_rows_numbered(values, headers, 1)
        .into_iter()
        .map(|(_, record)| record)
        .collect()
}

/// Like [`decode_rows`], pairing each record with its sheet row number
///
/// `first_row` is the sheet row of `values[0]`. Dropped blank rows do not
/// shift the numbers of the rows after them.
pub fn decode_rows_numbered<S: AsRef<str>>(
    values: &[Vec<CellValue>],
    headers: &[S],
    first_row: u32,
) -> Vec<(u32, Record)> {
    let mut records = Vec::with_capacity(values.len());
    for (i, row) in values.iter().enumerate() {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }

        if row.len() > headers.len() {
            tracing::warn!(
                row = first_row as usize + i,
                cells = row.len(),
                headers = headers.len(),
                "row has more cells than headers, ignoring the extra cells"
            );
        }

        let mut record = Record::new();
        for (j, header) in headers.iter().enumerate() {
            let value = match row.get(j) {
                Some(cell) if !cell.is_empty() => cell.clone(),
                _ => CellValue::Empty,
            };
            record.insert(header.as_ref(), value);
        }
        records.push((first_row + i as u32, record));
    }
    records
}

/// Encode records into a block of `records.len()` rows by `headers.len()` columns
pub fn encode_rows<S: AsRef<str>>(records: &[Record], headers: &[S]) -> Vec<Vec<CellValue>> {
    records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| encode_cell(h.as_ref(), record.get(h.as_ref())))
                .collect()
        })
        .collect()
}

/// Encode records whose keys differ from the sheet headers
///
/// The value for header `h` is read from the record field named by
/// `mapping.source_for(h)`. Headers missing from the mapping encode as blank.
pub fn encode_mapped_rows<S: AsRef<str>>(
    records: &[Record],
    headers: &[S],
    mapping: &HeaderMapping,
) -> Vec<Vec<CellValue>> {
    records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| {
                    let h = h.as_ref();
                    let value = mapping.source_for(h).and_then(|key| record.get(key));
                    encode_cell(h, value)
                })
                .collect()
        })
        .collect()
}

/// Cell value written for one header of one record
///
/// Numeric zero is kept as `0` under a named column. Otherwise an unnamed
/// column, a missing field or any unset value (blank, `false`, NaN) is
/// written as blank.
pub fn encode_cell(header: &str, value: Option<&CellValue>) -> CellValue {
    match value {
        Some(v) if !header.is_empty() && v.is_zero() => CellValue::Integer(0),
        Some(v) if !header.is_empty() && v.is_truthy() => v.clone(),
        _ => CellValue::Empty,
    }
}
