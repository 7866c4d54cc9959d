//! Reading and repairing a sheet's header row

use crate::error::Result;
use crate::grid::{Region, Workbook};
use crate::options::Options;
use crate::value::CellValue;

/// The header row of a sheet and where it sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    /// Sheet row holding the headers
    pub row: u32,
    /// Column of the first header
    pub col: u32,
    /// Header names, one per column
    pub names: Vec<String>,
}

impl HeaderRow {
    /// Number of header columns
    pub fn width(&self) -> u32 {
        self.names.len() as u32
    }
}

/// Read the header row used for decoding and encoding records
///
/// Uses `options.headers_range` when given (its row, first column and
/// width). Otherwise reads `options.header_row()` from column 1 to the
/// sheet's last populated column.
pub fn read_header_row<W: Workbook + ?Sized>(book: &W, sheet: &str, options: &Options) -> Result<HeaderRow> {
    let region = match options.headers_range {
        Some(range) => Region::new(range.row, range.col, 1, range.width),
        None => Region::row_span(options.header_row(), book.extents(sheet)?.cols),
    };
    let names = read_names(book, sheet, region)?;
    Ok(HeaderRow {
        row: region.row,
        col: region.col,
        names,
    })
}

/// Make sure the sheet's header row holds `options.expected_headers`
///
/// Without expected headers this only reads the current header row. On a
/// sheet with no columns the expected headers are written in one block.
/// Otherwise each missing header is appended after the last column; headers
/// already present are never moved. Freezes rows `1..=header_row` when
/// `options.freeze_headers` is set, and commits before returning so later
/// reads see the new headers.
pub fn upsert_headers<W: Workbook + ?Sized>(book: &mut W, sheet: &str, options: &Options) -> Result<Vec<String>> {
    let header_row = options.header_row();
    let extents = book.extents(sheet)?;
    let mut headers = read_names(book, sheet, Region::row_span(header_row, extents.cols))?;

    let Some(expected) = options.expected_headers.as_ref() else {
        return Ok(headers);
    };

    if extents.cols > 0 {
        let mut last_col = extents.cols;
        for name in expected {
            if headers.contains(name) {
                continue;
            }
            book.write_region(
                sheet,
                header_row,
                last_col + 1,
                &[vec![CellValue::from(name.as_str())]],
            )?;
            headers.push(name.clone());
            last_col += 1;
            tracing::debug!(sheet, header = %name, col = last_col, "appended missing header");
        }
    } else {
        if !expected.is_empty() {
            let block = vec![expected.iter().map(|h| CellValue::from(h.as_str())).collect()];
            book.write_region(sheet, header_row, 1, &block)?;
        }
        headers = expected.clone();
        tracing::debug!(sheet, count = headers.len(), "wrote headers to blank sheet");
    }

    if options.freeze_headers {
        book.freeze_rows(sheet, header_row)?;
    }
    book.commit()?;
    Ok(headers)
}

pub(crate) fn read_names<W: Workbook + ?Sized>(book: &W, sheet: &str, region: Region) -> Result<Vec<String>> {
    if region.is_empty() {
        return Ok(Vec::new());
    }
    let block = book.read_region(sheet, region)?;
    Ok(block
        .into_iter()
        .next()
        .unwrap_or_default()
        .iter()
        .map(CellValue::to_string_value)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorkbook;
    use crate::testutil::{sample_book, sample_headers, SHEET};

    fn expecting(headers: &[&str]) -> Options {
        Options {
            expected_headers: Some(headers.iter().map(|s| s.to_string()).collect()),
            ..Options::default()
        }
    }

    fn header_cells(headers: &[&str]) -> Vec<Vec<CellValue>> {
        vec![headers.iter().map(|&h| CellValue::from(h)).collect()]
    }

    #[test]
    fn test_blank_sheet_gets_expected_headers() {
        let mut book = MemoryWorkbook::from_rows(SHEET, Vec::new());
        let mut opts = expecting(&["A", "B", "C"]);
        opts.freeze_headers = true;

        let headers = upsert_headers(&mut book, SHEET, &opts).unwrap();

        assert_eq!(headers, vec!["A", "B", "C"]);
        assert_eq!(book.sheet_rows(SHEET).unwrap(), header_cells(&["A", "B", "C"]));
        assert_eq!(book.sheet(SHEET).unwrap().frozen_rows(), 1);
        assert_eq!(book.commit_count(), 1);
    }

    #[test]
    fn test_missing_headers_are_appended_in_order() {
        let mut book = MemoryWorkbook::from_rows(SHEET, header_cells(&["A", "B"]));

        let headers = upsert_headers(&mut book, SHEET, &expecting(&["B", "C", "A"])).unwrap();

        assert_eq!(headers, vec!["A", "B", "C"]);
        assert_eq!(book.sheet_rows(SHEET).unwrap(), header_cells(&["A", "B", "C"]));
    }

    #[test]
    fn test_upsert_into_populated_sheet() {
        let mut book = sample_book();
        let expected = [
            "Record ID 1", "Test 5", "Record ID 2", "test1", "Test 2", "Test2a", "Test 3", "Test 4",
        ];

        let headers = upsert_headers(&mut book, SHEET, &expecting(&expected)).unwrap();

        let mut want = sample_headers();
        want.push("Test 5".to_string());
        want.push("Test 4".to_string());
        assert_eq!(headers, want);
        let stored = read_header_row(&book, SHEET, &Options::default()).unwrap();
        assert_eq!(stored.names, want);
        // data rows are untouched
        assert_eq!(book.extents(SHEET).unwrap().rows, 4);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut book = MemoryWorkbook::from_rows(SHEET, header_cells(&["A"]));
        let opts = expecting(&["A", "B"]);

        let first = upsert_headers(&mut book, SHEET, &opts).unwrap();
        let second = upsert_headers(&mut book, SHEET, &opts).unwrap();

        assert_eq!(first, second);
        assert_eq!(book.extents(SHEET).unwrap().cols, 2);
    }

    #[test]
    fn test_without_expected_headers_only_reads() {
        let mut book = sample_book();

        let headers = upsert_headers(&mut book, SHEET, &Options::default()).unwrap();

        assert_eq!(headers, sample_headers());
        assert_eq!(book.commit_count(), 0);

        let mut empty = MemoryWorkbook::from_rows(SHEET, Vec::new());
        assert!(upsert_headers(&mut empty, SHEET, &Options::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_header_row_other_than_first() {
        let mut book = MemoryWorkbook::from_rows(SHEET, Vec::new());
        let mut opts = expecting(&["A", "B"]);
        opts.column_headers_row_index = Some(3);
        opts.freeze_headers = true;

        upsert_headers(&mut book, SHEET, &opts).unwrap();

        let row = read_header_row(&book, SHEET, &opts).unwrap();
        assert_eq!(row.row, 3);
        assert_eq!(row.names, vec!["A", "B"]);
        assert_eq!(book.sheet(SHEET).unwrap().frozen_rows(), 3);
    }

    #[test]
    fn test_read_header_row_from_explicit_range() {
        let book = sample_book();
        let opts = Options {
            headers_range: Some(Region::new(1, 2, 1, 2)),
            ..Options::default()
        };

        let row = read_header_row(&book, SHEET, &opts).unwrap();

        assert_eq!(row.col, 2);
        assert_eq!(row.names, vec!["Record ID 2", "test1"]);
    }
}
