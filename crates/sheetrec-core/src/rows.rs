//! Reading records from a sheet and writing them back
//!
//! Writes always cover one rectangular block of exactly
//! `records.len()` rows by `headers.len()` columns. Nothing is written for
//! an empty record list.

use crate::codec::{decode_rows_numbered, encode_mapped_rows, encode_rows};
use crate::error::Result;
use crate::grid::{Region, Workbook};
use crate::headers::{read_header_row, read_names, HeaderRow};
use crate::options::Options;
use crate::record::{HeaderMapping, Record};
use crate::value::CellValue;

/// Read every record below the header row
///
/// `options.data_range` and `options.headers_range` narrow the read to an
/// exact block; by default the data range is everything below the header
/// row and the headers span the same columns as the data.
pub fn read_rows<W: Workbook + ?Sized>(book: &W, sheet: &str, options: &Options) -> Result<Vec<Record>> {
    Ok(read_numbered_rows(book, sheet, options)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Like [`read_rows`], pairing each record with its sheet row number
pub fn read_numbered_rows<W: Workbook + ?Sized>(
    book: &W,
    sheet: &str,
    options: &Options,
) -> Result<Vec<(u32, Record)>> {
    let header_row = options.header_row();
    let extents = book.extents(sheet)?;
    if extents.rows < header_row + 1 {
        return Ok(Vec::new());
    }

    let data_range = options.data_range.unwrap_or_else(|| {
        Region::new(header_row + 1, 1, extents.rows - header_row, extents.cols)
    });
    let headers_range = options
        .headers_range
        .unwrap_or_else(|| Region::new(header_row, data_range.col, 1, data_range.width));

    let headers = read_names(book, sheet, headers_range)?;
    let values = if data_range.is_empty() {
        Vec::new()
    } else {
        book.read_region(sheet, data_range)?
    };

    let records = decode_rows_numbered(&values, &headers, data_range.row);
    tracing::debug!(sheet, rows = values.len(), records = records.len(), "read records");
    Ok(records)
}

/// Encode `records` against `headers` and write them with the top-left cell
/// at (`first_row`, `first_col`)
pub fn write_records<W, S>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    headers: &[S],
    first_row: u32,
    first_col: u32,
) -> Result<()>
where
    W: Workbook + ?Sized,
    S: AsRef<str>,
{
    let block = encode_rows(records, headers);
    write_block(book, sheet, block, first_row, first_col)
}

/// Write records below the header row, one row per record
///
/// Writing starts at `options.first_data_row_index`, or the row right below
/// the headers.
pub fn write_rows<W: Workbook + ?Sized>(book: &mut W, sheet: &str, records: &[Record], options: &Options) -> Result<()> {
    let headers = read_header_row(book, sheet, options)?;
    let first_row = options.first_data_row_index.unwrap_or(headers.row + 1);
    write_records(book, sheet, records, &headers.names, first_row, headers.col)
}

/// Write records after the sheet's last populated row
pub fn append_rows<W: Workbook + ?Sized>(book: &mut W, sheet: &str, records: &[Record], options: &Options) -> Result<()> {
    let headers = read_header_row(book, sheet, options)?;
    let next_row = book.extents(sheet)?.rows + 1;
    write_records(book, sheet, records, &headers.names, next_row, headers.col)
}

/// Write records keyed differently from the sheet headers
///
/// `mapping` pairs each destination header with the record field that
/// feeds it. Columns without a mapping are written blank.
pub fn write_mapped_rows<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    mapping: &HeaderMapping,
    options: &Options,
) -> Result<()> {
    let headers = read_header_row(book, sheet, options)?;
    let first_row = options.first_data_row_index.unwrap_or(headers.row + 1);
    let block = encode_mapped_rows(records, &headers.names, mapping);
    write_block(book, sheet, block, first_row, headers.col)
}

/// Append records keyed differently from the sheet headers
pub fn append_mapped_rows<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    mapping: &HeaderMapping,
    options: &Options,
) -> Result<()> {
    let headers = read_header_row(book, sheet, options)?;
    let next_row = book.extents(sheet)?.rows + 1;
    let block = encode_mapped_rows(records, &headers.names, mapping);
    write_block(book, sheet, block, next_row, headers.col)
}

/// Overwrite a single sheet row with one record
pub(crate) fn write_record_at<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    record: &Record,
    headers: &HeaderRow,
    row: u32,
) -> Result<()> {
    write_records(book, sheet, std::slice::from_ref(record), &headers.names, row, headers.col)
}

fn write_block<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    block: Vec<Vec<CellValue>>,
    first_row: u32,
    first_col: u32,
) -> Result<()> {
    let width = block.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        tracing::debug!(sheet, records = block.len(), "nothing to write");
        return Ok(());
    }
    tracing::debug!(sheet, first_row, rows = block.len(), cols = width, "writing records");
    book.write_region(sheet, first_row, first_col, &block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorkbook;
    use crate::testutil::{int, record, sample_book, sample_headers, sample_records, sample_sheet_rows, text, SHEET};

    fn headers_only() -> MemoryWorkbook {
        MemoryWorkbook::from_rows(SHEET, sample_sheet_rows()[..1].to_vec())
    }

    #[test]
    fn test_read_rows() {
        let book = sample_book();
        assert_eq!(read_rows(&book, SHEET, &Options::default()).unwrap(), sample_records());
    }

    #[test]
    fn test_read_rows_empty_sheet() {
        let book = headers_only();
        assert!(read_rows(&book, SHEET, &Options::default()).unwrap().is_empty());

        let blank = MemoryWorkbook::from_rows(SHEET, Vec::new());
        assert!(read_rows(&blank, SHEET, &Options::default()).unwrap().is_empty());
    }

    #[test]
    fn test_read_rows_with_explicit_ranges() {
        let mut book = MemoryWorkbook::from_rows(SHEET, Vec::new());
        book.write_region(SHEET, 3, 1, &sample_sheet_rows()).unwrap();
        let opts = Options {
            column_headers_row_index: Some(3),
            data_range: Some(Region::new(5, 1, 2, 2)),
            headers_range: Some(Region::new(3, 1, 1, 2)),
            ..Options::default()
        };

        let records = read_rows(&book, SHEET, &opts).unwrap();

        assert_eq!(
            records,
            vec![
                record(&[("Record ID 1", int(12346)), ("Record ID 2", int(123))]),
                record(&[("Record ID 1", int(12347)), ("Record ID 2", int(125))]),
            ]
        );
    }

    #[test]
    fn test_write_rows_reproduces_sheet() {
        let mut book = headers_only();

        write_rows(&mut book, SHEET, &sample_records(), &Options::default()).unwrap();

        assert_eq!(book.sheet_rows(SHEET).unwrap(), sample_sheet_rows());
    }

    #[test]
    fn test_write_rows_below_lower_header_row() {
        let mut book = MemoryWorkbook::from_rows(SHEET, Vec::new());
        book.write_region(SHEET, 3, 1, &sample_sheet_rows()[..1]).unwrap();
        let opts = Options {
            headers_range: Some(Region::row_span(3, 6)),
            ..Options::default()
        };

        write_rows(&mut book, SHEET, &sample_records(), &opts).unwrap();

        let block = book.read_region(SHEET, Region::new(3, 1, 4, 6)).unwrap();
        assert_eq!(block, sample_sheet_rows());
    }

    #[test]
    fn test_append_rows() {
        let mut book = sample_book();
        let extra = record(&[
            ("Record ID 1", int(12348)),
            ("Record ID 2", int(126)),
            ("test1", int(3)),
            ("Test 2", text("Goodbye")),
            ("Test2a", text("Cruel")),
            ("Test 3", text("World")),
        ]);

        append_rows(&mut book, SHEET, std::slice::from_ref(&extra), &Options::default()).unwrap();

        let mut want = sample_records();
        want.push(extra);
        assert_eq!(read_rows(&book, SHEET, &Options::default()).unwrap(), want);
    }

    #[test]
    fn test_writing_nothing_leaves_sheet_alone() {
        let mut book = sample_book();
        write_rows(&mut book, SHEET, &[], &Options::default()).unwrap();
        assert_eq!(book.sheet_rows(SHEET).unwrap(), sample_sheet_rows());
    }

    #[test]
    fn test_write_mapped_rows_matches_direct_write() {
        let mapped: Vec<Record> = sample_records()
            .into_iter()
            .map(|r| {
                record(&[
                    ("recordId1", r.get("Record ID 1").cloned().unwrap()),
                    ("recordId2", r.get("Record ID 2").cloned().unwrap()),
                    ("test1", r.get("test1").cloned().unwrap()),
                    ("test2", r.get("Test 2").cloned().unwrap()),
                    ("test2a", r.get("Test2a").cloned().unwrap()),
                    ("test3", r.get("Test 3").cloned().unwrap()),
                ])
            })
            .collect();
        let mapping = HeaderMapping::from_pairs([
            ("Record ID 1", "recordId1"),
            ("Record ID 2", "recordId2"),
            ("test1", "test1"),
            ("Test 2", "test2"),
            ("Test2a", "test2a"),
            ("Test 3", "test3"),
        ]);
        let mut book = headers_only();

        write_mapped_rows(&mut book, SHEET, &mapped, &mapping, &Options::default()).unwrap();

        assert_eq!(book.sheet_rows(SHEET).unwrap(), sample_sheet_rows());
    }

    #[test]
    fn test_append_mapped_rows() {
        let mut book = sample_book();
        let mapping = HeaderMapping::from_pairs([
            ("Record ID 1", "recordId1"),
            ("Record ID 2", "recordId2"),
            ("test1", "test1"),
            ("Test 2", "test2"),
            ("Test2a", "test2a"),
            ("Test 3", "test3"),
        ]);
        let extra = vec![
            record(&[
                ("recordId1", int(12348)),
                ("recordId2", int(126)),
                ("test1", int(3)),
                ("test2", text("Greetings")),
                ("test2a", text("fellow")),
                ("test3", text("traveler")),
            ]),
            record(&[
                ("recordId1", int(12349)),
                ("recordId2", int(127)),
                ("test1", int(4)),
                ("test2", text("")),
                ("test2a", text("Go")),
                ("test3", text("onward")),
            ]),
        ];

        append_mapped_rows(&mut book, SHEET, &extra, &mapping, &Options::default()).unwrap();

        let rows = book.sheet_rows(SHEET).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows[4],
            vec![int(12348), int(126), int(3), text("Greetings"), text("fellow"), text("traveler")]
        );
        assert_eq!(
            rows[5],
            vec![int(12349), int(127), int(4), text(""), text("Go"), text("onward")]
        );
        assert_eq!(rows[0].len(), sample_headers().len());
    }
}
