//! Matching incoming records against a sheet and applying the result
//!
//! Records are matched on a join key: the text of one or more fields
//! concatenated in order, with no separator. Keys such as `("1", "23")` and
//! `("12", "3")` therefore collide; existing sheets depend on this key
//! format, so it is kept as is.
//!
//! Three granularities are provided:
//! - [`update_row_in_place`] overwrites one known row, optionally checking
//!   that it still holds the expected record first.
//! - [`update_rows_in_place`] / [`update_mapped_rows_in_place`] scan the
//!   sheet for rows matching one source record and rewrite each match.
//! - [`update_rows_data`] / [`update_mapped_rows_data`] reconcile a whole
//!   record set: update matches, optionally insert new records and archive
//!   records missing from the source, then rewrite the data block.

use crate::codec::{decode_rows, decode_rows_numbered};
use crate::error::{Error, Result, Side};
use crate::grid::{Region, Workbook};
use crate::headers::{read_header_row, upsert_headers, HeaderRow};
use crate::options::Options;
use crate::record::{HeaderMapping, Record};
use crate::rows::{append_rows, write_record_at, write_records};
use crate::status::UpdateStatus;
use crate::value::CellValue;
use std::collections::{HashMap, HashSet};

const UPDATE_ROW_IN_PLACE: &str = "update_row_in_place";
const UPDATE_ROWS_IN_PLACE: &str = "update_rows_in_place";
const UPDATE_MAPPED_ROWS_IN_PLACE: &str = "update_mapped_rows_in_place";
const UPDATE_ROWS_DATA: &str = "update_rows_data";
const UPDATE_MAPPED_ROWS_DATA: &str = "update_mapped_rows_data";

/// Name of the sheet that receives records removed by reconciliation
pub fn archive_sheet_name(sheet: &str) -> String {
    format!("{}_archive", sheet)
}

/// How join keys are built and how a matched record is merged
enum Matcher<'a> {
    /// Source keys and sheet headers share names
    Direct(Vec<&'a str>),
    /// Source keys are translated to sheet headers
    Mapped {
        matching: &'a HeaderMapping,
        update: &'a HeaderMapping,
    },
}

impl Matcher<'_> {
    /// (source field, destination field) pairs that make up the join key
    fn key_fields(&self) -> Vec<(&str, &str)> {
        match self {
            Matcher::Direct(fields) => fields.iter().map(|&f| (f, f)).collect(),
            Matcher::Mapped { matching, .. } => matching.iter().map(|(dest, src)| (src, dest)).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Matcher::Direct(fields) => fields.is_empty(),
            Matcher::Mapped { matching, .. } => matching.is_empty(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Matcher::Direct(_) => "match headers",
            Matcher::Mapped { .. } => "mapped join keys",
        }
    }

    /// Copy the fields the source actually carries onto a matched row
    fn merge_present(&self, dest: &mut Record, source: &Record) {
        match self {
            Matcher::Direct(_) => dest.assign(source),
            Matcher::Mapped { update, .. } => {
                for (dest_header, src_key) in update.iter() {
                    if let Some(value) = source.get(src_key) {
                        dest.insert(dest_header, value.clone());
                    }
                }
            }
        }
    }

    /// Copy every update-mask field onto a matched row; fields the source
    /// lacks are blanked
    fn merge_mask(&self, dest: &mut Record, source: &Record) {
        match self {
            Matcher::Direct(_) => dest.assign(source),
            Matcher::Mapped { update, .. } => {
                for (dest_header, src_key) in update.iter() {
                    let value = source.get(src_key).cloned().unwrap_or_default();
                    dest.insert(dest_header, value);
                }
            }
        }
    }

    /// A new destination record built from a source record
    fn project(&self, source: &Record) -> Record {
        match self {
            Matcher::Direct(_) => source.clone(),
            Matcher::Mapped { update, .. } => update
                .iter()
                .map(|(dest_header, src_key)| (dest_header, source.get(src_key).cloned().unwrap_or_default()))
                .collect(),
        }
    }
}

/// Text of a field that holds a set value; blank, zero and `false` count as unset
fn field_text(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .filter(|v| v.is_truthy())
        .map(CellValue::to_string_value)
}

fn missing_field(operation: &'static str, side: Side, field: &str, record: &Record) -> Error {
    Error::MissingMatchField {
        operation,
        side,
        field: field.to_string(),
        record: record.to_json_string(),
    }
}

/// Join key of a source record for an in-place scan; every field must be set
fn scan_source_key(matcher: &Matcher<'_>, source: &Record, operation: &'static str) -> Result<String> {
    let mut key = String::new();
    for (src, _) in matcher.key_fields() {
        let text = field_text(source, src).ok_or_else(|| missing_field(operation, Side::Source, src, source))?;
        key.push_str(&text);
    }
    Ok(key)
}

/// Join key of a destination row for an in-place scan; unset fields add nothing
fn scan_dest_key(matcher: &Matcher<'_>, record: &Record) -> String {
    matcher
        .key_fields()
        .into_iter()
        .filter_map(|(_, dest)| field_text(record, dest))
        .collect()
}

/// Join key for bulk reconciliation; fields must exist but may be blank
fn bulk_key(record: &Record, fields: &[&str], operation: &'static str, side: Side) -> Result<String> {
    let mut key = String::new();
    for &field in fields {
        let value = record
            .get(field)
            .ok_or_else(|| missing_field(operation, side, field, record))?;
        key.push_str(&value.to_string_value());
    }
    Ok(key)
}

/// Key every record, rejecting duplicate keys
fn index_records<'r>(
    records: &'r [Record],
    fields: &[&str],
    operation: &'static str,
    side: Side,
) -> Result<Vec<(String, &'r Record)>> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        let key = bulk_key(record, fields, operation, side)?;
        if !seen.insert(key.clone()) {
            return Err(Error::DuplicateKey { operation, side, key });
        }
        keyed.push((key, record));
    }
    Ok(keyed)
}

/// Data rows below the header row, decoded with that header row
fn destination_rows<W: Workbook + ?Sized>(book: &W, sheet: &str, headers: &HeaderRow) -> Result<Vec<(u32, Record)>> {
    let extents = book.extents(sheet)?;
    if extents.rows <= headers.row || headers.names.is_empty() {
        return Ok(Vec::new());
    }
    let region = Region::new(headers.row + 1, headers.col, extents.rows - headers.row, headers.width());
    let values = book.read_region(sheet, region)?;
    Ok(decode_rows_numbered(&values, &headers.names, region.row))
}

/// Overwrite one row with a record, optionally checking it first
///
/// With `options.require_match` the row's current values for
/// `options.match_headers` must join to the same key as the source's. If
/// they do not, the row has probably moved, and this falls back to
/// [`update_rows_in_place`] over the whole sheet. A failed row write is
/// counted in `errors`, not returned.
pub fn update_row_in_place<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    source: &Record,
    row_num: Option<u32>,
    options: &Options,
) -> Result<UpdateStatus> {
    let row = row_num.filter(|&r| r > 0).ok_or(Error::MissingRowNumber)?;
    let headers = read_header_row(book, sheet, options)?;

    if options.require_match {
        let match_headers = options
            .match_headers
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(Error::MissingMatchKey {
                operation: UPDATE_ROW_IN_PLACE,
                what: "match headers",
            })?;

        let current = book.read_region(sheet, Region::new(row, headers.col, 1, headers.width()))?;
        let existing = decode_rows(&current, &headers.names)
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut existing_key = String::new();
        let mut source_key = String::new();
        for field in match_headers {
            let text = field_text(&existing, field)
                .ok_or_else(|| missing_field(UPDATE_ROW_IN_PLACE, Side::Destination, field, &existing))?;
            existing_key.push_str(&text);
            let text = field_text(source, field)
                .ok_or_else(|| missing_field(UPDATE_ROW_IN_PLACE, Side::Source, field, source))?;
            source_key.push_str(&text);
        }

        if existing_key != source_key {
            tracing::debug!(sheet, row, "row no longer matches, scanning the sheet instead");
            let fallback = Options {
                require_unique: false,
                ..options.clone()
            };
            return update_rows_in_place(book, sheet, source, match_headers, &fallback);
        }
    }

    let mut status = UpdateStatus::new();
    match write_record_at(book, sheet, source, &headers, row) {
        Ok(()) => status.records_updated += 1,
        Err(err) => {
            tracing::warn!(sheet, row, error = %err, "failed to write row");
            status.errors += 1;
        }
    }
    Ok(status)
}

/// Update every row whose match headers join to the source record's key
///
/// All of the source's fields are written onto each matching row. With
/// `options.require_unique` the call fails as soon as any row matches,
/// before anything is written. Failed row writes are counted in `errors`
/// and the remaining matches are still written.
pub fn update_rows_in_place<W, S>(
    book: &mut W,
    sheet: &str,
    source: &Record,
    match_headers: &[S],
    options: &Options,
) -> Result<UpdateStatus>
where
    W: Workbook + ?Sized,
    S: AsRef<str>,
{
    let matcher = Matcher::Direct(match_headers.iter().map(AsRef::as_ref).collect());
    update_in_place(book, sheet, source, &matcher, options, UPDATE_ROWS_IN_PLACE)
}

/// [`update_rows_in_place`] for source records keyed differently from the sheet
///
/// `match_mapping` pairs the sheet headers that form the join key with the
/// source fields they correspond to. Only headers in `update_mapping` are
/// written, and only from source fields that are present.
pub fn update_mapped_rows_in_place<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    source: &Record,
    match_mapping: &HeaderMapping,
    update_mapping: &HeaderMapping,
    options: &Options,
) -> Result<UpdateStatus> {
    let matcher = Matcher::Mapped {
        matching: match_mapping,
        update: update_mapping,
    };
    update_in_place(book, sheet, source, &matcher, options, UPDATE_MAPPED_ROWS_IN_PLACE)
}

fn update_in_place<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    source: &Record,
    matcher: &Matcher<'_>,
    options: &Options,
    operation: &'static str,
) -> Result<UpdateStatus> {
    if matcher.is_empty() {
        return Err(Error::MissingMatchKey {
            operation,
            what: matcher.describe(),
        });
    }
    let source_key = scan_source_key(matcher, source, operation)?;

    let headers = read_header_row(book, sheet, options)?;
    let matches: Vec<(u32, Record)> = destination_rows(book, sheet, &headers)?
        .into_iter()
        .filter(|(_, record)| scan_dest_key(matcher, record) == source_key)
        .collect();

    // Fires on any match, not only on more than one.
    if options.require_unique && !matches.is_empty() {
        return Err(Error::MatchNotUnique {
            operation,
            what: matcher.describe(),
        });
    }

    let mut status = UpdateStatus::new();
    for (row, mut record) in matches {
        matcher.merge_present(&mut record, source);
        match write_record_at(book, sheet, &record, &headers, row) {
            Ok(()) => status.records_updated += 1,
            Err(err) => {
                tracing::warn!(sheet, row, error = %err, "failed to write matched row");
                status.errors += 1;
            }
        }
    }
    tracing::debug!(sheet, key = %source_key, updated = status.records_updated, errors = status.errors, "in-place update done");
    Ok(status)
}

/// Reconcile the sheet's records with a complete source record set
///
/// Source and destination records are keyed on `match_fields`; a duplicate
/// key on either side fails the call before anything is written. Matched
/// destination records take every source field. Unmatched destination
/// records are kept unless `options.remove_and_archive_non_matching_records`
/// is set, in which case they are appended to `<sheet>_archive` first. With
/// `options.upsert_new_records`, source records without a match are added
/// after the existing ones. The data block is then cleared and rewritten.
pub fn update_rows_data<W, S>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    match_fields: &[S],
    options: &Options,
) -> Result<UpdateStatus>
where
    W: Workbook + ?Sized,
    S: AsRef<str>,
{
    let matcher = Matcher::Direct(match_fields.iter().map(AsRef::as_ref).collect());
    reconcile(book, sheet, records, &matcher, options, UPDATE_ROWS_DATA)
}

/// [`update_rows_data`] for source records keyed differently from the sheet
///
/// Matched rows get every header in `update_mapping` from the mapped source
/// field (blank when the source lacks it); other columns keep their values.
/// Inserted records contain only the `update_mapping` headers.
pub fn update_mapped_rows_data<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    match_mapping: &HeaderMapping,
    update_mapping: &HeaderMapping,
    options: &Options,
) -> Result<UpdateStatus> {
    if update_mapping.is_empty() {
        return Err(Error::MissingMatchKey {
            operation: UPDATE_MAPPED_ROWS_DATA,
            what: "update mapping",
        });
    }
    let matcher = Matcher::Mapped {
        matching: match_mapping,
        update: update_mapping,
    };
    reconcile(book, sheet, records, &matcher, options, UPDATE_MAPPED_ROWS_DATA)
}

fn reconcile<W: Workbook + ?Sized>(
    book: &mut W,
    sheet: &str,
    records: &[Record],
    matcher: &Matcher<'_>,
    options: &Options,
    operation: &'static str,
) -> Result<UpdateStatus> {
    if matcher.is_empty() {
        return Err(Error::MissingMatchKey {
            operation,
            what: matcher.describe(),
        });
    }

    let headers = read_header_row(book, sheet, options)?;
    let existing: Vec<Record> = destination_rows(book, sheet, &headers)?
        .into_iter()
        .map(|(_, record)| record)
        .collect();

    let (source_fields, dest_fields): (Vec<&str>, Vec<&str>) = matcher.key_fields().into_iter().unzip();
    let source = index_records(records, &source_fields, operation, Side::Source)?;
    let destination = index_records(&existing, &dest_fields, operation, Side::Destination)?;
    tracing::debug!(sheet, source = source.len(), destination = destination.len(), "keyed records");

    let source_by_key: HashMap<&str, &Record> = source.iter().map(|(k, r)| (k.as_str(), *r)).collect();
    let dest_keys: HashSet<&str> = destination.iter().map(|(k, _)| k.as_str()).collect();
    let archiving = options.remove_and_archive_non_matching_records;

    let mut status = UpdateStatus::new();
    let mut kept = Vec::with_capacity(destination.len());
    let mut unmatched = Vec::new();

    for (key, record) in &destination {
        let mut record = (*record).clone();
        if let Some(update) = source_by_key.get(key.as_str()) {
            matcher.merge_mask(&mut record, update);
            kept.push(record);
            status.records_updated += 1;
        } else if !archiving {
            kept.push(record);
        } else {
            unmatched.push(record);
        }
    }

    if options.upsert_new_records {
        for (key, record) in &source {
            if !dest_keys.contains(key.as_str()) {
                kept.push(matcher.project(record));
                status.records_inserted += 1;
            }
        }
    }

    // Archive before the destructive rewrite below.
    if archiving && !unmatched.is_empty() {
        archive_records(book, sheet, &headers.names, &unmatched)?;
        status.records_archived = unmatched.len();
    }

    let extents = book.extents(sheet)?;
    if extents.rows > headers.row {
        book.clear_region(
            sheet,
            Region::new(headers.row + 1, 1, extents.rows - headers.row, extents.cols),
        )?;
    }
    write_records(book, sheet, &kept, &headers.names, headers.row + 1, headers.col)?;

    tracing::info!(
        sheet,
        updated = status.records_updated,
        inserted = status.records_inserted,
        archived = status.records_archived,
        "reconciled records"
    );
    Ok(status)
}

/// Append records to the sheet's archive, creating it with `headers` if needed
fn archive_records<W: Workbook + ?Sized>(book: &mut W, sheet: &str, headers: &[String], records: &[Record]) -> Result<()> {
    let archive = archive_sheet_name(sheet);
    book.locate_or_create_sheet(&archive)?;
    let header_opts = Options {
        expected_headers: Some(headers.to_vec()),
        ..Options::default()
    };
    upsert_headers(book, &archive, &header_opts)?;
    append_rows(book, &archive, records, &Options::default())?;
    book.commit()?;
    tracing::info!(sheet, archive = %archive, count = records.len(), "archived unmatched records");
    Ok(())
}
