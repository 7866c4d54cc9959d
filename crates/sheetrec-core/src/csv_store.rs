//! A workbook stored as a directory of CSV files
//!
//! Each sheet is `<name>.csv` in the workbook directory; every CSV line is
//! one grid row, there is no header handling at this layer. Sheet ids,
//! frozen rows and modification times live in `workbook.json` next to the
//! CSV files. CSV files not yet listed there are picked up when the
//! workbook is opened.
//!
//! Writes are buffered in memory until [`Workbook::commit`].

use crate::error::{Error, Result};
use crate::grid::{Extents, Region, SheetId, Workbook};
use crate::memory::MemoryWorkbook;
use crate::value::CellValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of the workbook manifest
pub const MANIFEST_FILE: &str = "workbook.json";

/// Manifest entry for one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub id: SheetId,
    pub name: String,
    #[serde(default)]
    pub frozen_rows: u32,
    /// Last time the sheet was written
    pub updated_at: DateTime<Utc>,
}

/// Sheet index of a workbook directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub sheets: Vec<SheetEntry>,
}

impl Manifest {
    /// Load the manifest, or an empty one if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the manifest
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Find a sheet entry by name
    pub fn entry(&self, name: &str) -> Option<&SheetEntry> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut SheetEntry> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    fn next_id(&self) -> SheetId {
        self.sheets.iter().map(|s| s.id + 1).max().unwrap_or(0)
    }
}

/// Workbook backed by a directory of CSV files
#[derive(Debug)]
pub struct CsvWorkbook {
    root: PathBuf,
    manifest: Manifest,
    cells: MemoryWorkbook,
    dirty: BTreeSet<String>,
}

impl CsvWorkbook {
    /// Open a workbook directory, creating it if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut manifest = Manifest::load(root.join(MANIFEST_FILE))?;
        let mut cells = MemoryWorkbook::new();
        for entry in &manifest.sheets {
            let rows = read_sheet_file(&sheet_path(&root, &entry.name))?;
            cells.insert_sheet(entry.id, &entry.name, rows, entry.frozen_rows);
        }

        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !path.extension().is_some_and(|ext| ext == "csv") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if manifest.entry(name).is_some() {
                continue;
            }

            let id = manifest.next_id();
            let rows = read_sheet_file(path)?;
            cells.insert_sheet(id, name, rows, 0);
            manifest.sheets.push(SheetEntry {
                id,
                name: name.to_string(),
                frozen_rows: 0,
                updated_at: Utc::now(),
            });
            tracing::debug!(sheet = name, id, "discovered sheet file");
        }

        tracing::debug!(root = %root.display(), sheets = manifest.sheets.len(), "opened workbook");
        Ok(Self {
            root,
            manifest,
            cells,
            dirty: BTreeSet::new(),
        })
    }

    /// Workbook directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current manifest, including sheets not yet committed
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path of the CSV file backing a sheet
    pub fn sheet_path(&self, name: &str) -> PathBuf {
        sheet_path(&self.root, name)
    }

    /// Whether there are writes not yet committed
    pub fn has_pending_writes(&self) -> bool {
        !self.dirty.is_empty()
    }

    fn touch(&mut self, sheet: &str) {
        self.dirty.insert(sheet.to_string());
    }
}

impl Workbook for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.cells.sheet_names()
    }

    fn sheet_id(&self, sheet: &str) -> Option<SheetId> {
        self.cells.sheet_id(sheet)
    }

    fn extents(&self, sheet: &str) -> Result<Extents> {
        self.cells.extents(sheet)
    }

    fn read_region(&self, sheet: &str, region: Region) -> Result<Vec<Vec<CellValue>>> {
        self.cells.read_region(sheet, region)
    }

    fn write_region(&mut self, sheet: &str, row: u32, col: u32, values: &[Vec<CellValue>]) -> Result<()> {
        self.cells.write_region(sheet, row, col, values)?;
        self.touch(sheet);
        Ok(())
    }

    fn clear_region(&mut self, sheet: &str, region: Region) -> Result<()> {
        self.cells.clear_region(sheet, region)?;
        self.touch(sheet);
        Ok(())
    }

    fn freeze_rows(&mut self, sheet: &str, count: u32) -> Result<()> {
        self.cells.freeze_rows(sheet, count)?;
        if let Some(entry) = self.manifest.entry_mut(sheet) {
            entry.frozen_rows = count;
        }
        self.touch(sheet);
        Ok(())
    }

    fn locate_or_create_sheet(&mut self, name: &str) -> Result<SheetId> {
        if let Some(id) = self.cells.sheet_id(name) {
            return Ok(id);
        }
        validate_sheet_name(name)?;

        let id = self.cells.locate_or_create_sheet(name)?;
        self.manifest.sheets.push(SheetEntry {
            id,
            name: name.to_string(),
            frozen_rows: 0,
            updated_at: Utc::now(),
        });
        self.touch(name);
        tracing::debug!(sheet = name, id, "created sheet");
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        let now = Utc::now();
        for name in &self.dirty {
            let rows = self
                .cells
                .sheet_rows(name)
                .ok_or_else(|| Error::SheetNotFound(name.clone()))?;
            write_sheet_file(&sheet_path(&self.root, name), &rows)?;
            if let Some(entry) = self.manifest.entry_mut(name) {
                entry.updated_at = now;
            }
        }
        self.manifest.save(self.root.join(MANIFEST_FILE))?;
        tracing::debug!(root = %self.root.display(), sheets = self.dirty.len(), "committed workbook");
        self.dirty.clear();
        Ok(())
    }
}

fn sheet_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}.csv", name))
}

/// Sheet names become file names, so they must be a single path component
fn validate_sheet_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

/// Read a sheet file into rows; a missing file is an empty sheet
fn read_sheet_file(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        rows.push(record.iter().map(CellValue::parse_exact).collect());
    }
    Ok(rows)
}

fn write_sheet_file(path: &Path, rows: &[Vec<CellValue>]) -> Result<()> {
    let csv_err = |e: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer
            .write_record(row.iter().map(CellValue::to_string_value))
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::record::Record;
    use crate::reconcile::update_rows_data;
    use crate::rows::{read_rows, write_rows};
    use crate::testutil::{int, sample_headers, sample_records, SHEET};
    use tempfile::tempdir;

    fn header_cells() -> Vec<Vec<CellValue>> {
        vec![sample_headers().into_iter().map(CellValue::from).collect()]
    }

    #[test]
    fn test_commit_writes_csv_and_manifest() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        assert!(book.sheet_names().is_empty());

        let id = book.locate_or_create_sheet("Data").unwrap();
        book.write_region("Data", 1, 1, &[vec![CellValue::from("a"), CellValue::from("b")]])
            .unwrap();
        book.write_region("Data", 2, 1, &[vec![int(1), CellValue::Float(2.5)]])
            .unwrap();
        assert!(book.has_pending_writes());
        book.commit().unwrap();
        assert!(!book.has_pending_writes());

        let content = fs::read_to_string(dir.path().join("Data.csv")).unwrap();
        assert_eq!(content, "a,b\n1,2.5\n");

        let reopened = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(reopened.sheet_id("Data"), Some(id));
        let block = reopened.read_region("Data", Region::new(1, 1, 2, 2)).unwrap();
        assert_eq!(block[1], vec![int(1), CellValue::Float(2.5)]);
    }

    #[test]
    fn test_text_cells_survive_reopen() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(book.root(), dir.path());
        book.locate_or_create_sheet(SHEET).unwrap();
        book.write_region(SHEET, 1, 1, &[vec![CellValue::from("Id"), CellValue::from("Name")]])
            .unwrap();
        let record: Record = [("Id", CellValue::from("007")), ("Name", CellValue::from(" padded "))]
            .into_iter()
            .collect();
        write_rows(&mut book, SHEET, std::slice::from_ref(&record), &Options::default()).unwrap();
        book.commit().unwrap();

        let mut reopened = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(read_rows(&reopened, SHEET, &Options::default()).unwrap(), vec![record.clone()]);

        let opts = Options {
            upsert_new_records: true,
            ..Options::default()
        };
        let status = update_rows_data(&mut reopened, SHEET, &[record], &["Id"], &opts).unwrap();
        assert_eq!(status.records_updated, 1);
        assert_eq!(status.records_inserted, 0);
    }

    #[test]
    fn test_uncommitted_writes_are_not_persisted() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        book.locate_or_create_sheet("Data").unwrap();
        book.write_region("Data", 1, 1, &[vec![int(1)]]).unwrap();
        drop(book);

        let reopened = CsvWorkbook::open(dir.path()).unwrap();
        assert!(reopened.sheet_names().is_empty());
    }

    #[test]
    fn test_discovers_csv_files_with_typed_cells() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("People.csv"), "Name,Age,Score\nAnn,41,9.5\nBob,,\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let book = CsvWorkbook::open(dir.path()).unwrap();

        assert_eq!(book.sheet_names(), vec!["People".to_string()]);
        assert_eq!(book.extents("People").unwrap(), Extents { rows: 3, cols: 3 });
        let block = book.read_region("People", Region::new(2, 1, 2, 3)).unwrap();
        assert_eq!(
            block,
            vec![
                vec![CellValue::from("Ann"), int(41), CellValue::Float(9.5)],
                vec![CellValue::from("Bob"), CellValue::Empty, CellValue::Empty],
            ]
        );
    }

    #[test]
    fn test_discovered_sheets_get_fresh_ids() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        let first = book.locate_or_create_sheet("First").unwrap();
        book.commit().unwrap();
        fs::write(dir.path().join("Second.csv"), "x\n").unwrap();

        let mut reopened = CsvWorkbook::open(dir.path()).unwrap();
        let second = reopened.sheet_id("Second").unwrap();
        assert_eq!(reopened.sheet_id("First"), Some(first));
        assert_ne!(first, second);
        assert_eq!(reopened.sheet_name_by_id(second).as_deref(), Some("Second"));

        reopened.commit().unwrap();
        let manifest = Manifest::load(dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.entry("Second").map(|e| e.id), Some(second));
    }

    #[test]
    fn test_rejects_path_like_sheet_names() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();

        for name in ["../escape", "a/b", "a\\b", "", ".."] {
            let err = book.locate_or_create_sheet(name).unwrap_err();
            assert!(matches!(err, Error::InvalidSheetName(_)), "{name:?}");
        }
    }

    #[test]
    fn test_frozen_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        book.locate_or_create_sheet(SHEET).unwrap();
        book.freeze_rows(SHEET, 2).unwrap();
        book.commit().unwrap();

        let reopened = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(reopened.manifest().entry(SHEET).map(|e| e.frozen_rows), Some(2));
    }

    #[test]
    fn test_reconcile_against_csv_directory() {
        let dir = tempdir().unwrap();
        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        book.locate_or_create_sheet(SHEET).unwrap();
        book.write_region(SHEET, 1, 1, &header_cells()).unwrap();
        write_rows(&mut book, SHEET, &sample_records(), &Options::default()).unwrap();
        book.commit().unwrap();

        let mut book = CsvWorkbook::open(dir.path()).unwrap();
        let mut changed = sample_records()[0].clone();
        changed.insert("Test 3", "Saved");
        let opts = Options {
            remove_and_archive_non_matching_records: true,
            ..Options::default()
        };
        let status = update_rows_data(&mut book, SHEET, &[changed.clone()], &["Record ID 1"], &opts).unwrap();
        book.commit().unwrap();

        assert_eq!(status.records_archived, 2);
        let reopened = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(read_rows(&reopened, SHEET, &Options::default()).unwrap(), vec![changed]);
        let archived = read_rows(&reopened, "Records_archive", &Options::default()).unwrap();
        assert_eq!(archived, sample_records()[1..].to_vec());
        assert!(dir.path().join("Records_archive.csv").exists());
    }
}
