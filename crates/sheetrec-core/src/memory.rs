//! In-memory workbook

use crate::error::{Error, Result};
use crate::grid::{block_dimensions, check_region, Extents, Region, SheetId, Workbook};
use crate::value::CellValue;

/// A sheet held as a dense grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySheet {
    id: SheetId,
    name: String,
    cells: Vec<Vec<CellValue>>,
    frozen_rows: u32,
}

impl MemorySheet {
    fn new(id: SheetId, name: String, cells: Vec<Vec<CellValue>>, frozen_rows: u32) -> Self {
        Self {
            id,
            name,
            cells,
            frozen_rows,
        }
    }

    /// Sheet id
    pub fn id(&self) -> SheetId {
        self.id
    }

    /// Sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frozen rows
    pub fn frozen_rows(&self) -> u32 {
        self.frozen_rows
    }

    /// Last populated row and column
    pub fn extents(&self) -> Extents {
        let mut extents = Extents::default();
        for (i, row) in self.cells.iter().enumerate() {
            if let Some(last) = row.iter().rposition(|c| !c.is_empty()) {
                extents.rows = (i + 1) as u32;
                extents.cols = extents.cols.max((last + 1) as u32);
            }
        }
        extents
    }

    /// The populated area as a rectangular block
    pub fn rows(&self) -> Vec<Vec<CellValue>> {
        let extents = self.extents();
        self.read(Region::new(1, 1, extents.rows, extents.cols))
    }

    fn read(&self, region: Region) -> Vec<Vec<CellValue>> {
        let row0 = region.row.saturating_sub(1) as usize;
        let col0 = region.col.saturating_sub(1) as usize;
        (0..region.height as usize)
            .map(|r| {
                (0..region.width as usize)
                    .map(|c| {
                        self.cells
                            .get(row0 + r)
                            .and_then(|row| row.get(col0 + c))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }

    fn write(&mut self, row: u32, col: u32, values: &[Vec<CellValue>]) {
        let row0 = (row - 1) as usize;
        let col0 = (col - 1) as usize;
        if self.cells.len() < row0 + values.len() {
            self.cells.resize_with(row0 + values.len(), Vec::new);
        }
        for (r, block_row) in values.iter().enumerate() {
            let target = &mut self.cells[row0 + r];
            if target.len() < col0 + block_row.len() {
                target.resize(col0 + block_row.len(), CellValue::Empty);
            }
            for (c, value) in block_row.iter().enumerate() {
                target[col0 + c] = value.clone();
            }
        }
    }

    fn clear(&mut self, region: Region) {
        let row0 = (region.row - 1) as usize;
        let col0 = (region.col - 1) as usize;
        for row in self.cells.iter_mut().skip(row0).take(region.height as usize) {
            for cell in row.iter_mut().skip(col0).take(region.width as usize) {
                *cell = CellValue::Empty;
            }
        }
    }
}

/// A workbook that lives entirely in memory
///
/// Sheet ids are handed out sequentially from 0. `commit` does nothing but
/// count calls, which tests use to check that a flush happened.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    next_id: SheetId,
    commits: usize,
}

impl MemoryWorkbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workbook holding one sheet with the given rows
    pub fn from_rows(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        Self::new().with_sheet(name, rows)
    }

    /// Add a sheet with the given rows
    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        let id = self.next_id;
        self.insert_sheet(id, name, rows, 0);
        self
    }

    /// Add or replace a sheet with an explicit id
    pub fn insert_sheet(&mut self, id: SheetId, name: &str, rows: Vec<Vec<CellValue>>, frozen_rows: u32) {
        self.sheets.retain(|s| s.name != name);
        self.sheets
            .push(MemorySheet::new(id, name.to_string(), rows, frozen_rows));
        self.next_id = self.next_id.max(id + 1);
    }

    /// Get a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Populated cells of a sheet as a rectangular block
    pub fn sheet_rows(&self, name: &str) -> Option<Vec<Vec<CellValue>>> {
        self.sheet(name).map(MemorySheet::rows)
    }

    /// Number of times `commit` has been called
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    fn require(&self, name: &str) -> Result<&MemorySheet> {
        self.sheet(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn sheet_id(&self, sheet: &str) -> Option<SheetId> {
        self.sheet(sheet).map(|s| s.id)
    }

    fn extents(&self, sheet: &str) -> Result<Extents> {
        Ok(self.require(sheet)?.extents())
    }

    fn read_region(&self, sheet: &str, region: Region) -> Result<Vec<Vec<CellValue>>> {
        check_region(sheet, region)?;
        Ok(self.require(sheet)?.read(region))
    }

    fn write_region(&mut self, sheet: &str, row: u32, col: u32, values: &[Vec<CellValue>]) -> Result<()> {
        let (height, width) = block_dimensions(sheet, values)?;
        let region = Region::new(
            row,
            col,
            u32::try_from(height).unwrap_or(u32::MAX),
            u32::try_from(width).unwrap_or(u32::MAX),
        );
        check_region(sheet, region)?;
        self.require_mut(sheet)?.write(row, col, values);
        Ok(())
    }

    fn clear_region(&mut self, sheet: &str, region: Region) -> Result<()> {
        check_region(sheet, region)?;
        self.require_mut(sheet)?.clear(region);
        Ok(())
    }

    fn freeze_rows(&mut self, sheet: &str, count: u32) -> Result<()> {
        self.require_mut(sheet)?.frozen_rows = count;
        Ok(())
    }

    fn locate_or_create_sheet(&mut self, name: &str) -> Result<SheetId> {
        if let Some(sheet) = self.sheet(name) {
            return Ok(sheet.id);
        }
        let id = self.next_id;
        self.insert_sheet(id, name, Vec::new(), 0);
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}
