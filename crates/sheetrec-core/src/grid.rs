//! The workbook interface the rest of the crate reads and writes through
//!
//! A [`Workbook`] holds named sheets of scalar cells. Coordinates are
//! 1-indexed, matching what spreadsheet users see.

use crate::error::{Error, Result};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};

/// Stable numeric id of a sheet within a workbook
pub type SheetId = u32;

/// A rectangular block of cells, 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// First row
    pub row: u32,
    /// First column
    pub col: u32,
    /// Number of rows
    pub height: u32,
    /// Number of columns
    pub width: u32,
}

impl Region {
    /// Create a new region
    pub fn new(row: u32, col: u32, height: u32, width: u32) -> Self {
        Self {
            row,
            col,
            height,
            width,
        }
    }

    /// A single row starting at column 1
    pub fn row_span(row: u32, width: u32) -> Self {
        Self::new(row, 1, 1, width)
    }

    /// Whether the region covers no cells
    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

/// Last populated row and column of a sheet (0 when the sheet is empty)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extents {
    pub rows: u32,
    pub cols: u32,
}

/// A collection of named sheets backed by some grid store
///
/// Reads observe every write made through the same value. Backends that
/// buffer writes make them durable on [`Workbook::commit`].
pub trait Workbook {
    /// Names of all sheets, in sheet order
    fn sheet_names(&self) -> Vec<String>;

    /// Id of the named sheet
    fn sheet_id(&self, sheet: &str) -> Option<SheetId>;

    /// Last populated row and column
    fn extents(&self, sheet: &str) -> Result<Extents>;

    /// Read a block of cells; cells outside the populated area read as `Empty`
    fn read_region(&self, sheet: &str, region: Region) -> Result<Vec<Vec<CellValue>>>;

    /// Write a rectangular block with its top-left cell at (`row`, `col`)
    fn write_region(&mut self, sheet: &str, row: u32, col: u32, values: &[Vec<CellValue>]) -> Result<()>;

    /// Blank every cell in a region
    fn clear_region(&mut self, sheet: &str, region: Region) -> Result<()>;

    /// Freeze the first `count` rows
    fn freeze_rows(&mut self, sheet: &str, count: u32) -> Result<()>;

    /// Find a sheet by name, creating an empty one if it does not exist
    fn locate_or_create_sheet(&mut self, name: &str) -> Result<SheetId>;

    /// Flush pending writes
    fn commit(&mut self) -> Result<()>;

    /// Name of the sheet with the given id
    fn sheet_name_by_id(&self, id: SheetId) -> Option<String> {
        self.sheet_names()
            .into_iter()
            .find(|name| self.sheet_id(name) == Some(id))
    }
}

/// Look up a sheet name by an id given as text
///
/// Ids arrive as strings from config files and command lines; anything that
/// does not parse as a number is rejected rather than treated as "not found".
pub fn sheet_by_id<W: Workbook + ?Sized>(book: &W, raw_id: &str) -> Result<Option<String>> {
    let id: SheetId = raw_id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidSheetId(raw_id.to_string()))?;
    Ok(book.sheet_name_by_id(id))
}

/// Check that a block is rectangular and return its (height, width)
pub(crate) fn block_dimensions(sheet: &str, values: &[Vec<CellValue>]) -> Result<(usize, usize)> {
    let width = values.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = values.iter().position(|row| row.len() != width) {
        return Err(Error::InvalidRegion {
            sheet: sheet.to_string(),
            message: format!(
                "block is not rectangular: row {} has {} cells, expected {}",
                bad,
                values[bad].len(),
                width
            ),
        });
    }
    Ok((values.len(), width))
}

/// Largest row number a sheet can address
pub const MAX_ROWS: u32 = 1_048_576;

/// Largest column number a sheet can address
pub const MAX_COLS: u32 = 16_384;

/// Reject regions that are 0-based or reach past the sheet limits
pub(crate) fn check_region(sheet: &str, region: Region) -> Result<()> {
    let invalid = |message: String| Error::InvalidRegion {
        sheet: sheet.to_string(),
        message,
    };
    if region.row == 0 || region.col == 0 {
        return Err(invalid(format!(
            "rows and columns are 1-indexed, got ({}, {})",
            region.row, region.col
        )));
    }
    let last_row = u64::from(region.row) + u64::from(region.height.max(1)) - 1;
    let last_col = u64::from(region.col) + u64::from(region.width.max(1)) - 1;
    if last_row > u64::from(MAX_ROWS) || last_col > u64::from(MAX_COLS) {
        return Err(invalid(format!(
            "region ending at ({}, {}) is outside the {} x {} sheet limit",
            last_row, last_col, MAX_ROWS, MAX_COLS
        )));
    }
    Ok(())
}
