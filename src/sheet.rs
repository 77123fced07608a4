//! Positional access to downloaded spreadsheets.
//!
//! The CDTFA workbooks have no usable header row, so their columns are mapped by
//! position. Everything that knows about spreadsheet coordinates goes through
//! [`Grid`]; callers turn a row into a typed record and never touch calamine
//! directly.

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("failed to read workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),
}

/// The first worksheet of a workbook.
///
/// Rows are 1-based as displayed by spreadsheet applications, columns are
/// 0-based (`A` = 0).
#[derive(Debug, Clone)]
pub struct Grid {
    range: Range<Data>,
}

static EMPTY: Data = Data::Empty;

impl Grid {
    pub fn open(path: &Path) -> Result<Grid, SheetError> {
        let open_err = |source| SheetError::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut workbook = open_workbook_auto(path).map_err(open_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SheetError::NoWorksheet(path.to_path_buf()))?
            .map_err(open_err)?;
        log::debug!(
            "Read {} rows from {}",
            range.height(),
            path.display()
        );
        Ok(Grid { range })
    }

    pub fn cell(&self, row: u32, col: u32) -> &Data {
        if row == 0 {
            return &EMPTY;
        }
        self.range.get_value((row - 1, col)).unwrap_or(&EMPTY)
    }

    /// Non-blank string content of a cell
    pub fn text(&self, row: u32, col: u32) -> Option<&str> {
        match self.cell(row, col) {
            Data::String(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric content of a cell; numeric strings are accepted too
    pub fn number(&self, row: u32, col: u32) -> Option<Decimal> {
        match self.cell(row, col) {
            Data::Float(f) => Decimal::from_f64(*f),
            Data::Int(i) => Some(Decimal::from(*i)),
            Data::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Last used row, 0 for an empty sheet
    pub fn last_row(&self) -> u32 {
        self.range.end().map_or(0, |(row, _)| row + 1)
    }

    /// Row numbers from `first` through the last used row
    pub fn rows_from(&self, first: u32) -> impl Iterator<Item = u32> {
        first.max(1)..=self.last_row()
    }
}
