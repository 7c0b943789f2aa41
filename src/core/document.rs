//! Spreadsheet documents backed by umya-spreadsheet

use std::any::Any;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use umya_spreadsheet::Spreadsheet;

/// Errors from constructing or writing a spreadsheet
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a readable spreadsheet: {0}")]
    Malformed(String),
    #[error("could not write spreadsheet: {0}")]
    Write(String),
    #[error("spreadsheet I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Cell contents of one sheet, keyed by A1 coordinate. Empty cells are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub name: String,
    pub cells: BTreeMap<String, String>,
}

/// The currently open spreadsheet
pub struct SpreadsheetDocument {
    book: Spreadsheet,
    active_sheet: usize,
    /// Whether cells were edited since the document was created or opened
    pub modified: bool,
}

impl std::fmt::Debug for SpreadsheetDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadsheetDocument")
            .field("sheets", &self.sheet_names())
            .field("active_sheet", &self.active_sheet)
            .field("modified", &self.modified)
            .finish()
    }
}

impl SpreadsheetDocument {
    /// Create a new workbook with a single empty sheet
    pub fn new_empty() -> Self {
        Self {
            book: umya_spreadsheet::new_file(),
            active_sheet: 0,
            modified: false,
        }
    }

    /// Read an `.xlsx` workbook from a byte stream.
    ///
    /// The parser panics on some broken workbook parts; such panics are reported as
    /// [`DocumentError::Malformed`] like any other parse failure.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, DocumentError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Err(DocumentError::Malformed("file is empty".to_string()));
        }

        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        }));
        let book = match parsed {
            Ok(Ok(book)) => book,
            Ok(Err(e)) => return Err(DocumentError::Malformed(e.to_string())),
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                tracing::error!("Spreadsheet parser panicked: {}", reason);
                return Err(DocumentError::Malformed(reason));
            }
        };
        if book.get_sheet_collection().is_empty() {
            return Err(DocumentError::Malformed("workbook has no sheets".to_string()));
        }

        Ok(Self {
            book,
            active_sheet: 0,
            modified: false,
        })
    }

    /// Write the workbook as `.xlsx` to `out`
    pub fn write_to(&self, mut out: impl Write) -> Result<(), DocumentError> {
        out.write_all(&self.to_bytes()?)?;
        out.flush()?;
        Ok(())
    }

    /// Serialize the workbook to `.xlsx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut buffer = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut buffer)
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    /// Names of all sheets in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect()
    }

    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Switch the sheet shown in the grid; out-of-range indices are ignored
    pub fn set_active_sheet(&mut self, index: usize) {
        if index < self.book.get_sheet_collection().len() {
            self.active_sheet = index;
        }
    }

    /// Displayed value of a cell on the active sheet (1-based column and row)
    pub fn cell_value(&self, col: u32, row: u32) -> String {
        let addr = to_a1(col, row);
        self.book
            .get_sheet_collection()
            .get(self.active_sheet)
            .and_then(|sheet| sheet.get_cell(addr.as_str()))
            .map(|cell| cell.get_value().to_string())
            .unwrap_or_default()
    }

    /// Set a cell on the active sheet (1-based column and row)
    pub fn set_cell_value(&mut self, col: u32, row: u32, value: &str) {
        let addr = to_a1(col, row);
        if let Some(sheet) = self.book.get_sheet_collection_mut().get_mut(self.active_sheet) {
            sheet.get_cell_mut(addr.as_str()).set_value(value);
            self.modified = true;
        }
    }

    /// Highest used (column, row) on the active sheet; `(0, 0)` for an empty sheet
    pub fn used_extent(&self) -> (u32, u32) {
        self.book
            .get_sheet_collection()
            .get(self.active_sheet)
            .map(|sheet| (sheet.get_highest_column(), sheet.get_highest_row()))
            .unwrap_or((0, 0))
    }

    /// Non-empty cell contents of every sheet
    pub fn snapshot(&self) -> Vec<SheetSnapshot> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| SheetSnapshot {
                name: sheet.get_name().to_string(),
                cells: sheet
                    .get_cell_collection()
                    .into_iter()
                    .map(|cell| {
                        (
                            cell.get_coordinate().get_coordinate(),
                            cell.get_value().to_string(),
                        )
                    })
                    .filter(|(_, value)| !value.is_empty())
                    .collect(),
            })
            .collect()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "workbook content could not be parsed".to_string()
    }
}

/// Spreadsheet column letters for a 1-based column number (1 -> A, 27 -> AA)
pub fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1-style address for a 1-based column and row
pub fn to_a1(col: u32, row: u32) -> String {
    format!("{}{}", column_name(col), row)
}
