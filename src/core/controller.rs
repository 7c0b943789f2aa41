//! Document lifecycle and toolbar state
//!
//! The controller owns the single document handle. After every transition it recomputes
//! which toolbar actions are enabled: New/Open while nothing is open, Save/Close while a
//! document is shown.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

use super::codec::StorageCodec;
use super::document::{DocumentError, SpreadsheetDocument};
use super::error::{ExellError, Result};
use super::web_storage::WebStorage;

/// The six toolbar actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolbarAction {
    New,
    OpenFromDisk,
    OpenFromStorage,
    SaveToDisk,
    SaveToStorage,
    Close,
}

impl ToolbarAction {
    /// All actions in toolbar order
    pub const ALL: [ToolbarAction; 6] = [
        ToolbarAction::New,
        ToolbarAction::OpenFromDisk,
        ToolbarAction::OpenFromStorage,
        ToolbarAction::SaveToDisk,
        ToolbarAction::SaveToStorage,
        ToolbarAction::Close,
    ];

    /// Button caption
    pub fn label(self) -> &'static str {
        match self {
            ToolbarAction::New => "New...",
            ToolbarAction::OpenFromDisk => "\u{2B06} Open",
            ToolbarAction::OpenFromStorage => "\u{2601} Open stored",
            ToolbarAction::SaveToDisk => "\u{2B07} Save",
            ToolbarAction::SaveToStorage => "\u{2601} Store",
            ToolbarAction::Close => "Close",
        }
    }

    /// Hover text
    pub fn tooltip(self) -> &'static str {
        match self {
            ToolbarAction::New => "Creates a new spreadsheet",
            ToolbarAction::OpenFromDisk => "Open .xlsx file...",
            ToolbarAction::OpenFromStorage => "Open previously saved file from local storage...",
            ToolbarAction::SaveToDisk => "Save the spreadsheet as an .xlsx file...",
            ToolbarAction::SaveToStorage => "Saves current file to local storage...",
            ToolbarAction::Close => "Close the spreadsheet",
        }
    }

    /// Whether the action needs an open document
    pub fn needs_document(self) -> bool {
        matches!(
            self,
            ToolbarAction::SaveToDisk | ToolbarAction::SaveToStorage | ToolbarAction::Close
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ToolbarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolbarAction::New => "New",
            ToolbarAction::OpenFromDisk => "Open from disk",
            ToolbarAction::OpenFromStorage => "Open from storage",
            ToolbarAction::SaveToDisk => "Save to disk",
            ToolbarAction::SaveToStorage => "Save to storage",
            ToolbarAction::Close => "Close",
        };
        f.write_str(name)
    }
}

/// Whether a document is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    NoDocument,
    DocumentOpen,
}

/// Enabled flags for the six toolbar actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarState {
    enabled: [bool; 6],
}

impl ToolbarState {
    /// The enabled set for a document state
    pub fn for_state(state: DocumentState) -> Self {
        let file_open = state == DocumentState::DocumentOpen;
        let mut enabled = [false; 6];
        for action in ToolbarAction::ALL {
            enabled[action.index()] = action.needs_document() == file_open;
        }
        Self { enabled }
    }

    pub fn is_enabled(&self, action: ToolbarAction) -> bool {
        self.enabled[action.index()]
    }

    /// Enabled actions in toolbar order
    #[allow(dead_code)]
    pub fn enabled_actions(&self) -> Vec<ToolbarAction> {
        ToolbarAction::ALL
            .into_iter()
            .filter(|action| self.is_enabled(*action))
            .collect()
    }
}

/// Result of opening from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredOpen {
    Opened,
    /// Nothing was stored under the chosen name
    NothingStored,
}

/// Owns the document handle and keeps the toolbar in step with it
#[derive(Debug)]
pub struct DocumentController {
    document: Option<SpreadsheetDocument>,
    toolbar: ToolbarState,
    codec: StorageCodec,
}

impl Default for DocumentController {
    fn default() -> Self {
        Self::new(StorageCodec::default())
    }
}

impl DocumentController {
    pub fn new(codec: StorageCodec) -> Self {
        Self {
            document: None,
            toolbar: ToolbarState::for_state(DocumentState::NoDocument),
            codec,
        }
    }

    pub fn state(&self) -> DocumentState {
        if self.document.is_some() {
            DocumentState::DocumentOpen
        } else {
            DocumentState::NoDocument
        }
    }

    pub fn is_document_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&SpreadsheetDocument> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut SpreadsheetDocument> {
        self.document.as_mut()
    }

    pub fn toolbar(&self) -> ToolbarState {
        self.toolbar
    }

    /// Fail unless `action` is currently enabled
    pub fn ensure_enabled(&self, action: ToolbarAction) -> Result<()> {
        if self.toolbar.is_enabled(action) {
            Ok(())
        } else {
            Err(ExellError::ActionDisabled(action))
        }
    }

    /// Create an empty spreadsheet
    pub fn new_document(&mut self) -> Result<()> {
        self.ensure_enabled(ToolbarAction::New)?;
        self.display(SpreadsheetDocument::new_empty());
        tracing::info!("Created new spreadsheet");
        Ok(())
    }

    /// Open a spreadsheet from an uploaded byte stream.
    ///
    /// On failure the current state is left untouched.
    pub fn open_reader(&mut self, content: impl Read) -> Result<()> {
        self.ensure_enabled(ToolbarAction::OpenFromDisk)?;
        let document = SpreadsheetDocument::from_reader(content)?;
        self.display(document);
        tracing::info!("Opened spreadsheet from upload");
        Ok(())
    }

    /// Open a spreadsheet from a stored payload read under some filename.
    ///
    /// An absent payload is not an error: nothing is opened.
    pub fn open_stored_payload(&mut self, payload: Option<&str>) -> Result<StoredOpen> {
        self.ensure_enabled(ToolbarAction::OpenFromStorage)?;
        let Some(payload) = payload else {
            return Ok(StoredOpen::NothingStored);
        };
        let raw = self.codec.decode(payload)?;
        let document = SpreadsheetDocument::from_reader(raw.as_slice())?;
        self.display(document);
        tracing::info!("Opened spreadsheet from storage");
        Ok(StoredOpen::Opened)
    }

    /// Close the open spreadsheet
    pub fn close(&mut self) -> Result<()> {
        self.ensure_enabled(ToolbarAction::Close)?;
        self.document = None;
        self.maintain_toolbar();
        tracing::info!("Closed spreadsheet");
        Ok(())
    }

    /// `.xlsx` bytes of the open spreadsheet
    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let document = self.document.as_ref().ok_or(ExellError::NoDocument)?;
        Ok(document.to_bytes()?)
    }

    /// Write the open spreadsheet to a file on disk
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.ensure_enabled(ToolbarAction::SaveToDisk)?;
        let document = self.document.as_ref().ok_or(ExellError::NoDocument)?;
        let file = File::create(path).map_err(DocumentError::from)?;
        document.write_to(BufWriter::new(file))?;
        tracing::info!("Saved spreadsheet to {}", path.display());
        Ok(())
    }

    /// Encode the open spreadsheet and store it under `filename`.
    ///
    /// Returns the length of the stored text.
    pub fn save_to_storage(&self, storage: &dyn WebStorage, filename: &str) -> Result<usize> {
        self.ensure_enabled(ToolbarAction::SaveToStorage)?;
        let bytes = self.save_bytes()?;
        let payload = self.codec.encode(&bytes)?;
        storage.set_item(filename, &payload)?;
        tracing::info!("Stored spreadsheet as '{}' ({} chars)", filename, payload.len());
        Ok(payload.len())
    }

    fn display(&mut self, document: SpreadsheetDocument) {
        self.document = Some(document);
        self.maintain_toolbar();
    }

    /// Re-derive the toolbar from the document handle
    fn maintain_toolbar(&mut self) {
        self.toolbar = ToolbarState::for_state(self.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::fixtures::malformed_workbooks;
    use crate::core::web_storage::MemoryStorage;

    const OPEN_GROUP: [ToolbarAction; 3] = [
        ToolbarAction::New,
        ToolbarAction::OpenFromDisk,
        ToolbarAction::OpenFromStorage,
    ];
    const SAVE_GROUP: [ToolbarAction; 3] = [
        ToolbarAction::SaveToDisk,
        ToolbarAction::SaveToStorage,
        ToolbarAction::Close,
    ];

    fn assert_toolbar_consistent(controller: &DocumentController) {
        let toolbar = controller.toolbar();
        let open_group = OPEN_GROUP.iter().all(|a| toolbar.is_enabled(*a));
        let save_group = SAVE_GROUP.iter().all(|a| toolbar.is_enabled(*a));
        let open_none = OPEN_GROUP.iter().all(|a| !toolbar.is_enabled(*a));
        let save_none = SAVE_GROUP.iter().all(|a| !toolbar.is_enabled(*a));

        assert!((open_group && save_none) ^ (save_group && open_none));
        assert_eq!(save_group, controller.is_document_open());
        assert_eq!(toolbar, ToolbarState::for_state(controller.state()));
    }

    fn xlsx_with(value: &str) -> Vec<u8> {
        let mut doc = SpreadsheetDocument::new_empty();
        doc.set_cell_value(1, 1, value);
        doc.to_bytes().unwrap()
    }

    #[test]
    fn test_initial_toolbar() {
        let controller = DocumentController::default();
        assert_eq!(controller.state(), DocumentState::NoDocument);
        assert_eq!(controller.toolbar().enabled_actions(), OPEN_GROUP.to_vec());
        assert_toolbar_consistent(&controller);
    }

    #[test]
    fn test_toolbar_tracks_transitions() {
        let mut controller = DocumentController::default();

        controller.new_document().unwrap();
        assert_eq!(controller.toolbar().enabled_actions(), SAVE_GROUP.to_vec());
        assert_toolbar_consistent(&controller);

        controller.close().unwrap();
        assert_toolbar_consistent(&controller);

        controller.open_reader(xlsx_with("x").as_slice()).unwrap();
        assert_toolbar_consistent(&controller);
        assert_eq!(controller.document().unwrap().cell_value(1, 1), "x");

        assert!(matches!(
            controller.new_document(),
            Err(ExellError::ActionDisabled(ToolbarAction::New))
        ));
        assert_toolbar_consistent(&controller);

        controller.close().unwrap();
        assert!(matches!(
            controller.close(),
            Err(ExellError::ActionDisabled(ToolbarAction::Close))
        ));
        assert_toolbar_consistent(&controller);
    }

    #[test]
    fn test_corrupted_upload_keeps_no_document_state() {
        let mut controller = DocumentController::default();
        let result = controller.open_reader(&b"PK\x03\x04 corrupted"[..]);

        assert!(matches!(result, Err(ExellError::Document(_))));
        assert_eq!(controller.state(), DocumentState::NoDocument);
        assert!(controller.toolbar().is_enabled(ToolbarAction::New));
        assert!(controller.toolbar().is_enabled(ToolbarAction::OpenFromDisk));
        assert!(!controller.toolbar().is_enabled(ToolbarAction::SaveToDisk));
        assert!(!controller.toolbar().is_enabled(ToolbarAction::Close));
        assert_toolbar_consistent(&controller);

        for (case, bytes) in malformed_workbooks() {
            let result = controller.open_reader(bytes.as_slice());
            assert!(matches!(result, Err(ExellError::Document(_))), "{case}");
            assert_eq!(controller.state(), DocumentState::NoDocument, "{case}");
            assert_toolbar_consistent(&controller);
        }
    }

    #[test]
    fn test_broken_stored_workbook_keeps_no_document_state() {
        let codec = StorageCodec::default();
        let mut controller = DocumentController::new(codec);

        for (case, bytes) in malformed_workbooks() {
            let payload = codec.encode(&bytes).unwrap();
            let result = controller.open_stored_payload(Some(&payload));
            assert!(matches!(result, Err(ExellError::Document(_))), "{case}");
            assert_eq!(controller.state(), DocumentState::NoDocument, "{case}");
            assert_toolbar_consistent(&controller);
        }
    }

    #[test]
    fn test_store_close_and_reopen_round_trip() {
        let storage = MemoryStorage::new();
        let mut controller = DocumentController::default();

        controller.new_document().unwrap();
        let saved = controller.document().unwrap().snapshot();
        let stored_len = controller.save_to_storage(&storage, "demo1").unwrap();
        assert!(stored_len > 0);
        controller.close().unwrap();

        let payload = storage.get_item("demo1").try_take().unwrap().unwrap();
        let outcome = controller.open_stored_payload(payload.as_deref()).unwrap();

        assert_eq!(outcome, StoredOpen::Opened);
        assert_eq!(controller.document().unwrap().snapshot(), saved);
        assert_toolbar_consistent(&controller);
    }

    #[test]
    fn test_stored_edits_round_trip() {
        let storage = MemoryStorage::new();
        let mut controller = DocumentController::default();

        controller.new_document().unwrap();
        controller.document_mut().unwrap().set_cell_value(2, 2, "kept");
        controller.save_to_storage(&storage, "edits").unwrap();
        controller.close().unwrap();

        let payload = storage.get_item("edits").try_take().unwrap().unwrap();
        controller.open_stored_payload(payload.as_deref()).unwrap();
        assert_eq!(controller.document().unwrap().cell_value(2, 2), "kept");
    }

    #[test]
    fn test_absent_payload_opens_nothing() {
        let mut controller = DocumentController::default();
        let outcome = controller.open_stored_payload(None).unwrap();
        assert_eq!(outcome, StoredOpen::NothingStored);
        assert_eq!(controller.state(), DocumentState::NoDocument);
        assert_toolbar_consistent(&controller);
    }

    #[test]
    fn test_undecodable_payload_is_a_codec_error() {
        let mut controller = DocumentController::default();

        let result = controller.open_stored_payload(Some("%%% not base64"));
        assert!(matches!(result, Err(ExellError::Codec(_))));

        let result = controller.open_stored_payload(Some("aGVsbG8="));
        assert!(matches!(result, Err(ExellError::Codec(_))));

        assert_eq!(controller.state(), DocumentState::NoDocument);
        assert_toolbar_consistent(&controller);
    }

    #[test]
    fn test_save_requires_document() {
        let controller = DocumentController::default();
        let storage = MemoryStorage::new();
        assert!(matches!(
            controller.save_to_storage(&storage, "x"),
            Err(ExellError::ActionDisabled(ToolbarAction::SaveToStorage))
        ));
        assert!(matches!(controller.save_bytes(), Err(ExellError::NoDocument)));
    }

    #[test]
    fn test_save_to_path_writes_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved-vaadin-e-xell-file.xlsx");
        let mut controller = DocumentController::default();
        controller.new_document().unwrap();
        controller.document_mut().unwrap().set_cell_value(1, 2, "on disk");
        controller.save_to_path(&path).unwrap();

        controller.close().unwrap();
        controller.open_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(controller.document().unwrap().cell_value(1, 2), "on disk");
    }
}
