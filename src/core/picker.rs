//! Filename pickers over the registry
//!
//! A picker first waits for the registry to load, then lets the user pick one of the
//! listed names or, in new-or-existing mode, type a new one. The chosen name resolves
//! the [`PendingPick`] handed out when the picker was opened. Dropping an unresolved
//! picker resolves it to `None`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot::{self, error::TryRecvError};

use super::registry::{is_valid_filename, FilenameRegistry};
use super::web_storage::{PendingRead, StorageError};

/// Which dialog to present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMode {
    /// Only names already in the registry
    Existing,
    /// Registry names, or a newly typed name that gets registered
    NewOrExisting,
}

/// The eventual result of a pick
pub struct PendingPick {
    rx: Option<oneshot::Receiver<String>>,
}

impl PendingPick {
    /// Take the outcome once available: `Some(Some(name))` when picked, `Some(None)` when
    /// the dialog went away without a choice, `None` while still open.
    pub fn try_take(&mut self) -> Option<Option<String>> {
        let rx = self.rx.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(name) => Some(name),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => None,
        };
        self.rx = None;
        Some(outcome)
    }
}

impl Future for PendingPick {
    type Output = Option<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.rx = None;
                Poll::Ready(result.ok())
            }
        }
    }
}

enum Files {
    Loading(PendingRead<Result<Vec<String>, StorageError>>),
    Ready(Vec<String>),
    /// The registry could not be read
    Failed(String),
}

/// Modal filename picker state
pub struct FilePicker {
    mode: PickMode,
    files: Files,
    /// Text typed into the new-name field
    pub new_name: String,
    responder: Option<oneshot::Sender<String>>,
}

impl FilePicker {
    /// Pick one of the registered names
    pub fn pick_existing(registry: &FilenameRegistry) -> (Self, PendingPick) {
        Self::open(PickMode::Existing, registry)
    }

    /// Pick a registered name or type a new one
    pub fn pick_new_or_existing(registry: &FilenameRegistry) -> (Self, PendingPick) {
        Self::open(PickMode::NewOrExisting, registry)
    }

    fn open(mode: PickMode, registry: &FilenameRegistry) -> (Self, PendingPick) {
        let (tx, rx) = oneshot::channel();
        let picker = Self {
            mode,
            files: Files::Loading(registry.list_filenames()),
            new_name: String::new(),
            responder: Some(tx),
        };
        (picker, PendingPick { rx: Some(rx) })
    }

    /// Move a finished registry read into place; returns whether loading is over
    pub fn poll(&mut self) -> bool {
        if let Files::Loading(read) = &mut self.files {
            match read.try_take() {
                Some(Ok(files)) => {
                    tracing::debug!("Picker loaded {} registered names", files.len());
                    self.files = Files::Ready(files);
                }
                Some(Err(e)) => {
                    tracing::error!("Failed to load registered names: {}", e);
                    self.files = Files::Failed(e.to_string());
                }
                None => {}
            }
        }
        !matches!(self.files, Files::Loading(_))
    }

    /// Registered names, once loaded. Empty when the registry could not be read.
    pub fn files(&self) -> Option<&[String]> {
        match &self.files {
            Files::Ready(files) => Some(files),
            Files::Failed(_) => Some(&[]),
            Files::Loading(_) => None,
        }
    }

    /// Why the registered names could not be loaded
    pub fn load_error(&self) -> Option<&str> {
        match &self.files {
            Files::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether the pick has been resolved
    pub fn is_resolved(&self) -> bool {
        self.responder.is_none()
    }

    /// Dialog heading above the list of existing names
    pub fn existing_heading(&self) -> &'static str {
        match self.mode {
            PickMode::Existing => "Open existing file:",
            PickMode::NewOrExisting => "Replace old",
        }
    }

    /// Dialog heading above the new-name field, if the mode has one
    pub fn new_name_heading(&self) -> Option<&'static str> {
        match self.mode {
            PickMode::Existing => None,
            PickMode::NewOrExisting => Some("or type in new file name..."),
        }
    }

    /// Whether the typed name may be confirmed
    pub fn can_confirm_new(&self) -> bool {
        self.mode == PickMode::NewOrExisting && !self.is_resolved() && is_valid_filename(&self.new_name)
    }

    /// Resolve with a listed name. Names not in the list are ignored.
    pub fn choose_existing(&mut self, name: &str) -> bool {
        let listed = self
            .files()
            .is_some_and(|files| files.iter().any(|f| f == name));
        listed && self.resolve(name.to_string())
    }

    /// Register the typed name and resolve with it.
    ///
    /// Returns `Ok(false)` when the name is not acceptable. A failed registration leaves
    /// the picker open.
    pub fn confirm_new(&mut self, registry: &FilenameRegistry) -> Result<bool, StorageError> {
        if !self.can_confirm_new() {
            return Ok(false);
        }
        let name = self.new_name.clone();
        registry.register_filename(&name)?;
        if let Files::Ready(files) = &mut self.files {
            files.push(name.clone());
        }
        Ok(self.resolve(name))
    }

    fn resolve(&mut self, name: String) -> bool {
        match self.responder.take() {
            Some(tx) => {
                tracing::info!("Picked storage file '{}'", name);
                let _ = tx.send(name);
                true
            }
            None => false,
        }
    }
}
