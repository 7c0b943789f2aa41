//! Application-level error type

use thiserror::Error;

use super::codec::CodecError;
use super::controller::ToolbarAction;
use super::document::DocumentError;
use super::web_storage::StorageError;

/// Every failure a user action can end in. Each one is shown as a notification.
#[derive(Debug, Error)]
pub enum ExellError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no document is open")]
    NoDocument,
    #[error("'{0}' is not available right now")]
    ActionDisabled(ToolbarAction),
}

pub type Result<T> = std::result::Result<T, ExellError>;
