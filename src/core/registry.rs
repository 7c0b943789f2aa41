//! Filename registry kept in web storage
//!
//! All names ever used for stored documents live under the reserved key `"files"` as a
//! single `;`-joined string. The list is an append log: duplicates are kept, and names
//! are not checked for the separator.

use std::sync::{Arc, OnceLock};

use regex_lite::Regex;

use super::web_storage::{PendingRead, StorageError, WebStorage};

/// Reserved storage key holding the registry
pub const REGISTRY_KEY: &str = "files";

/// Separator between names in the stored registry value
pub const SEPARATOR: &str = ";";

const FILENAME_PATTERN: &str = r"^[A-Za-z0-9]+$";

/// Registry of filenames used with the storage codec
#[derive(Clone)]
pub struct FilenameRegistry {
    storage: Arc<dyn WebStorage>,
}

impl FilenameRegistry {
    /// Create a registry on top of the given store
    pub fn new(storage: Arc<dyn WebStorage>) -> Self {
        Self { storage }
    }

    /// The underlying store
    pub fn storage(&self) -> &Arc<dyn WebStorage> {
        &self.storage
    }

    /// Read the registered names; an absent registry yields an empty list
    pub fn list_filenames(&self) -> PendingRead<Result<Vec<String>, StorageError>> {
        self.storage
            .get_item(REGISTRY_KEY)
            .map(|raw| raw.map(|raw| parse_registry(raw.as_deref())))
    }

    /// Append `name` and write the full list back in one storage update.
    ///
    /// Returns the list as written.
    pub fn register_filename(&self, name: &str) -> Result<Vec<String>, StorageError> {
        let mut written = Vec::new();
        self.storage.update_item(REGISTRY_KEY, &mut |current: Option<String>| {
            let mut files = parse_registry(current.as_deref());
            files.push(name.to_string());
            let joined = join_registry(&files);
            written = files;
            joined
        })?;
        tracing::info!("Registered storage file name '{}' ({} entries)", name, written.len());
        Ok(written)
    }
}

/// Split a stored registry value into names
pub fn parse_registry(raw: Option<&str>) -> Vec<String> {
    match raw {
        None | Some("") => Vec::new(),
        Some(raw) => raw.split(SEPARATOR).map(str::to_string).collect(),
    }
}

/// Join names into a registry value
pub fn join_registry(files: &[String]) -> String {
    files.join(SEPARATOR)
}

/// Whether `name` is acceptable as a newly typed filename (non-empty, ASCII letters and digits)
pub fn is_valid_filename(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(FILENAME_PATTERN).expect("filename pattern is a valid regex"))
        .is_match(name)
}
