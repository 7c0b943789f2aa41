//! String-keyed persistent key/value store ("web storage")
//!
//! Reads are asynchronous: `get_item` returns a [`PendingRead`] right away and the value
//! (or the read failure) arrives later. Writes are synchronous. `update_item` is a read-modify-write that runs
//! under the store's own lock so that callers inside one process cannot lose updates.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Errors from the key/value store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not access storage item '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("storage is unavailable")]
    Unavailable,
}

/// Outcome of reading one item; an absent key is `Ok(None)`
pub type ItemRead = Result<Option<String>, StorageError>;

type Finish<T> = Box<dyn FnOnce(ItemRead) -> T + Send>;

struct Inflight<T> {
    rx: oneshot::Receiver<ItemRead>,
    finish: Finish<T>,
}

/// A single-result asynchronous storage read.
///
/// Resolves exactly once. If the store goes away before answering, the read resolves to
/// [`StorageError::Unavailable`].
pub struct PendingRead<T> {
    inflight: Option<Inflight<T>>,
}

impl PendingRead<ItemRead> {
    /// Wrap the receiving half of a store read
    pub fn new(rx: oneshot::Receiver<ItemRead>) -> Self {
        Self {
            inflight: Some(Inflight {
                rx,
                finish: Box::new(|raw| raw),
            }),
        }
    }

    /// A read whose value is already known but is still delivered through the channel
    pub fn ready(value: ItemRead) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(value);
        Self::new(rx)
    }
}

impl<T: 'static> PendingRead<T> {
    /// Transform the eventual value
    pub fn map<U, F>(self, f: F) -> PendingRead<U>
    where
        U: 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        PendingRead {
            inflight: self.inflight.map(|Inflight { rx, finish }| Inflight {
                rx,
                finish: Box::new(move |raw| f(finish(raw))) as Finish<U>,
            }),
        }
    }
}

impl<T> PendingRead<T> {
    /// Take the value if it has arrived. Returns `None` while the read is in flight or
    /// after the value was already taken.
    pub fn try_take(&mut self) -> Option<T> {
        let inflight = self.inflight.as_mut()?;
        let raw = match inflight.rx.try_recv() {
            Ok(raw) => raw,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(StorageError::Unavailable),
        };
        let inflight = self.inflight.take()?;
        Some((inflight.finish)(raw))
    }

    /// Whether the value has been taken already
    #[allow(dead_code)]
    pub fn is_done(&self) -> bool {
        self.inflight.is_none()
    }
}

impl<T> Future for PendingRead<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;
        let Some(inflight) = this.inflight.as_mut() else {
            return Poll::Pending;
        };
        let raw = match Pin::new(&mut inflight.rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result.unwrap_or(Err(StorageError::Unavailable)),
        };
        match this.inflight.take() {
            Some(inflight) => Poll::Ready((inflight.finish)(raw)),
            None => Poll::Pending,
        }
    }
}

/// A string-to-string persistent store
pub trait WebStorage: Send + Sync {
    /// Read `key`; an absent key resolves to `Ok(None)`
    fn get_item(&self, key: &str) -> PendingRead<ItemRead>;

    /// Write `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Atomically replace the value of `key` with `update(current)` and return the new value
    fn update_item(
        &self,
        key: &str,
        update: &mut dyn FnMut(Option<String>) -> String,
    ) -> Result<String, StorageError>;
}

/// In-process store, used by tests and when no storage directory is available
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WebStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> PendingRead<ItemRead> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        PendingRead::ready(Ok(items.get(key).cloned()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn update_item(
        &self,
        key: &str,
        update: &mut dyn FnMut(Option<String>) -> String,
    ) -> Result<String, StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let value = update(items.get(key).cloned());
        items.insert(key.to_string(), value.clone());
        Ok(value)
    }
}

/// Store that keeps one file per key inside a directory.
///
/// Reads run on the tokio blocking pool of the given runtime handle.
pub struct DirectoryStorage {
    root: PathBuf,
    runtime: Handle,
    write_lock: Mutex<()>,
}

impl DirectoryStorage {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new(root: PathBuf, runtime: Handle) -> Self {
        Self {
            root,
            runtime,
            write_lock: Mutex::new(()),
        }
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.item", escape_key(key)))
    }

    fn write_locked(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.item_path(key);
        let tmp = path.with_extension("item.tmp");
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

impl WebStorage for DirectoryStorage {
    fn get_item(&self, key: &str) -> PendingRead<ItemRead> {
        let (tx, rx) = oneshot::channel();
        let path = self.item_path(key);
        let key = key.to_string();
        self.runtime.spawn_blocking(move || {
            let value = match read_item(&path) {
                Ok(value) => {
                    tracing::debug!("Read storage item '{}' (present: {})", key, value.is_some());
                    Ok(value)
                }
                Err(source) => {
                    tracing::error!("Failed to read storage item '{}': {}", key, source);
                    Err(StorageError::Io { key, source })
                }
            };
            let _ = tx.send(value);
        });
        PendingRead::new(rx)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_locked(key, value)
    }

    fn update_item(
        &self,
        key: &str,
        update: &mut dyn FnMut(Option<String>) -> String,
    ) -> Result<String, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = read_item(&self.item_path(key)).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        let value = update(current);
        self.write_locked(key, &value)?;
        Ok(value)
    }
}

fn read_item(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Map an arbitrary key onto a portable file name.
///
/// Only lowercase letters, digits, `-` and `_` pass through; everything else, uppercase
/// letters included, becomes `%XX`. Keys that differ only in case therefore stay distinct
/// on case-insensitive file systems.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    #[test]
    fn test_memory_storage_get_set() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("missing").try_take().unwrap().unwrap(), None);

        storage.set_item("k", "v").unwrap();
        assert_eq!(
            storage.get_item("k").try_take().unwrap().unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn test_pending_read_takes_once() {
        let mut read = PendingRead::ready(Ok(Some("x".to_string())))
            .map(|v| v.map(|s| s.map(|s| s.len())));
        assert!(!read.is_done());
        assert_eq!(read.try_take().unwrap().unwrap(), Some(1));
        assert!(read.is_done());
        assert!(read.try_take().is_none());
    }

    #[test]
    fn test_pending_read_waits_for_sender() {
        let (tx, rx) = oneshot::channel();
        let mut read = PendingRead::new(rx);
        assert!(read.try_take().is_none());
        tx.send(Ok(Some("later".to_string()))).unwrap();
        assert_eq!(read.try_take().unwrap().unwrap(), Some("later".to_string()));
    }

    #[test]
    fn test_pending_read_dropped_sender_is_unavailable() {
        let (tx, rx) = oneshot::channel::<ItemRead>();
        drop(tx);
        let mut read = PendingRead::new(rx);
        assert!(matches!(read.try_take(), Some(Err(StorageError::Unavailable))));

        let (tx, rx) = oneshot::channel::<ItemRead>();
        drop(tx);
        let rt = runtime();
        assert!(matches!(
            rt.block_on(PendingRead::new(rx)),
            Err(StorageError::Unavailable)
        ));
    }

    #[test]
    fn test_memory_update_item_sees_current_value() {
        let storage = MemoryStorage::new();
        storage.set_item("n", "1").unwrap();
        let value = storage
            .update_item("n", &mut |cur: Option<String>| format!("{}+1", cur.unwrap_or_default()))
            .unwrap();
        assert_eq!(value, "1+1");
    }

    #[test]
    fn test_directory_storage_round_trip() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().join("store"), rt.handle().clone());

        assert_eq!(rt.block_on(storage.get_item("files")).unwrap(), None);

        storage.set_item("files", "a;b").unwrap();
        assert_eq!(
            rt.block_on(storage.get_item("files")).unwrap(),
            Some("a;b".to_string())
        );

        let updated = storage
            .update_item("files", &mut |cur: Option<String>| format!("{};c", cur.unwrap_or_default()))
            .unwrap();
        assert_eq!(updated, "a;b;c");
        assert_eq!(
            rt.block_on(storage.get_item("files")).unwrap(),
            Some("a;b;c".to_string())
        );
    }

    #[test]
    fn test_directory_storage_escapes_keys() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().to_path_buf(), rt.handle().clone());

        storage.set_item("../evil name", "x").unwrap();
        assert!(dir.path().join("%2E%2E%2Fevil%20name.item").exists());
        assert_eq!(
            rt.block_on(storage.get_item("../evil name")).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_keys_differing_in_case_are_distinct_files() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().to_path_buf(), rt.handle().clone());

        storage.set_item("Demo", "upper").unwrap();
        storage.set_item("demo", "lower").unwrap();

        let upper = escape_key("Demo");
        let lower = escape_key("demo");
        assert_eq!(upper, "%44emo");
        assert!(!upper.eq_ignore_ascii_case(&lower));
        assert!(!escape_key("A").eq_ignore_ascii_case(&escape_key("a")));

        assert_eq!(
            rt.block_on(storage.get_item("Demo")).unwrap(),
            Some("upper".to_string())
        );
        assert_eq!(
            rt.block_on(storage.get_item("demo")).unwrap(),
            Some("lower".to_string())
        );
    }

    #[test]
    fn test_unreadable_item_is_an_error() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().to_path_buf(), rt.handle().clone());

        fs::write(dir.path().join("broken.item"), [0xff, 0xfe, 0x00]).unwrap();

        let result = rt.block_on(storage.get_item("broken"));
        assert!(matches!(result, Err(StorageError::Io { ref key, .. }) if key == "broken"));
        assert!(storage
            .update_item("broken", &mut |_: Option<String>| String::new())
            .is_err());
    }
}
