//! Key/value storage backends.
//!
//! The mock store keeps everything as JSON strings under string keys, the
//! same model as browser localStorage. Native builds can use a directory
//! of JSON files instead.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::StoreError;

/// Synchronous string key/value storage.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend.
///
/// Can be switched offline to make every call fail with
/// [`StoreError::Unavailable`], which is how storage outages are simulated.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<String, String>>,
    offline: Cell<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        log::debug!("Memory backend: offline = {}", offline);
        self.offline.set(offline);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.get() {
            Err(StoreError::unavailable("storage is offline"))
        } else {
            Ok(())
        }
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use self::file::FileBackend;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::KeyValueBackend;
    use crate::error::StoreError;

    /// One `<key>.json` file per key inside a directory.
    #[derive(Debug, Clone)]
    pub struct FileBackend {
        root: PathBuf,
    }

    impl FileBackend {
        /// Open a backend rooted at `root`, creating the directory if needed.
        pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
            let root = root.into();
            std::fs::create_dir_all(&root)?;
            log::debug!("File backend opened at {:?}", root);
            Ok(Self { root })
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        /// Bytes outside `[A-Za-z0-9_-]` are percent-encoded, so distinct
        /// keys never share a file.
        fn path_for(&self, key: &str) -> PathBuf {
            let mut name = String::with_capacity(key.len());
            for byte in key.bytes() {
                if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                    name.push(char::from(byte));
                } else {
                    name.push_str(&format!("%{:02X}", byte));
                }
            }
            self.root.join(format!("{}.json", name))
        }
    }

    impl KeyValueBackend for FileBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            match std::fs::read_to_string(self.path_for(key)) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            let path = self.path_for(key);
            // Readers only ever see complete files.
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, value)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            match std::fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use self::web::LocalStorageBackend;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::KeyValueBackend;
    use crate::error::StoreError;

    /// Browser localStorage.
    pub struct LocalStorageBackend {
        storage: web_sys::Storage,
    }

    impl LocalStorageBackend {
        pub fn open() -> Result<Self, StoreError> {
            let window = web_sys::window()
                .ok_or_else(|| StoreError::unavailable("No window object available"))?;
            let storage = window
                .local_storage()
                .map_err(|e| StoreError::unavailable(format!("localStorage access error: {:?}", e)))?
                .ok_or_else(|| StoreError::unavailable("localStorage not available"))?;
            Ok(Self { storage })
        }
    }

    impl KeyValueBackend for LocalStorageBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.storage
                .get_item(key)
                .map_err(|e| StoreError::unavailable(format!("localStorage read failed: {:?}", e)))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| StoreError::unavailable(format!("localStorage write failed: {:?}", e)))
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.storage
                .remove_item(key)
                .map_err(|e| StoreError::unavailable(format!("localStorage remove failed: {:?}", e)))
        }
    }
}
