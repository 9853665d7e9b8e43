//! `window.localStorage` as a [`KeyValueStore`].

use crate::error::storage_error;
use xsltui_core::{FallbackStore, KeyValueStore, StorageError};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(storage_error)?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))?;
        Ok(LocalStorage { storage })
    }

    /// `localStorage` behind a memory fallback, or memory alone if it cannot be opened.
    pub fn with_fallback() -> FallbackStore<LocalStorage> {
        match Self::open() {
            Ok(store) => FallbackStore::new(store),
            Err(e) => {
                log::warn!("{}; edits will not survive a reload.", e);
                FallbackStore::memory_only()
            }
        }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(storage_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(storage_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(storage_error)
    }
}
