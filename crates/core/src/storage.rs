//! Key-value storage backends for pane contents.

use crate::error::StorageError;
use std::cell::Cell;
use std::collections::HashMap;

/// A persistent string-to-string store, such as browser `localStorage` or a JSON file.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// A store that lives only as long as the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Wraps a persistent store and degrades to memory when it fails.
///
/// Every successful write is mirrored into memory. After the first failed read or
/// write the primary store is no longer used for the rest of the session and all
/// operations go to memory, so values written earlier in the session survive.
#[derive(Debug)]
pub struct FallbackStore<S> {
    primary: Option<S>,
    degraded: Cell<bool>,
    memory: MemoryStore,
}

impl<S: KeyValueStore> FallbackStore<S> {
    pub fn new(primary: S) -> Self {
        FallbackStore {
            primary: Some(primary),
            degraded: Cell::new(false),
            memory: MemoryStore::new(),
        }
    }

    /// A store with no persistent backend, e.g. when none could be opened.
    pub fn memory_only() -> Self {
        FallbackStore {
            primary: None,
            degraded: Cell::new(true),
            memory: MemoryStore::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    pub fn primary(&self) -> Option<&S> {
        self.primary.as_ref()
    }

    fn active_primary(&self) -> Option<&S> {
        self.primary.as_ref().filter(|_| !self.degraded.get())
    }

    fn degrade(&self, error: &StorageError) {
        if !self.degraded.replace(true) {
            log::warn!("Persistent storage failed ({}); keeping edits in memory for this session.", error);
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for FallbackStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if let Some(value) = self.memory.get(key)? {
            return Ok(Some(value));
        }
        let Some(primary) = self.active_primary() else {
            return Ok(None);
        };
        match primary.get(key) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.degrade(&e);
                Ok(None)
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.degraded.get() {
            if let Some(Err(e)) = self.primary.as_mut().map(|p| p.set(key, value)) {
                self.degrade(&e);
            }
        }
        self.memory.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.degraded.get() {
            if let Some(Err(e)) = self.primary.as_mut().map(|p| p.remove(key)) {
                self.degrade(&e);
            }
        }
        self.memory.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails every operation after `healthy_writes` successful writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        healthy_writes: usize,
        writes: usize,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.writes >= self.healthy_writes {
                return Err(StorageError::Unavailable("quota".into()));
            }
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.writes >= self.healthy_writes {
                return Err(StorageError::Unavailable("quota".into()));
            }
            self.writes += 1;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.set("xsltui.xml", "<a/>").unwrap();
        assert_eq!(store.get("xsltui.xml").unwrap().as_deref(), Some("<a/>"));
        store.remove("xsltui.xml").unwrap();
        assert_eq!(store.get("xsltui.xml").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_fallback_switches_to_memory_after_failure() {
        let mut store = FallbackStore::new(FlakyStore {
            healthy_writes: 1,
            ..Default::default()
        });
        store.set("k1", "first").unwrap();
        assert!(!store.is_degraded());

        store.set("k2", "second").unwrap();
        assert!(store.is_degraded());

        assert_eq!(store.get("k1").unwrap().as_deref(), Some("first"));
        assert_eq!(store.get("k2").unwrap().as_deref(), Some("second"));
        store.set("k1", "third").unwrap();
        assert_eq!(store.get("k1").unwrap().as_deref(), Some("third"));
    }

    #[test]
    fn test_failed_read_degrades() {
        let store = FallbackStore::new(FlakyStore::default());
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_degraded());
    }

    #[test]
    fn test_fallback_reads_through_to_primary() {
        let mut primary = MemoryStore::new();
        primary.set("saved", "from disk").unwrap();
        let store = FallbackStore::new(primary);
        assert_eq!(store.get("saved").unwrap().as_deref(), Some("from disk"));
        assert_eq!(store.get("missing").unwrap(), None);
    }
}
