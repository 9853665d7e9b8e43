//! Saving and loading pane contents under `<prefix><pane>` keys.

use crate::defaults;
use crate::error::StorageError;
use crate::storage::KeyValueStore;
use crate::types::EditorId;

#[derive(Debug)]
pub struct Persistence<S> {
    prefix: String,
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(prefix: impl Into<String>, store: S) -> Self {
        Persistence {
            prefix: prefix.into(),
            store,
        }
    }

    pub fn key(&self, editor: EditorId) -> String {
        format!("{}{}", self.prefix, editor.as_str())
    }

    /// Writes the pane text, overwriting any previous value.
    pub fn save(&mut self, editor: EditorId, text: &str) -> Result<(), StorageError> {
        let key = self.key(editor);
        log::debug!("Saving {} bytes under '{}'", text.len(), key);
        self.store.set(&key, text)
    }

    /// The stored text, if any.
    pub fn stored(&self, editor: EditorId) -> Result<Option<String>, StorageError> {
        self.store.get(&self.key(editor))
    }

    /// The stored text, or the de-indented `template` when nothing is stored.
    pub fn load(&self, editor: EditorId, template: &str) -> Result<String, StorageError> {
        Ok(match self.stored(editor)? {
            Some(text) => text,
            None => defaults::normalize_template(template),
        })
    }

    /// The stored text, or the built-in default for the pane.
    pub fn load_or_default(&self, editor: EditorId) -> Result<String, StorageError> {
        self.load(editor, defaults::template_for(editor))
    }

    pub fn remove(&mut self, editor: EditorId) -> Result<(), StorageError> {
        self.store.remove(&self.key(editor))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
