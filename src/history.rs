use crate::storage::{KeyValueStore, StorageError};
use crate::types::GeneratedImage;

pub const STORAGE_KEY: &str = "khayal_history";
pub const MEMORY_LIMIT: usize = 10;
pub const PERSIST_LIMIT: usize = 6;
pub const GALLERY_LIMIT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub memory: usize,
    pub persist: usize,
    pub gallery: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            memory: MEMORY_LIMIT,
            persist: PERSIST_LIMIT,
            gallery: GALLERY_LIMIT,
        }
    }
}

impl Limits {
    /// The persisted entries must stay a prefix of the in-memory ones.
    pub fn normalized(self) -> Self {
        let memory = self.memory.max(1);
        Limits {
            memory,
            persist: self.persist.min(memory),
            gallery: self.gallery.min(memory),
        }
    }
}

/// Newest-first generation history, mirrored into a key-value store.
pub struct History<S: KeyValueStore> {
    entries: Vec<GeneratedImage>,
    store: S,
    limits: Limits,
}

impl<S: KeyValueStore> History<S> {
    pub fn new(store: S, limits: Limits) -> Self {
        History {
            entries: Vec::new(),
            store,
            limits: limits.normalized(),
        }
    }

    /// Opens the store and reads whatever was persisted last session.
    pub fn open(store: S, limits: Limits) -> Self {
        let mut history = History::new(store, limits);
        history.entries = history.load();
        history
    }

    pub fn load(&mut self) -> Vec<GeneratedImage> {
        let raw = match self.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read history");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<GeneratedImage>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(self.limits.memory);
                tracing::debug!(count = entries.len(), "loaded history");
                entries
            }
            Err(e) => {
                tracing::error!(error = %e, "persisted history is corrupted, discarding it");
                if let Err(e) = self.store.remove(STORAGE_KEY) {
                    tracing::warn!(error = %e, "failed to remove corrupted history");
                }
                Vec::new()
            }
        }
    }

    /// Writes the leading entries. A failure leaves memory untouched.
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let end = self.entries.len().min(self.limits.persist);
        let json = serde_json::to_string(&self.entries[..end])?;
        self.store.set(STORAGE_KEY, &json)
    }

    /// On failure the stale value is dropped so storage never disagrees with memory.
    fn persist_or_warn(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "could not save history locally");
            if let Err(e) = self.store.remove(STORAGE_KEY) {
                tracing::warn!(error = %e, "failed to remove stale history");
            }
        }
    }

    pub fn append(&mut self, image: GeneratedImage) {
        self.entries.insert(0, image);
        self.entries.truncate(self.limits.memory);
        self.persist_or_warn();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to remove persisted history");
        }
    }

    pub fn entries(&self) -> &[GeneratedImage] {
        &self.entries
    }

    pub fn gallery(&self) -> &[GeneratedImage] {
        let end = self.entries.len().min(self.limits.gallery);
        &self.entries[..end]
    }

    pub fn find(&self, id: &str) -> Option<&GeneratedImage> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}
