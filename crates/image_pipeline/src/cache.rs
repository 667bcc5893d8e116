use std::collections::HashMap;

use log::warn;

use crate::texture::TextureHandle;

#[derive(Debug)]
struct CacheEntry {
    handle: TextureHandle,
    refs: usize,
}

/// Reference-counted map from resolved source key to shared texture.
///
/// Every node displaying a source holds one reference; the entry lives
/// exactly as long as its longest-lived referent. When the count reaches
/// zero the entry is evicted and the handle is returned to the caller,
/// which owns freeing the underlying texture slot. Failed decodes never
/// get an entry.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, CacheEntry>,
}

impl TextureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a ready entry without taking a reference.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<TextureHandle> {
        self.entries.get(key).map(|entry| entry.handle)
    }

    /// Take one reference on a ready entry.
    #[must_use]
    pub fn acquire(&mut self, key: &str) -> Option<TextureHandle> {
        self.entries.get_mut(key).map(|entry| {
            entry.refs += 1;
            entry.handle
        })
    }

    /// Insert a freshly uploaded texture with its initial reference count
    /// (one per waiter resolved with the handle).
    pub fn insert(&mut self, key: &str, handle: TextureHandle, refs: usize) {
        let previous = self.entries.insert(
            key.to_owned(),
            CacheEntry { handle, refs },
        );
        debug_assert!(previous.is_none(), "cache entry inserted twice for {key}");
    }

    /// Drop one reference. Returns the handle when this was the last one
    /// and the entry has been evicted; the caller frees the texture slot.
    pub fn release(&mut self, key: &str) -> Option<TextureHandle> {
        let Some(entry) = self.entries.get_mut(key) else {
            warn!(target: "image_pipeline", "release for unknown cache key {key}");
            return None;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return None;
        }
        self.entries.remove(key).map(|entry| entry.handle)
    }

    #[must_use]
    pub fn ref_count(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.refs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
