//! Browser-backed key-value store
//!
//! Pending edits and cash counts go to `localStorage` so they survive a page
//! reload. When storage is unavailable (private mode, quota, no window) the
//! values are kept in memory for the life of the page.

use shared::{KeyValueStore, MemoryStore};
use web_sys::Storage;

use crate::web_warn;

pub struct BrowserStore {
    local: Option<Storage>,
    fallback: MemoryStore,
}

impl BrowserStore {
    /// Store over the window's `localStorage`, if the browser grants one
    pub fn local() -> Self {
        let local = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if local.is_none() {
            web_warn("localStorage unavailable; pending edits are kept in memory only");
        }
        Self {
            local,
            fallback: MemoryStore::new(),
        }
    }

    /// In-memory store, never touching browser APIs
    pub fn detached() -> Self {
        Self {
            local: None,
            fallback: MemoryStore::new(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.local.is_some()
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        match &self.local {
            Some(storage) => storage
                .get_item(key)
                .ok()
                .flatten()
                .or_else(|| self.fallback.get(key)),
            None => self.fallback.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.local {
            if storage.set_item(key, value).is_ok() {
                return;
            }
            web_warn(&format!("Could not write {key} to localStorage"));
        }
        self.fallback.set(key, value);
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = &self.local {
            if storage.remove_item(key).is_err() {
                web_warn(&format!("Could not remove {key} from localStorage"));
            }
        }
        self.fallback.remove(key);
    }
}
