//! Persisted client state.
//!
//! Everything the console keeps across reloads goes through the
//! [`KeyValueStore`] trait: `localStorage` in the browser, a `HashMap` in
//! unit tests.  Values are JSON strings except the raw session token.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::{TOKEN_KEY, USER_KEY};
use crate::error::StorageError;
use crate::models::UserProfile;

/// Durable string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

pub type SharedStore = Rc<dyn KeyValueStore>;

/// In-memory backend used by tests and as a fallback when the browser
/// refuses access to `localStorage` (private mode, sandboxed iframes).
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// `window.localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    /// `true` when the browser actually grants access.
    pub fn available() -> bool {
        Self::storage().is_some()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = Self::storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|_| StorageError::Write(key.to_string()))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// The storage backend for the current platform.
pub fn default_store() -> SharedStore {
    #[cfg(target_arch = "wasm32")]
    {
        if LocalStorage::available() {
            return Rc::new(LocalStorage);
        }
        log::warn!("localStorage unavailable, falling back to in-memory storage");
    }
    Rc::new(MemoryStore::new())
}

/// Read and decode a JSON value.  `Ok(None)` when the key is absent.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// The persisted session (`token` + `user`).  Any component may read it;
/// only the auth flows and the 401 interceptor clear it.
#[derive(Clone)]
pub struct SessionStorage {
    store: SharedStore,
}

impl SessionStorage {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    pub fn user(&self) -> Result<Option<UserProfile>, StorageError> {
        load_json(self.store.as_ref(), USER_KEY)
    }

    pub fn save(&self, token: &str, user: &UserProfile) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)?;
        self.save_user(user)
    }

    pub fn save_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), USER_KEY, user)
    }

    pub fn clear(&self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(USER_KEY);
    }
}
