//! In-memory collaborator implementations.
//!
//! Reference backends for tests and demos. `MemoryObjectStore` signs URLs
//! with a per-store generation counter so repeated reconciliations observe
//! fresh URLs over an identical key set, mirroring real signed-URL churn.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use photo_model::OwnerSession;

use crate::{MetadataTable, ObjectEntry, ObjectStore, SessionProvider, StoreError};

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Option<i64>>>,
    url_generation: AtomicU64,
    failing_sign_keys: Mutex<Vec<String>>,
    fail_removals: AtomicBool,
    fail_lists: AtomicBool,
}

impl MemoryObjectStore {
    pub fn put(&self, key: &str, last_modified_ms: Option<i64>) {
        self.objects.lock().unwrap().insert(key.to_string(), last_modified_ms);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Make `signed_url` fail for one key, leaving the rest intact.
    pub fn fail_signing_for(&self, key: &str) {
        self.failing_sign_keys.lock().unwrap().push(key.to_string());
    }

    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::Relaxed);
    }

    pub fn fail_lists(&self) {
        self.fail_lists.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        if self.fail_lists.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("listing unavailable".into()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, last_modified_ms)| ObjectEntry {
                key: key.clone(),
                last_modified_ms: *last_modified_ms,
            })
            .collect())
    }

    async fn signed_url(&self, key: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        if self.failing_sign_keys.lock().unwrap().iter().any(|k| k == key) {
            return Err(StoreError::Backend(format!("signing unavailable for `{key}`")));
        }
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let generation = self.url_generation.fetch_add(1, Ordering::Relaxed);
        Ok(format!("memory://{key}?expires={expires_in_secs}&gen={generation}"))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_removals.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("removal unavailable".into()));
        }
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

#[derive(Default)]
pub struct MemoryMetadataTable {
    items: Mutex<Vec<serde_json::Value>>,
    fail_scans: AtomicBool,
}

impl MemoryMetadataTable {
    pub fn insert(&self, item: serde_json::Value) {
        self.items.lock().unwrap().push(item);
    }

    pub fn fail_scans(&self) {
        self.fail_scans.store(true, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item_key(item: &serde_json::Value) -> Option<String> {
        match item.get("imageKey") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(obj) => obj.get("S").and_then(|s| s.as_str()).map(str::to_string),
            None => None,
        }
    }
}

#[async_trait]
impl MetadataTable for MemoryMetadataTable {
    async fn scan(&self) -> Result<Vec<serde_json::Value>, StoreError> {
        if self.fail_scans.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("scan unavailable".into()));
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn delete_by_key(&self, image_key: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| Self::item_key(item).as_deref() != Some(image_key));
        if items.len() == before {
            return Err(StoreError::NotFound(image_key.to_string()));
        }
        Ok(())
    }
}

/// Session provider returning a fixed identity, or none at all.
#[derive(Default)]
pub struct StaticSessionProvider {
    session: Option<OwnerSession>,
    fail_lookups: AtomicBool,
}

impl StaticSessionProvider {
    pub fn signed_in(owner_id: &str) -> Self {
        Self { session: Some(OwnerSession::new(owner_id)), fail_lookups: AtomicBool::new(false) }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Make `current_session` return an error rather than an identity.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Result<Option<OwnerSession>, StoreError> {
        if self.fail_lookups.load(Ordering::Relaxed) {
            return Err(StoreError::Backend("session service unavailable".into()));
        }
        Ok(self.session.clone())
    }
}
