pub mod filter;
pub mod keymap;
pub mod memory;
pub mod meta_index;
pub mod orchestrator;
pub mod reconcile;

use async_trait::async_trait;
use photo_model::OwnerSession;

/// One listed object, as reported by the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    /// Last-modified time in epoch milliseconds, when the store reports one.
    pub last_modified_ms: Option<i64>,
}

/// Thin abstraction over the object-storage collaborator.
///
/// Keys are owner-scoped by the conventional `user_data/<owner_id>/<name>`
/// prefix; callers pass fully formed prefixes and keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under the given key prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    /// Produce a time-limited signed access URL for one object.
    async fn signed_url(&self, key: &str, expires_in_secs: u64) -> Result<String, StoreError>;

    /// Remove one object by its exact key.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Abstraction over the metadata table. The table offers no server-side
/// owner filter, so `scan` returns every record and filtering happens in
/// the index builder.
#[async_trait]
pub trait MetadataTable: Send + Sync {
    /// Return all records as loose JSON items; tolerant decoding is the
    /// index builder's job, not the collaborator's.
    async fn scan(&self) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Delete the record stored under exactly `image_key`.
    async fn delete_by_key(&self, image_key: &str) -> Result<(), StoreError>;
}

/// Auth collaborator: resolves the current owner identity. Must be
/// consulted per privileged operation rather than cached.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<OwnerSession>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("not found: {0}")]
    NotFound(String),
}
