//! Orchestrates photo deletion across the two stores.

use tracing::{debug, warn};

use crate::keymap::KeyMatcher;
use crate::{MetadataTable, ObjectStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("storage removal failed for `{key}`: {source}")]
    Storage { key: String, source: StoreError },
}

/// Outcome of one orchestrated delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub storage_deleted: bool,
    /// The candidate key that removed the metadata record, when any did.
    pub metadata_deleted_key: Option<String>,
    pub metadata_attempts: usize,
}

/// Orchestrate deletion: remove the object from storage, then try the
/// metadata record under an ordered list of plausible key spellings.
///
/// Phase 1 is authoritative: a storage failure aborts the operation. A
/// not-found object counts as already deleted, so repeat deletes succeed.
/// Phase 2 is best-effort: first candidate that deletes wins, and total
/// failure never fails the overall operation.
pub async fn delete_photo_orchestrated(
    store: &dyn ObjectStore,
    table: &dyn MetadataTable,
    matcher: &dyn KeyMatcher,
    owner_id: &str,
    storage_key: &str,
) -> Result<DeleteReport, DeleteError> {
    match store.remove(storage_key).await {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => {
            debug!(key = %storage_key, "object already absent; treating delete as success");
        }
        Err(source) => {
            return Err(DeleteError::Storage { key: storage_key.to_string(), source });
        }
    }

    let mut report = DeleteReport { storage_deleted: true, ..DeleteReport::default() };

    for candidate in matcher.candidate_keys(storage_key, owner_id) {
        report.metadata_attempts += 1;
        match table.delete_by_key(&candidate).await {
            Ok(()) => {
                debug!(key = %candidate, "metadata record removed");
                report.metadata_deleted_key = Some(candidate);
                break;
            }
            Err(err) => {
                debug!(key = %candidate, %err, "metadata delete candidate missed");
            }
        }
    }
    if report.metadata_deleted_key.is_none() {
        warn!(key = %storage_key, "no metadata candidate key deleted; continuing anyway");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::SuffixKeyMatcher;
    use crate::memory::{MemoryMetadataTable, MemoryObjectStore};

    #[tokio::test]
    async fn storage_failure_aborts_and_surfaces() {
        let store = MemoryObjectStore::default();
        store.put("user_data/u1/x.png", Some(1));
        store.fail_removals();
        let table = MemoryMetadataTable::default();

        let err = delete_photo_orchestrated(
            &store,
            &table,
            &SuffixKeyMatcher,
            "u1",
            "user_data/u1/x.png",
        )
        .await
        .expect_err("storage failure must surface");
        assert!(matches!(err, DeleteError::Storage { .. }));
        assert!(store.contains("user_data/u1/x.png"));
    }

    #[tokio::test]
    async fn metadata_miss_on_every_candidate_still_succeeds() {
        let store = MemoryObjectStore::default();
        store.put("user_data/u1/x.png", Some(1));
        let table = MemoryMetadataTable::default();

        let report = delete_photo_orchestrated(
            &store,
            &table,
            &SuffixKeyMatcher,
            "u1",
            "user_data/u1/x.png",
        )
        .await
        .unwrap();
        assert!(report.storage_deleted);
        assert_eq!(report.metadata_attempts, 5);
        assert!(report.metadata_deleted_key.is_none());
        assert!(!store.contains("user_data/u1/x.png"));
    }

    #[tokio::test]
    async fn first_matching_candidate_wins() {
        let store = MemoryObjectStore::default();
        store.put("user_data/u1/x.png", Some(1));
        let table = MemoryMetadataTable::default();
        table.insert(serde_json::json!({
            "userId": "u1",
            "imageKey": "public/user_data/u1/x.png",
            "caption": "x",
        }));

        let report = delete_photo_orchestrated(
            &store,
            &table,
            &SuffixKeyMatcher,
            "u1",
            "user_data/u1/x.png",
        )
        .await
        .unwrap();
        assert_eq!(
            report.metadata_deleted_key.as_deref(),
            Some("public/user_data/u1/x.png")
        );
        assert_eq!(report.metadata_attempts, 2);
    }

    #[tokio::test]
    async fn repeat_delete_is_idempotent() {
        let store = MemoryObjectStore::default();
        store.put("user_data/u1/x.png", Some(1));
        let table = MemoryMetadataTable::default();

        let first = delete_photo_orchestrated(
            &store,
            &table,
            &SuffixKeyMatcher,
            "u1",
            "user_data/u1/x.png",
        )
        .await
        .unwrap();
        assert!(first.storage_deleted);

        let second = delete_photo_orchestrated(
            &store,
            &table,
            &SuffixKeyMatcher,
            "u1",
            "user_data/u1/x.png",
        )
        .await
        .unwrap();
        assert!(second.storage_deleted);
    }
}
