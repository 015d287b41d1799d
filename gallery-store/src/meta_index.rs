//! Builds the per-owner metadata index consulted during search.

use photo_model::RawMetadataItem;
use tracing::warn;

use crate::keymap::KeyMatcher;
use crate::MetadataTable;

/// One indexed annotation, keyed by the raw `image_key` as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub image_key: String,
    pub tags: Vec<String>,
    pub caption: String,
}

/// Mapping from raw image key to annotations for a single owner.
///
/// Entries keep scan order so that lookup's "first match wins" rule is
/// deterministic; keys are left raw and normalization happens at lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataIndex {
    entries: Vec<MetadataEntry>,
}

impl MetadataIndex {
    pub fn from_entries(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose raw key matches the photo's storage key under the
    /// given strategy, in scan order.
    pub fn lookup(&self, storage_key: &str, matcher: &dyn KeyMatcher) -> Option<&MetadataEntry> {
        self.entries
            .iter()
            .find(|e| matcher.matches(&e.image_key, storage_key))
    }
}

/// Scan the whole table and keep the records owned by `owner_id`.
///
/// Fail-open: a scan or decode failure yields an empty index so search
/// degrades to "no matches" instead of crashing the gallery.
pub async fn build_index(table: &dyn MetadataTable, owner_id: &str) -> MetadataIndex {
    let items = match table.scan().await {
        Ok(items) => items,
        Err(err) => {
            warn!(%err, "metadata scan failed; search will see an empty index");
            return MetadataIndex::default();
        }
    };

    let mut entries = Vec::new();
    for item in items {
        let raw: RawMetadataItem = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "metadata item failed to decode; dropping the whole index");
                return MetadataIndex::default();
            }
        };
        let record = raw.into_record();
        if record.owner_id != owner_id {
            continue;
        }
        entries.push(MetadataEntry {
            image_key: record.image_key,
            tags: record.tags,
            caption: record.caption,
        });
    }
    MetadataIndex::from_entries(entries)
}
