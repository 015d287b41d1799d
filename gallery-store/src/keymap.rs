//! Key matching across the two independently keyed stores.
//!
//! The object store and the metadata table never agreed on a key format:
//! records may carry `public/` or `user_data/` prefixes, or just the bare
//! filename. The matcher is an explicit strategy so the heuristic stays
//! isolated and replaceable; the long-term fix is a single join key written
//! at upload time.

pub use photo_model::canonical_filename;

/// Strategy deciding whether a metadata record belongs to a storage object,
/// and which key spellings a deletion should try.
pub trait KeyMatcher: Send + Sync {
    /// True when `record_key` should be treated as annotating `storage_key`.
    fn matches(&self, record_key: &str, storage_key: &str) -> bool;

    /// Plausible metadata-table spellings for `storage_key`, most likely
    /// first. Deletion walks these in order, stopping at the first success.
    fn candidate_keys(&self, storage_key: &str, owner_id: &str) -> Vec<String>;
}

/// Default matcher: exact key equality, or the record key ending with the
/// storage key's canonical filename. Deliberately permissive to tolerate
/// differing path prefixes; an empty canonical filename matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixKeyMatcher;

impl KeyMatcher for SuffixKeyMatcher {
    fn matches(&self, record_key: &str, storage_key: &str) -> bool {
        if record_key == storage_key {
            return true;
        }
        let name = canonical_filename(storage_key);
        !name.is_empty() && record_key.ends_with(name)
    }

    fn candidate_keys(&self, storage_key: &str, owner_id: &str) -> Vec<String> {
        let name = canonical_filename(storage_key);
        vec![
            storage_key.to_string(),
            format!("public/user_data/{owner_id}/{name}"),
            format!("user_data/{owner_id}/{name}"),
            format!("public/{storage_key}"),
            name.to_string(),
        ]
    }
}
