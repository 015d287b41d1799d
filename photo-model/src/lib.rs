//! Shared models used across the gallery crates.

use serde::Deserialize;

/// One user-owned image, rebuilt transiently on every gallery reconciliation.
///
/// The `access_url` is a time-limited signed URL and is regenerated on each
/// fetch; nothing in this struct is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Opaque storage key, owner-scoped by a path prefix.
    pub storage_key: String,
    /// Signed access URL, valid only for the current view session.
    pub access_url: String,
    /// Last-modified time of the object in epoch milliseconds, falling back
    /// to the fetch time when the store reports none. Used only for sorting.
    pub uploaded_at_ms: i64,
    /// Tags joined from metadata; empty until a search attaches them.
    pub tags: Vec<String>,
    /// Caption joined from metadata; empty until a search attaches it.
    pub caption: String,
}

impl Photo {
    pub fn new(storage_key: impl Into<String>, access_url: impl Into<String>, uploaded_at_ms: i64) -> Self {
        Self {
            storage_key: storage_key.into(),
            access_url: access_url.into(),
            uploaded_at_ms,
            tags: Vec::new(),
            caption: String::new(),
        }
    }

    /// Display title: the last path segment of the storage key.
    pub fn title(&self) -> &str {
        canonical_filename(&self.storage_key)
    }
}

/// Canonical filename of a storage key: the text after the final `/`.
///
/// The empty string normalizes to the empty string, which downstream
/// matching treats as "matches nothing".
pub fn canonical_filename(raw_key: &str) -> &str {
    raw_key.rsplit('/').next().unwrap_or("")
}

/// Decoded annotation record for one photo, keyed loosely by `image_key`.
///
/// The key format is whatever the metadata table stored and is not
/// guaranteed to match any `Photo::storage_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub owner_id: String,
    pub image_key: String,
    pub tags: Vec<String>,
    pub caption: String,
}

/// A string on the metadata wire: either plain or type-tagged.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireString {
    Plain(String),
    Wrapped {
        #[serde(rename = "S")]
        s: String,
    },
}

impl WireString {
    pub fn into_string(self) -> String {
        match self {
            WireString::Plain(s) => s,
            WireString::Wrapped { s } => s,
        }
    }
}

/// A tag list on the metadata wire: either a plain sequence or a wrapped one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTags {
    Plain(Vec<WireString>),
    Wrapped {
        #[serde(rename = "L")]
        l: Vec<WireString>,
    },
}

impl WireTags {
    pub fn into_strings(self) -> Vec<String> {
        let items = match self {
            WireTags::Plain(v) => v,
            WireTags::Wrapped { l } => l,
        };
        items.into_iter().map(WireString::into_string).collect()
    }
}

/// Raw metadata-table item as scanned; every field is optional because the
/// table enforces no schema beyond the key.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMetadataItem {
    #[serde(rename = "userId")]
    pub user_id: Option<WireString>,
    #[serde(rename = "imageKey")]
    pub image_key: Option<WireString>,
    pub labels: Option<WireTags>,
    pub caption: Option<WireString>,
}

impl RawMetadataItem {
    /// Normalize the heterogeneous wire encodings into a [`MetadataRecord`].
    /// Missing fields default to empty rather than failing the whole scan.
    pub fn into_record(self) -> MetadataRecord {
        MetadataRecord {
            owner_id: self.user_id.map(WireString::into_string).unwrap_or_default(),
            image_key: self.image_key.map(WireString::into_string).unwrap_or_default(),
            tags: self.labels.map(WireTags::into_strings).unwrap_or_default(),
            caption: self.caption.map(WireString::into_string).unwrap_or_default(),
        }
    }
}

/// Identity snapshot of the caller, owned by the auth collaborator.
///
/// Re-fetched per privileged operation; the core never caches it beyond the
/// immediate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerSession {
    /// Durable subject identifier.
    pub owner_id: String,
    /// Opaque transient storage credential, when the collaborator issues one.
    pub credentials: Option<String>,
}

impl OwnerSession {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self { owner_id: owner_id.into(), credentials: None }
    }
}

/// User-selectable gallery ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Newest,
    Oldest,
}
