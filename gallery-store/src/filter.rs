//! Pure filtering and sorting over a reconciled photo list.

use photo_model::{Photo, SortMode};

use crate::keymap::KeyMatcher;
use crate::meta_index::MetadataIndex;

/// Filter photos by a free-text query against joined metadata.
///
/// An empty or whitespace-only query returns the input unchanged. Otherwise
/// each photo is joined to its first-matching index entry; the returned copy
/// carries the joined tags/caption, and a photo is retained when the query
/// appears (case-insensitively) in the caption or any tag. Photos without
/// any matching metadata are unannotated and therefore not searchable.
pub fn filter_by_metadata(
    photos: &[Photo],
    index: &MetadataIndex,
    matcher: &dyn KeyMatcher,
    query: &str,
) -> Vec<Photo> {
    let query = query.trim();
    if query.is_empty() {
        return photos.to_vec();
    }
    let needle = query.to_lowercase();

    photos
        .iter()
        .filter_map(|photo| {
            let meta = index.lookup(&photo.storage_key, matcher)?;
            let retained = meta.caption.to_lowercase().contains(&needle)
                || meta.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !retained {
                return None;
            }
            let mut joined = photo.clone();
            joined.tags = meta.tags.clone();
            joined.caption = meta.caption.clone();
            Some(joined)
        })
        .collect()
}

/// Filter photos by a case-insensitive substring of the title (the storage
/// key's final segment). Composes with the metadata filter by narrowing
/// whatever result set it is given.
pub fn filter_by_filename(photos: &[Photo], query: &str) -> Vec<Photo> {
    let query = query.trim();
    if query.is_empty() {
        return photos.to_vec();
    }
    let needle = query.to_lowercase();
    photos
        .iter()
        .filter(|p| p.title().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stable in-place sort on `uploaded_at_ms`; a missing timestamp sorts as
/// the oldest possible.
pub fn sort_photos(photos: &mut [Photo], mode: SortMode) {
    match mode {
        SortMode::Newest => photos.sort_by(|a, b| b.uploaded_at_ms.cmp(&a.uploaded_at_ms)),
        SortMode::Oldest => photos.sort_by(|a, b| a.uploaded_at_ms.cmp(&b.uploaded_at_ms)),
    }
}
