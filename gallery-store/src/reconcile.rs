//! Rebuilds the canonical in-memory photo list from the object store.

use chrono::Utc;
use futures::future::join_all;
use photo_model::{Photo, SortMode};
use tracing::{debug, warn};

use crate::filter::sort_photos;
use crate::{ObjectStore, SessionProvider};

/// Expiry for per-object signed URLs, in seconds.
pub const SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Root of the owner-scoped key namespace.
pub const OWNER_PREFIX: &str = "user_data";

/// Listing prefix that isolates one owner's objects.
pub fn owner_prefix(owner_id: &str) -> String {
    format!("{OWNER_PREFIX}/{owner_id}/")
}

/// List the current owner's objects and resolve each to a signed URL.
///
/// Fail-open end to end: no resolvable owner or a listing failure returns
/// an empty list, and a signing failure for one object drops only that
/// object. URL signing fans out concurrently; one slow or failing request
/// does not hold up the rest.
///
/// Photos come back newest first with empty tags/caption; the metadata
/// join happens only when a search is active.
pub async fn reconcile(store: &dyn ObjectStore, sessions: &dyn SessionProvider) -> Vec<Photo> {
    let owner = match sessions.current_session().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            warn!("no owner identity resolvable; returning an empty gallery");
            return Vec::new();
        }
        Err(err) => {
            warn!(%err, "session lookup failed; returning an empty gallery");
            return Vec::new();
        }
    };

    let prefix = owner_prefix(&owner.owner_id);
    let entries = match store.list(&prefix).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%err, %prefix, "object listing failed; returning an empty gallery");
            return Vec::new();
        }
    };
    debug!(count = entries.len(), %prefix, "listed objects");

    let now_ms = Utc::now().timestamp_millis();
    let signed = join_all(entries.into_iter().map(|entry| async move {
        match store.signed_url(&entry.key, SIGNED_URL_EXPIRY_SECS).await {
            Ok(url) => Some(Photo::new(
                entry.key,
                url,
                entry.last_modified_ms.unwrap_or(now_ms),
            )),
            Err(err) => {
                warn!(key = %entry.key, %err, "signing failed; dropping object from the gallery");
                None
            }
        }
    }))
    .await;

    let mut photos: Vec<Photo> = signed.into_iter().flatten().collect();
    sort_photos(&mut photos, SortMode::Newest);
    photos
}
