//! Facade tying the gallery core together: reconciliation, search with
//! optional AI assist, filename narrowing, sorting and deletion over one
//! in-memory photo list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use assist_provider::assist::{AssistAction, AssistProvider};
use gallery_store::filter::{filter_by_filename, filter_by_metadata, sort_photos};
use gallery_store::keymap::KeyMatcher;
use gallery_store::meta_index::{build_index, MetadataIndex};
use gallery_store::orchestrator::{delete_photo_orchestrated, DeleteError, DeleteReport};
use gallery_store::reconcile::reconcile;
use gallery_store::{MetadataTable, ObjectStore, SessionProvider};
use photo_model::{Photo, SortMode};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no signed-in owner; refusing destructive operation")]
    NoSession,
    #[error("session lookup failed: {0}")]
    Session(String),
    #[error(transparent)]
    Delete(#[from] DeleteError),
}

/// Query lifecycle: `Idle -> AssistPending -> Filtering -> Idle`.
/// Empty queries short-circuit without ever entering `Filtering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    AssistPending,
    Filtering,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Prompt template the assist step asks for when rewriting a query.
    pub assist_action: AssistAction,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { assist_action: AssistAction::AnalyzePhoto }
    }
}

pub struct GalleryService {
    cfg: ServiceConfig,
    store: Arc<dyn ObjectStore>,
    table: Arc<dyn MetadataTable>,
    sessions: Arc<dyn SessionProvider>,
    matcher: Arc<dyn KeyMatcher>,
    assist: Option<Arc<dyn AssistProvider>>,
    /// Canonical list from the last committed reconciliation.
    photos: RwLock<Vec<Photo>>,
    /// Currently displayed subset after any active filters.
    visible: RwLock<Vec<Photo>>,
    search_state: RwLock<SearchState>,
    sort_override: RwLock<Option<SortMode>>,
    /// Monotonic request-generation token; a finished search or refresh
    /// commits to shared state only while its token is still the latest,
    /// so a stale response cannot overwrite a newer one.
    search_epoch: AtomicU64,
}

impl GalleryService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        table: Arc<dyn MetadataTable>,
        sessions: Arc<dyn SessionProvider>,
        matcher: Arc<dyn KeyMatcher>,
    ) -> Self {
        Self {
            cfg: ServiceConfig::default(),
            store,
            table,
            sessions,
            matcher,
            assist: None,
            photos: RwLock::new(Vec::new()),
            visible: RwLock::new(Vec::new()),
            search_state: RwLock::new(SearchState::Idle),
            sort_override: RwLock::new(None),
            search_epoch: AtomicU64::new(0),
        }
    }

    pub fn with_assist(mut self, assist: Arc<dyn AssistProvider>) -> Self {
        self.assist = Some(assist);
        self
    }

    pub fn with_config(mut self, cfg: ServiceConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Snapshot of the canonical photo list.
    pub fn photos(&self) -> Vec<Photo> {
        self.photos.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of the currently displayed subset.
    pub fn visible(&self) -> Vec<Photo> {
        self.visible.read().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn search_state(&self) -> SearchState {
        self.search_state.read().map(|g| *g).unwrap_or(SearchState::Idle)
    }

    fn set_state(&self, state: SearchState) {
        if let Ok(mut w) = self.search_state.write() {
            *w = state;
        }
    }

    fn issue_token(&self) -> u64 {
        self.search_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.search_epoch.load(Ordering::SeqCst) == token
    }

    fn commit_visible(&self, photos: Vec<Photo>) {
        if let Ok(mut w) = self.visible.write() {
            *w = photos;
        }
    }

    /// Rebuild the canonical list from the stores. Fail-open: an
    /// unauthenticated or unreachable listing yields an empty gallery.
    pub async fn refresh(&self) -> Vec<Photo> {
        let token = self.issue_token();
        let mut photos = reconcile(&*self.store, &*self.sessions).await;
        if let Ok(Some(mode)) = self.sort_override.read().map(|g| *g) {
            sort_photos(&mut photos, mode);
        }
        if self.is_current(token) {
            if let Ok(mut w) = self.photos.write() {
                *w = photos.clone();
            }
            self.commit_visible(photos.clone());
        } else {
            debug!("stale refresh result discarded");
        }
        photos
    }

    /// Filter the gallery by a free-text query, optionally rewritten by the
    /// AI assist step first.
    ///
    /// Assist failure of any kind falls back to the raw query; a missing
    /// owner or failed metadata scan degrades to an empty result. The
    /// committed view honors request fencing: only the latest issued
    /// search may write to the visible list.
    pub async fn search(&self, raw_query: &str, use_assist: bool) -> Vec<Photo> {
        let trimmed = raw_query.trim();
        if trimmed.is_empty() {
            // Still bump the generation so an in-flight older search cannot
            // overwrite the cleared view.
            let _ = self.issue_token();
            let all = self.photos();
            self.commit_visible(all.clone());
            return all;
        }

        let token = self.issue_token();
        let mut query = trimmed.to_string();
        if use_assist {
            if let Some(assist) = &self.assist {
                self.set_state(SearchState::AssistPending);
                match assist.assist(trimmed, self.cfg.assist_action).await {
                    Ok(response) if !response.message.trim().is_empty() => {
                        debug!(
                            rewritten = %response.message,
                            "assist rewrote the search query"
                        );
                        query = response.message;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "assist unavailable; filtering with the raw query");
                    }
                }
            }
        }

        self.set_state(SearchState::Filtering);
        let index = self.owner_index().await;
        let photos = self.photos();
        let filtered = filter_by_metadata(&photos, &index, &*self.matcher, &query);
        if self.is_current(token) {
            self.commit_visible(filtered.clone());
        } else {
            debug!("stale search result discarded");
        }
        self.set_state(SearchState::Idle);
        filtered
    }

    /// Narrow the current view by a case-insensitive title substring.
    /// Compounds with any active search by operating on its result set.
    pub fn filter_filename(&self, query: &str) -> Vec<Photo> {
        let narrowed = filter_by_filename(&self.visible(), query);
        self.commit_visible(narrowed.clone());
        narrowed
    }

    /// Set the user sort override and re-order the current view.
    pub fn set_sort(&self, mode: SortMode) -> Vec<Photo> {
        if let Ok(mut w) = self.sort_override.write() {
            *w = Some(mode);
        }
        let mut view = self.visible();
        sort_photos(&mut view, mode);
        self.commit_visible(view.clone());
        view
    }

    /// Delete one photo. Storage removal is authoritative and its failure
    /// surfaces; metadata removal is best-effort. On success the photo
    /// leaves the in-memory lists immediately, without re-reconciling.
    pub async fn delete(&self, storage_key: &str) -> Result<DeleteReport, ServiceError> {
        // Destructive operations never fail open: re-fetch the session and
        // refuse without one.
        let session = self
            .sessions
            .current_session()
            .await
            .map_err(|err| ServiceError::Session(err.to_string()))?
            .ok_or(ServiceError::NoSession)?;

        let report = delete_photo_orchestrated(
            &*self.store,
            &*self.table,
            &*self.matcher,
            &session.owner_id,
            storage_key,
        )
        .await?;

        if let Ok(mut w) = self.photos.write() {
            w.retain(|p| p.storage_key != storage_key);
        }
        if let Ok(mut w) = self.visible.write() {
            w.retain(|p| p.storage_key != storage_key);
        }
        Ok(report)
    }

    /// Metadata index for the current owner; sessions are re-fetched per
    /// operation, and an unresolvable owner yields an empty index.
    async fn owner_index(&self) -> MetadataIndex {
        match self.sessions.current_session().await {
            Ok(Some(session)) => build_index(&*self.table, &session.owner_id).await,
            Ok(None) => {
                warn!("no owner identity resolvable; search will see an empty index");
                MetadataIndex::default()
            }
            Err(err) => {
                warn!(%err, "session lookup failed; search will see an empty index");
                MetadataIndex::default()
            }
        }
    }
}
