use std::sync::Arc;

use assist_provider::assist::{AssistAction, AssistError, AssistProvider, AssistResponse};
use async_trait::async_trait;
use gallery_service::{GalleryService, SearchState, ServiceError};
use gallery_store::keymap::SuffixKeyMatcher;
use gallery_store::memory::{MemoryMetadataTable, MemoryObjectStore, StaticSessionProvider};
use photo_model::SortMode;
use tokio::sync::Notify;

fn seeded_store() -> Arc<MemoryObjectStore> {
    let store = Arc::new(MemoryObjectStore::default());
    store.put("user_data/u1/cat.png", Some(1_000));
    store.put("user_data/u1/dog.png", Some(2_000));
    store.put("user_data/u1/untagged.png", Some(3_000));
    store
}

fn seeded_table() -> Arc<MemoryMetadataTable> {
    let table = Arc::new(MemoryMetadataTable::default());
    table.insert(serde_json::json!({
        "userId": "u1",
        "imageKey": "public/user_data/u1/cat.png",
        "labels": ["cat", "indoor"],
        "caption": "a sleepy cat",
    }));
    table.insert(serde_json::json!({
        "userId": {"S": "u1"},
        "imageKey": {"S": "user_data/u1/dog.png"},
        "labels": {"L": [{"S": "dog"}]},
        "caption": {"S": "a playful dog"},
    }));
    table
}

fn service(store: Arc<MemoryObjectStore>, table: Arc<MemoryMetadataTable>) -> GalleryService {
    GalleryService::new(
        store,
        table,
        Arc::new(StaticSessionProvider::signed_in("u1")),
        Arc::new(SuffixKeyMatcher),
    )
}

#[tokio::test]
async fn refresh_populates_newest_first() {
    let svc = service(seeded_store(), seeded_table());
    let photos = svc.refresh().await;
    let titles: Vec<&str> = photos.iter().map(|p| p.title()).collect();
    assert_eq!(titles, vec!["untagged.png", "dog.png", "cat.png"]);
    assert_eq!(svc.visible(), photos);
}

#[tokio::test]
async fn empty_query_returns_the_full_set_unchanged() {
    let svc = service(seeded_store(), seeded_table());
    let all = svc.refresh().await;
    let out = svc.search("   ", false).await;
    assert_eq!(out, all);
    assert_eq!(svc.search_state(), SearchState::Idle);
}

#[tokio::test]
async fn metadata_search_joins_across_differing_prefixes() {
    let svc = service(seeded_store(), seeded_table());
    svc.refresh().await;

    let hits = svc.search("cat", false).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].storage_key, "user_data/u1/cat.png");
    assert_eq!(hits[0].tags, vec!["cat", "indoor"]);
    assert_eq!(hits[0].caption, "a sleepy cat");

    assert!(svc.search("zebra", false).await.is_empty());
    assert_eq!(svc.search_state(), SearchState::Idle);
}

#[tokio::test]
async fn unannotated_photos_are_never_search_hits() {
    let svc = service(seeded_store(), seeded_table());
    svc.refresh().await;
    // The title contains the query, but the photo has no metadata record.
    assert!(svc.search("untagged", false).await.is_empty());
}

struct RewritingAssist;

#[async_trait]
impl AssistProvider for RewritingAssist {
    async fn assist(&self, message: &str, _action: AssistAction) -> Result<AssistResponse, AssistError> {
        let rewritten = if message == "kitty" { "cat" } else { message };
        Ok(AssistResponse { success: true, message: rewritten.to_string(), usage: None })
    }
}

struct FailingAssist;

#[async_trait]
impl AssistProvider for FailingAssist {
    async fn assist(&self, _message: &str, _action: AssistAction) -> Result<AssistResponse, AssistError> {
        Err(AssistError::EndpointFailure { message: "connection refused".into() })
    }
}

#[tokio::test]
async fn assist_rewrite_drives_the_filter() {
    let svc = service(seeded_store(), seeded_table()).with_assist(Arc::new(RewritingAssist));
    svc.refresh().await;

    assert!(svc.search("kitty", false).await.is_empty());
    let hits = svc.search("kitty", true).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title(), "cat.png");
}

#[tokio::test]
async fn assist_failure_falls_back_to_the_raw_query() {
    let svc = service(seeded_store(), seeded_table()).with_assist(Arc::new(FailingAssist));
    svc.refresh().await;

    let with_assist = svc.search("cat", true).await;
    let without = svc.search("cat", false).await;
    assert_eq!(with_assist, without);
    assert_eq!(with_assist.len(), 1);
}

#[tokio::test]
async fn scan_failure_degrades_to_no_matches() {
    let store = seeded_store();
    let table = seeded_table();
    table.fail_scans();
    let svc = service(store, table);
    svc.refresh().await;

    let hits = svc.search("cat", false).await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn filename_filter_narrows_the_active_result_set() {
    let svc = service(seeded_store(), seeded_table());
    svc.refresh().await;

    // Narrow all photos by title.
    let narrowed = svc.filter_filename("dog");
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].title(), "dog.png");

    // Compounds with a metadata search by narrowing its result set.
    svc.search("a", false).await; // matches both captions
    let compounded = svc.filter_filename("cat");
    assert_eq!(compounded.len(), 1);
    assert_eq!(compounded[0].title(), "cat.png");
}

#[tokio::test]
async fn sort_override_survives_refresh() {
    let svc = service(seeded_store(), seeded_table());
    svc.refresh().await;
    let oldest = svc.set_sort(SortMode::Oldest);
    assert_eq!(oldest[0].title(), "cat.png");

    let refreshed = svc.refresh().await;
    let titles: Vec<&str> = refreshed.iter().map(|p| p.title()).collect();
    assert_eq!(titles, vec!["cat.png", "dog.png", "untagged.png"]);
}

#[tokio::test]
async fn delete_removes_the_photo_even_when_metadata_is_missed() {
    let store = seeded_store();
    let table = Arc::new(MemoryMetadataTable::default()); // no record matches any candidate
    let svc = service(store.clone(), table);
    svc.refresh().await;

    let report = svc.delete("user_data/u1/cat.png").await.expect("delete succeeds");
    assert!(report.storage_deleted);
    assert!(report.metadata_deleted_key.is_none());
    assert_eq!(report.metadata_attempts, 5);

    assert!(!store.contains("user_data/u1/cat.png"));
    assert!(svc.photos().iter().all(|p| p.storage_key != "user_data/u1/cat.png"));
    assert!(svc.visible().iter().all(|p| p.storage_key != "user_data/u1/cat.png"));
}

#[tokio::test]
async fn delete_also_clears_the_metadata_record_when_one_matches() {
    let store = seeded_store();
    let table = seeded_table();
    let svc = service(store, table.clone());
    svc.refresh().await;

    let report = svc.delete("user_data/u1/cat.png").await.unwrap();
    assert_eq!(
        report.metadata_deleted_key.as_deref(),
        Some("public/user_data/u1/cat.png")
    );
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn failed_storage_delete_keeps_the_photo_listed() {
    let store = seeded_store();
    store.fail_removals();
    let svc = service(store, seeded_table());
    svc.refresh().await;

    let err = svc.delete("user_data/u1/cat.png").await.expect_err("surfaced");
    assert!(matches!(err, ServiceError::Delete(_)));
    assert!(svc.photos().iter().any(|p| p.storage_key == "user_data/u1/cat.png"));
    assert!(svc.visible().iter().any(|p| p.storage_key == "user_data/u1/cat.png"));
}

#[tokio::test]
async fn delete_without_a_session_is_refused() {
    let svc = GalleryService::new(
        seeded_store(),
        seeded_table(),
        Arc::new(StaticSessionProvider::signed_out()),
        Arc::new(SuffixKeyMatcher),
    );
    let err = svc.delete("user_data/u1/cat.png").await.expect_err("no session");
    assert!(matches!(err, ServiceError::NoSession));
}

#[tokio::test]
async fn signed_out_search_degrades_to_empty() {
    let svc = GalleryService::new(
        seeded_store(),
        seeded_table(),
        Arc::new(StaticSessionProvider::signed_out()),
        Arc::new(SuffixKeyMatcher),
    );
    assert!(svc.refresh().await.is_empty());
    assert!(svc.search("cat", false).await.is_empty());
}

#[tokio::test]
async fn session_failure_degrades_search_and_refuses_delete() {
    let sessions = Arc::new(StaticSessionProvider::signed_in("u1"));
    let svc = GalleryService::new(
        seeded_store(),
        seeded_table(),
        sessions.clone(),
        Arc::new(SuffixKeyMatcher),
    );
    // Populate the gallery while the session service is healthy.
    assert_eq!(svc.refresh().await.len(), 3);

    sessions.fail_lookups();

    // Search sees an empty index, so even annotated photos stop matching.
    assert!(svc.search("cat", false).await.is_empty());

    // Destructive operations surface the failure instead of failing open.
    let err = svc.delete("user_data/u1/cat.png").await.expect_err("surfaced");
    assert!(matches!(err, ServiceError::Session(_)));
    assert!(svc.photos().iter().any(|p| p.storage_key == "user_data/u1/cat.png"));
}

struct GatedAssist {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AssistProvider for GatedAssist {
    async fn assist(&self, _message: &str, _action: AssistAction) -> Result<AssistResponse, AssistError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(AssistResponse { success: true, message: "cat".into(), usage: None })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_search_cannot_overwrite_a_newer_one() {
    let gate = Arc::new(GatedAssist { entered: Notify::new(), release: Notify::new() });
    let svc = Arc::new(service(seeded_store(), seeded_table()).with_assist(gate.clone()));
    svc.refresh().await;

    let older = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.search("anything", true).await })
    };
    gate.entered.notified().await; // older search is parked in the assist call

    let newer = svc.search("dog", false).await;
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].title(), "dog.png");

    gate.release.notify_one();
    let stale = older.await.expect("search task completes");
    // The stale search still returns its own result to its caller...
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].title(), "cat.png");
    // ...but the shared view keeps the newer one.
    let visible = svc.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title(), "dog.png");
}
