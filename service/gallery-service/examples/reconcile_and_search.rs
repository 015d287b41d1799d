use std::sync::Arc;

use gallery_service::GalleryService;
use gallery_store::keymap::SuffixKeyMatcher;
use gallery_store::memory::{MemoryMetadataTable, MemoryObjectStore, StaticSessionProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let query = args.get(1).map(String::as_str).unwrap_or("cat");

    let store = Arc::new(MemoryObjectStore::default());
    store.put("user_data/demo/cat.png", Some(1_700_000_000_000));
    store.put("user_data/demo/beach.jpg", Some(1_700_000_100_000));
    store.put("user_data/demo/receipt.png", Some(1_700_000_200_000));

    let table = Arc::new(MemoryMetadataTable::default());
    table.insert(serde_json::json!({
        "userId": "demo",
        "imageKey": "public/user_data/demo/cat.png",
        "labels": ["cat", "indoor"],
        "caption": "a sleepy cat on a couch",
    }));
    table.insert(serde_json::json!({
        "userId": "demo",
        "imageKey": "beach.jpg",
        "labels": {"L": [{"S": "nature"}, {"S": "sea"}]},
        "caption": {"S": "waves at sunset"},
    }));

    let svc = GalleryService::new(
        store,
        table,
        Arc::new(StaticSessionProvider::signed_in("demo")),
        Arc::new(SuffixKeyMatcher),
    );

    let all = svc.refresh().await;
    println!("Gallery: {} photos", all.len());
    for p in &all {
        println!("  {} ({})", p.title(), p.access_url);
    }

    let hits = svc.search(query, false).await;
    println!("Query {query:?}: {} match(es)", hits.len());
    for p in &hits {
        println!("  {} tags={:?} caption={:?}", p.title(), p.tags, p.caption);
    }
}
