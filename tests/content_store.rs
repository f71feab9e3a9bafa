//! Integration tests for the content store and the bulk sync path.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use chrono::{TimeZone, Utc};
use gsa_sync::config::Config;
use gsa_sync::content::{Node, ResolveError, Whitelist};
use gsa_sync::feed::FeedType;
use gsa_sync::storage::{Database, DatabaseError};
use gsa_sync::sync::{Dispatch, SyncError, Synchronizer};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_node(id: i64, category: &str) -> Node {
    Node {
        id,
        category: category.to_string(),
        title: format!("Node {}", id),
        alias: None,
        link: None,
        changed: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
    }
}

// ============================================================================
// Store Operations
// ============================================================================

#[tokio::test]
async fn test_upsert_and_get_node() {
    let db = test_db().await;
    let mut node = test_node(1, "article");
    node.alias = Some("/news/first".to_string());

    db.upsert_node(&node).await.unwrap();

    let stored = db.get_node(1).await.unwrap().unwrap();
    assert_eq!(stored, node);
}

#[tokio::test]
async fn test_upsert_replaces_existing_snapshot() {
    let db = test_db().await;
    db.upsert_node(&test_node(1, "article")).await.unwrap();

    let mut updated = test_node(1, "page");
    updated.title = "Renamed".to_string();
    updated.changed = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    db.upsert_node(&updated).await.unwrap();

    assert_eq!(db.count_nodes().await.unwrap(), 1);
    assert_eq!(db.get_node(1).await.unwrap().unwrap(), updated);
}

#[tokio::test]
async fn test_get_missing_node() {
    let db = test_db().await;
    assert!(db.get_node(404).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_node() {
    let db = test_db().await;
    db.upsert_node(&test_node(1, "article")).await.unwrap();

    assert!(db.delete_node(1).await.unwrap());
    assert!(!db.delete_node(1).await.unwrap());
    assert_eq!(db.count_nodes().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_nodes_batch() {
    let db = test_db().await;
    let nodes: Vec<Node> = (1..=250).map(|id| test_node(id, "article")).collect();

    assert_eq!(db.upsert_nodes(&nodes).await.unwrap(), 250);
    assert_eq!(db.count_nodes().await.unwrap(), 250);
    assert_eq!(db.upsert_nodes(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_eligible_nodes_filters_by_whitelist() {
    let db = test_db().await;
    db.upsert_nodes(&[
        test_node(3, "a"),
        test_node(1, "b"),
        test_node(2, "c"),
        test_node(4, "a"),
    ])
    .await
    .unwrap();

    let nodes = db.eligible_nodes(&Whitelist::new(["a", "b"])).await.unwrap();
    let ids: Vec<i64> = nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);

    let none = db.eligible_nodes(&Whitelist::default()).await.unwrap();
    assert!(none.is_empty());
}

// ============================================================================
// Full Sync
// ============================================================================

fn sync_config(server: &MockServer, whitelist: &[&str]) -> Arc<Config> {
    let mut config = Config::default();
    config.gsa.endpoint = format!("{}/xmlfeed", server.uri());
    config.whitelist = whitelist.iter().map(|s| s.to_string()).collect();
    Arc::new(config)
}

fn origin() -> Url {
    Url::parse("https://www.example.com").unwrap()
}

#[tokio::test]
async fn test_full_sync_pushes_whitelisted_nodes_in_one_feed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Success"))
        .expect(1)
        .mount(&server)
        .await;

    let db = test_db().await;
    let mut link = test_node(3, "link");
    link.link = Some("https://partner.example.org/report".to_string());
    db.upsert_nodes(&[test_node(1, "article"), test_node(2, "forum"), link])
        .await
        .unwrap();

    let sync = Synchronizer::new(sync_config(&server, &["article", "link"])).unwrap();
    let dispatch = sync.full_sync(&db, &origin()).await.unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Pushed {
            feed_type: FeedType::Full,
            records: 2
        }
    );

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.contains("<feedtype>full</feedtype>"));
    assert!(body.contains(r#"url="https://www.example.com/node/1""#));
    assert!(body.contains(r#"displayurl="https://partner.example.org/report""#));
    assert!(!body.contains("/node/2"));
    assert!(body.contains(r#"last-modified="2024-03-01T12:30:00Z""#));
}

#[tokio::test]
async fn test_full_sync_with_no_matching_nodes_sends_empty_feed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let db = test_db().await;
    db.upsert_node(&test_node(1, "forum")).await.unwrap();

    let sync = Synchronizer::new(sync_config(&server, &["article"])).unwrap();
    let dispatch = sync.full_sync(&db, &origin()).await.unwrap();
    assert_eq!(
        dispatch,
        Dispatch::Pushed {
            feed_type: FeedType::Full,
            records: 0
        }
    );
}

#[tokio::test]
async fn test_full_sync_aborts_on_unresolvable_node() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let db = test_db().await;
    db.upsert_nodes(&[test_node(1, "article"), test_node(2, "link")])
        .await
        .unwrap();

    let sync = Synchronizer::new(sync_config(&server, &["article", "link"])).unwrap();
    let result = sync.full_sync(&db, &origin()).await;
    assert!(matches!(
        result,
        Err(SyncError::Resolve(ResolveError::MissingLink { node_id: 2 }))
    ));
}

#[tokio::test]
async fn test_full_sync_refuses_empty_whitelist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let db = test_db().await;
    db.upsert_node(&test_node(1, "article")).await.unwrap();

    let sync = Synchronizer::new(sync_config(&server, &[])).unwrap();
    assert!(matches!(
        sync.full_sync(&db, &origin()).await,
        Err(SyncError::EmptyWhitelist)
    ));
}

#[tokio::test]
async fn test_missing_store_sends_no_full_feed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = std::env::temp_dir().join("gsa_sync_missing_store");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("not-imported.db");
    let _ = std::fs::remove_file(&path);

    let sync = Synchronizer::new(sync_config(&server, &["article"])).unwrap();
    match Database::open_existing(path.to_str().unwrap()).await {
        Ok(db) => {
            let dispatch = sync.full_sync(&db, &origin()).await;
            panic!("missing store was opened, full sync gave {:?}", dispatch);
        }
        Err(e) => assert!(matches!(e, DatabaseError::NotFound(_))),
    }
    assert!(!path.exists());

    std::fs::remove_dir_all(&dir).ok();
}
