//! Lifecycle hooks and bulk synchronization.
//!
//! Every path runs the same straight pipeline: gate, resolve records,
//! build the feed, push it. Only resolution and build failures reach the
//! caller; the push itself is fire-and-forget.

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::{Config, ConfigError};
use crate::content::{eligible_node, Entity, Node, ResolveError, UrlResolver, Whitelist};
use crate::feed::{build_feed, Action, FeedClient, FeedEnvelope, FeedError, FeedType, PushError};
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create feed client: {0}")]
    Client(#[from] PushError),

    #[error("Cannot build record: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Cannot build feed: {0}")]
    Feed(#[from] FeedError),

    #[error("Content store error: {0}")]
    Database(#[from] DatabaseError),

    /// A full feed with no records deletes the data source, so an empty
    /// whitelist must not reach it by accident.
    #[error("Category whitelist is empty; refusing to send a full feed (use purge to delete the data source)")]
    EmptyWhitelist,
}

/// What a sync call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Entity was not eligible; nothing was sent.
    Skipped,
    /// A feed was handed to the transport. The push outcome is only logged.
    Pushed { feed_type: FeedType, records: usize },
}

/// Entry point for lifecycle hooks and bulk sync.
pub struct Synchronizer {
    config: Arc<Config>,
    client: FeedClient,
    whitelist: Whitelist,
    dtd_url: Url,
}

impl Synchronizer {
    pub fn new(config: Arc<Config>) -> Result<Self, SyncError> {
        let client = FeedClient::new(&config.gsa)?;
        Self::with_client(config, client)
    }

    /// Uses a preconfigured client (custom timeouts, tests).
    pub fn with_client(config: Arc<Config>, client: FeedClient) -> Result<Self, SyncError> {
        let dtd_url = config.gsa.dtd_url()?;
        let whitelist = config.whitelist();
        Ok(Self {
            config,
            client,
            whitelist,
            dtd_url,
        })
    }

    /// Resolver for records built while handling a request from `origin`.
    pub fn resolver(&self, origin: &Url) -> UrlResolver {
        UrlResolver::new(origin, self.config.link_category.clone())
    }

    pub async fn on_created(&self, entity: &Entity, origin: &Url) -> Result<Dispatch, SyncError> {
        self.push_entity(entity, Action::Add, origin).await
    }

    pub async fn on_updated(&self, entity: &Entity, origin: &Url) -> Result<Dispatch, SyncError> {
        self.push_entity(entity, Action::Add, origin).await
    }

    pub async fn on_deleted(&self, entity: &Entity, origin: &Url) -> Result<Dispatch, SyncError> {
        self.push_entity(entity, Action::Delete, origin).await
    }

    /// Pushes one entity as an incremental feed if it passes the whitelist.
    pub async fn push_entity(
        &self,
        entity: &Entity,
        action: Action,
        origin: &Url,
    ) -> Result<Dispatch, SyncError> {
        let Some(node) = eligible_node(entity, &self.whitelist) else {
            tracing::debug!(
                kind = %entity.kind(),
                id = entity.id(),
                "Entity not eligible for search feed, skipping"
            );
            return Ok(Dispatch::Skipped);
        };

        let record = self.resolver(origin).resolve(node)?;
        let envelope = FeedEnvelope::new(
            self.config.gsa.data_source.as_str(),
            FeedType::Incremental,
            vec![record],
        )?;
        tracing::debug!(node_id = node.id, action = ?action, "Pushing node");
        self.send(&envelope, action).await
    }

    /// Pushes every whitelisted node in the store as one `full` feed.
    ///
    /// The appliance drops documents of the data source that are not in the
    /// feed, so a single unresolvable node aborts the whole sync.
    pub async fn full_sync(&self, db: &Database, origin: &Url) -> Result<Dispatch, SyncError> {
        if self.whitelist.is_empty() {
            return Err(SyncError::EmptyWhitelist);
        }

        let nodes = db.eligible_nodes(&self.whitelist).await?;
        let resolver = self.resolver(origin);
        let records = nodes
            .iter()
            .map(|node| resolver.resolve(node))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            records = records.len(),
            categories = self.whitelist.len(),
            "Starting full sync"
        );
        let envelope = FeedEnvelope::new(
            self.config.gsa.data_source.as_str(),
            FeedType::Full,
            records,
        )?;
        self.send(&envelope, Action::Add).await
    }

    /// Deletes the whole data source by pushing an empty `full` feed.
    pub async fn purge(&self) -> Result<Dispatch, SyncError> {
        let envelope = FeedEnvelope::new(
            self.config.gsa.data_source.as_str(),
            FeedType::Full,
            Vec::new(),
        )?;
        tracing::warn!(data_source = %envelope.data_source(), "Purging data source");
        self.send(&envelope, Action::Add).await
    }

    /// Builds the incremental feed for a node without sending it.
    ///
    /// The whitelist is not applied.
    pub fn render(&self, node: &Node, action: Action, origin: &Url) -> Result<String, SyncError> {
        let record = self.resolver(origin).resolve(node)?;
        let envelope = FeedEnvelope::new(
            self.config.gsa.data_source.as_str(),
            FeedType::Incremental,
            vec![record],
        )?;
        Ok(build_feed(&envelope, action, &self.dtd_url)?)
    }

    async fn send(&self, envelope: &FeedEnvelope, action: Action) -> Result<Dispatch, SyncError> {
        let xml = build_feed(envelope, action, &self.dtd_url)?;
        self.client
            .push(&xml, envelope.feed_type(), envelope.data_source())
            .await;
        Ok(Dispatch::Pushed {
            feed_type: envelope.feed_type(),
            records: envelope.records().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::builder::tests::parse_feed;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str, whitelist: &[&str]) -> Arc<Config> {
        let mut config = Config::default();
        config.gsa.endpoint = endpoint.to_string();
        config.whitelist = whitelist.iter().map(|s| s.to_string()).collect();
        Arc::new(config)
    }

    fn origin() -> Url {
        Url::parse("https://www.example.com").unwrap()
    }

    fn node(id: i64, category: &str) -> Node {
        Node {
            id,
            category: category.to_string(),
            title: format!("Node {}", id),
            alias: None,
            link: None,
            changed: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_article_scenario() {
        let sync = Synchronizer::new(config("http://127.0.0.1:9/xmlfeed", &["article"])).unwrap();
        let xml = sync
            .render(&node(1, "article"), Action::Add, &origin())
            .unwrap();

        let parsed = parse_feed(&xml);
        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record["last-modified"], "2024-01-01T00:00:00Z");
        assert_eq!(record["mimetype"], "text/html");
        assert!(!record.contains_key("action"));
    }

    #[test]
    fn test_render_propagates_resolve_error() {
        let sync = Synchronizer::new(config("http://127.0.0.1:9/xmlfeed", &["link"])).unwrap();
        let result = sync.render(&node(3, "link"), Action::Add, &origin());
        assert!(matches!(
            result,
            Err(SyncError::Resolve(ResolveError::MissingLink { node_id: 3 }))
        ));
    }

    #[tokio::test]
    async fn test_ineligible_entity_sends_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let endpoint = format!("{}/xmlfeed", mock_server.uri());
        let sync = Synchronizer::new(config(&endpoint, &["a", "b"])).unwrap();

        let dispatch = sync
            .on_created(&Entity::Node(node(1, "c")), &origin())
            .await
            .unwrap();
        assert_eq!(dispatch, Dispatch::Skipped);

        let user = Entity::Other {
            kind: "user".to_string(),
            id: 1,
        };
        assert_eq!(
            sync.on_updated(&user, &origin()).await.unwrap(),
            Dispatch::Skipped
        );
    }

    #[tokio::test]
    async fn test_eligible_entity_is_pushed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Success"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let endpoint = format!("{}/xmlfeed", mock_server.uri());
        let sync = Synchronizer::new(config(&endpoint, &["a", "b"])).unwrap();

        let dispatch = sync
            .on_created(&Entity::Node(node(1, "a")), &origin())
            .await
            .unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Pushed {
                feed_type: FeedType::Incremental,
                records: 1
            }
        );
    }

    #[tokio::test]
    async fn test_hook_succeeds_when_appliance_is_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/xmlfeed", listener.local_addr().unwrap());
        drop(listener);

        let sync = Synchronizer::new(config(&endpoint, &["article"])).unwrap();
        let dispatch = sync
            .on_deleted(&Entity::Node(node(1, "article")), &origin())
            .await
            .unwrap();
        assert!(matches!(dispatch, Dispatch::Pushed { .. }));
    }
}
