use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content node as the CMS stores it.
///
/// Nodes are the only entity kind pushed to the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    /// Content type ("article", "page", ...). Matched against the whitelist.
    pub category: String,
    #[serde(default)]
    pub title: String,
    /// Path alias (`/about-us`); the canonical route falls back to
    /// [`Node::internal_path`] when unset.
    #[serde(default)]
    pub alias: Option<String>,
    /// Link field URI, used as display URL for the link category.
    /// Either absolute (`https://...`), `internal:/path`, `entity:node/N`
    /// or `route:<front>`.
    #[serde(default)]
    pub link: Option<String>,
    pub changed: DateTime<Utc>,
}

impl Node {
    /// System path of the node, independent of any alias.
    pub fn internal_path(&self) -> String {
        format!("/node/{}", self.id)
    }

    /// Canonical route: the alias when set, the system path otherwise.
    pub fn canonical_path(&self) -> String {
        match self.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => alias.to_owned(),
            _ => self.internal_path(),
        }
    }
}

/// Any entity a lifecycle notification can carry.
///
/// Only [`Entity::Node`] is ever pushed; other kinds (users, taxonomy
/// terms, files) pass through the hooks as no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Node(Node),
    Other { kind: String, id: i64 },
}

impl Entity {
    pub fn kind(&self) -> &str {
        match self {
            Entity::Node(_) => "node",
            Entity::Other { kind, .. } => kind,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Node(node) => node.id,
            Entity::Other { id, .. } => *id,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn node(alias: Option<&str>) -> Node {
        Node {
            id: 42,
            category: "page".to_string(),
            title: "About".to_string(),
            alias: alias.map(str::to_string),
            link: None,
            changed: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_canonical_path_prefers_alias() {
        assert_eq!(node(Some("/about-us")).canonical_path(), "/about-us");
        assert_eq!(node(None).canonical_path(), "/node/42");
        assert_eq!(node(Some("  ")).canonical_path(), "/node/42");
    }

    #[test]
    fn test_entity_kind() {
        assert_eq!(Entity::from(node(None)).kind(), "node");
        let term = Entity::Other {
            kind: "taxonomy_term".to_string(),
            id: 3,
        };
        assert_eq!(term.kind(), "taxonomy_term");
        assert_eq!(term.id(), 3);
    }

    #[test]
    fn test_node_deserializes_with_defaults() {
        let json = r#"{"id": 5, "category": "article", "changed": "2024-01-01T00:00:00Z"}"#;
        let parsed: Node = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, 5);
        assert_eq!(parsed.title, "");
        assert!(parsed.alias.is_none());
        assert!(parsed.link.is_none());
        assert_eq!(parsed.changed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }
}
