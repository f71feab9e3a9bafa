use thiserror::Error;
use url::Url;

use super::node::Node;
use crate::feed::FeedRecord;
use crate::util::{join_path, origin_of, validate_http_url, UrlValidationError};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Node of the link category has an empty link field.
    #[error("Node {node_id} has no link to use as display URL")]
    MissingLink { node_id: i64 },

    /// Link field holds a URI scheme that cannot be made absolute.
    #[error("Node {node_id} has unsupported link '{link}'")]
    UnsupportedLink { node_id: i64, link: String },

    #[error("Node {node_id} has an invalid URL: {source}")]
    InvalidUrl {
        node_id: i64,
        #[source]
        source: UrlValidationError,
    },
}

/// Where a link field points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Absolute off-site URL, used unchanged.
    External(Url),
    /// Site-relative path, joined onto the request origin.
    Internal(String),
}

/// Classifies a link field URI.
///
/// ```
/// use gsa_sync::content::{parse_link, LinkTarget};
///
/// assert_eq!(
///     parse_link("entity:node/12").unwrap(),
///     Some(LinkTarget::Internal("/node/12".to_string()))
/// );
/// assert_eq!(parse_link("mailto:x@example.com").unwrap(), None);
/// ```
pub fn parse_link(uri: &str) -> Result<Option<LinkTarget>, UrlValidationError> {
    let uri = uri.trim();

    if uri.starts_with("http://") || uri.starts_with("https://") {
        return validate_http_url(uri).map(|url| Some(LinkTarget::External(url)));
    }
    if let Some(path) = uri.strip_prefix("internal:") {
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{}", path)
        };
        return Ok(Some(LinkTarget::Internal(path)));
    }
    if let Some(id) = uri.strip_prefix("entity:node/") {
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Some(LinkTarget::Internal(format!("/node/{}", id))));
        }
        return Ok(None);
    }
    if uri == "route:<front>" {
        return Ok(Some(LinkTarget::Internal("/".to_owned())));
    }
    Ok(None)
}

/// Derives the record URLs of a node.
///
/// The origin comes from the request that triggered the push, not from the
/// appliance endpoint, so records always point at the public site.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    origin: Url,
    link_category: Option<String>,
}

impl UrlResolver {
    pub fn new(origin: &Url, link_category: Option<String>) -> Self {
        Self {
            origin: origin_of(origin),
            link_category: link_category.filter(|c| !c.is_empty()),
        }
    }

    /// Origin plus the node's system path.
    pub fn internal_url(&self, node: &Node) -> Result<Url, ResolveError> {
        self.join(node, &node.internal_path())
    }

    /// Absolute URL shown in search results.
    ///
    /// Nodes of the link category use their link field; all others use
    /// their canonical route.
    pub fn display_url(&self, node: &Node) -> Result<Url, ResolveError> {
        if self.link_category.as_deref() != Some(node.category.as_str()) {
            return self.join(node, &node.canonical_path());
        }

        let link = match node.link.as_deref().map(str::trim) {
            Some(link) if !link.is_empty() => link,
            _ => return Err(ResolveError::MissingLink { node_id: node.id }),
        };

        let target = parse_link(link).map_err(|source| ResolveError::InvalidUrl {
            node_id: node.id,
            source,
        })?;
        match target {
            Some(LinkTarget::External(url)) => Ok(url),
            Some(LinkTarget::Internal(path)) => self.join(node, &path),
            None => Err(ResolveError::UnsupportedLink {
                node_id: node.id,
                link: link.to_owned(),
            }),
        }
    }

    /// Builds the feed record for a node.
    pub fn resolve(&self, node: &Node) -> Result<FeedRecord, ResolveError> {
        Ok(FeedRecord::new(
            self.internal_url(node)?,
            self.display_url(node)?,
            node.changed,
        ))
    }

    fn join(&self, node: &Node, path: &str) -> Result<Url, ResolveError> {
        join_path(&self.origin, path).map_err(|source| ResolveError::InvalidUrl {
            node_id: node.id,
            source,
        })
    }
}
