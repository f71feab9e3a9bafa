use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while describing or serializing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Feed type is not one of `full`, `incremental`, `metadata-and-url`.
    #[error("Invalid feed type '{0}': expected one of full, incremental, metadata-and-url")]
    InvalidFeedType(String),

    /// Data source name does not follow the appliance naming rule.
    #[error("Invalid data source '{0}': must match [A-Za-z_][A-Za-z0-9_-]*")]
    InvalidDataSource(String),

    /// The XML writer failed.
    #[error("Failed to write feed XML: {0}")]
    Xml(String),

    /// Produced bytes were not UTF-8.
    #[error("Generated feed contains invalid UTF-8")]
    InvalidUtf8,
}

// ============================================================================
// Feed Type / Action
// ============================================================================

/// How the appliance applies the records in a feed.
///
/// A `Full` feed replaces the whole data source: records missing from it are
/// removed from the index. `Incremental` and `MetadataAndUrl` only touch the
/// listed URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedType {
    Full,
    Incremental,
    MetadataAndUrl,
}

impl FeedType {
    pub const ALL: [FeedType; 3] = [
        FeedType::Full,
        FeedType::Incremental,
        FeedType::MetadataAndUrl,
    ];

    /// Wire value used in the `<feedtype>` element and the `feedtype` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Full => "full",
            FeedType::Incremental => "incremental",
            FeedType::MetadataAndUrl => "metadata-and-url",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FeedError::InvalidFeedType(s.to_owned()))
    }
}

/// Whether records are added to or deleted from the index.
///
/// `Add` is the appliance default, so it is never written to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    #[default]
    Add,
    Delete,
}

impl Action {
    /// Value of the record `action` attribute, `None` for the implicit default.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            Action::Add => None,
            Action::Delete => Some("delete"),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// One content item pushed to the appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    /// Host-prefixed internal path of the node (`https://site/node/42`).
    pub url: Url,
    /// Absolute URL shown in search results; may point off-site.
    pub display_url: Url,
    pub last_modified: DateTime<Utc>,
}

impl FeedRecord {
    pub const MIME_TYPE: &'static str = "text/html";
    pub const AUTH_METHOD: &'static str = "none";
    pub const CRAWL_IMMEDIATELY: &'static str = "true";

    pub fn new(url: Url, display_url: Url, last_modified: DateTime<Utc>) -> Self {
        Self {
            url,
            display_url,
            last_modified,
        }
    }

    /// `last-modified` attribute value, e.g. `2024-01-01T00:00:00Z`.
    pub fn last_modified_attr(&self) -> String {
        self.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A complete feed: header values plus the ordered records.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEnvelope {
    data_source: String,
    feed_type: FeedType,
    records: Vec<FeedRecord>,
}

impl FeedEnvelope {
    pub fn new(
        data_source: impl Into<String>,
        feed_type: FeedType,
        records: Vec<FeedRecord>,
    ) -> Result<Self, FeedError> {
        let data_source = data_source.into();
        validate_data_source(&data_source)?;
        Ok(Self {
            data_source,
            feed_type,
            records,
        })
    }

    /// Builds an envelope from a feed-type string, failing on unknown types.
    pub fn parse(
        data_source: impl Into<String>,
        feed_type: &str,
        records: Vec<FeedRecord>,
    ) -> Result<Self, FeedError> {
        Self::new(data_source, feed_type.parse()?, records)
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn feed_type(&self) -> FeedType {
        self.feed_type
    }

    pub fn records(&self) -> &[FeedRecord] {
        &self.records
    }
}

/// Checks a data source name against `[A-Za-z_][A-Za-z0-9_-]*`.
pub fn validate_data_source(name: &str) -> Result<(), FeedError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(FeedError::InvalidDataSource(name.to_owned()))
    }
}
