use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::FeedType;
use crate::config::GsaConfig;
use crate::util::{validate_http_url, UrlValidationError};

/// Time allowed to establish the TCP/TLS connection to the appliance.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the whole request, including the appliance's response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Response bodies longer than this are truncated in log output.
const MAX_LOGGED_BODY: usize = 2048;

#[derive(Debug, Error)]
pub enum PushError {
    /// The configured endpoint is not an absolute HTTP(S) URL.
    #[error("Invalid feed endpoint: {0}")]
    InvalidEndpoint(#[from] UrlValidationError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    /// Network error, timeout, or an HTTP error status raised by the client.
    /// All three are handled identically by callers. `body` holds the
    /// truncated response body when the appliance answered with an error.
    #[error("Feed push failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
        body: Option<String>,
    },
}

impl From<reqwest::Error> for PushError {
    fn from(source: reqwest::Error) -> Self {
        PushError::Transport { source, body: None }
    }
}

impl PushError {
    /// Response body the appliance sent along with an error status.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            PushError::Transport { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

/// Basic-auth credentials for the feed endpoint.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Returns credentials only when both parts are present and non-empty.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some(Self {
                username: user.to_owned(),
                password: SecretString::from(pass.to_owned()),
            }),
            _ => None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// What the appliance answered to a feed push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    pub status: u16,
    pub body: String,
}

/// HTTP client for the appliance feed endpoint.
///
/// Feeds are sent as `multipart/form-data` with three fields: `feedtype`,
/// `datasource` and `data` (the XML document).
#[derive(Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
    raise_on_http_error: bool,
}

impl FeedClient {
    /// Creates a client with the standard 10s connect / 120s total timeouts.
    pub fn new(config: &GsaConfig) -> Result<Self, PushError> {
        Self::with_timeouts(config, CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        config: &GsaConfig,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, PushError> {
        let endpoint = validate_http_url(&config.endpoint)?;
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("gsa-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PushError::Client)?;

        let credentials =
            Credentials::from_parts(config.username.as_deref(), config.password.as_deref());
        if credentials.is_none() && (config.username.is_some() || config.password.is_some()) {
            tracing::debug!("Incomplete feed credentials, sending without basic auth");
        }

        Ok(Self {
            http,
            endpoint,
            credentials,
            raise_on_http_error: config.raise_on_http_error,
        })
    }

    /// Posts a feed document and returns the appliance's answer.
    ///
    /// With `raise_on_http_error` set, a non-2xx status is returned as
    /// [`PushError::Transport`]; otherwise any response counts as a receipt.
    pub async fn send(
        &self,
        xml: &str,
        feed_type: FeedType,
        data_source: &str,
    ) -> Result<PushReceipt, PushError> {
        let data = Part::text(xml.to_owned())
            .file_name("feed.xml")
            .mime_str("text/xml")?;
        let form = Form::new()
            .text("feedtype", feed_type.as_str())
            .text("datasource", data_source.to_owned())
            .part("data", data);

        let mut request = self.http.post(self.endpoint.clone()).multipart(form);
        if let Some(credentials) = &self.credentials {
            tracing::trace!(username = %credentials.username, "Feed push authentication configured");
            request = request.basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        let status_error = if self.raise_on_http_error {
            response.error_for_status_ref().err()
        } else {
            None
        };
        let body = response.text().await?;

        if let Some(source) = status_error {
            return Err(PushError::Transport {
                source,
                body: Some(truncate_for_log(&body, MAX_LOGGED_BODY).to_owned()),
            });
        }

        Ok(PushReceipt {
            status: status.as_u16(),
            body,
        })
    }

    /// Posts a feed document and logs the outcome.
    ///
    /// Failures are logged and dropped: the caller is never told, and the
    /// push is not retried.
    pub async fn push(&self, xml: &str, feed_type: FeedType, data_source: &str) {
        match self.send(xml, feed_type, data_source).await {
            Ok(receipt) => {
                tracing::info!(
                    endpoint = %self.endpoint,
                    data_source = %data_source,
                    feed_type = %feed_type,
                    status = receipt.status,
                    body = %truncate_for_log(&receipt.body, MAX_LOGGED_BODY),
                    "Feed pushed to search appliance"
                );
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.endpoint,
                    data_source = %data_source,
                    feed_type = %feed_type,
                    error = %e,
                    body = e.response_body().unwrap_or_default(),
                    "Feed push failed"
                );
            }
        }
    }
}

/// Cuts `text` to at most `max` bytes on a char boundary.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max)
        .last()
        .unwrap_or(0);
    &text[..end]
}
