use thiserror::Error;
use url::Url;

/// Errors that can occur while validating or composing URLs.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// A site-relative path was expected but something else was given.
    #[error("Not a site-relative path: {0}")]
    NotAPath(String),
}

/// Validates a URL string as an absolute HTTP(S) URL with a host.
///
/// Unlike a feed fetcher, the GSA endpoint and the CMS origin are usually
/// internal hosts, so private and loopback addresses are accepted.
///
/// # Examples
///
/// ```
/// use gsa_sync::util::validate_http_url;
///
/// let url = validate_http_url("http://gsa.example.com:19900/xmlfeed").unwrap();
/// assert_eq!(url.port(), Some(19900));
///
/// assert!(validate_http_url("file:///etc/passwd").is_err());
/// assert!(validate_http_url("/relative/path").is_err());
/// ```
pub fn validate_http_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost(url_str.to_owned())),
    }
}

/// Reduces a URL to its origin: scheme, host and port, with an empty path.
pub fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    // Credentials never belong to a public record URL.
    let _ = origin.set_username("");
    let _ = origin.set_password(None);
    origin
}

/// Joins a site-relative path (`/about-us`) onto an origin.
///
/// The path must start with a single `/`; protocol-relative references
/// (`//host/x`) are rejected so a path cannot move the URL to another host.
pub fn join_path(origin: &Url, path: &str) -> Result<Url, UrlValidationError> {
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(UrlValidationError::NotAPath(path.to_owned()));
    }
    Ok(origin_of(origin).join(path)?)
}
