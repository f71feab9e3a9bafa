//! URL helpers shared by configuration loading and record URL resolution.

mod url_validator;

pub use url_validator::{join_path, origin_of, validate_http_url, UrlValidationError};
