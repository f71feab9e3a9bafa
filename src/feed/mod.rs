//! GSA feed construction and delivery.
//!
//! - [`builder`] turns a [`FeedEnvelope`] into the XML document the appliance
//!   expects. It is pure and needs no network.
//! - [`transport`] posts that document to the appliance feed endpoint as
//!   multipart form data and logs the outcome.
//!
//! # Example
//!
//! ```ignore
//! let envelope = FeedEnvelope::new("cms", FeedType::Incremental, records)?;
//! let xml = build_feed(&envelope, Action::Add, &dtd_url)?;
//! client.push(&xml, envelope.feed_type(), envelope.data_source()).await;
//! ```

pub mod builder;
pub mod transport;
mod types;

pub use builder::build_feed;
pub use transport::{Credentials, FeedClient, PushError, PushReceipt};
pub use types::{validate_data_source, Action, FeedEnvelope, FeedError, FeedRecord, FeedType};
