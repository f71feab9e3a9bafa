//! Keeps a Google Search Appliance index in step with CMS content.
//!
//! Content changes are pushed to the appliance as XML feeds over its
//! multipart feed endpoint:
//!
//! - [`feed`] builds feed documents and posts them
//! - [`content`] decides which nodes are pushed and derives their URLs
//! - [`sync`] wires both into lifecycle hooks and a bulk full sync
//! - [`storage`] holds the node snapshots bulk sync reads
//! - [`config`] loads the immutable push configuration

pub mod config;
pub mod content;
pub mod feed;
pub mod storage;
pub mod sync;
pub mod util;
