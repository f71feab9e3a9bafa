//! CMS content model and the rules that turn a node into a feed record.
//!
//! - [`node`] - nodes and the entity wrapper lifecycle hooks receive
//! - [`eligibility`] - category whitelist gate applied before every push
//! - [`resolver`] - internal/display URL derivation per record

mod eligibility;
mod node;
mod resolver;

pub use eligibility::{eligible_node, Whitelist};
pub use node::{Entity, Node};
pub use resolver::{parse_link, LinkTarget, ResolveError, UrlResolver};
