//! SQLite snapshot of CMS nodes, read by the bulk sync path.

mod nodes;
mod schema;
mod types;

pub use schema::Database;
pub use types::DatabaseError;
