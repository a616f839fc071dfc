//! Portfolio projects: public listing, admin-only writes.

pub mod handlers;
pub mod models;
pub mod store;

pub use handlers::{create_routes, ProjectState};
pub use models::*;
pub use store::{MemoryProjectStore, PgProjectStore, ProjectStore};
