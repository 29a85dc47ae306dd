//! Infrastructure adapters for storage backends.

pub mod store;
pub use store::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
