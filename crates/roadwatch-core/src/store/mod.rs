//! Storage backends.
//!
//! - [`SqliteStore`]: durable storage with an atomic forward-only update
//!   (`UPDATE ... SET col = COALESCE(col, ?) ... RETURNING`)
//! - [`InMemoryStore`]: process-local storage using the default
//!   read-merge-persist path, with read/write counters
//!
//! Both implement [`RepairStore`](crate::repair::RepairStore); the
//! in-memory store also serves as a [`HazardSource`](crate::loader::HazardSource).

mod error;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use memory::{DEFAULT_LIST_LIMIT, InMemoryStore, StoreStats};
pub use sqlite::SqliteStore;
