//! Storage layer
//!
//! ## Architecture
//!
//! - **kv**: transactional key-value store with nested buckets, one SQLite file
//! - **gateway**: item CRUD over the `<root>/<items>` bucket
//! - **memory**: volatile gateway with the same semantics
//!
//! Items are stored under the decimal string of their ID; values are JSON.

pub mod error;
pub mod gateway;
pub mod kv;
pub mod memory;
mod schema;

#[cfg(test)]
mod suite;

pub use error::{StorageError, StorageResult};
pub use gateway::{Gateway, SqliteGateway};
pub use kv::{Bucket, KvStore, Tx};
pub use memory::MemoryGateway;
