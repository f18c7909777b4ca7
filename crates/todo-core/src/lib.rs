//! Todo Core Library
//!
//! This crate provides item storage for todo: a small CRUD service over
//! a transactional key-value store kept in one local file.
//!
//! # Architecture
//!
//! - **Key-value store**: nested buckets with per-bucket sequences on SQLite
//! - **Gateway**: item records in the `<root>/<items>` bucket
//! - **Item service**: validation, not-found semantics, ordering
//!
//! # Quick Start
//!
//! ```no_run
//! use todo_core::{Config, ItemService, SqliteGateway};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let gateway = SqliteGateway::open(config.database_path(), &config.layout())?;
//! let service = ItemService::new(gateway);
//!
//! let item = service.add_new_item("buy milk")?;
//! let items = service.get_items()?;
//! service.delete_item(item.id)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - `models`: the `Item` record
//! - `storage`: key-value store, gateways and storage errors
//! - `service`: the item service
//! - `config`: application configuration

pub mod config;
pub mod models;
pub mod service;
pub mod storage;

pub use config::{Config, Layout};
pub use models::{Item, ItemId};
pub use service::{ItemError, ItemResult, ItemService};
pub use storage::{Gateway, KvStore, MemoryGateway, SqliteGateway, StorageError, StorageResult};
