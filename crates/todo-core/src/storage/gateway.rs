//! Item storage gateway
//!
//! The [`Gateway`] trait is the contract between the item service and
//! persistence. [`SqliteGateway`] keeps items in the nested
//! `<root>/<items>` bucket of a [`KvStore`]: the key is the decimal item
//! ID and the value is the JSON-encoded [`Item`].
//!
//! Identifiers come from the items bucket's sequence, so they are unique
//! and strictly increasing for the lifetime of the store file, and are
//! never reused after a delete.

use std::path::Path;

use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::kv::{Bucket, KvStore, Tx};
use crate::config::Layout;
use crate::models::{item_key, Item, ItemId};

/// Durable CRUD over item records
pub trait Gateway: Send + Sync {
    /// All items in native key order
    ///
    /// Keys are decimal strings, so the order is lexicographic (`"10"` sorts
    /// before `"9"`). An empty collection is not an error.
    fn find_all(&self) -> StorageResult<Vec<Item>>;

    /// Point lookup by ID, `None` when absent
    fn find(&self, id: ItemId) -> StorageResult<Option<Item>>;

    /// Store a new item under the next identifier
    fn insert(&self, content: &str, is_completed: bool) -> StorageResult<Item>;

    /// Overwrite an existing item's content and completion flag
    ///
    /// Fails with [`StorageError::NotFound`] if the ID is absent.
    fn update(&self, id: ItemId, content: &str, is_completed: bool) -> StorageResult<Item>;

    /// Remove an item; removing an absent ID succeeds
    fn delete(&self, id: ItemId) -> StorageResult<()>;

    /// Number of stored items
    fn count(&self) -> StorageResult<usize>;
}

/// Gateway backed by a bucketed SQLite key-value store
#[derive(Debug)]
pub struct SqliteGateway {
    store: KvStore,
    layout: Layout,
}

impl SqliteGateway {
    /// Open or create the store file and make sure both buckets exist
    ///
    /// Fails if the file cannot be opened, is locked by another process, or
    /// either bucket cannot be created.
    pub fn open(path: impl AsRef<Path>, layout: &Layout) -> StorageResult<Self> {
        let store = KvStore::open(path)?;
        Self::with_store(store, layout)
    }

    /// Open a gateway over an in-memory store (for testing)
    pub fn open_in_memory(layout: &Layout) -> StorageResult<Self> {
        Self::with_store(KvStore::open_in_memory()?, layout)
    }

    fn with_store(store: KvStore, layout: &Layout) -> StorageResult<Self> {
        store.update(|tx| {
            let root = tx
                .create_bucket_if_not_exists(&layout.root_bucket)
                .map_err(|_| StorageError::BucketCreation {
                    name: layout.root_bucket.clone(),
                })?;
            root.create_bucket_if_not_exists(&layout.items_bucket)
                .map_err(|_| StorageError::BucketCreation {
                    name: layout.items_bucket.clone(),
                })?;
            Ok(())
        })?;

        info!(
            "Item buckets ready: {}/{}",
            layout.root_bucket, layout.items_bucket
        );

        Ok(Self {
            store,
            layout: layout.clone(),
        })
    }

    /// The bucket names in use
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The underlying key-value store
    pub fn store(&self) -> &KvStore {
        &self.store
    }

    fn items<'a>(&self, op: &'static str, tx: &Tx<'a>) -> StorageResult<Bucket<'a>> {
        let root_name = &self.layout.root_bucket;
        let items_name = &self.layout.items_bucket;

        let root = tx
            .bucket(root_name)
            .map_err(|source| bucket_access(op, root_name, source))?
            .ok_or_else(|| StorageError::BucketMissing {
                name: root_name.clone(),
            })?;
        root.bucket(items_name)
            .map_err(|source| bucket_access(op, items_name, source))?
            .ok_or_else(|| StorageError::BucketMissing {
                name: items_name.clone(),
            })
    }
}

impl Gateway for SqliteGateway {
    fn find_all(&self) -> StorageResult<Vec<Item>> {
        self.store.view(|tx| {
            let mut items = Vec::new();
            self.items("find_all", tx)?
                .for_each(|key, value| {
                    items.push(decode("find_all", key_id(key), value)?);
                    Ok(())
                })
                .map_err(|e| match e {
                    StorageError::Database(source) => {
                        bucket_access("find_all", &self.layout.items_bucket, source)
                    }
                    other => other,
                })?;
            Ok(items)
        })
    }

    fn find(&self, id: ItemId) -> StorageResult<Option<Item>> {
        self.store.view(|tx| {
            let value = self
                .items("find", tx)?
                .get(item_key(id).as_bytes())
                .map_err(|source| StorageError::Read {
                    op: "find",
                    id,
                    source,
                })?;
            value.map(|v| decode("find", id, &v)).transpose()
        })
    }

    fn insert(&self, content: &str, is_completed: bool) -> StorageResult<Item> {
        let item = self.store.update(|tx| {
            let bucket = self.items("insert", tx)?;
            let id = bucket
                .next_sequence()
                .map_err(|source| StorageError::Sequence {
                    op: "insert",
                    bucket: bucket.name().to_string(),
                    source,
                })?;

            let item = Item::new(id, content, is_completed);
            let value = encode("insert", &item)?;
            bucket
                .put(item.key().as_bytes(), &value)
                .map_err(|source| StorageError::Write {
                    op: "insert",
                    id,
                    source,
                })?;
            Ok(item)
        })?;

        debug!("Inserted item {}", item.id);
        Ok(item)
    }

    fn update(&self, id: ItemId, content: &str, is_completed: bool) -> StorageResult<Item> {
        let item = self.store.update(|tx| {
            let bucket = self.items("update", tx)?;
            let key = item_key(id);

            let existing = bucket
                .get(key.as_bytes())
                .map_err(|source| StorageError::Read {
                    op: "update",
                    id,
                    source,
                })?
                .ok_or(StorageError::NotFound { id })?;
            let mut item = decode("update", id, &existing)?;

            item.content = content.to_string();
            item.is_completed = is_completed;

            let value = encode("update", &item)?;
            bucket
                .put(key.as_bytes(), &value)
                .map_err(|source| StorageError::Write {
                    op: "update",
                    id,
                    source,
                })?;
            Ok(item)
        })?;

        debug!("Updated item {}", id);
        Ok(item)
    }

    fn delete(&self, id: ItemId) -> StorageResult<()> {
        let removed = self.store.update(|tx| {
            self.items("delete", tx)?
                .delete(item_key(id).as_bytes())
                .map_err(|source| StorageError::Write {
                    op: "delete",
                    id,
                    source,
                })
        })?;

        if removed {
            debug!("Deleted item {}", id);
        } else {
            debug!("Delete of item {} was a no-op, key absent", id);
        }
        Ok(())
    }

    fn count(&self) -> StorageResult<usize> {
        self.store.view(|tx| {
            self.items("count", tx)?
                .len()
                .map_err(|source| bucket_access("count", &self.layout.items_bucket, source))
        })
    }
}

fn bucket_access(op: &'static str, name: &str, source: rusqlite::Error) -> StorageError {
    StorageError::BucketAccess {
        op,
        name: name.to_string(),
        source,
    }
}

fn encode(op: &'static str, item: &Item) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(item).map_err(|source| StorageError::Serialization {
        op,
        id: item.id,
        source,
    })
}

fn decode(op: &'static str, id: ItemId, value: &[u8]) -> StorageResult<Item> {
    serde_json::from_slice(value).map_err(|source| StorageError::Serialization { op, id, source })
}

/// Best-effort ID from a raw key, for error context only
fn key_id(key: &[u8]) -> ItemId {
    std::str::from_utf8(key)
        .ok()
        .and_then(|k| k.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::suite;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn layout() -> Layout {
        Layout::default()
    }

    #[test]
    fn test_gateway_suite() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        suite::run(&gateway);
    }

    #[test]
    fn test_gateway_suite_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = SqliteGateway::open(temp_dir.path().join("test.db"), &layout()).unwrap();
        suite::run(&gateway);
    }

    #[test]
    fn test_open_creates_buckets() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();

        gateway
            .store()
            .view(|tx| {
                let root = tx.bucket("DB")?.expect("root bucket");
                assert!(root.bucket("ITEMS")?.is_some());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_custom_bucket_names() {
        let layout = Layout {
            root_bucket: "root".to_string(),
            items_bucket: "items".to_string(),
        };
        let gateway = SqliteGateway::open_in_memory(&layout).unwrap();
        gateway.insert("buy milk", false).unwrap();

        assert_eq!(gateway.layout(), &layout);
        gateway
            .store()
            .view(|tx| {
                let items = tx.bucket("root")?.unwrap().bucket("items")?.unwrap();
                assert_eq!(items.len()?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_stored_value_format() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        gateway.insert("buy milk", false).unwrap();

        let raw = gateway
            .store()
            .view(|tx| Ok(gateway.items("find", tx)?.get(b"1")?))
            .unwrap()
            .unwrap();

        assert_eq!(
            String::from_utf8(raw).unwrap(),
            r#"{"id":1,"content":"buy milk","isCompleted":false}"#
        );
    }

    #[test]
    fn test_find_all_native_order_is_lexicographic() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        for i in 1..=10 {
            gateway.insert(&format!("item {}", i), false).unwrap();
        }

        let ids: Vec<ItemId> = gateway.find_all().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 10, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_ids_not_reused_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todolist.db");

        {
            let gateway = SqliteGateway::open(&path, &layout()).unwrap();
            gateway.insert("one", false).unwrap();
            let two = gateway.insert("two", false).unwrap();
            gateway.delete(two.id).unwrap();
        }

        let gateway = SqliteGateway::open(&path, &layout()).unwrap();
        let three = gateway.insert("three", false).unwrap();

        assert_eq!(three.id, 3);
        assert_eq!(gateway.count().unwrap(), 2);
    }

    #[test]
    fn test_corrupt_value_is_reported() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        gateway.insert("fine", false).unwrap();
        gateway
            .store()
            .update(|tx| {
                gateway.items("insert", tx)?.put(b"2", b"not json")?;
                Ok(())
            })
            .unwrap();

        let err = gateway.find_all().unwrap_err();
        assert!(matches!(
            err,
            StorageError::Serialization {
                op: "find_all",
                id: 2,
                ..
            }
        ));

        let err = gateway.update(2, "x", true).unwrap_err();
        assert!(matches!(err, StorageError::Serialization { id: 2, .. }));
        assert!(err.to_string().contains("during update"));
    }

    #[test]
    fn test_sequence_failure_names_insert() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        gateway
            .store()
            .execute_raw(
                "CREATE TRIGGER fail_sequence BEFORE UPDATE ON buckets
                 BEGIN SELECT RAISE(ABORT, 'io failure'); END;",
            )
            .unwrap();

        let err = gateway.insert("buy milk", false).unwrap_err();

        assert!(matches!(err, StorageError::Sequence { op: "insert", .. }));
        let message = err.to_string();
        assert!(message.contains("bucket ITEMS during insert"), "{}", message);
        assert!(message.contains("io failure"), "{}", message);
        assert_eq!(gateway.count().unwrap(), 0);
    }

    #[test]
    fn test_write_failure_names_update_and_id() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        gateway.insert("buy milk", false).unwrap();
        gateway
            .store()
            .execute_raw(
                "CREATE TRIGGER fail_write BEFORE UPDATE ON entries
                 BEGIN SELECT RAISE(ABORT, 'io failure'); END;",
            )
            .unwrap();

        let err = gateway.update(1, "get mail", true).unwrap_err();

        assert!(matches!(err, StorageError::Write { id: 1, .. }));
        assert!(err.to_string().contains("item 1 during update"));
        assert_eq!(
            gateway.find(1).unwrap(),
            Some(Item::new(1, "buy milk", false))
        );
    }

    #[test]
    fn test_read_failure_names_operation_and_id() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        gateway.insert("buy milk", false).unwrap();
        gateway.store().execute_raw("DROP TABLE entries;").unwrap();

        let err = gateway.find(1).unwrap_err();
        assert!(matches!(err, StorageError::Read { id: 1, .. }));
        assert!(err.to_string().contains("item 1 during find"));

        let err = gateway.update(1, "get mail", true).unwrap_err();
        assert!(matches!(err, StorageError::Read { id: 1, .. }));
        assert!(err.to_string().contains("item 1 during update"));

        let err = gateway.find_all().unwrap_err();
        assert!(matches!(err, StorageError::BucketAccess { .. }));
        assert!(err.to_string().contains("during find_all"));

        let err = gateway.count().unwrap_err();
        assert!(matches!(err, StorageError::BucketAccess { op: "count", .. }));
    }

    #[test]
    fn test_open_locked_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todolist.db");

        let _gateway = SqliteGateway::open(&path, &layout()).unwrap();
        let err = SqliteGateway::open(&path, &layout()).unwrap_err();

        assert!(matches!(err, StorageError::Locked { .. }));
    }

    fn insert_from_threads(gateway: Arc<SqliteGateway>) {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let gateway = Arc::clone(&gateway);
                thread::spawn(move || {
                    (0..25)
                        .map(|i| gateway.insert(&format!("{}-{}", t, i), false).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<ItemId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 100);
        assert_eq!(ids.iter().copied().max(), Some(100));
        assert_eq!(gateway.count().unwrap(), 100);
    }

    #[test]
    fn test_concurrent_inserts_get_distinct_ids() {
        let gateway = SqliteGateway::open_in_memory(&layout()).unwrap();
        insert_from_threads(Arc::new(gateway));
    }

    #[test]
    fn test_concurrent_inserts_on_disk_get_distinct_ids() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todolist.db");

        insert_from_threads(Arc::new(SqliteGateway::open(&path, &layout()).unwrap()));

        // Sequence and records were committed to the file
        let gateway = SqliteGateway::open(&path, &layout()).unwrap();
        assert_eq!(gateway.count().unwrap(), 100);
        assert_eq!(gateway.insert("after", false).unwrap().id, 101);
    }
}
