//! Bucketed key-value store
//!
//! A small transactional key-value layer on top of a single SQLite file.
//! Keys and values are opaque bytes grouped into named buckets, buckets can
//! nest, and every bucket carries its own monotonically increasing sequence.
//!
//! ## Transactions
//!
//! - [`KvStore::view`]: read-only, always rolled back, sees a consistent snapshot
//! - [`KvStore::update`]: read-write, committed only when the closure succeeds
//!
//! Read-write transactions are serialized. The connection is opened with an
//! exclusive file lock and a zero busy timeout, so a second process opening
//! the same file fails immediately instead of waiting.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init, ROOT_PARENT};

/// File mode for newly created store files
#[cfg(unix)]
const STORE_FILE_MODE: u32 = 0o600;

/// Handle to an open key-value store
///
/// Holds one long-lived connection. `rusqlite::Connection` is not `Sync`, so
/// the handle keeps it behind a mutex; each transaction holds the lock for
/// its whole duration.
pub struct KvStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl KvStore {
    /// Open or create the store file at `path`
    ///
    /// The file is created with owner-only permissions. Fails with
    /// [`StorageError::Locked`] if another handle already holds the file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }
        create_restricted(path)?;

        let mut conn =
            Connection::open(path).map_err(|e| StorageError::from_open(e, path.to_path_buf()))?;

        conn.busy_timeout(Duration::ZERO)
            .and_then(|_| conn.execute_batch("PRAGMA locking_mode = EXCLUSIVE;"))
            .and_then(|_| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .map_err(|e| StorageError::from_open(e, path.to_path_buf()))?;

        // The bootstrap write takes the exclusive lock and keeps it.
        bootstrap(&mut conn).map_err(|e| StorageError::from_open(e, path.to_path_buf()))?;

        info!("Opened store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a store backed by a private in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        bootstrap(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` inside a read-only transaction
    ///
    /// Any attempt to write fails with [`StorageError::ReadOnly`]. The
    /// transaction is always rolled back.
    pub fn view<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Tx<'_>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;

        conn.execute_batch("PRAGMA query_only = ON;")?;
        let result = run_read(&mut conn, f);
        conn.execute_batch("PRAGMA query_only = OFF;")?;

        result.map_err(classify)
    }

    /// Run `f` inside a read-write transaction
    ///
    /// Changes are committed if `f` returns `Ok`; on `Err` every change made
    /// inside the transaction, including sequence increments, is rolled back.
    pub fn update<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Tx<'_>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from_sqlite)?;

        let out = f(&Tx { conn: &tx }).map_err(classify)?;

        tx.commit().map_err(StorageError::from_sqlite)?;
        Ok(out)
    }

    /// Run raw SQL outside any transaction
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> StorageResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Give untyped SQLite failures from a transaction their specific variant
fn classify(error: StorageError) -> StorageError {
    match error {
        StorageError::Database(e) => StorageError::from_sqlite(e),
        other => other,
    }
}

fn run_read<T, F>(conn: &mut Connection, f: F) -> StorageResult<T>
where
    F: FnOnce(&Tx<'_>) -> StorageResult<T>,
{
    // Dropping the transaction rolls it back.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    f(&Tx { conn: &tx })
}

/// Create the layout tables (if needed) inside one write transaction
///
/// The version row is rewritten on every open so that the connection
/// always performs a write here.
fn bootstrap(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if needs_init(&tx) {
        debug!("Initializing store layout");
    }
    init_schema(&tx)?;
    tx.commit()
}

/// Create the store file with owner-only permissions if it does not exist
fn create_restricted(path: &Path) -> StorageResult<()> {
    if path.exists() {
        return Ok(());
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(STORE_FILE_MODE);
    }

    options
        .open(path)
        .map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;
    Ok(())
}

/// An open transaction
pub struct Tx<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> Tx<'a> {
    /// Look up a top-level bucket
    pub fn bucket(&self, name: &str) -> rusqlite::Result<Option<Bucket<'a>>> {
        find_bucket(self.conn, ROOT_PARENT, name)
    }

    /// Get a top-level bucket, creating it if absent
    pub fn create_bucket_if_not_exists(&self, name: &str) -> rusqlite::Result<Bucket<'a>> {
        create_bucket(self.conn, ROOT_PARENT, name)
    }
}

/// A bucket within an open transaction
#[derive(Debug)]
pub struct Bucket<'a> {
    conn: &'a rusqlite::Connection,
    id: i64,
    name: String,
}

impl<'a> Bucket<'a> {
    /// The bucket's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a nested bucket
    pub fn bucket(&self, name: &str) -> rusqlite::Result<Option<Bucket<'a>>> {
        find_bucket(self.conn, self.id, name)
    }

    /// Get a nested bucket, creating it if absent
    pub fn create_bucket_if_not_exists(&self, name: &str) -> rusqlite::Result<Bucket<'a>> {
        create_bucket(self.conn, self.id, name)
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &[u8]) -> rusqlite::Result<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT value FROM entries WHERE bucket_id = ?1 AND key = ?2",
                params![self.id, key],
                |row| row.get(0),
            )
            .optional()
    }

    /// Store `value` under `key`, replacing any existing value
    pub fn put(&self, key: &[u8], value: &[u8]) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO entries (bucket_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (bucket_id, key) DO UPDATE SET value = excluded.value",
            params![self.id, key, value],
        )?;
        Ok(())
    }

    /// Remove `key`, returning whether it was present
    ///
    /// Removing an absent key is not an error.
    pub fn delete(&self, key: &[u8]) -> rusqlite::Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM entries WHERE bucket_id = ?1 AND key = ?2",
            params![self.id, key],
        )?;
        Ok(removed > 0)
    }

    /// Visit every key/value pair in bytewise key order
    pub fn for_each<F>(&self, mut f: F) -> StorageResult<()>
    where
        F: FnMut(&[u8], &[u8]) -> StorageResult<()>,
    {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM entries WHERE bucket_id = ?1 ORDER BY key")?;
        let mut rows = stmt.query(params![self.id])?;

        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            f(&key, &value)?;
        }

        Ok(())
    }

    /// Advance the bucket's sequence and return the new value
    ///
    /// The first call on a fresh bucket returns 1.
    pub fn next_sequence(&self) -> rusqlite::Result<u64> {
        self.conn.execute(
            "UPDATE buckets SET sequence = sequence + 1 WHERE id = ?1",
            params![self.id],
        )?;
        self.sequence()
    }

    /// Current sequence value without advancing it
    pub fn sequence(&self) -> rusqlite::Result<u64> {
        let seq: i64 = self.conn.query_row(
            "SELECT sequence FROM buckets WHERE id = ?1",
            params![self.id],
            |row| row.get(0),
        )?;
        Ok(seq as u64)
    }

    /// Number of keys in the bucket
    pub fn len(&self) -> rusqlite::Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE bucket_id = ?1",
            params![self.id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Whether the bucket holds no keys
    pub fn is_empty(&self) -> rusqlite::Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn find_bucket<'a>(
    conn: &'a Connection,
    parent_id: i64,
    name: &str,
) -> rusqlite::Result<Option<Bucket<'a>>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM buckets WHERE parent_id = ?1 AND name = ?2",
            params![parent_id, name.as_bytes()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(id.map(|id| Bucket {
        conn,
        id,
        name: name.to_string(),
    }))
}

fn create_bucket<'a>(
    conn: &'a Connection,
    parent_id: i64,
    name: &str,
) -> rusqlite::Result<Bucket<'a>> {
    let created = conn.execute(
        "INSERT OR IGNORE INTO buckets (parent_id, name) VALUES (?1, ?2)",
        params![parent_id, name.as_bytes()],
    )?;
    if created > 0 {
        debug!("Created bucket {}", name);
    }

    find_bucket(conn, parent_id, name)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}
