//! In-memory gateway
//!
//! Keeps items in a `BTreeMap` keyed by the same decimal strings the durable
//! store uses, so `find_all` returns the same lexicographic order. Nothing
//! survives the process; useful for tests and throwaway sessions.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::{StorageError, StorageResult};
use super::gateway::Gateway;
use crate::models::{item_key, Item, ItemId};

#[derive(Debug, Default)]
struct MemoryState {
    items: BTreeMap<String, Item>,
    sequence: ItemId,
}

/// Gateway holding items in process memory
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: RwLock<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StorageError::Poisoned)
    }
}

impl Gateway for MemoryGateway {
    fn find_all(&self) -> StorageResult<Vec<Item>> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn find(&self, id: ItemId) -> StorageResult<Option<Item>> {
        Ok(self.read()?.items.get(&item_key(id)).cloned())
    }

    fn insert(&self, content: &str, is_completed: bool) -> StorageResult<Item> {
        let mut state = self.write()?;
        state.sequence += 1;

        let item = Item::new(state.sequence, content, is_completed);
        state.items.insert(item.key(), item.clone());
        Ok(item)
    }

    fn update(&self, id: ItemId, content: &str, is_completed: bool) -> StorageResult<Item> {
        let mut state = self.write()?;
        let item = state
            .items
            .get_mut(&item_key(id))
            .ok_or(StorageError::NotFound { id })?;

        item.content = content.to_string();
        item.is_completed = is_completed;
        Ok(item.clone())
    }

    fn delete(&self, id: ItemId) -> StorageResult<()> {
        self.write()?.items.remove(&item_key(id));
        Ok(())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.read()?.items.len())
    }
}
