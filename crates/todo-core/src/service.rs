//! Item service
//!
//! Business rules on top of a [`Gateway`]: content validation, translation
//! of storage failures into domain errors, and ascending-ID ordering of
//! listings. The service keeps no state between calls.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Item, ItemId};
use crate::storage::{Gateway, StorageError};

/// Errors returned by the item service
#[derive(Error, Debug)]
pub enum ItemError {
    /// Content was empty after trimming
    #[error("content cannot be empty")]
    EmptyContent,

    /// The store holds no items
    #[error("item not found")]
    NoItems,

    /// Items could not be read from the store
    #[error("item not found: store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    /// A storage operation failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ItemError {
    /// Whether this error belongs to the not-found category
    pub fn is_not_found(&self) -> bool {
        match self {
            ItemError::NoItems | ItemError::StoreUnavailable(_) => true,
            ItemError::Storage(e) => e.is_not_found(),
            ItemError::EmptyContent => false,
        }
    }

    /// Whether this error was caused by invalid input
    pub fn is_validation(&self) -> bool {
        matches!(self, ItemError::EmptyContent)
    }
}

/// Result type for item service operations
pub type ItemResult<T> = Result<T, ItemError>;

/// Entry points used by the transport layer
pub struct ItemService<G> {
    gateway: G,
}

impl<G: Gateway> ItemService<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Get the underlying gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// All items ordered by ascending ID
    ///
    /// Fails with a not-found error when the store is empty or cannot be read.
    pub fn get_items(&self) -> ItemResult<Vec<Item>> {
        let mut items = self.gateway.find_all().map_err(|e| {
            warn!("Failed to read items: {}", e);
            ItemError::StoreUnavailable(e)
        })?;

        if items.is_empty() {
            return Err(ItemError::NoItems);
        }

        // Store order is lexicographic on the key, not numeric.
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    /// Create an item with trimmed content, not yet completed
    pub fn add_new_item(&self, content: &str) -> ItemResult<Item> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ItemError::EmptyContent);
        }

        let item = self.gateway.insert(content, false)?;
        debug!("Added item {}", item.id);
        Ok(item)
    }

    /// Delete an item
    ///
    /// Returns `true` on success, including when the ID did not exist.
    pub fn delete_item(&self, id: ItemId) -> ItemResult<bool> {
        self.gateway.delete(id)?;
        Ok(true)
    }
}
