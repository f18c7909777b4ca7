//! Data models for todo
//!
//! Defines the `Item` record persisted by the storage gateway.

use serde::{Deserialize, Serialize};

/// Identifier assigned to an item by the store
pub type ItemId = u64;

/// A single todo entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Unique identifier, taken from the items bucket sequence
    pub id: ItemId,
    /// Text content
    pub content: String,
    /// Whether the item has been completed
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

impl Item {
    /// Create an item with a store-assigned ID
    pub fn new(id: ItemId, content: impl Into<String>, is_completed: bool) -> Self {
        Self {
            id,
            content: content.into(),
            is_completed,
        }
    }

    /// The key this item is stored under: the decimal string of its ID
    pub fn key(&self) -> String {
        item_key(self.id)
    }
}

/// Encode an item ID as a storage key
pub fn item_key(id: ItemId) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serialization_field_names() {
        let item = Item::new(7, "buy milk", true);
        let json = serde_json::to_string(&item).unwrap();

        assert_eq!(json, r#"{"id":7,"content":"buy milk","isCompleted":true}"#);
    }

    #[test]
    fn test_item_deserialization() {
        let item: Item =
            serde_json::from_str(r#"{"id":12,"content":"get mail","isCompleted":false}"#).unwrap();

        assert_eq!(item, Item::new(12, "get mail", false));
    }

    #[test]
    fn test_item_key_is_decimal() {
        assert_eq!(item_key(1), "1");
        assert_eq!(item_key(10), "10");
        assert_eq!(Item::new(42, "x", false).key(), "42");
    }
}
