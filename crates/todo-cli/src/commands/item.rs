//! Item command handlers

use anyhow::{Context, Result};

use todo_core::{Gateway, ItemError, ItemId, ItemService};

use crate::output::Output;

/// List all items
///
/// An empty store is reported as an empty listing, not a failure.
pub fn list<G: Gateway>(service: &ItemService<G>, output: &Output) -> Result<()> {
    match service.get_items() {
        Ok(items) => output.print_items(&items),
        Err(ItemError::NoItems) => output.print_items(&[]),
        Err(e) => Err(e).context("Failed to list items"),
    }
}

/// Add a new item
pub fn add<G: Gateway>(service: &ItemService<G>, content: &str, output: &Output) -> Result<()> {
    let item = service
        .add_new_item(content)
        .context("Failed to add item")?;

    output.success(&format!("Added item {}", item.id));
    output.print_item(&item)
}

/// Delete an item
pub fn delete<G: Gateway>(service: &ItemService<G>, id: ItemId, output: &Output) -> Result<()> {
    service
        .delete_item(id)
        .with_context(|| format!("Failed to delete item {}", id))?;

    output.success(&format!("Deleted item {}", id));
    Ok(())
}
