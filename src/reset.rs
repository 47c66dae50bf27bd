//! Pre-pass that recursively empties a destination container.

use tracing::{debug, info};

use crate::store::{Store, StoreError};

/// Deletes every item and child container under `container_id`, leaving the
/// container itself present but empty. Already-empty containers are a no-op.
///
/// Containers form a tree (no cycles), so an explicit stack suffices: items
/// are deleted as each container is discovered, child containers afterwards
/// in deepest-first order so every container is empty by the time it is
/// removed.
pub async fn empty_container<S: Store + ?Sized>(
    store: &S,
    container_id: &str,
) -> Result<(), StoreError> {
    let mut discovered: Vec<String> = Vec::new();
    let mut stack: Vec<String> = vec![container_id.to_string()];

    while let Some(id) = stack.pop() {
        for item in store.list_items(&id).await? {
            debug!(item_id = %item.id, name = %item.name, "deleting item");
            store.delete_item(&item.id).await?;
        }
        for child in store.list_containers(&id).await? {
            discovered.push(child.id.clone());
            stack.push(child.id);
        }
    }

    // Discovery order puts every parent before its descendants.
    for id in discovered.into_iter().rev() {
        debug!(container_id = %id, "deleting container");
        store.delete_container(&id).await?;
    }

    info!(container_id, "destination container emptied");
    Ok(())
}
