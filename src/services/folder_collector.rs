use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::AppError;
use crate::models::folder_node::{is_system_root, ROOT_ID};
use crate::services::bookmark_store::BookmarkStore;

/// Deletes every folder that holds nothing, bottom-up, in a single pass.
///
/// Each folder's child list is read from the store once, before its children
/// are visited; after that only the store's answers are trusted. A folder whose
/// children were all removed in this pass is removed too. System roots are never
/// deleted. Returns the number of folders actually deleted.
pub async fn collect(store: &dyn BookmarkStore) -> Result<usize, AppError> {
    collect_from(store, ROOT_ID).await
}

pub async fn collect_from(store: &dyn BookmarkStore, start_id: &str) -> Result<usize, AppError> {
    let mut removed = 0;
    visit(store, start_id.to_string(), &mut removed).await?;
    tracing::info!(removed, "empty folder sweep finished");
    Ok(removed)
}

/// Resolves to true when the folder was removed, i.e. it reports "empty" to its parent.
fn visit<'a>(
    store: &'a dyn BookmarkStore,
    folder_id: String,
    removed: &'a mut usize,
) -> BoxFuture<'a, Result<bool, AppError>> {
    async move {
        let snapshot = store.list_children(&folder_id).await?;

        let mut has_content = false;
        for child in snapshot {
            if child.is_link() {
                has_content = true;
                continue;
            }
            if !visit(store, child.id, removed).await? {
                has_content = true;
            }
        }

        if has_content || is_system_root(&folder_id) {
            return Ok(false);
        }

        match store.delete_node(&folder_id).await {
            Ok(()) => {
                *removed += 1;
                tracing::debug!(folder_id = %folder_id, "removed empty folder");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(folder_id = %folder_id, error = %e, "could not remove empty folder");
                Ok(false)
            }
        }
    }
    .boxed()
}
