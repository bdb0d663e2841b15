use std::collections::HashSet;

use crate::error::AppError;
use crate::models::classification::CandidatePath;
use crate::models::folder_node::MENU_ID;
use crate::services::bookmark_store::BookmarkStore;
use crate::services::name_normalizer::normalize;

/// Folder every resolved path is anchored under.
pub const DEFAULT_CONTAINER_ID: &str = MENU_ID;

/// Label as stored: trimmed, without leading or trailing path separators.
fn storage_label(segment: &str) -> &str {
    segment.trim().trim_matches(|c: char| c == '/' || c == '\\').trim()
}

/// Trims segments, drops those with an empty key (blanks, bare separators,
/// decoration only), and drops any segment whose key already appeared earlier
/// in the path. First occurrence wins.
pub fn sanitize<S: AsRef<str>>(raw: &[S]) -> CandidatePath {
    let mut seen = HashSet::new();
    let segments = raw
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| {
            let key = normalize(s);
            !key.is_empty() && seen.insert(key)
        })
        .map(str::to_string)
        .collect();
    CandidatePath::from_sanitized(segments)
}

/// Walks `path` from the default container, reusing any child folder whose key
/// matches and creating the rest. Returns the id of the deepest folder reached.
///
/// Store failures propagate as-is.
pub async fn ensure<S: AsRef<str>>(
    store: &dyn BookmarkStore,
    path: &[S],
) -> Result<String, AppError> {
    ensure_under(store, DEFAULT_CONTAINER_ID, path).await
}

pub async fn ensure_under<S: AsRef<str>>(
    store: &dyn BookmarkStore,
    start_id: &str,
    path: &[S],
) -> Result<String, AppError> {
    let mut current = start_id.to_string();
    let mut previous_key: Option<String> = None;

    for segment in path {
        let label = storage_label(segment.as_ref());
        let key = normalize(label);
        if key.is_empty() {
            continue;
        }
        // "Technology → Technology" nests a category under itself.
        if previous_key.as_deref() == Some(key.as_str()) {
            continue;
        }

        let existing = store
            .list_children(&current)
            .await?
            .into_iter()
            .find(|child| child.is_folder() && normalize(&child.title) == key);

        current = match existing {
            Some(folder) => folder.id,
            None => {
                let id = store.create_folder(&current, label).await?;
                tracing::debug!(folder_id = %id, title = %label, "created folder");
                id
            }
        };
        previous_key = Some(key);
    }

    Ok(current)
}

/// `sanitize` then `ensure`.
pub async fn resolve<S: AsRef<str>>(
    store: &dyn BookmarkStore,
    raw: &[S],
) -> Result<(CandidatePath, String), AppError> {
    let path = sanitize(raw);
    let folder_id = ensure(store, path.segments()).await?;
    Ok((path, folder_id))
}
