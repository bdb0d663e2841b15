use tokio::sync::mpsc::UnboundedSender;

use crate::data::repository::{self, AuditLogEntry};
use crate::error::AppError;
use crate::models::classification::{ClassificationResult, LinkInput};
use crate::models::folder_node::FolderNode;
use crate::models::organize::{OrganizeProgress, OrganizeSummary, PlacedLink};
use crate::services::bookmark_store::BookmarkStore;
use crate::services::{folder_collector, organize_service};
use crate::state::AppState;

fn audit(state: &AppState, action: &str, summary: &str) {
    if let Ok(conn) = state.db.lock() {
        let _ = repository::insert_audit_log(&conn, action, Some(summary));
    }
}

pub async fn organize_all(
    state: &AppState,
    progress: Option<&UnboundedSender<OrganizeProgress>>,
) -> Result<OrganizeSummary, AppError> {
    let summary = organize_service::organize_all(&state.organize_ctx(progress))
        .await
        .map_err(|e| e.capture())?;
    audit(
        state,
        "organize_all",
        &format!(
            "{} links: {} moved, {} unchanged, {} failed, {} folders removed",
            summary.total, summary.moved, summary.unchanged, summary.failed, summary.removed_folders
        ),
    );
    Ok(summary)
}

pub async fn organize_link(state: &AppState, link_id: &str) -> Result<PlacedLink, AppError> {
    organize_service::organize_link_by_id(&state.organize_ctx(None), link_id)
        .await
        .map_err(|e| e.capture())
}

pub async fn add_link(state: &AppState, url: &str, title: &str) -> Result<PlacedLink, AppError> {
    if url.trim().is_empty() {
        return Err(AppError::General("url is empty".to_string()));
    }
    let placed = organize_service::add_link(&state.organize_ctx(None), url.trim(), title.trim())
        .await
        .map_err(|e| e.capture())?;
    audit(
        state,
        "add_link",
        &format!("{url} -> {}", placed.folder_path.join("/")),
    );
    Ok(placed)
}

/// Classification only; nothing in the store changes.
pub async fn classify_preview(
    state: &AppState,
    url: &str,
    title: &str,
) -> Result<ClassificationResult, AppError> {
    organize_service::classify_link(&state.organize_ctx(None), &LinkInput::new(url, title))
        .await
        .map_err(|e| e.capture())
}

pub async fn cleanup(state: &AppState) -> Result<usize, AppError> {
    let removed = folder_collector::collect(&state.store)
        .await
        .map_err(|e| e.capture())?;
    audit(state, "cleanup", &format!("{removed} empty folders removed"));
    Ok(removed)
}

pub async fn get_tree(state: &AppState) -> Result<FolderNode, AppError> {
    state.store.get_full_tree().await
}

pub fn get_audit_log(state: &AppState, limit: usize) -> Result<Vec<AuditLogEntry>, AppError> {
    let conn = state.db.lock()?;
    repository::get_audit_log(&conn, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaxonomyConfig;
    use crate::data::Database;
    use crate::models::folder_node::MENU_ID;

    fn state() -> AppState {
        AppState::with_database(Database::open_in_memory().unwrap(), TaxonomyConfig::default())
            .unwrap()
    }

    #[tokio::test]
    async fn cleanup_records_audit_entry() {
        let state = state();
        state.store.create_folder(MENU_ID, "Empty").await.unwrap();

        assert_eq!(cleanup(&state).await.unwrap(), 1);
        let log = get_audit_log(&state, 5).unwrap();
        assert_eq!(log[0].action, "cleanup");
        assert_eq!(log[0].summary.as_deref(), Some("1 empty folders removed"));
    }

    #[tokio::test]
    async fn add_link_rejects_blank_url() {
        let state = state();
        let err = add_link(&state, "  ", "Nothing").await.unwrap_err();
        assert!(matches!(err, AppError::General(_)));
    }
}
