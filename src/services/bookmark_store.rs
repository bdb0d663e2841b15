use async_trait::async_trait;

use crate::data::{repository, Database};
use crate::error::AppError;
use crate::models::folder_node::FolderNode;

/// Tree of folders and links that the taxonomy engine reads and reshapes.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn create_folder(&self, parent_id: &str, title: &str) -> Result<String, AppError>;

    async fn create_link(&self, parent_id: &str, title: &str, url: &str)
        -> Result<String, AppError>;

    async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<(), AppError>;

    /// Direct children of `id`. Returned nodes are shallow.
    async fn list_children(&self, id: &str) -> Result<Vec<FolderNode>, AppError>;

    /// Fails if the node still has children.
    async fn delete_node(&self, id: &str) -> Result<(), AppError>;

    async fn get_full_tree(&self) -> Result<FolderNode, AppError>;
}

pub struct SqliteBookmarkStore {
    db: Database,
}

impl SqliteBookmarkStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn create_folder(&self, parent_id: &str, title: &str) -> Result<String, AppError> {
        let conn = self.db.lock()?;
        repository::insert_node(&conn, parent_id, title, None)
    }

    async fn create_link(
        &self,
        parent_id: &str,
        title: &str,
        url: &str,
    ) -> Result<String, AppError> {
        let conn = self.db.lock()?;
        repository::insert_node(&conn, parent_id, title, Some(url))
    }

    async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<(), AppError> {
        let conn = self.db.lock()?;
        repository::move_node(&conn, id, new_parent_id)
    }

    async fn list_children(&self, id: &str) -> Result<Vec<FolderNode>, AppError> {
        let conn = self.db.lock()?;
        repository::list_children(&conn, id)
    }

    async fn delete_node(&self, id: &str) -> Result<(), AppError> {
        let conn = self.db.lock()?;
        repository::delete_node(&conn, id)
    }

    async fn get_full_tree(&self) -> Result<FolderNode, AppError> {
        let conn = self.db.lock()?;
        repository::load_tree(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::folder_node::{MENU_ID, ROOT_ID};

    #[tokio::test]
    async fn sqlite_store_round_trips_through_trait() {
        let store = SqliteBookmarkStore::new(Database::open_in_memory().unwrap());
        let folder = store.create_folder(MENU_ID, "Reading").await.unwrap();
        let link = store
            .create_link(&folder, "Blog", "https://blog.example")
            .await
            .unwrap();

        let children = store.list_children(&folder).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].is_link());

        store.move_node(&link, MENU_ID).await.unwrap();
        store.delete_node(&folder).await.unwrap();

        let tree = store.get_full_tree().await.unwrap();
        assert_eq!(tree.id, ROOT_ID);
        assert!(tree.find(&folder).is_none());
        assert!(tree.find(&link).is_some());
    }
}
