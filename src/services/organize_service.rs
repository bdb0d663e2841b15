use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::AppError;
use crate::models::classification::{ClassificationResult, LinkInput};
use crate::models::folder_node::FolderNode;
use crate::models::organize::{OrganizePhase, OrganizeProgress, OrganizeSummary, PlacedLink};
use crate::services::bookmark_store::BookmarkStore;
use crate::services::classify_service::{self, CallSnapshot, ClassifyCtx};
use crate::services::folder_collector;
use crate::services::folder_resolver::{self, DEFAULT_CONTAINER_ID};
use crate::services::secret_store::SecretStore;

/// Pause after each link of a batch, to stay under provider rate limits.
pub const ORGANIZE_ITEM_DELAY: Duration = Duration::from_millis(1500);

pub struct OrganizeCtx<'a> {
    pub store: &'a dyn BookmarkStore,
    pub secrets: &'a dyn SecretStore,
    pub classify: ClassifyCtx<'a>,
    pub item_delay: Duration,
    pub progress: Option<&'a UnboundedSender<OrganizeProgress>>,
}

impl OrganizeCtx<'_> {
    fn emit(&self, phase: OrganizePhase, processed: usize, total: usize, message: String) {
        if let Some(tx) = self.progress {
            let _ = tx.send(OrganizeProgress {
                phase,
                processed,
                total,
                message,
            });
        }
    }
}

/// Folder paths under the default container, as shown to the classifier.
pub async fn existing_folder_paths(store: &dyn BookmarkStore) -> Result<Vec<String>, AppError> {
    let tree = store.get_full_tree().await?;
    Ok(tree
        .find(DEFAULT_CONTAINER_ID)
        .map(FolderNode::folder_paths)
        .unwrap_or_default())
}

/// Classifies against a fresh credential/preference snapshot and the current folders.
pub async fn classify_link(
    ctx: &OrganizeCtx<'_>,
    link: &LinkInput,
) -> Result<ClassificationResult, AppError> {
    let snapshot = CallSnapshot::load(ctx.secrets, ctx.classify.prefs).await?;
    let existing = existing_folder_paths(ctx.store).await?;
    classify_service::classify(&ctx.classify, &snapshot, link, &existing).await
}

/// Classifies an existing link and moves it into the resolved folder.
pub async fn organize_link(ctx: &OrganizeCtx<'_>, link: &FolderNode) -> Result<PlacedLink, AppError> {
    let url = link
        .url
        .as_deref()
        .ok_or_else(|| AppError::Store(format!("not a link: {}", link.id)))?;
    let result = classify_link(ctx, &LinkInput::new(url, link.title.as_str())).await?;
    let (path, folder_id) = folder_resolver::resolve(ctx.store, &result.folder_path).await?;

    let moved = link.parent_id.as_deref() != Some(folder_id.as_str());
    if moved {
        ctx.store.move_node(&link.id, &folder_id).await?;
    }
    tracing::info!(link_id = %link.id, folder_id = %folder_id, path = %path, moved, "link organized");

    Ok(PlacedLink {
        link_id: link.id.clone(),
        folder_id,
        folder_path: path.into_inner(),
        tags: result.tags,
        moved,
    })
}

pub async fn organize_link_by_id(ctx: &OrganizeCtx<'_>, link_id: &str) -> Result<PlacedLink, AppError> {
    let tree = ctx.store.get_full_tree().await?;
    let link = tree
        .find(link_id)
        .filter(|node| node.is_link())
        .ok_or_else(|| AppError::Store(format!("link not found: {link_id}")))?;
    organize_link(ctx, link).await
}

/// Classifies a new bookmark and creates it directly in the resolved folder.
pub async fn add_link(ctx: &OrganizeCtx<'_>, url: &str, title: &str) -> Result<PlacedLink, AppError> {
    let result = classify_link(ctx, &LinkInput::new(url, title)).await?;
    let (path, folder_id) = folder_resolver::resolve(ctx.store, &result.folder_path).await?;
    let link_id = ctx.store.create_link(&folder_id, title, url).await?;
    tracing::info!(link_id = %link_id, folder_id = %folder_id, path = %path, "link added");

    Ok(PlacedLink {
        link_id,
        folder_id,
        folder_path: path.into_inner(),
        tags: result.tags,
        moved: false,
    })
}

/// Reclassifies every link, one at a time, then sweeps empty folders once.
///
/// A failing link is logged and skipped. A failing sweep fails the batch.
pub async fn organize_all(ctx: &OrganizeCtx<'_>) -> Result<OrganizeSummary, AppError> {
    CallSnapshot::load(ctx.secrets, ctx.classify.prefs)
        .await?
        .require_credential()?;

    let tree = ctx.store.get_full_tree().await?;
    let links: Vec<FolderNode> = tree.links().into_iter().cloned().collect();
    let total = links.len();
    let mut summary = OrganizeSummary {
        total,
        ..Default::default()
    };
    tracing::info!(total, "organizing all links");

    for (index, link) in links.iter().enumerate() {
        match organize_link(ctx, link).await {
            Ok(placed) if placed.moved => summary.moved += 1,
            Ok(_) => summary.unchanged += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(link_id = %link.id, url = ?link.url, error = %e, "failed to organize link");
            }
        }
        ctx.emit(
            OrganizePhase::Classifying,
            index + 1,
            total,
            format!("Organized {} of {total}: {}", index + 1, link.title),
        );
        tokio::time::sleep(ctx.item_delay).await;
    }

    ctx.emit(
        OrganizePhase::Cleaning,
        total,
        total,
        "Removing empty folders...".to_string(),
    );
    summary.removed_folders = folder_collector::collect(ctx.store).await?;

    ctx.emit(
        OrganizePhase::Done,
        total,
        total,
        format!(
            "Moved {}, unchanged {}, failed {}, removed {} empty folders.",
            summary.moved, summary.unchanged, summary.failed, summary.removed_folders
        ),
    );
    tracing::info!(
        moved = summary.moved,
        unchanged = summary.unchanged,
        failed = summary.failed,
        removed = summary.removed_folders,
        "organize finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;
    use crate::models::folder_node::{MENU_ID, ROOT_ID};
    use crate::models::provider::ProviderProfile;
    use crate::services::bookmark_store::SqliteBookmarkStore;
    use crate::services::classify_service::ClassifySettings;
    use crate::services::inference_client::{
        CompletionRequest, InferenceClient, InferenceError, TokenExchanger,
    };
    use crate::services::preference_store::SettingsPreferenceStore;
    use async_trait::async_trait;

    /// Answers with the first route whose key appears in the prompt.
    struct RoutingClient {
        routes: Vec<(&'static str, Result<String, InferenceError>)>,
    }

    #[async_trait]
    impl InferenceClient for RoutingClient {
        async fn complete(
            &self,
            request: CompletionRequest<'_>,
        ) -> Result<String, InferenceError> {
            self.routes
                .iter()
                .find(|(key, _)| request.prompt.contains(key))
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| Ok(r#"{"folderPath":["Misc"]}"#.to_string()))
        }

        async fn discover_default_model(
            &self,
            _profile: &ProviderProfile,
            _credential: &str,
        ) -> Result<Option<String>, InferenceError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl TokenExchanger for RoutingClient {
        async fn exchange(&self, credential: &str) -> Result<String, InferenceError> {
            Ok(credential.to_string())
        }
    }

    struct FixedSecret(Option<&'static str>);

    #[async_trait]
    impl SecretStore for FixedSecret {
        async fn get(&self) -> Result<Option<String>, AppError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct Fixture {
        store: SqliteBookmarkStore,
        prefs: SettingsPreferenceStore,
        client: RoutingClient,
        secret: FixedSecret,
    }

    impl Fixture {
        fn new(routes: Vec<(&'static str, Result<String, InferenceError>)>) -> Self {
            let db = Database::open_in_memory().unwrap();
            Self {
                store: SqliteBookmarkStore::new(db.clone()),
                prefs: SettingsPreferenceStore::new(db),
                client: RoutingClient { routes },
                secret: FixedSecret(Some("sk-test")),
            }
        }

        fn ctx<'a>(
            &'a self,
            progress: Option<&'a UnboundedSender<OrganizeProgress>>,
        ) -> OrganizeCtx<'a> {
            OrganizeCtx {
                store: &self.store,
                secrets: &self.secret,
                classify: ClassifyCtx {
                    client: &self.client,
                    exchanger: &self.client,
                    prefs: &self.prefs,
                    settings: ClassifySettings::default(),
                },
                item_delay: Duration::ZERO,
                progress,
            }
        }
    }

    fn route(key: &'static str, body: &str) -> (&'static str, Result<String, InferenceError>) {
        (key, Ok(body.to_string()))
    }

    #[tokio::test]
    async fn organize_all_reuses_folders_and_sweeps_leftovers() {
        let fx = Fixture::new(vec![
            route("developer.mozilla.org", r#"{"folderPath":["Coding","Guides","HTML"],"tags":["html"]}"#),
            route("blog.rust-lang.org", r#"{"folderPath":["💻 coding","Rust"],"tags":["rust"]}"#),
        ]);
        let misc = fx.store.create_folder(MENU_ID, "Unsorted").await.unwrap();
        let old = fx.store.create_folder(MENU_ID, "Old").await.unwrap();
        fx.store.create_folder(&old, "Stale").await.unwrap();
        let html = fx
            .store
            .create_link(&misc, "HTML basics", "https://developer.mozilla.org/html")
            .await
            .unwrap();
        let rust = fx
            .store
            .create_link(&misc, "Rust blog", "https://blog.rust-lang.org")
            .await
            .unwrap();

        let summary = organize_all(&fx.ctx(None)).await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.moved, 2);
        assert_eq!(summary.failed, 0);
        // Unsorted (emptied by the batch), Old and Stale.
        assert_eq!(summary.removed_folders, 3);

        let tree = fx.store.get_full_tree().await.unwrap();
        let menu = tree.find(MENU_ID).unwrap();
        assert_eq!(
            menu.folder_paths(),
            vec!["Coding", "Coding/Guides", "Coding/Guides/HTML", "Coding/Rust"]
        );
        let html_node = tree.find(&html).unwrap();
        assert_eq!(tree.find(html_node.parent_id.as_deref().unwrap()).unwrap().title, "HTML");
        let rust_node = tree.find(&rust).unwrap();
        assert_eq!(tree.find(rust_node.parent_id.as_deref().unwrap()).unwrap().title, "Rust");
    }

    #[tokio::test]
    async fn per_item_failures_do_not_stop_the_batch() {
        let fx = Fixture::new(vec![
            ("broken.example", Err(InferenceError::http(500, "upstream exploded"))),
            route("news.example", r#"{"folderPath":["News"]}"#),
        ]);
        fx.store
            .create_link(MENU_ID, "Broken", "https://broken.example")
            .await
            .unwrap();
        fx.store
            .create_link(MENU_ID, "Daily", "https://news.example")
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let summary = organize_all(&fx.ctx(Some(&tx))).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.moved, 1);

        drop(tx);
        let mut phases = Vec::new();
        while let Some(event) = rx.recv().await {
            phases.push(event.phase);
        }
        assert_eq!(
            phases,
            vec![
                OrganizePhase::Classifying,
                OrganizePhase::Classifying,
                OrganizePhase::Cleaning,
                OrganizePhase::Done
            ]
        );
    }

    #[tokio::test]
    async fn batch_without_credential_touches_nothing() {
        let mut fx = Fixture::new(vec![]);
        fx.secret = FixedSecret(None);
        let empty = fx.store.create_folder(MENU_ID, "Empty").await.unwrap();

        let err = organize_all(&fx.ctx(None)).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
        let tree = fx.store.get_full_tree().await.unwrap();
        assert!(tree.find(&empty).is_some());
    }

    #[tokio::test]
    async fn organize_link_leaves_correctly_placed_links() {
        let fx = Fixture::new(vec![route("docs.rs", r#"{"folderPath":["Coding"]}"#)]);
        let coding = fx.store.create_folder(MENU_ID, "Coding").await.unwrap();
        let link = fx
            .store
            .create_link(&coding, "docs.rs", "https://docs.rs")
            .await
            .unwrap();

        let placed = organize_link_by_id(&fx.ctx(None), &link).await.unwrap();
        assert!(!placed.moved);
        assert_eq!(placed.folder_id, coding);

        let missing = organize_link_by_id(&fx.ctx(None), &coding).await.unwrap_err();
        assert!(matches!(missing, AppError::Store(_)));
    }

    #[tokio::test]
    async fn add_link_creates_in_resolved_folder() {
        let fx = Fixture::new(vec![route(
            "seriouseats.com",
            r#"{"folderPath":["Cooking","Cooking","Recipes"],"tags":["Food","Dinner"]}"#,
        )]);

        let placed = add_link(&fx.ctx(None), "https://www.seriouseats.com/pasta", "Pasta")
            .await
            .unwrap();
        assert_eq!(placed.folder_path, vec!["Cooking", "Recipes"]);
        assert_eq!(placed.tags, vec!["food", "dinner"]);
        assert!(!placed.moved);

        let children = fx.store.list_children(&placed.folder_id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, placed.link_id);
        assert_eq!(
            existing_folder_paths(&fx.store).await.unwrap(),
            vec!["Cooking", "Cooking/Recipes"]
        );
    }

    /// Refuses to list the true root, which only the final sweep reads.
    struct SweepFailingStore {
        inner: SqliteBookmarkStore,
    }

    #[async_trait]
    impl BookmarkStore for SweepFailingStore {
        async fn create_folder(&self, parent_id: &str, title: &str) -> Result<String, AppError> {
            self.inner.create_folder(parent_id, title).await
        }
        async fn create_link(
            &self,
            parent_id: &str,
            title: &str,
            url: &str,
        ) -> Result<String, AppError> {
            self.inner.create_link(parent_id, title, url).await
        }
        async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<(), AppError> {
            self.inner.move_node(id, new_parent_id).await
        }
        async fn list_children(&self, id: &str) -> Result<Vec<FolderNode>, AppError> {
            if id == ROOT_ID {
                return Err(AppError::Store("root listing unavailable".to_string()));
            }
            self.inner.list_children(id).await
        }
        async fn delete_node(&self, id: &str) -> Result<(), AppError> {
            self.inner.delete_node(id).await
        }
        async fn get_full_tree(&self) -> Result<FolderNode, AppError> {
            self.inner.get_full_tree().await
        }
    }

    #[tokio::test]
    async fn sweep_failure_fails_the_batch() {
        let fx = Fixture::new(vec![route("news.example", r#"{"folderPath":["News"]}"#)]);
        let store = SweepFailingStore {
            inner: SqliteBookmarkStore::new(Database::open_in_memory().unwrap()),
        };
        let link = store
            .create_link(MENU_ID, "Daily", "https://news.example")
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx = fx.ctx(Some(&tx));
        ctx.store = &store;
        let err = organize_all(&ctx).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        drop(tx);
        let mut phases = Vec::new();
        while let Some(event) = rx.recv().await {
            phases.push(event.phase);
        }
        assert_eq!(
            phases,
            vec![OrganizePhase::Classifying, OrganizePhase::Cleaning]
        );

        // The item itself was still placed before the sweep ran.
        let tree = store.get_full_tree().await.unwrap();
        let placed = tree.find(&link).unwrap();
        assert_eq!(tree.find(placed.parent_id.as_deref().unwrap()).unwrap().title, "News");
    }
}
