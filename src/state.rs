use tokio::sync::mpsc::UnboundedSender;

use crate::config::TaxonomyConfig;
use crate::data::Database;
use crate::error::AppError;
use crate::models::organize::OrganizeProgress;
use crate::services::bookmark_store::SqliteBookmarkStore;
use crate::services::classify_service::ClassifyCtx;
use crate::services::inference_client::HttpInferenceClient;
use crate::services::organize_service::OrganizeCtx;
use crate::services::preference_store::SettingsPreferenceStore;
use crate::services::secret_store::KeyringSecretStore;

pub struct AppState {
    pub db: Database,
    pub config: TaxonomyConfig,
    pub store: SqliteBookmarkStore,
    pub prefs: SettingsPreferenceStore,
    pub secrets: KeyringSecretStore,
    pub client: HttpInferenceClient,
}

impl AppState {
    pub fn open(config: TaxonomyConfig) -> Result<Self, AppError> {
        let db = Database::open(&config.db_path)?;
        Self::with_database(db, config)
    }

    pub fn with_database(db: Database, config: TaxonomyConfig) -> Result<Self, AppError> {
        let client = HttpInferenceClient::new(config.request_timeout)?;
        Ok(Self {
            store: SqliteBookmarkStore::new(db.clone()),
            prefs: SettingsPreferenceStore::new(db.clone()),
            secrets: KeyringSecretStore::default(),
            client,
            db,
            config,
        })
    }

    pub fn organize_ctx<'a>(
        &'a self,
        progress: Option<&'a UnboundedSender<OrganizeProgress>>,
    ) -> OrganizeCtx<'a> {
        OrganizeCtx {
            store: &self.store,
            secrets: &self.secrets,
            classify: ClassifyCtx {
                client: &self.client,
                exchanger: &self.client,
                prefs: &self.prefs,
                settings: self.config.classify_settings(),
            },
            item_delay: self.config.item_delay,
            progress,
        }
    }
}
