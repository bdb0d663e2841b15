use async_trait::async_trait;

use crate::data::{repository, Database};
use crate::error::AppError;

pub const PROVIDER_PREFERENCE_KEY: &str = "provider_preference";
pub const SELECTED_MODEL_KEY: &str = "groq_selected_model";

/// Persisted provider preference and the per-family model choice.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn provider_preference(&self) -> Result<Option<String>, AppError>;

    async fn selected_model(&self) -> Result<Option<String>, AppError>;

    async fn set_selected_model(&self, model: &str) -> Result<(), AppError>;

    async fn clear_selected_model(&self) -> Result<(), AppError>;
}

pub struct SettingsPreferenceStore {
    db: Database,
}

impl SettingsPreferenceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn set_provider_preference(&self, provider: Option<&str>) -> Result<(), AppError> {
        let conn = self.db.lock()?;
        match provider {
            Some(value) => repository::set_setting(&conn, PROVIDER_PREFERENCE_KEY, value),
            None => repository::delete_setting(&conn, PROVIDER_PREFERENCE_KEY),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        let conn = self.db.lock()?;
        Ok(repository::get_setting(&conn, key)?.filter(|v| !v.trim().is_empty()))
    }
}

#[async_trait]
impl PreferenceStore for SettingsPreferenceStore {
    async fn provider_preference(&self) -> Result<Option<String>, AppError> {
        self.read(PROVIDER_PREFERENCE_KEY)
    }

    async fn selected_model(&self) -> Result<Option<String>, AppError> {
        self.read(SELECTED_MODEL_KEY)
    }

    async fn set_selected_model(&self, model: &str) -> Result<(), AppError> {
        let conn = self.db.lock()?;
        repository::set_setting(&conn, SELECTED_MODEL_KEY, model)
    }

    async fn clear_selected_model(&self) -> Result<(), AppError> {
        let conn = self.db.lock()?;
        repository::delete_setting(&conn, SELECTED_MODEL_KEY)
    }
}
