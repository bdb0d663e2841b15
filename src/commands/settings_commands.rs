use serde::Serialize;

use crate::error::AppError;
use crate::models::provider::{ProviderFamily, ProviderProfile};
use crate::services::preference_store::PreferenceStore;
use crate::services::provider_service;
use crate::services::secret_store::SecretStore;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub has_api_key: bool,
    pub preference: Option<String>,
    pub selected_model: Option<String>,
    /// Profile the next classification would use, if a key is configured.
    pub active: Option<ProviderProfile>,
}

pub fn save_api_key(state: &AppState, key: &str) -> Result<(), AppError> {
    if key.trim().is_empty() {
        return Err(AppError::General("API key is empty".to_string()));
    }
    state.secrets.save(key)
}

pub async fn has_api_key(state: &AppState) -> Result<bool, AppError> {
    Ok(state.secrets.get().await?.is_some())
}

pub fn delete_api_key(state: &AppState) -> Result<(), AppError> {
    state.secrets.delete()
}

/// `None` clears the preference so the credential shape decides again.
pub fn set_provider(state: &AppState, provider: Option<&str>) -> Result<(), AppError> {
    let normalized = provider
        .map(|p| p.parse::<ProviderFamily>().map_err(AppError::General))
        .transpose()?
        .map(|family| family.to_string());
    state.prefs.set_provider_preference(normalized.as_deref())
}

pub async fn set_model(state: &AppState, model: Option<&str>) -> Result<(), AppError> {
    match model.map(str::trim).filter(|m| !m.is_empty()) {
        Some(model) => state.prefs.set_selected_model(model).await,
        None => state.prefs.clear_selected_model().await,
    }
}

pub async fn provider_status(state: &AppState) -> Result<ProviderStatus, AppError> {
    let credential = state.secrets.get().await?;
    let preference = state.prefs.provider_preference().await?;
    let selected_model = state.prefs.selected_model().await?;
    let active = credential.as_deref().map(|key| {
        provider_service::resolve(
            key,
            preference.as_deref(),
            selected_model.as_deref(),
            state.config.classify_settings().selector,
        )
    });
    Ok(ProviderStatus {
        has_api_key: credential.is_some(),
        preference,
        selected_model,
        active,
    })
}
