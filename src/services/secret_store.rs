use async_trait::async_trait;

use crate::error::AppError;

const KEYRING_SERVICE: &str = "taxonomist";
const KEYRING_USER: &str = "api_key";
pub const API_KEY_ENV: &str = "TAXONOMIST_API_KEY";

/// Opaque holder of the inference credential. Read-only from the engine's side.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>, AppError>;
}

/// Environment variable first, then the OS keychain.
pub struct KeyringSecretStore {
    service: String,
    user: String,
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
            user: KEYRING_USER.to_string(),
        }
    }
}

impl KeyringSecretStore {
    fn entry(&self) -> Result<keyring::Entry, AppError> {
        keyring::Entry::new(&self.service, &self.user)
            .map_err(|e| AppError::General(format!("Keychain error: {e}")))
    }

    pub fn save(&self, key: &str) -> Result<(), AppError> {
        self.entry()?
            .set_password(key.trim())
            .map_err(|e| AppError::General(format!("Failed to save API key: {e}")))
    }

    pub fn delete(&self) -> Result<(), AppError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::General(format!("Failed to delete API key: {e}"))),
        }
    }

    fn read_keychain(&self) -> Result<Option<String>, AppError> {
        match self.entry()?.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::General(format!("Keychain error: {e}"))),
        }
    }
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn get(&self) -> Result<Option<String>, AppError> {
        if let Some(key) = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
        {
            return Ok(Some(key.trim().to_string()));
        }
        Ok(self.read_keychain()?.filter(|k| !k.trim().is_empty()))
    }
}
