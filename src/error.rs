use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Missing configuration: {0}")]
    Precondition(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("No fallback model available: {0}")]
    NoFallbackModel(String),

    #[error("Malformed classification response: {0}")]
    ResponseFormat(String),

    #[error("Bookmark store error: {0}")]
    Store(String),

    #[error("Session token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Inference API error {status}: {message}")]
    Inference { status: u16, message: String },

    #[error("{0}")]
    General(String),
}

impl AppError {
    pub fn capture(self) -> Self {
        tracing::error!(error = %self, "operation failed");
        self
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_have_distinct_prefixes() {
        let messages = [
            AppError::Precondition("x".into()).to_string(),
            AppError::Auth("x".into()).to_string(),
            AppError::RateLimit("x".into()).to_string(),
            AppError::Permission("x".into()).to_string(),
            AppError::ModelNotFound("x".into()).to_string(),
            AppError::NoFallbackModel("x".into()).to_string(),
            AppError::ResponseFormat("x".into()).to_string(),
            AppError::Store("x".into()).to_string(),
            AppError::TokenExchange("x".into()).to_string(),
            AppError::Transport("x".into()).to_string(),
        ];
        let prefixes: std::collections::HashSet<&str> = messages
            .iter()
            .map(|m| m.split(':').next().unwrap_or_default())
            .collect();
        assert_eq!(prefixes.len(), messages.len());
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Store("folder not empty: abc".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Bookmark store error: folder not empty: abc\"");
    }
}
