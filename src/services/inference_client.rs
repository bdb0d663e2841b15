//! Chat-completion transport for the classification orchestrator.
//!
//! Every supported family speaks the OpenAI-compatible wire format, so one
//! HTTP client covers them all. Failures carry the HTTP status (if any) so the
//! orchestrator can decide between fallback and a fatal error category.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::provider::{ProviderFamily, ProviderProfile};

const COPILOT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";
const USER_AGENT: &str = concat!("taxonomist/", env!("CARGO_PKG_VERSION"));
const EDITOR_VERSION: &str = "vscode/1.95.0";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Preferred fallback models for discovery, best first.
const PREFERRED_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "gemma2-9b-it",
];
const NON_CHAT_MARKERS: &[&str] = &["whisper", "guard", "tts"];

/// Failed inference call. `status` is None for transport failures, timeouts included.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InferenceError {
    pub status: Option<u16>,
    pub message: String,
}

impl InferenceError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub profile: &'a ProviderProfile,
    /// Credential or exchanged session token sent as the bearer.
    pub bearer: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, InferenceError>;

    async fn discover_default_model(
        &self,
        profile: &ProviderProfile,
        credential: &str,
    ) -> Result<Option<String>, InferenceError>;
}

/// Swaps a long-lived credential for a short-lived session token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, credential: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SessionToken {
    token: String,
}

pub struct HttpInferenceClient {
    http: reqwest::Client,
}

impl HttpInferenceClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::General(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    fn endpoint(profile: &ProviderProfile, path: &str) -> String {
        format!("{}/{path}", profile.base_url.trim_end_matches('/'))
    }

    fn with_family_headers(
        request: reqwest::RequestBuilder,
        family: ProviderFamily,
    ) -> reqwest::RequestBuilder {
        match family {
            ProviderFamily::Copilot => request
                .header("Copilot-Integration-Id", "vscode-chat")
                .header("Editor-Version", EDITOR_VERSION),
            ProviderFamily::OpenRouter => request.header("X-Title", "Taxonomist"),
            _ => request,
        }
    }
}

async fn error_from_response(response: reqwest::Response) -> InferenceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    InferenceError::http(status, error_message(&body))
}

/// Pulls `error.message` out of an API error body, else a truncated raw body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|json| {
        json.pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(|v| v.as_str())
    });
    match message {
        Some(msg) => msg.to_string(),
        None => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

/// Picks a fallback from a model listing: a preferred id if offered, else the
/// first chat-capable one.
pub fn choose_default_model(ids: &[String]) -> Option<String> {
    PREFERRED_MODELS
        .iter()
        .find(|preferred| ids.iter().any(|id| id == *preferred))
        .map(|id| id.to_string())
        .or_else(|| {
            ids.iter()
                .find(|id| {
                    let lower = id.to_lowercase();
                    !NON_CHAT_MARKERS.iter().any(|marker| lower.contains(marker))
                })
                .cloned()
        })
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, InferenceError> {
        let body = ChatRequest {
            model: &request.profile.model,
            messages: vec![Message {
                role: "user",
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let builder = self
            .http
            .post(Self::endpoint(request.profile, "chat/completions"))
            .bearer_auth(request.bearer)
            .json(&body);
        let response = Self::with_family_headers(builder, request.profile.family)
            .send()
            .await
            .map_err(|e| InferenceError::transport(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::transport(format!("Failed to read response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        tracing::debug!(
            provider = %request.profile.family,
            model = %request.profile.model,
            chars = text.len(),
            "completion received"
        );
        Ok(text)
    }

    async fn discover_default_model(
        &self,
        profile: &ProviderProfile,
        credential: &str,
    ) -> Result<Option<String>, InferenceError> {
        let response = self
            .http
            .get(Self::endpoint(profile, "models"))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| InferenceError::transport(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let listing: ModelList = response
            .json()
            .await
            .map_err(|e| InferenceError::transport(format!("Failed to read model list: {e}")))?;
        let ids: Vec<String> = listing
            .data
            .into_iter()
            .filter(|m| m.active)
            .map(|m| m.id)
            .collect();
        Ok(choose_default_model(&ids))
    }
}

#[async_trait]
impl TokenExchanger for HttpInferenceClient {
    async fn exchange(&self, credential: &str) -> Result<String, InferenceError> {
        let response = self
            .http
            .get(COPILOT_TOKEN_URL)
            .header("Authorization", format!("token {credential}"))
            .header("Accept", "application/json")
            .header("Editor-Version", EDITOR_VERSION)
            .send()
            .await
            .map_err(|e| InferenceError::transport(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let session: SessionToken = response
            .json()
            .await
            .map_err(|e| InferenceError::transport(format!("Failed to read session token: {e}")))?;
        Ok(session.token)
    }
}
