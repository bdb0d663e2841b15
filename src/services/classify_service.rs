use crate::error::AppError;
use crate::models::classification::{ClassificationResult, LinkInput, MAX_PATH_DEPTH, MAX_TAGS};
use crate::models::provider::ProviderProfile;
use crate::services::inference_client::{
    CompletionRequest, InferenceClient, InferenceError, TokenExchanger,
};
use crate::services::preference_store::PreferenceStore;
use crate::services::provider_service::{self, SelectorOptions};
use crate::services::secret_store::SecretStore;

pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_PROMPT_FOLDERS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct ClassifySettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_prompt_folders: usize,
    pub selector: SelectorOptions,
}

impl Default for ClassifySettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_prompt_folders: DEFAULT_MAX_PROMPT_FOLDERS,
            selector: SelectorOptions::default(),
        }
    }
}

/// Credential and preferences as read at the start of one classification call.
/// Later writes by other calls do not affect a call already in flight.
#[derive(Debug, Clone, Default)]
pub struct CallSnapshot {
    pub credential: Option<String>,
    pub provider_preference: Option<String>,
    pub selected_model: Option<String>,
}

impl CallSnapshot {
    pub async fn load(
        secrets: &dyn SecretStore,
        prefs: &dyn PreferenceStore,
    ) -> Result<Self, AppError> {
        Ok(Self {
            credential: secrets.get().await?,
            provider_preference: prefs.provider_preference().await?,
            selected_model: prefs.selected_model().await?,
        })
    }

    pub fn require_credential(&self) -> Result<&str, AppError> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::Precondition(
                    "No API key configured. Run `taxonomist api-key set <key>` first.".to_string(),
                )
            })
    }
}

pub struct ClassifyCtx<'a> {
    pub client: &'a dyn InferenceClient,
    pub exchanger: &'a dyn TokenExchanger,
    pub prefs: &'a dyn PreferenceStore,
    pub settings: ClassifySettings,
}

pub fn build_prompt(link: &LinkInput, existing_folders: &[String], max_folders: usize) -> String {
    let mut prompt = format!(
        "You organize browser bookmarks into a folder hierarchy.\n\n\
         Bookmark title: {}\n\
         Bookmark URL: {}\n",
        link.title.trim(),
        link.url.trim()
    );

    if existing_folders.is_empty() {
        prompt.push_str("\nThere are no folders yet.\n");
    } else {
        prompt.push_str("\nExisting folders:\n");
        for folder in existing_folders.iter().take(max_folders) {
            prompt.push_str(&format!("- {folder}\n"));
        }
        if existing_folders.len() > max_folders {
            prompt.push_str(&format!(
                "...and {} more\n",
                existing_folders.len() - max_folders
            ));
        }
    }

    prompt.push_str(
        "\nRules:\n\
         - Prefer reusing an existing folder path when one fits. Only invent a new folder when none does.\n\
         - Use 1 to 3 levels, broad to specific (e.g. [\"Coding\", \"Guides\", \"HTML\"]).\n\
         - Never repeat a folder name inside the same path.\n\
         - Give 2 to 5 short lowercase tags.\n\n\
         Respond with JSON only:\n\
         {\"folderPath\": [\"...\"], \"tags\": [\"...\"]}",
    );
    prompt
}

/// Outermost `{...}` span, searched inside the first code fence when there is one.
/// The fence's info string (`json`, `JSON`, none) does not matter.
pub fn extract_json_payload(text: &str) -> Option<String> {
    let fenced = text
        .split_once("```")
        .and_then(|(_, rest)| rest.split_once("```"))
        .map(|(inner, _)| inner);
    let region = fenced.unwrap_or(text);
    let start = region.find('{')?;
    let end = region.rfind('}')?;
    (start < end).then(|| region[start..=end].to_string())
}

/// Validates the model output. `folderPath` must be an array; it is cut to
/// three entries. Missing `tags` become empty.
pub fn parse_classification(text: &str) -> Result<ClassificationResult, AppError> {
    let payload = extract_json_payload(text).ok_or_else(|| {
        AppError::ResponseFormat("response did not contain a JSON object".to_string())
    })?;
    let json: serde_json::Value = serde_json::from_str(&payload)
        .map_err(|e| AppError::ResponseFormat(format!("invalid JSON: {e}")))?;

    let folder_path = json
        .get("folderPath")
        .ok_or_else(|| AppError::ResponseFormat("missing folderPath".to_string()))?
        .as_array()
        .ok_or_else(|| AppError::ResponseFormat("folderPath is not an array".to_string()))?
        .iter()
        .filter_map(|v| v.as_str())
        .take(MAX_PATH_DEPTH)
        .map(str::to_string)
        .collect();

    let tags = json
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .take(MAX_TAGS)
                .collect()
        })
        .unwrap_or_default();

    Ok(ClassificationResult { folder_path, tags })
}

/// Maps a failed call onto the user-facing error categories.
fn translate_error(err: InferenceError, profile: &ProviderProfile) -> AppError {
    let provider = profile.family;
    match err.status {
        Some(401) => AppError::Auth(format!("{provider} rejected the API key: {}", err.message)),
        Some(403) => AppError::Permission(format!("{provider}: {}", err.message)),
        Some(404) => AppError::ModelNotFound(format!("{provider}/{}: {}", profile.model, err.message)),
        Some(429) => AppError::RateLimit(format!("{provider}: {}", err.message)),
        Some(status) => AppError::Inference {
            status,
            message: err.message,
        },
        None => AppError::Transport(err.message),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Fallback,
}

/// Classifies one link against the caller's view of existing folders.
///
/// A "model not found" answer from the override-capable family triggers one
/// fallback: the persisted model is cleared, a new default is discovered and
/// persisted, and the request is repeated once. Every other failure is final.
pub async fn classify(
    ctx: &ClassifyCtx<'_>,
    snapshot: &CallSnapshot,
    link: &LinkInput,
    existing_folders: &[String],
) -> Result<ClassificationResult, AppError> {
    let credential = snapshot.require_credential()?;
    let mut profile = provider_service::resolve(
        credential,
        snapshot.provider_preference.as_deref(),
        snapshot.selected_model.as_deref(),
        ctx.settings.selector,
    );
    let bearer = provider_service::session_bearer(&profile, credential, ctx.exchanger).await?;
    let prompt = build_prompt(link, existing_folders, ctx.settings.max_prompt_folders);

    let mut attempt = Attempt::Initial;
    loop {
        tracing::debug!(
            provider = %profile.family,
            model = %profile.model,
            attempt = ?attempt,
            url = %link.url,
            "requesting classification"
        );
        let outcome = ctx
            .client
            .complete(CompletionRequest {
                profile: &profile,
                bearer: &bearer,
                prompt: &prompt,
                max_tokens: ctx.settings.max_tokens,
                temperature: ctx.settings.temperature,
            })
            .await;

        let err = match outcome {
            Ok(text) => return parse_classification(&text),
            Err(err) => err,
        };

        if !err.is_not_found() || !profile.family.supports_model_override() {
            return Err(translate_error(err, &profile));
        }
        if attempt == Attempt::Fallback {
            return Err(AppError::NoFallbackModel(format!(
                "fallback model {} is also unavailable",
                profile.model
            )));
        }

        tracing::warn!(
            provider = %profile.family,
            model = %profile.model,
            "model not found, discovering a fallback"
        );
        ctx.prefs.clear_selected_model().await?;
        let fallback = ctx
            .client
            .discover_default_model(&profile, credential)
            .await
            .map_err(|e| translate_error(e, &profile))?
            .ok_or_else(|| {
                AppError::NoFallbackModel(format!("{} offers no usable model", profile.family))
            })?;
        ctx.prefs.set_selected_model(&fallback).await?;
        tracing::info!(provider = %profile.family, model = %fallback, "switched to fallback model");
        profile.model = fallback;
        attempt = Attempt::Fallback;
    }
}
