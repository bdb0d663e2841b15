use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::services::classify_service::{
    ClassifySettings, DEFAULT_MAX_PROMPT_FOLDERS, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::services::organize_service::ORGANIZE_ITEM_DELAY;
use crate::services::provider_service::SelectorOptions;

const DB_FILE_NAME: &str = "taxonomist.db";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TaxonomyConfig {
    pub db_path: PathBuf,
    pub item_delay: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub length_heuristic: bool,
    pub max_prompt_folders: usize,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            item_delay: ORGANIZE_ITEM_DELAY,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            length_heuristic: true,
            max_prompt_folders: DEFAULT_MAX_PROMPT_FOLDERS,
        }
    }
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "taxonomist")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::General(format!("invalid value for {name}: {raw:?}")))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::General(format!("invalid value for {name}: {raw:?}"))),
    }
}

impl TaxonomyConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with `TAXONOMIST_*` values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("TAXONOMIST_DB_PATH").filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup("TAXONOMIST_ITEM_DELAY_MS") {
            config.item_delay =
                Duration::from_millis(parse_var("TAXONOMIST_ITEM_DELAY_MS", &raw)?);
        }
        if let Some(raw) = lookup("TAXONOMIST_MAX_TOKENS") {
            config.max_tokens = parse_var("TAXONOMIST_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("TAXONOMIST_TEMPERATURE") {
            let temperature: f32 = parse_var("TAXONOMIST_TEMPERATURE", &raw)?;
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AppError::General(format!(
                    "TAXONOMIST_TEMPERATURE must be between 0 and 2, got {temperature}"
                )));
            }
            config.temperature = temperature;
        }
        if let Some(raw) = lookup("TAXONOMIST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_var("TAXONOMIST_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("TAXONOMIST_LENGTH_HEURISTIC") {
            config.length_heuristic = parse_flag("TAXONOMIST_LENGTH_HEURISTIC", &raw)?;
        }
        if let Some(raw) = lookup("TAXONOMIST_MAX_PROMPT_FOLDERS") {
            config.max_prompt_folders = parse_var("TAXONOMIST_MAX_PROMPT_FOLDERS", &raw)?;
        }

        Ok(config)
    }

    pub fn classify_settings(&self) -> ClassifySettings {
        ClassifySettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_prompt_folders: self.max_prompt_folders,
            selector: SelectorOptions {
                length_heuristic: self.length_heuristic,
            },
        }
    }
}
