use crate::error::AppError;
use crate::models::provider::{ProviderFamily, ProviderProfile};
use crate::services::inference_client::TokenExchanger;

/// Credentials longer than this with no recognized prefix are treated as
/// OpenRouter keys when the length heuristic is on.
pub const LENGTH_HEURISTIC_MIN_CHARS: usize = 40;
pub const DEFAULT_FAMILY: ProviderFamily = ProviderFamily::OpenAi;

#[derive(Debug, Clone, Copy)]
enum CredentialMatcher {
    Prefix(&'static [&'static str]),
    LongerThan(usize),
}

impl CredentialMatcher {
    fn matches(self, credential: &str) -> bool {
        match self {
            Self::Prefix(prefixes) => prefixes.iter().any(|p| credential.starts_with(p)),
            Self::LongerThan(len) => credential.chars().count() > len,
        }
    }

    fn is_heuristic(self) -> bool {
        matches!(self, Self::LongerThan(_))
    }
}

/// Evaluated top to bottom; the first match wins. Specific prefixes must stay
/// above `sk-` and the length rule must stay last.
const CREDENTIAL_RULES: &[(CredentialMatcher, ProviderFamily)] = &[
    (CredentialMatcher::Prefix(&["sk-or-"]), ProviderFamily::OpenRouter),
    (CredentialMatcher::Prefix(&["gsk_"]), ProviderFamily::Groq),
    (CredentialMatcher::Prefix(&["AIza"]), ProviderFamily::Gemini),
    (
        CredentialMatcher::Prefix(&["ghu_", "gho_", "github_pat_"]),
        ProviderFamily::Copilot,
    ),
    (CredentialMatcher::Prefix(&["sk-"]), ProviderFamily::OpenAi),
    (
        CredentialMatcher::LongerThan(LENGTH_HEURISTIC_MIN_CHARS),
        ProviderFamily::OpenRouter,
    ),
];

#[derive(Debug, Clone, Copy)]
pub struct SelectorOptions {
    pub length_heuristic: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            length_heuristic: true,
        }
    }
}

pub fn infer_family(credential: &str, options: SelectorOptions) -> ProviderFamily {
    let credential = credential.trim();
    CREDENTIAL_RULES
        .iter()
        .filter(|(matcher, _)| options.length_heuristic || !matcher.is_heuristic())
        .find(|(matcher, _)| matcher.matches(credential))
        .map(|(_, family)| *family)
        .unwrap_or(DEFAULT_FAMILY)
}

/// Picks the profile for one classification call.
///
/// An explicit preference naming a known family wins; otherwise the credential
/// shape decides. A persisted model only applies to the override-capable family.
pub fn resolve(
    credential: &str,
    explicit_preference: Option<&str>,
    persisted_model: Option<&str>,
    options: SelectorOptions,
) -> ProviderProfile {
    let family = explicit_preference
        .and_then(|pref| pref.parse::<ProviderFamily>().ok())
        .unwrap_or_else(|| infer_family(credential, options));

    let mut profile = family.profile();
    if family.supports_model_override() {
        if let Some(model) = persisted_model.map(str::trim).filter(|m| !m.is_empty()) {
            profile.model = model.to_string();
        }
    }
    profile
}

/// Bearer token to send for `profile`. Families that need a session token get
/// one exchanged here; a failed exchange ends the attempt.
pub async fn session_bearer(
    profile: &ProviderProfile,
    credential: &str,
    exchanger: &dyn TokenExchanger,
) -> Result<String, AppError> {
    if !profile.family.requires_token_exchange() {
        return Ok(credential.to_string());
    }
    let token = exchanger.exchange(credential).await.map_err(|e| {
        let detail = match e.status {
            Some(status) => format!("status {status}: {}", e.message),
            None => e.message,
        };
        AppError::TokenExchange(detail)
    })?;
    tracing::debug!(provider = %profile.family, "session token exchanged");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inference_client::InferenceError;
    use async_trait::async_trait;

    const OPTS: SelectorOptions = SelectorOptions {
        length_heuristic: true,
    };

    #[test]
    fn specific_prefixes_beat_generic_ones() {
        assert_eq!(infer_family("sk-or-v1-abc", OPTS), ProviderFamily::OpenRouter);
        assert_eq!(infer_family("sk-proj-abc", OPTS), ProviderFamily::OpenAi);
        assert_eq!(infer_family("gsk_abc", OPTS), ProviderFamily::Groq);
        assert_eq!(infer_family("AIzaSyabc", OPTS), ProviderFamily::Gemini);
        assert_eq!(infer_family("ghu_abc", OPTS), ProviderFamily::Copilot);
        assert_eq!(infer_family("github_pat_abc", OPTS), ProviderFamily::Copilot);
    }

    #[test]
    fn prefix_rules_win_over_length_rule() {
        let long_openai = format!("sk-{}", "a".repeat(60));
        assert_eq!(infer_family(&long_openai, OPTS), ProviderFamily::OpenAi);
        let long_groq = format!("gsk_{}", "a".repeat(60));
        assert_eq!(infer_family(&long_groq, OPTS), ProviderFamily::Groq);
    }

    #[test]
    fn length_rule_is_switchable() {
        let long = "x".repeat(LENGTH_HEURISTIC_MIN_CHARS + 1);
        assert_eq!(infer_family(&long, OPTS), ProviderFamily::OpenRouter);
        assert_eq!(
            infer_family(&long, SelectorOptions { length_heuristic: false }),
            DEFAULT_FAMILY
        );
        let exact = "x".repeat(LENGTH_HEURISTIC_MIN_CHARS);
        assert_eq!(infer_family(&exact, OPTS), DEFAULT_FAMILY);
    }

    #[test]
    fn explicit_preference_overrides_credential_shape() {
        let profile = resolve("sk-proj-abc", Some("gemini"), None, OPTS);
        assert_eq!(profile.family, ProviderFamily::Gemini);

        let fallback = resolve("gsk_abc", Some("not-a-provider"), None, OPTS);
        assert_eq!(fallback.family, ProviderFamily::Groq);
    }

    #[test]
    fn persisted_model_applies_only_to_override_family() {
        let groq = resolve("gsk_abc", None, Some("llama-3.3-70b-versatile"), OPTS);
        assert_eq!(groq.model, "llama-3.3-70b-versatile");

        let openai = resolve("sk-abc", None, Some("llama-3.3-70b-versatile"), OPTS);
        assert_eq!(openai.model, ProviderFamily::OpenAi.profile().model);

        let blank = resolve("gsk_abc", None, Some("  "), OPTS);
        assert_eq!(blank.model, ProviderFamily::Groq.profile().model);
    }

    struct FixedExchanger(Result<String, InferenceError>);

    #[async_trait]
    impl TokenExchanger for FixedExchanger {
        async fn exchange(&self, _credential: &str) -> Result<String, InferenceError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn session_bearer_exchanges_only_when_required() {
        let exchanger = FixedExchanger(Ok("tid=session".to_string()));

        let openai = ProviderFamily::OpenAi.profile();
        assert_eq!(
            session_bearer(&openai, "sk-abc", &exchanger).await.unwrap(),
            "sk-abc"
        );

        let copilot = ProviderFamily::Copilot.profile();
        assert_eq!(
            session_bearer(&copilot, "ghu_abc", &exchanger).await.unwrap(),
            "tid=session"
        );
    }

    #[tokio::test]
    async fn failed_exchange_is_fatal() {
        let exchanger = FixedExchanger(Err(InferenceError::http(401, "bad token")));
        let copilot = ProviderFamily::Copilot.profile();
        let err = session_bearer(&copilot, "ghu_abc", &exchanger)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TokenExchange(msg) if msg.contains("401")));
    }
}
