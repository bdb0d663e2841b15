use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    OpenAi,
    OpenRouter,
    Groq,
    Gemini,
    Copilot,
}

impl ProviderFamily {
    pub const ALL: [ProviderFamily; 5] = [
        Self::OpenAi,
        Self::OpenRouter,
        Self::Groq,
        Self::Gemini,
        Self::Copilot,
    ];

    /// Only this family honors a persisted model choice and model discovery.
    pub fn supports_model_override(self) -> bool {
        matches!(self, Self::Groq)
    }

    /// The primary credential must be swapped for a session token before use.
    pub fn requires_token_exchange(self) -> bool {
        matches!(self, Self::Copilot)
    }

    pub fn profile(self) -> ProviderProfile {
        let (base_url, model) = match self {
            Self::OpenAi => ("https://api.openai.com/v1", "gpt-4o-mini"),
            Self::OpenRouter => ("https://openrouter.ai/api/v1", "openai/gpt-4o-mini"),
            Self::Groq => ("https://api.groq.com/openai/v1", "llama-3.1-8b-instant"),
            Self::Gemini => (
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.0-flash",
            ),
            Self::Copilot => ("https://api.githubcopilot.com", "gpt-4o"),
        };
        ProviderProfile {
            family: self,
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::Groq => write!(f, "groq"),
            Self::Gemini => write!(f, "gemini"),
            Self::Copilot => write!(f, "copilot"),
        }
    }
}

impl std::str::FromStr for ProviderFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|family| family.to_string() == wanted)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// One inference endpoint family. `model` may be swapped for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderProfile {
    pub family: ProviderFamily,
    pub base_url: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_round_trips_through_display() {
        for family in ProviderFamily::ALL {
            assert_eq!(family.to_string().parse::<ProviderFamily>(), Ok(family));
        }
        assert_eq!(" GROQ ".parse::<ProviderFamily>(), Ok(ProviderFamily::Groq));
        assert!("mistral".parse::<ProviderFamily>().is_err());
    }

    #[test]
    fn only_groq_overrides_and_only_copilot_exchanges() {
        let overriding: Vec<_> = ProviderFamily::ALL
            .into_iter()
            .filter(|f| f.supports_model_override())
            .collect();
        assert_eq!(overriding, vec![ProviderFamily::Groq]);

        let exchanging: Vec<_> = ProviderFamily::ALL
            .into_iter()
            .filter(|f| f.requires_token_exchange())
            .collect();
        assert_eq!(exchanging, vec![ProviderFamily::Copilot]);
    }
}
