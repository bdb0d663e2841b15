use serde::{Deserialize, Serialize};

/// Deepest folder path a classification may propose.
pub const MAX_PATH_DEPTH: usize = 3;
pub const MAX_TAGS: usize = 5;

/// Sanitized folder labels, broad to specific.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidatePath(Vec<String>);

impl CandidatePath {
    /// Callers are expected to have sanitized `segments` already.
    pub(crate) fn from_sanitized(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl std::fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub folder_path: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A link to be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInput {
    pub url: String,
    pub title: String,
}

impl LinkInput {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}
