use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizePhase {
    Classifying,
    Cleaning,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeProgress {
    pub phase: OrganizePhase,
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedLink {
    pub link_id: String,
    pub folder_id: String,
    pub folder_path: Vec<String>,
    pub tags: Vec<String>,
    /// True only when an existing link changed folders. Newly created links report false.
    pub moved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeSummary {
    pub total: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub removed_folders: usize,
}
