use serde::{Deserialize, Serialize};

/// The true root of the bookmark hierarchy. Every other node descends from it.
pub const ROOT_ID: &str = "root________";
/// Default container that classified folders are created under.
pub const MENU_ID: &str = "menu________";
pub const TOOLBAR_ID: &str = "toolbar_____";
pub const UNFILED_ID: &str = "unfiled_____";
pub const MOBILE_ID: &str = "mobile______";

/// Containers predefined by the host environment. Never deleted, never moved.
pub const SYSTEM_ROOTS: &[&str] = &[ROOT_ID, MENU_ID, TOOLBAR_ID, UNFILED_ID, MOBILE_ID];

pub fn is_system_root(id: &str) -> bool {
    SYSTEM_ROOTS.contains(&id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
    /// Target address; present iff this node is a link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn is_link(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_folder(&self) -> bool {
        !self.is_link()
    }

    pub fn find(&self, id: &str) -> Option<&FolderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// All link nodes in the subtree, depth-first in child order.
    pub fn links(&self) -> Vec<&FolderNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_link() {
                out.push(node);
                continue;
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// `/`-joined title paths of every folder below this node, parents before children.
    pub fn folder_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(self, "", &mut out);
        out
    }
}

fn collect_paths(node: &FolderNode, prefix: &str, out: &mut Vec<String>) {
    for child in node.children.iter().filter(|c| c.is_folder()) {
        let title = child.title.trim_matches('/');
        let path = if prefix.is_empty() {
            title.to_string()
        } else {
            format!("{prefix}/{title}")
        };
        out.push(path.clone());
        collect_paths(child, &path, out);
    }
}
