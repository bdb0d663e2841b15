use std::collections::HashMap;

use rusqlite::{params, Connection, Row};

use crate::error::AppError;
use crate::models::folder_node::{is_system_root, FolderNode, ROOT_ID};

const NODE_COLUMNS: &str = "id, parent_id, title, url";

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<FolderNode> {
    Ok(FolderNode {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        children: Vec::new(),
    })
}

pub fn get_node(conn: &Connection, id: &str) -> Result<Option<FolderNode>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM bookmarks WHERE id = ?1"
    ))?;
    let node = stmt.query_row(params![id], row_to_node).optional()?;
    Ok(node)
}

fn require_folder(conn: &Connection, id: &str) -> Result<FolderNode, AppError> {
    let node = get_node(conn, id)?
        .ok_or_else(|| AppError::Store(format!("node not found: {id}")))?;
    if node.is_link() {
        return Err(AppError::Store(format!("not a folder: {id}")));
    }
    Ok(node)
}

fn next_position(conn: &Connection, parent_id: &str) -> Result<i64, AppError> {
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM bookmarks WHERE parent_id = ?1",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(position)
}

/// Inserts a folder (`url` = None) or link under `parent_id` and returns its new id.
pub fn insert_node(
    conn: &Connection,
    parent_id: &str,
    title: &str,
    url: Option<&str>,
) -> Result<String, AppError> {
    require_folder(conn, parent_id)?;
    let id = uuid::Uuid::new_v4().to_string();
    let position = next_position(conn, parent_id)?;
    conn.execute(
        "INSERT INTO bookmarks (id, parent_id, title, url, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            parent_id,
            title,
            url,
            position,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(id)
}

pub fn list_children(conn: &Connection, parent_id: &str) -> Result<Vec<FolderNode>, AppError> {
    require_folder(conn, parent_id)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM bookmarks WHERE parent_id = ?1 ORDER BY position ASC, rowid ASC"
    ))?;
    let children = stmt
        .query_map(params![parent_id], row_to_node)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(children)
}

pub fn child_count(conn: &Connection, id: &str) -> Result<usize, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookmarks WHERE parent_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn is_ancestor_or_self(conn: &Connection, candidate: &str, of: &str) -> Result<bool, AppError> {
    let mut current = Some(of.to_string());
    while let Some(id) = current {
        if id == candidate {
            return Ok(true);
        }
        current = get_node(conn, &id)?.and_then(|n| n.parent_id);
    }
    Ok(false)
}

pub fn move_node(conn: &Connection, id: &str, new_parent_id: &str) -> Result<(), AppError> {
    if is_system_root(id) {
        return Err(AppError::Store(format!("cannot move system root: {id}")));
    }
    get_node(conn, id)?.ok_or_else(|| AppError::Store(format!("node not found: {id}")))?;
    require_folder(conn, new_parent_id)?;
    if is_ancestor_or_self(conn, id, new_parent_id)? {
        return Err(AppError::Store(format!(
            "cannot move {id} into its own subtree"
        )));
    }
    let position = next_position(conn, new_parent_id)?;
    conn.execute(
        "UPDATE bookmarks SET parent_id = ?1, position = ?2 WHERE id = ?3",
        params![new_parent_id, position, id],
    )?;
    Ok(())
}

pub fn delete_node(conn: &Connection, id: &str) -> Result<(), AppError> {
    if is_system_root(id) {
        return Err(AppError::Store(format!("cannot delete system root: {id}")));
    }
    if child_count(conn, id)? > 0 {
        return Err(AppError::Store(format!("folder not empty: {id}")));
    }
    let count = conn.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
    if count == 0 {
        return Err(AppError::Store(format!("node not found: {id}")));
    }
    Ok(())
}

/// Loads every node and assembles the hierarchy under the true root.
pub fn load_tree(conn: &Connection) -> Result<FolderNode, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM bookmarks ORDER BY position ASC, rowid ASC"
    ))?;
    let rows = stmt
        .query_map([], row_to_node)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut root = None;
    let mut by_parent: HashMap<String, Vec<FolderNode>> = HashMap::new();
    for node in rows {
        match node.parent_id.clone() {
            Some(parent) => by_parent.entry(parent).or_default().push(node),
            None if node.id == ROOT_ID => root = Some(node),
            None => {}
        }
    }

    let mut root =
        root.ok_or_else(|| AppError::Store("bookmark root is missing".to_string()))?;
    attach_children(&mut root, &mut by_parent);
    Ok(root)
}

fn attach_children(node: &mut FolderNode, by_parent: &mut HashMap<String, Vec<FolderNode>>) {
    if let Some(mut children) = by_parent.remove(&node.id) {
        for child in children.iter_mut() {
            attach_children(child, by_parent);
        }
        node.children = children;
    }
}

// --- Settings ---

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete_setting(conn: &Connection, key: &str) -> Result<(), AppError> {
    conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
    Ok(())
}

// --- Audit log ---

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: String,
    pub summary: Option<String>,
    pub created_at: String,
}

pub fn insert_audit_log(
    conn: &Connection,
    action: &str,
    summary: Option<&str>,
) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO audit_log (action, summary, created_at) VALUES (?1, ?2, ?3)",
        params![action, summary, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_audit_log(conn: &Connection, limit: usize) -> Result<Vec<AuditLogEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, action, summary, created_at FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let entries = stmt
        .query_map(params![limit as i64], |row| {
            Ok(AuditLogEntry {
                id: row.get(0)?,
                action: row.get(1)?,
                summary: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

// Needed for rusqlite optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
