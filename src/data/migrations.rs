use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::folder_node::{MENU_ID, MOBILE_ID, ROOT_ID, TOOLBAR_ID, UNFILED_ID};

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS bookmarks (
    id TEXT PRIMARY KEY NOT NULL,
    parent_id TEXT REFERENCES bookmarks(id),
    title TEXT NOT NULL,
    url TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_parent ON bookmarks(parent_id, position);
CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    summary TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

const SYSTEM_ROOT_ROWS: &[(&str, Option<&str>, &str, i64)] = &[
    (ROOT_ID, None, "", 0),
    (MENU_ID, Some(ROOT_ID), "Bookmarks Menu", 0),
    (TOOLBAR_ID, Some(ROOT_ID), "Bookmarks Toolbar", 1),
    (UNFILED_ID, Some(ROOT_ID), "Other Bookmarks", 2),
    (MOBILE_ID, Some(ROOT_ID), "Mobile Bookmarks", 3),
];

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    for (id, parent_id, title, position) in SYSTEM_ROOT_ROWS {
        conn.execute(
            "INSERT OR IGNORE INTO bookmarks (id, parent_id, title, url, position) VALUES (?1, ?2, ?3, NULL, ?4)",
            params![id, parent_id, title, position],
        )?;
    }
    Ok(())
}
