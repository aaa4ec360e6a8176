// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Result;
use crate::models::Session;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.moneymap", "MoneyMap", "moneymap"));

/// One connection shared by the local backend, local auth and the session
/// store.
pub type SharedConn = Arc<Mutex<Connection>>;

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP.0, APP.1, APP.2)
}

pub fn default_db_path() -> Result<PathBuf> {
    let proj = project_dirs().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine platform-specific data dir",
        )
    })?;
    Ok(proj.data_dir().join("moneymap.sqlite"))
}

pub fn open_or_init(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    tracing::debug!(path = %path.display(), "opening state database");
    let mut conn = Connection::open(path)?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn shared(conn: Connection) -> SharedConn {
    Arc::new(Mutex::new(conn))
}

pub fn lock(conn: &SharedConn) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Persisted sign-in, at most one row.
    CREATE TABLE IF NOT EXISTS session(
        id INTEGER PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL,
        saved_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Local backend: accounts and issued tokens
    CREATE TABLE IF NOT EXISTS users(
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        user_metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS tokens(
        token TEXT PRIMARY KEY,
        kind TEXT NOT NULL CHECK(kind IN ('access','refresh')),
        user_id TEXT NOT NULL,
        expires_at INTEGER,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    -- Local backend: the hosted tables
    CREATE TABLE IF NOT EXISTS profiles(
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        avatar_url TEXT NOT NULL DEFAULT '',
        updated_at TEXT
    );

    CREATE TABLE IF NOT EXISTS categories(
        id TEXT PRIMARY KEY,
        user_id TEXT,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense','both')),
        icon TEXT NOT NULL DEFAULT '',
        color TEXT NOT NULL DEFAULT '',
        created_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        amount TEXT NOT NULL CHECK(CAST(amount AS REAL) > 0),
        category TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        icon TEXT NOT NULL DEFAULT '',
        created_at TEXT,
        updated_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);

    CREATE TABLE IF NOT EXISTS objects(
        bucket TEXT NOT NULL,
        path TEXT NOT NULL,
        content_type TEXT NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY(bucket, path)
    );
    "#,
    )?;
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Keeps the signed-in session between runs.
#[derive(Clone)]
pub struct SessionStore {
    conn: SharedConn,
}

impl SessionStore {
    pub fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let conn = lock(&self.conn);
        let data: Option<String> = conn
            .query_row("SELECT data FROM session WHERE id=1", [], |r| r.get(0))
            .optional()?;
        match data {
            Some(s) => match serde_json::from_str(&s) {
                Ok(session) => Ok(Some(session)),
                Err(err) => {
                    tracing::warn!("discarding unreadable stored session: {err}");
                    conn.execute("DELETE FROM session", [])?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let data = serde_json::to_string(session)?;
        lock(&self.conn).execute(
            "INSERT INTO session(id, data) VALUES(1, ?1)
             ON CONFLICT(id) DO UPDATE SET data=excluded.data, saved_at=datetime('now')",
            params![data],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        lock(&self.conn).execute("DELETE FROM session", [])?;
        Ok(())
    }
}
