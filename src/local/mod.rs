// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The hosted tables and storage emulated on the local SQLite file, with the
//! same row-level rules: users see their own rows plus shared categories,
//! and shared categories cannot be changed.

pub mod auth;

pub use auth::LocalAuth;

use crate::backend::{Backend, Direction, Filter, Query, AVATARS};
use crate::db::{lock, SharedConn};
use crate::error::{Error, Result};
use crate::models::Session;
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::sync::Mutex;
use uuid::Uuid;

/// Which rows a user may touch.
#[derive(Clone, Copy)]
enum Owner {
    /// `user_id` must be the caller.
    User,
    /// Readable when `user_id` is the caller or null, writable only when it
    /// is the caller.
    UserOrShared,
    /// The row id is the caller's id.
    Itself,
}

struct TableSpec {
    name: &'static str,
    columns: &'static [&'static str],
    numeric: &'static [&'static str],
    owner: Owner,
}

static TABLES: &[TableSpec] = &[
    TableSpec {
        name: "transactions",
        columns: &[
            "id",
            "user_id",
            "type",
            "amount",
            "category",
            "description",
            "date",
            "icon",
            "created_at",
            "updated_at",
        ],
        numeric: &["amount"],
        owner: Owner::User,
    },
    TableSpec {
        name: "categories",
        columns: &["id", "user_id", "name", "type", "icon", "color", "created_at"],
        numeric: &[],
        owner: Owner::UserOrShared,
    },
    TableSpec {
        name: "profiles",
        columns: &["id", "username", "email", "avatar_url", "updated_at"],
        numeric: &[],
        owner: Owner::Itself,
    },
];

/// (name, type, icon, color) of the shared categories seeded on `init`.
const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str)] = &[
    ("Food", "expense", "🛒", "#f97316"),
    ("Transport", "expense", "🚗", "#0ea5e9"),
    ("Housing", "expense", "🏠", "#8b5cf6"),
    ("Utilities", "expense", "💡", "#eab308"),
    ("Entertainment", "expense", "🎮", "#ec4899"),
    ("Health", "expense", "⚕️", "#ef4444"),
    ("Salary", "income", "💰", "#22c55e"),
    ("Freelance", "income", "💻", "#14b8a6"),
    ("Investments", "income", "📈", "#6366f1"),
    ("Gifts", "income", "🎁", "#f43f5e"),
    ("Other", "both", "📦", "#64748b"),
];

impl TableSpec {
    fn column(&self, name: &str) -> Result<&'static str> {
        self.columns
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| Error::Backend {
                status: 400,
                message: format!("column {}.{} does not exist", self.name, name),
            })
    }

    fn is_numeric(&self, column: &str) -> bool {
        self.numeric.contains(&column)
    }

    fn owner_column(&self) -> &'static str {
        match self.owner {
            Owner::User | Owner::UserOrShared => "user_id",
            Owner::Itself => "id",
        }
    }

    fn has(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

fn spec(table: &str) -> Result<&'static TableSpec> {
    TABLES
        .iter()
        .find(|t| t.name == table)
        .ok_or_else(|| Error::Backend {
            status: 404,
            message: format!("relation \"public.{}\" does not exist", table),
        })
}

fn rls_violation(table: &str) -> Error {
    Error::Forbidden(format!(
        "new row violates row-level security policy for table \"{}\"",
        table
    ))
}

pub struct SqliteBackend {
    conn: SharedConn,
    acting: Mutex<Option<Uuid>>,
}

impl SqliteBackend {
    pub fn new(conn: SharedConn) -> Self {
        Self {
            conn,
            acting: Mutex::new(None),
        }
    }

    fn acting(&self) -> Result<Uuid> {
        self.acting
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .ok_or_else(|| Error::Unauthorized("not signed in".into()))
    }

    /// Insert the shared categories when there are none yet. Returns how many
    /// were added.
    pub fn seed_default_categories(&self) -> Result<usize> {
        let mut conn = lock(&self.conn);
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE user_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        if existing > 0 {
            return Ok(0);
        }
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for (name, kind, icon, color) in DEFAULT_CATEGORIES {
            tx.execute(
                "INSERT INTO categories(id, user_id, name, type, icon, color, created_at)
                 VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6)",
                params![Uuid::new_v4().to_string(), name, kind, icon, color, now],
            )?;
        }
        tx.commit()?;
        tracing::info!(count = DEFAULT_CATEGORIES.len(), "seeded shared categories");
        Ok(DEFAULT_CATEGORIES.len())
    }

    /// `WHERE` clause for `filters` limited to the rows `user` may read, or
    /// may write when `writing`.
    fn where_sql(
        spec: &TableSpec,
        user: Uuid,
        writing: bool,
        filters: &[Filter],
        params: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let scope = match (spec.owner, writing) {
            (Owner::UserOrShared, false) => "(user_id = ? OR user_id IS NULL)".to_string(),
            _ => format!("{} = ?", spec.owner_column()),
        };
        params.push(SqlValue::Text(user.to_string()));
        let mut clauses = vec![scope];
        for f in filters {
            clauses.push(filter_sql(spec, f, params)?);
        }
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }

    fn matching_ids(
        conn: &Connection,
        spec: &TableSpec,
        user: Uuid,
        filters: &[Filter],
    ) -> Result<Vec<String>> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT {} FROM {}{}",
            spec.columns.join(", "),
            spec.name,
            Self::where_sql(spec, user, true, filters, &mut params)?
        );
        let rows = read_rows(conn, spec, &sql, &params)?;
        let rows = retain_exact(spec, filters, rows)?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Shared categories are read-only for everyone.
    fn guard_shared(conn: &Connection, spec: &TableSpec, filters: &[Filter]) -> Result<()> {
        if !matches!(spec.owner, Owner::UserOrShared) {
            return Ok(());
        }
        let mut params = Vec::new();
        let mut clauses = vec!["user_id IS NULL".to_string()];
        for f in filters {
            clauses.push(filter_sql(spec, f, &mut params)?);
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            spec.columns.join(", "),
            spec.name,
            clauses.join(" AND ")
        );
        let shared = retain_exact(spec, filters, read_rows(conn, spec, &sql, &params)?)?;
        if !shared.is_empty() {
            return Err(Error::Forbidden(format!(
                "shared rows of \"{}\" are read-only",
                spec.name
            )));
        }
        Ok(())
    }

    fn fetch(conn: &Connection, spec: &TableSpec, id: &str) -> Result<Option<Value>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            spec.columns.join(", "),
            spec.name
        );
        let row = conn
            .query_row(&sql, params![id], |r| row_to_json(spec, r))
            .optional()?;
        Ok(row)
    }
}

impl Backend for SqliteBackend {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let spec = spec(table)?;
        let user = self.acting()?;
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            spec.columns.join(", "),
            spec.name,
            Self::where_sql(spec, user, false, &query.filters, &mut params)?
        );
        sql.push_str(&order_sql(spec, &query.order)?);
        let exact = touches_numeric(spec, &query.filters);
        if let (Some(n), false) = (query.limit, exact) {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        tracing::debug!(%sql, exact, "local select");

        let conn = lock(&self.conn);
        let mut out = retain_exact(spec, &query.filters, read_rows(&conn, spec, &sql, &params)?)?;
        if let Some(n) = query.limit {
            out.truncate(n);
        }
        Ok(out)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let spec = spec(table)?;
        let user = self.acting()?;
        let mut obj = into_object(row, spec)?;

        let owner = spec.owner_column();
        if owner == "id" && !obj.contains_key("id") {
            obj.insert("id".into(), Value::String(user.to_string()));
        }
        if obj.get(owner).and_then(Value::as_str) != Some(user.to_string().as_str()) {
            return Err(rls_violation(spec.name));
        }
        obj.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let now = Value::String(Utc::now().to_rfc3339());
        for stamp in ["created_at", "updated_at"] {
            if spec.has(stamp) && !obj.contains_key(stamp) {
                obj.insert(stamp.into(), now.clone());
            }
        }

        let id = obj
            .get("id")
            .map(stored_text)
            .unwrap_or_default();
        let cols: Vec<&str> = obj.keys().map(String::as_str).collect();
        let marks = vec!["?"; cols.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            spec.name,
            cols.join(", "),
            marks
        );
        let values: Vec<SqlValue> = obj.values().map(to_sql).collect();

        let conn = lock(&self.conn);
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(constraint_error)?;
        Self::fetch(&conn, spec, &id)?.ok_or_else(|| Error::NotFound(format!("{} {}", spec.name, id)))
    }

    fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let spec = spec(table)?;
        let user = self.acting()?;
        let mut obj = into_object(patch, spec)?;
        if obj.contains_key("id") {
            return Err(Error::Backend {
                status: 400,
                message: format!("column {}.id cannot be changed", spec.name),
            });
        }
        if let Some(owner) = obj.get(spec.owner_column()) {
            if owner.as_str() != Some(user.to_string().as_str()) {
                return Err(rls_violation(spec.name));
            }
        }
        if spec.has("updated_at") && !obj.contains_key("updated_at") {
            obj.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        }

        let mut conn = lock(&self.conn);
        Self::guard_shared(&conn, spec, &query.filters)?;
        let ids = Self::matching_ids(&conn, spec, user, &query.filters)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sets: Vec<String> = obj.keys().map(|k| format!("{} = ?", k)).collect();
        let sql = format!("UPDATE {} SET {} WHERE id = ?", spec.name, sets.join(", "));
        let tx = conn.transaction()?;
        for id in &ids {
            let mut values: Vec<SqlValue> = obj.values().map(to_sql).collect();
            values.push(SqlValue::Text(id.clone()));
            tx.execute(&sql, params_from_iter(values.iter()))
                .map_err(constraint_error)?;
        }
        tx.commit()?;

        let mut out = Vec::new();
        for id in &ids {
            if let Some(row) = Self::fetch(&conn, spec, id)? {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn upsert(&self, table: &str, row: Value) -> Result<Value> {
        let spec = spec(table)?;
        let user = self.acting()?;
        let mut obj = into_object(row, spec)?;
        let Some(id) = obj.get("id").map(stored_text) else {
            return self.insert(table, Value::Object(obj));
        };
        let exists = {
            let conn = lock(&self.conn);
            Self::fetch(&conn, spec, &id)?.is_some()
        };
        if !exists {
            return self.insert(table, Value::Object(obj));
        }
        obj.remove("id");
        let mut rows = self.update(table, &Query::new().eq("id", id.clone()), Value::Object(obj))?;
        if rows.is_empty() {
            tracing::warn!(%user, table, "upsert hit a row owned by someone else");
            return Err(rls_violation(spec.name));
        }
        Ok(rows.remove(0))
    }

    fn delete(&self, table: &str, query: &Query) -> Result<usize> {
        let spec = spec(table)?;
        let user = self.acting()?;
        let mut conn = lock(&self.conn);
        Self::guard_shared(&conn, spec, &query.filters)?;
        let ids = Self::matching_ids(&conn, spec, user, &query.filters)?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", spec.name);
        let tx = conn.transaction()?;
        let mut n = 0;
        for id in &ids {
            n += tx.execute(&sql, params![id])?;
        }
        tx.commit()?;
        Ok(n)
    }

    fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let user = self.acting()?;
        if bucket == AVATARS && !path.starts_with(&format!("{}/", user)) {
            return Err(rls_violation(bucket));
        }
        lock(&self.conn).execute(
            "INSERT INTO objects(bucket, path, content_type, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(bucket, path) DO UPDATE SET content_type=excluded.content_type, data=excluded.data",
            params![bucket, path, content_type, bytes],
        )?;
        Ok(())
    }

    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        self.acting()?;
        let data: Option<Vec<u8>> = lock(&self.conn)
            .query_row(
                "SELECT data FROM objects WHERE bucket=?1 AND path=?2",
                params![bucket, path],
                |r| r.get(0),
            )
            .optional()?;
        data.ok_or_else(|| Error::NotFound(format!("Object not found: {}/{}", bucket, path)))
    }

    fn set_session(&self, session: Option<&Session>) {
        let mut acting = self.acting.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *acting = session.map(|s| s.user.id);
    }
}

fn into_object(row: Value, spec: &TableSpec) -> Result<Map<String, Value>> {
    let Value::Object(obj) = row else {
        return Err(Error::Backend {
            status: 400,
            message: format!("expected a JSON object for {}", spec.name),
        });
    };
    for key in obj.keys() {
        if !spec.has(key) {
            return Err(Error::Backend {
                status: 400,
                message: format!("Could not find the '{}' column of '{}'", key, spec.name),
            });
        }
    }
    Ok(obj)
}

fn filter_sql(spec: &TableSpec, f: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    match f {
        Filter::Eq(c, v) => compare(spec, c, "=", v, params),
        Filter::Gte(c, v) => compare(spec, c, ">=", v, params),
        Filter::Lte(c, v) => compare(spec, c, "<=", v, params),
        Filter::IsNull(c) => Ok(format!("{} IS NULL", spec.column(c)?)),
        Filter::Or(inner) if inner.is_empty() => Ok("0".to_string()),
        Filter::Or(inner) => {
            let parts = inner
                .iter()
                .map(|f| filter_sql(spec, f, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("({})", parts.join(" OR ")))
        }
    }
}

fn compare(
    spec: &TableSpec,
    column: &str,
    op: &str,
    v: &Value,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let col = spec.column(column)?;
    if spec.is_numeric(col) {
        // Settled exactly by `retain_exact`; SQL only checks the operand.
        as_decimal(v)?;
        Ok("1".to_string())
    } else {
        params.push(to_sql(v));
        Ok(format!("{} {} ?", col, op))
    }
}

fn order_sql(spec: &TableSpec, order: &[(String, Direction)]) -> Result<String> {
    if order.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::new();
    for (c, d) in order {
        let col = spec.column(c)?;
        let expr = if spec.is_numeric(col) {
            format!("CAST({} AS REAL)", col)
        } else {
            col.to_string()
        };
        let dir = match d {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        parts.push(format!("{} {}", expr, dir));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

fn parse_numeric(text: &str) -> Option<Decimal> {
    let text = text.trim();
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

fn as_decimal(v: &Value) -> Result<Decimal> {
    let n = match v {
        Value::Number(n) => parse_numeric(&n.to_string()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    };
    n.ok_or_else(|| Error::Backend {
        status: 400,
        message: format!("invalid input syntax for type numeric: {}", v),
    })
}

fn touches_numeric(spec: &TableSpec, filters: &[Filter]) -> bool {
    filters.iter().any(|f| match f {
        Filter::Eq(c, _) | Filter::Gte(c, _) | Filter::Lte(c, _) => spec.is_numeric(c),
        Filter::IsNull(_) => false,
        Filter::Or(inner) => touches_numeric(spec, inner),
    })
}

/// Drops the rows that fail a numeric comparison. The SQL for those
/// comparisons matches every row, so this must run on whatever it returned.
fn retain_exact(spec: &TableSpec, filters: &[Filter], rows: Vec<Value>) -> Result<Vec<Value>> {
    if !touches_numeric(spec, filters) {
        return Ok(rows);
    }
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut keep = true;
        for f in filters {
            if !row_matches(spec, f, &row)? {
                keep = false;
                break;
            }
        }
        if keep {
            out.push(row);
        }
    }
    Ok(out)
}

/// Evaluates `f` on a decoded row the way the SQL would, but with numeric
/// columns compared as decimals. NULL never compares.
fn row_matches(spec: &TableSpec, f: &Filter, row: &Value) -> Result<bool> {
    let (column, v) = match f {
        Filter::Eq(c, v) | Filter::Gte(c, v) | Filter::Lte(c, v) => (c, v),
        Filter::IsNull(c) => return Ok(row.get(spec.column(c)?).is_none_or(Value::is_null)),
        Filter::Or(inner) => {
            for f in inner {
                if row_matches(spec, f, row)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
    };
    let col = spec.column(column)?;
    let Some(stored) = row.get(col).and_then(Value::as_str) else {
        return Ok(false);
    };
    let ord = if spec.is_numeric(col) {
        let Some(have) = parse_numeric(stored) else {
            return Ok(false);
        };
        have.cmp(&as_decimal(v)?)
    } else {
        stored.cmp(stored_text(v).as_str())
    };
    Ok(match f {
        Filter::Gte(..) => ord.is_ge(),
        Filter::Lte(..) => ord.is_le(),
        _ => ord.is_eq(),
    })
}

fn read_rows(conn: &Connection, spec: &TableSpec, sql: &str, params: &[SqlValue]) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |r| row_to_json(spec, r))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// Every column is stored as text, so numbers keep their exact decimal form.
fn stored_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        other => SqlValue::Text(stored_text(other)),
    }
}

fn row_to_json(spec: &TableSpec, r: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    let mut obj = Map::new();
    for (i, col) in spec.columns.iter().enumerate() {
        let v: Option<String> = r.get(i)?;
        obj.insert(
            (*col).to_string(),
            v.map(Value::String).unwrap_or(Value::Null),
        );
    }
    Ok(Value::Object(obj))
}

fn constraint_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            let message = msg.clone().unwrap_or_else(|| e.to_string());
            return Error::Backend {
                status: 400,
                message,
            };
        }
    }
    Error::Db(err)
}
