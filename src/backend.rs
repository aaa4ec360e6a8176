// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The table/storage seam between the repositories and whatever persists the
//! rows: the hosted REST API or the local SQLite file.

use crate::error::Result;
use crate::models::Session;
use serde_json::Value;

pub const TRANSACTIONS: &str = "transactions";
pub const CATEGORIES: &str = "categories";
pub const PROFILES: &str = "profiles";
pub const AVATARS: &str = "avatars";

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    IsNull(String),
    /// Matches when any inner filter matches.
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.into(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.into(), value.into()));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.into()));
        self
    }

    pub fn or(mut self, any_of: Vec<Filter>) -> Self {
        self.filters.push(Filter::Or(any_of));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Row and object operations offered by the backend. Rows travel as JSON
/// objects; typing happens in the repositories.
///
/// Implementations apply the row-level access rules of the backend for the
/// session most recently handed to [`Backend::set_session`].
pub trait Backend: Send + Sync {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored, server-side defaults included.
    fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Apply `patch` to every matching row and return the updated rows.
    fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// Insert or merge by primary key `id`.
    fn upsert(&self, table: &str, row: Value) -> Result<Value>;

    /// Delete matching rows and return how many went away.
    fn delete(&self, table: &str, query: &Query) -> Result<usize>;

    fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Follow the signed-in session. `None` drops back to anonymous access.
    fn set_session(&self, session: Option<&Session>);
}
