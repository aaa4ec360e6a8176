// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{check, HostedClient};
use crate::backend::{Backend, Direction, Filter, Query};
use crate::error::{Error, Result};
use crate::models::Session;
use reqwest::Method;
use serde_json::Value;
use std::sync::Mutex;

const RETURN_ROWS: &str = "return=representation";
const MERGE_ROWS: &str = "resolution=merge-duplicates,return=representation";

/// Tables and storage of the hosted backend. Row-level access is decided by
/// the platform from the bearer token.
pub struct RestBackend {
    client: HostedClient,
    token: Mutex<Option<String>>,
}

impl RestBackend {
    pub fn new(client: HostedClient) -> Self {
        Self {
            client,
            token: Mutex::new(None),
        }
    }

    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn table(&self, method: Method, table: &str, query: &Query) -> Result<reqwest::blocking::RequestBuilder> {
        let token = self.token();
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(render_query(query));
        Ok(self
            .client
            .request(method, &format!("rest/v1/{}", table), token.as_deref())?
            .query(&params))
    }

    fn single(rows: Vec<Value>, table: &str) -> Result<Value> {
        rows.into_iter().next().ok_or_else(|| Error::Backend {
            status: 200,
            message: format!("{} write returned no row", table),
        })
    }
}

impl Backend for RestBackend {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let res = check(self.table(Method::GET, table, query)?.send()?)?;
        Ok(res.json()?)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let res = self
            .table(Method::POST, table, &Query::new())?
            .header("Prefer", RETURN_ROWS)
            .json(&row)
            .send()?;
        Self::single(check(res)?.json()?, table)
    }

    fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let res = self
            .table(Method::PATCH, table, query)?
            .header("Prefer", RETURN_ROWS)
            .json(&patch)
            .send()?;
        Ok(check(res)?.json()?)
    }

    fn upsert(&self, table: &str, row: Value) -> Result<Value> {
        let res = self
            .table(Method::POST, table, &Query::new())?
            .header("Prefer", MERGE_ROWS)
            .json(&row)
            .send()?;
        Self::single(check(res)?.json()?, table)
    }

    fn delete(&self, table: &str, query: &Query) -> Result<usize> {
        let res = self
            .table(Method::DELETE, table, query)?
            .header("Prefer", RETURN_ROWS)
            .send()?;
        let rows: Vec<Value> = check(res)?.json()?;
        Ok(rows.len())
    }

    fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let token = self.token();
        let res = self
            .client
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{}", bucket, path),
                token.as_deref(),
            )?
            .header("x-upsert", "true")
            .header("Content-Type", content_type)
            .body(bytes)
            .send()?;
        check(res)?;
        Ok(())
    }

    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let token = self.token();
        let res = self
            .client
            .request(
                Method::GET,
                &format!("storage/v1/object/{}/{}", bucket, path),
                token.as_deref(),
            )?
            .send()?;
        Ok(check(res)?.bytes()?.to_vec())
    }

    fn set_session(&self, session: Option<&Session>) {
        let mut token = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *token = session.map(|s| s.access_token.clone());
    }
}

/// PostgREST query parameters for `query`, `select` excluded.
pub fn render_query(query: &Query) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for f in &query.filters {
        match f {
            Filter::Eq(c, v) => out.push((c.clone(), format!("eq.{}", literal(v)))),
            Filter::Gte(c, v) => out.push((c.clone(), format!("gte.{}", literal(v)))),
            Filter::Lte(c, v) => out.push((c.clone(), format!("lte.{}", literal(v)))),
            Filter::IsNull(c) => out.push((c.clone(), "is.null".to_string())),
            Filter::Or(inner) => out.push(("or".to_string(), format!("({})", inline_all(inner)))),
        }
    }
    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|(c, d)| match d {
                Direction::Asc => format!("{}.asc", c),
                Direction::Desc => format!("{}.desc", c),
            })
            .collect();
        out.push(("order".to_string(), order.join(",")));
    }
    if let Some(n) = query.limit {
        out.push(("limit".to_string(), n.to_string()));
    }
    out
}

fn inline_all(filters: &[Filter]) -> String {
    filters.iter().map(inline).collect::<Vec<_>>().join(",")
}

// Filters nested inside `or=(...)` use the `column.op.value` form.
fn inline(f: &Filter) -> String {
    match f {
        Filter::Eq(c, v) => format!("{}.eq.{}", c, literal(v)),
        Filter::Gte(c, v) => format!("{}.gte.{}", c, literal(v)),
        Filter::Lte(c, v) => format!("{}.lte.{}", c, literal(v)),
        Filter::IsNull(c) => format!("{}.is.null", c),
        Filter::Or(inner) => format!("or({})", inline_all(inner)),
    }
}

fn literal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
