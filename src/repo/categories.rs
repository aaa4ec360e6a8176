// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{decode, decode_all};
use crate::backend::{Backend, Direction, Filter, Query, CATEGORIES};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryPatch, NewCategory, TxType};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Shared and per-user categories. Whether a shared category may be changed
/// is up to the backend's access rules; this client does not check.
#[derive(Clone)]
pub struct CategoryRepository {
    backend: Arc<dyn Backend>,
}

impl CategoryRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Shared categories plus the user's own, by name.
    pub fn list(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let q = Query::new()
            .or(vec![
                Filter::Eq("user_id".into(), user_id.to_string().into()),
                Filter::IsNull("user_id".into()),
            ])
            .order("name", Direction::Asc);
        let rows = self
            .backend
            .select(CATEGORIES, &q)
            .inspect_err(|err| tracing::error!("loading categories failed: {err}"))?;
        decode_all(rows)
    }

    /// Categories a transaction of `tx_type` may use.
    pub fn list_for_type(&self, user_id: Uuid, tx_type: TxType) -> Result<Vec<Category>> {
        Ok(self
            .list(user_id)?
            .into_iter()
            .filter(|c| c.category_type.accepts(tx_type))
            .collect())
    }

    pub fn create(&self, data: &NewCategory, user_id: Uuid) -> Result<Category> {
        data.validate()?;
        let mut row = serde_json::to_value(data)?;
        if let Value::Object(obj) = &mut row {
            obj.insert("user_id".into(), Value::String(user_id.to_string()));
        }
        let stored = self
            .backend
            .insert(CATEGORIES, row)
            .inspect_err(|err| tracing::error!("creating category failed: {err}"))?;
        let category: Category = decode(stored)?;
        tracing::info!(id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn update(&self, id: Uuid, patch: &CategoryPatch) -> Result<Category> {
        patch.validate()?;
        let rows = self
            .backend
            .update(
                CATEGORIES,
                &Query::new().eq("id", id.to_string()),
                serde_json::to_value(patch)?,
            )
            .inspect_err(|err| tracing::error!("updating category {id} failed: {err}"))?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(Error::NotFound(format!("category {}", id))),
        }
    }

    /// Fails with `NotFound` when nothing was removed. The hosted backend
    /// hides rows the user may not touch, shared categories included.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let n = self
            .backend
            .delete(CATEGORIES, &Query::new().eq("id", id.to_string()))
            .inspect_err(|err| tracing::error!("deleting category {id} failed: {err}"))?;
        if n == 0 {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        tracing::info!(%id, "category deleted");
        Ok(())
    }
}
