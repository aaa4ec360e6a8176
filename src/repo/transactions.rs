// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{decode, decode_all};
use crate::backend::{Backend, Direction, Query, TRANSACTIONS};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionPatch, TxType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Server-side filters for [`TransactionRepository::list`]. Every bound is
/// inclusive and applied independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tx_type: Option<TxType>,
    pub category: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        }
    }

    fn to_query(&self, user_id: Uuid) -> Query {
        let mut q = Query::new().eq("user_id", user_id.to_string());
        if let Some(d) = self.start_date {
            q = q.gte("date", d.to_string());
        }
        if let Some(d) = self.end_date {
            q = q.lte("date", d.to_string());
        }
        if let Some(t) = self.tx_type {
            q = q.eq("type", t.as_str());
        }
        if let Some(c) = &self.category {
            q = q.eq("category", c.as_str());
        }
        if let Some(a) = self.min_amount {
            q = q.gte("amount", a.to_string());
        }
        if let Some(a) = self.max_amount {
            q = q.lte("amount", a.to_string());
        }
        q.order("date", Direction::Desc)
    }
}

#[derive(Clone)]
pub struct TransactionRepository {
    backend: Arc<dyn Backend>,
}

impl TransactionRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The user's transactions matching `filter`, newest first.
    pub fn list(&self, user_id: Uuid, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let rows = self
            .backend
            .select(TRANSACTIONS, &filter.to_query(user_id))
            .inspect_err(|err| tracing::error!("loading transactions failed: {err}"))?;
        tracing::debug!(count = rows.len(), "transactions loaded");
        decode_all(rows)
    }

    pub fn get(&self, id: Uuid) -> Result<Transaction> {
        let rows = self
            .backend
            .select(TRANSACTIONS, &Query::new().eq("id", id.to_string()).limit(1))?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(Error::NotFound(format!("transaction {}", id))),
        }
    }

    /// Validates `data` first; nothing reaches the backend when it is
    /// rejected.
    pub fn create(&self, data: &NewTransaction, user_id: Uuid) -> Result<Transaction> {
        data.validate()?;
        let mut row = serde_json::to_value(data)?;
        if let Value::Object(obj) = &mut row {
            obj.insert("user_id".into(), Value::String(user_id.to_string()));
        }
        let stored = self
            .backend
            .insert(TRANSACTIONS, row)
            .inspect_err(|err| tracing::error!("creating transaction failed: {err}"))?;
        let tx: Transaction = decode(stored)?;
        tracing::info!(id = %tx.id, amount = %tx.amount, "transaction created");
        Ok(tx)
    }

    pub fn update(&self, id: Uuid, patch: &TransactionPatch) -> Result<Transaction> {
        patch.validate()?;
        let rows = self
            .backend
            .update(
                TRANSACTIONS,
                &Query::new().eq("id", id.to_string()),
                serde_json::to_value(patch)?,
            )
            .inspect_err(|err| tracing::error!("updating transaction {id} failed: {err}"))?;
        match rows.into_iter().next() {
            Some(row) => {
                tracing::info!(%id, "transaction updated");
                decode(row)
            }
            None => Err(Error::NotFound(format!("transaction {}", id))),
        }
    }

    /// Deleting an id that is already gone is not an error.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let n = self
            .backend
            .delete(TRANSACTIONS, &Query::new().eq("id", id.to_string()))
            .inspect_err(|err| tracing::error!("deleting transaction {id} failed: {err}"))?;
        if n == 0 {
            tracing::debug!(%id, "transaction already deleted");
        } else {
            tracing::info!(%id, "transaction deleted");
        }
        Ok(())
    }
}
