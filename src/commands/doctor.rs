// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::context::AppContext;
use crate::models::{Category, Transaction};
use crate::repo::TransactionFilter;
use crate::utils::pretty_table;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

/// Transactions whose category name matches no visible category, or only
/// categories of the other type.
pub fn find_mismatches(list: &[Transaction], categories: &[Category]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for t in list {
        let named: Vec<&Category> = categories.iter().filter(|c| c.name == t.category).collect();
        let kind = if named.is_empty() {
            "unknown_category"
        } else if !named.iter().any(|c| c.category_type.accepts(t.tx_type)) {
            "category_type_mismatch"
        } else {
            continue;
        };
        issues.push(Issue {
            kind,
            detail: format!("{} {} '{}' ({})", t.date, t.tx_type, t.category, t.id),
        });
    }
    issues
}

pub fn handle(ctx: &AppContext) -> Result<()> {
    let user = ctx.require_user()?;
    let list = ctx.transactions.list(user.id, &TransactionFilter::default())?;
    let categories = ctx.categories.list(user.id)?;
    let issues = find_mismatches(&list, &categories);

    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
