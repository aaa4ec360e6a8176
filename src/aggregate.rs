// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derived figures for the dashboard, reports and transaction list.
//!
//! Everything here is a pure function over the rows of the current view and
//! is recomputed from scratch on each call.

use crate::error::{Error, Result};
use crate::models::{Transaction, TxType};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

pub fn totals(list: &[Transaction]) -> Totals {
    let mut t = Totals::default();
    for tx in list {
        match tx.tx_type {
            TxType::Income => t.income = t.income.saturating_add(tx.amount),
            TxType::Expense => t.expense = t.expense.saturating_add(tx.amount),
        }
    }
    t.balance = t.income.saturating_sub(t.expense);
    t
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: Decimal,
    /// Share of the type total, 0..=100. Zero when the type total is zero.
    pub percentage: Decimal,
}

/// Per-category sums for one transaction type, largest first.
pub fn by_category(list: &[Transaction], tx_type: TxType) -> Vec<CategoryShare> {
    let mut sums: HashMap<&str, Decimal> = HashMap::new();
    let mut type_total = Decimal::ZERO;
    for tx in list.iter().filter(|t| t.tx_type == tx_type) {
        let sum = sums.entry(tx.category.as_str()).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(tx.amount);
        type_total = type_total.saturating_add(tx.amount);
    }

    let hundred = Decimal::ONE_HUNDRED;
    let mut out: Vec<CategoryShare> = sums
        .into_iter()
        .map(|(category, total)| {
            // Rows from a hosted store are not range-checked, so the ratio
            // may not fit.
            let percentage = total
                .checked_div(type_total)
                .and_then(|r| r.checked_mul(hundred))
                .unwrap_or(Decimal::ZERO);
            CategoryShare {
                category: category.to_string(),
                total,
                percentage,
            }
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

/// Income and expense per calendar day, oldest first.
pub fn by_day(list: &[Transaction]) -> BTreeMap<NaiveDate, DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for tx in list {
        let entry = days.entry(tx.date).or_default();
        match tx.tx_type {
            TxType::Income => entry.income = entry.income.saturating_add(tx.amount),
            TxType::Expense => entry.expense = entry.expense.saturating_add(tx.amount),
        }
    }
    days
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
}

pub fn category_stats(list: &[Transaction], name: &str, tx_type: TxType) -> CategoryStats {
    let mut stats = CategoryStats::default();
    for tx in list
        .iter()
        .filter(|t| t.tx_type == tx_type && t.category == name)
    {
        stats.total = stats.total.saturating_add(tx.amount);
        stats.count += 1;
    }
    if stats.count > 0 {
        stats.average = stats.total / Decimal::from(stats.count);
    }
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Date,
    Amount,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "amount" => Ok(SortBy::Amount),
            other => Err(Error::validation(format!(
                "Invalid sort key '{}', expected date|amount",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::validation(format!(
                "Invalid sort order '{}', expected asc|desc",
                other
            ))),
        }
    }
}

/// Client-side narrowing of an already fetched list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListView {
    pub search: Option<String>,
    pub tx_type: Option<TxType>,
    pub category: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// Search, filter and sort. The sort is stable: rows comparing equal keep
/// the order they arrived in.
pub fn filter_and_sort(list: &[Transaction], view: &ListView) -> Vec<Transaction> {
    let needle = view
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut out: Vec<Transaction> = list
        .iter()
        .filter(|tx| match &needle {
            Some(n) => {
                tx.description.to_lowercase().contains(n) || tx.category.to_lowercase().contains(n)
            }
            None => true,
        })
        .filter(|tx| view.tx_type.is_none_or(|t| tx.tx_type == t))
        .filter(|tx| {
            view.category
                .as_deref()
                .is_none_or(|c| tx.category == c)
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| {
        let ord = match view.sort_by {
            SortBy::Date => a.date.cmp(&b.date),
            SortBy::Amount => a.amount.cmp(&b.amount),
        };
        match view.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    out
}

/// Date presets offered by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl Period {
    /// Inclusive `(start, end)` of the period containing `today`.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Week => {
                // Weeks run Sunday to Saturday.
                let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
                (start, start + Duration::days(6))
            }
            Period::Month => {
                let start = today.with_day(1).unwrap_or(today);
                let next = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
                };
                let end = next.map(|n| n - Duration::days(1)).unwrap_or(today);
                (start, end)
            }
            Period::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            ),
            Period::All => (
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
                NaiveDate::from_ymd_opt(2100, 12, 31).unwrap_or(NaiveDate::MAX),
            ),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "all" => Ok(Period::All),
            other => Err(Error::validation(format!(
                "Invalid period '{}', expected week|month|year|all",
                other
            ))),
        }
    }
}
