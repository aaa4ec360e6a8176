// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Income => "income",
            TxType::Expense => "expense",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TxType::Income),
            "expense" => Ok(TxType::Expense),
            other => Err(Error::validation(format!(
                "Invalid type '{}', expected income|expense",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
    Both,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Both => "both",
        }
    }

    /// Whether a transaction of `tx` type may use a category of this type.
    pub fn accepts(&self, tx: TxType) -> bool {
        match self {
            CategoryType::Both => true,
            CategoryType::Income => tx == TxType::Income,
            CategoryType::Expense => tx == TxType::Expense,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            "both" => Ok(CategoryType::Both),
            other => Err(Error::validation(format!(
                "Invalid category type '{}', expected income|expense|both",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub icon: String,
}

impl NewTransaction {
    /// Form-level checks, run before anything is sent to the backend.
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        require("category", &self.category)?;
        require("description", &self.description)?;
        Ok(())
    }
}

/// Partial update of a transaction. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<TxType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self == &TransactionPatch::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            require("category", category)?;
        }
        if let Some(description) = &self.description {
            require("description", description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

impl Category {
    /// Global categories are shared by every user and cannot be edited.
    pub fn is_global(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

impl NewCategory {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub category_type: Option<CategoryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CategoryPatch {
    pub fn validate(&self) -> Result<()> {
        if self == &CategoryPatch::default() {
            return Err(Error::validation("Nothing to update"));
        }
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(ts) => ts <= now.timestamp(),
            None => false,
        }
    }
}

/// Largest amount a single transaction may carry.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "Amount must be greater than 0 (got {})",
            amount
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::validation(format!(
            "Amount must be at most {} (got {})",
            MAX_AMOUNT, amount
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(amount: &str) -> NewTransaction {
        NewTransaction {
            tx_type: TxType::Expense,
            amount: amount.parse().unwrap(),
            category: "Food".into(),
            description: "Lunch".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            icon: String::new(),
        }
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(draft("12.50").validate().is_ok());
        assert!(matches!(draft("0").validate(), Err(Error::Validation(_))));
        assert!(matches!(draft("-3").validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn amount_is_capped() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000i64));
        assert!(draft("1000000000000").validate().is_ok());
        assert!(matches!(
            draft("1000000000000.01").validate(),
            Err(Error::Validation(_))
        ));
        let mut tx = draft("1");
        tx.amount = Decimal::MAX;
        assert!(tx.validate().is_err());
        let patch = TransactionPatch {
            amount: Some(Decimal::MAX),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut tx = draft("1");
        tx.description = "   ".into();
        assert!(tx.validate().is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(TransactionPatch::default().validate().is_err());
        let patch = TransactionPatch {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn both_accepts_any_type() {
        assert!(CategoryType::Both.accepts(TxType::Income));
        assert!(CategoryType::Both.accepts(TxType::Expense));
        assert!(!CategoryType::Income.accepts(TxType::Expense));
    }

    #[test]
    fn transaction_reads_hosted_row() {
        let row = serde_json::json!({
            "id": "6f0c7d8e-4a55-4a8e-9a44-1b2f7c9d0e11",
            "user_id": "0b6f4b5e-2f68-4d7b-8d0e-6c1a2b3c4d5e",
            "type": "expense",
            "amount": 40.5,
            "category": "Food",
            "description": "Groceries",
            "date": "2025-03-02",
            "created_at": "2025-03-02T10:00:00.123456+00:00"
        });
        let tx: Transaction = serde_json::from_value(row).unwrap();
        assert_eq!(tx.tx_type, TxType::Expense);
        assert_eq!(tx.amount, "40.5".parse::<Decimal>().unwrap());
        assert_eq!(tx.icon, "");
    }
}
