// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed clients for the backend tables.

pub mod categories;
pub mod profiles;
pub mod transactions;

pub use categories::CategoryRepository;
pub use profiles::ProfileRepository;
pub use transactions::{TransactionFilter, TransactionRepository};

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode).collect()
}
