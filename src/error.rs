// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the library can fail with.
///
/// Validation errors are raised before any backend call. Backend errors carry
/// the backend's own message unchanged so it can be shown to the user as is.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Map an HTTP status and backend message onto the taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 | 406 => Error::NotFound(message),
            _ => Error::Backend { status, message },
        }
    }
}
