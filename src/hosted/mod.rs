// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Client for the hosted backend: PostgREST tables under `/rest/v1`,
//! GoTrue auth under `/auth/v1` and object storage under `/storage/v1`.

pub mod auth;
pub mod rest;

pub use auth::RestAuth;
pub use rest::RestBackend;

use crate::error::{Error, Result};
use crate::utils::http_client;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::{Method, Url};

/// Shared HTTP plumbing: base URL, project key and the blocking client.
#[derive(Debug, Clone)]
pub struct HostedClient {
    base: Url,
    anon_key: String,
    http: reqwest::blocking::Client,
}

impl HostedClient {
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let mut base = Url::parse(url)
            .map_err(|err| Error::validation(format!("invalid backend url '{}': {}", url, err)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            anon_key: anon_key.to_string(),
            http: http_client()?,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| Error::validation(format!("invalid endpoint '{}': {}", path, err)))
    }

    /// A request carrying the project key, authorized as `token` when given
    /// and as the anonymous role otherwise.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, %url, "hosted request");
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key)))
    }
}

/// Pass successful responses through; turn the rest into [`Error`] with the
/// backend's own message.
pub fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    let message = error_message(&body);
    tracing::warn!(status = status.as_u16(), %message, "hosted backend error");
    Err(Error::from_status(status.as_u16(), message))
}

/// Pull the human readable part out of an error body. The REST, auth and
/// storage services each use a different field for it.
pub fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                return s.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}
