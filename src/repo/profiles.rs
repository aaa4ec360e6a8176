// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::decode;
use crate::backend::{Backend, Query, AVATARS, PROFILES};
use crate::error::{Error, Result};
use crate::models::{Profile, ProfileUpdate};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProfileRepository {
    backend: Arc<dyn Backend>,
}

impl ProfileRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn get(&self, user_id: Uuid) -> Result<Profile> {
        let rows = self
            .backend
            .select(PROFILES, &Query::new().eq("id", user_id.to_string()).limit(1))?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(Error::NotFound(format!("profile {}", user_id))),
        }
    }

    /// Create the profile or merge `update` into it.
    pub fn upsert(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile> {
        if let Some(username) = &update.username {
            if username.trim().is_empty() {
                return Err(Error::validation("username is required"));
            }
        }
        let mut row = serde_json::to_value(update)?;
        if let Value::Object(obj) = &mut row {
            obj.insert("id".into(), Value::String(user_id.to_string()));
            obj.insert(
                "updated_at".into(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        let stored = self
            .backend
            .upsert(PROFILES, row)
            .inspect_err(|err| tracing::error!("saving profile failed: {err}"))?;
        tracing::info!(%user_id, "profile saved");
        decode(stored)
    }

    /// Store `bytes` as the user's avatar and point the profile at it.
    pub fn upload_avatar(&self, user_id: Uuid, file_name: &str, bytes: Vec<u8>) -> Result<Profile> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let path = if ext.is_empty() {
            format!("{}/avatar", user_id)
        } else {
            format!("{}/avatar.{}", user_id, ext)
        };
        self.backend
            .upload(AVATARS, &path, bytes, content_type_for(&ext))
            .inspect_err(|err| tracing::error!("avatar upload failed: {err}"))?;
        self.upsert(
            user_id,
            &ProfileUpdate {
                avatar_url: Some(path),
                ..Default::default()
            },
        )
    }

    pub fn download_avatar(&self, profile: &Profile) -> Result<Vec<u8>> {
        if profile.avatar_url.is_empty() {
            return Err(Error::NotFound("profile has no avatar".into()));
        }
        self.backend.download(AVATARS, &profile.avatar_url)
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
