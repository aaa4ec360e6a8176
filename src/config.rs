// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "moneymap.toml";
const ENV_PREFIX: &str = "MONEYMAP";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Everything in the local SQLite file.
    #[default]
    Local,
    /// The hosted auth, REST and storage services at `url`.
    Hosted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub url: String,
    pub anon_key: String,
    /// State database location; the platform data dir when unset.
    pub database: Option<PathBuf>,
    /// Where the OAuth provider sends the browser back to.
    pub oauth_redirect: Option<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            url: String::new(),
            anon_key: String::new(),
            database: None,
            oauth_redirect: None,
            log_level: "warn".to_string(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    db::project_dirs().map(|p| p.config_dir().join(CONFIG_FILE))
}

impl AppConfig {
    /// Defaults, then the TOML file (`path`, or the optional one in the
    /// platform config dir), then `MONEYMAP_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(p) => {
                builder = builder.add_source(config::File::from(p).required(true));
            }
            None => {
                if let Some(p) = default_config_path() {
                    builder = builder.add_source(config::File::from(p.as_path()).required(false));
                }
            }
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
        let settings: AppConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Hosted && (self.url.is_empty() || self.anon_key.is_empty())
        {
            return Err(Error::validation(
                "the hosted backend needs both `url` and `anon_key` (or MONEYMAP_URL / MONEYMAP_ANON_KEY)",
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(p) => Ok(p.clone()),
            None => db::default_db_path(),
        }
    }
}
