// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use moneymap::config::{AppConfig, BackendKind};
use moneymap::Error;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn file_values_override_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("moneymap.toml");
    std::fs::write(
        &path,
        r#"
backend = "hosted"
url = "https://demo.example.co"
anon_key = "public-anon-key"
database = "/tmp/mm.sqlite"
log_level = "debug"
"#,
    )
    .unwrap();

    let cfg = AppConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(cfg.backend, BackendKind::Hosted);
    assert_eq!(cfg.url, "https://demo.example.co");
    assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/mm.sqlite"));
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.oauth_redirect, None);
}

#[test]
fn hosted_without_credentials_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("moneymap.toml");
    std::fs::write(&path, "backend = \"hosted\"\n").unwrap();
    assert!(matches!(AppConfig::load(Some(path.as_path())), Err(Error::Validation(_))));
}

#[test]
fn defaults_are_local_and_quiet() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.backend, BackendKind::Local);
    assert_eq!(cfg.log_level, "warn");
    assert!(cfg.validate().is_ok());
}

#[test]
fn explicit_config_file_must_exist() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(AppConfig::load(Some(missing.as_path())), Err(Error::Config(_))));
}
