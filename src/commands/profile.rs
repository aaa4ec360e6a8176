// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, json_flags};
use crate::auth::UserUpdate;
use crate::context::AppContext;
use crate::models::ProfileUpdate;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use std::path::Path;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(ctx, sub)?,
        Some(("edit", sub)) => edit(ctx, sub)?,
        Some(("avatar-upload", sub)) => {
            let user = ctx.require_user()?;
            let file = arg(sub, "file")?;
            let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file))?;
            let name = Path::new(file)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(file.as_str());
            let p = ctx.profiles.upload_avatar(user.id, name, bytes)?;
            println!("Avatar stored at {}", p.avatar_url);
        }
        Some(("avatar-download", sub)) => {
            let user = ctx.require_user()?;
            let out = arg(sub, "out")?;
            let profile = ctx.ensure_profile(&user)?;
            let bytes = ctx.profiles.download_avatar(&profile)?;
            std::fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out))?;
            println!("Saved avatar ({} bytes) to {}", bytes.len(), out);
        }
        _ => {}
    }
    Ok(())
}

fn show(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let user = ctx.require_user()?;
    let p = ctx.ensure_profile(&user)?;
    if !maybe_print_json(json_flag, jsonl_flag, &p)? {
        let rows = vec![
            vec!["username".into(), p.username.clone()],
            vec!["email".into(), p.email.clone()],
            vec!["avatar".into(), p.avatar_url.clone()],
        ];
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}

/// E-mail and display name live on the account, username on the profile.
/// The profile's copy of the e-mail follows the account.
fn edit(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let user = ctx.require_user()?;
    let email = sub.get_one::<String>("email").map(|s| s.trim().to_string());
    let name = sub.get_one::<String>("name").cloned();
    let username = sub.get_one::<String>("username").cloned();
    if email.is_none() && name.is_none() && username.is_none() {
        anyhow::bail!("Nothing to update: pass --username, --email or --name");
    }
    if email.is_some() || name.is_some() {
        ctx.session.update_user(&UserUpdate {
            email: email.clone(),
            name,
        })?;
    }
    if email.is_some() || username.is_some() {
        ctx.profiles.upsert(user.id, &ProfileUpdate { username, email, ..Default::default() })?;
    }
    println!("Profile updated");
    Ok(())
}
