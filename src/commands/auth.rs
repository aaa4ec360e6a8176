// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, json_flags};
use crate::auth::{OAuthProvider, Registration};
use crate::context::AppContext;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{anyhow, Result};
use serde::Serialize;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("login", sub)) => login(ctx, sub)?,
        Some(("signup", sub)) => signup(ctx, sub)?,
        Some(("oauth", sub)) => oauth(ctx, sub)?,
        Some(("callback", sub)) => {
            let session = ctx.complete_oauth(arg(sub, "url")?)?;
            println!("Signed in as {}", label(&session.user));
        }
        Some(("logout", _)) => {
            ctx.session.sign_out()?;
            println!("Signed out");
        }
        Some(("whoami", sub)) => whoami(ctx, sub)?,
        _ => {}
    }
    Ok(())
}

fn label(user: &crate::models::User) -> String {
    user.email.clone().unwrap_or_else(|| user.id.to_string())
}

fn password(sub: &clap::ArgMatches, prompt: &str) -> Result<String> {
    match sub.get_one::<String>("password") {
        Some(p) => Ok(p.clone()),
        None => Ok(rpassword::prompt_password(prompt)?),
    }
}

fn login(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let email = match sub.get_one::<String>("email") {
        Some(e) => e.clone(),
        None => ctx
            .last_email()?
            .ok_or_else(|| anyhow!("no previous sign-in here, pass --email"))?,
    };
    let pw = password(sub, &format!("Password for {}: ", email))?;
    let session = ctx.login(&email, &pw)?;
    println!("Signed in as {}", label(&session.user));
    Ok(())
}

fn signup(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let email = arg(sub, "email")?.clone();
    let (pw, confirm) = match sub.get_one::<String>("password") {
        Some(p) => (p.clone(), p.clone()),
        None => (
            rpassword::prompt_password("Password: ")?,
            rpassword::prompt_password("Confirm password: ")?,
        ),
    };
    let form = Registration {
        email,
        password: pw,
        confirm_password: confirm,
        username: arg(sub, "username")?.clone(),
    };
    let outcome = ctx.register(&form)?;
    match outcome.session {
        Some(s) => println!("Account created, signed in as {}", label(&s.user)),
        None => println!("Account created. Confirm your e-mail, then run `moneymap auth login`."),
    }
    Ok(())
}

fn oauth(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let provider: OAuthProvider = arg(sub, "provider")?.parse()?;
    let url = ctx.oauth_url(provider)?;
    println!("Open this URL in a browser, then pass the page you land on to `moneymap auth callback`:");
    println!("{}", url);
    Ok(())
}

#[derive(Serialize)]
struct WhoAmI {
    id: String,
    email: String,
    name: String,
    username: String,
}

fn whoami(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let user = ctx.require_user()?;
    let profile = ctx.ensure_profile(&user)?;
    let me = WhoAmI {
        id: user.id.to_string(),
        email: user.email.clone().unwrap_or_default(),
        name: user.display_name().unwrap_or_default().to_string(),
        username: profile.username,
    };
    if !maybe_print_json(json_flag, jsonl_flag, &me)? {
        let rows = vec![
            vec!["id".into(), me.id],
            vec!["email".into(), me.email],
            vec!["name".into(), me.name],
            vec!["username".into(), me.username],
        ];
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}
