// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{check, HostedClient};
use crate::auth::{AuthProvider, OAuthProvider, SignUp, UserUpdate};
use crate::error::Result;
use crate::models::{Session, User};
use chrono::Utc;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};

/// The hosted GoTrue service under `/auth/v1`.
pub struct RestAuth {
    client: HostedClient,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        let expires_at = t
            .expires_at
            .or_else(|| t.expires_in.map(|s| Utc::now().timestamp() + s));
        Session {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_at,
            user: t.user,
        }
    }
}

impl RestAuth {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/token", None)?
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()?;
        let token: TokenResponse = check(res)?.json()?;
        Ok(token.into())
    }
}

impl AuthProvider for RestAuth {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_grant("password", json!({ "email": email, "password": password }))
    }

    fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUp> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/signup", None)?
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()?;
        let body: Value = check(res)?.json()?;
        parse_sign_up(body)
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<Url> {
        let mut url = self.client.endpoint("auth/v1/authorize")?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("provider", provider.as_str());
            if let Some(r) = redirect_to {
                q.append_pair("redirect_to", r);
            }
        }
        Ok(url)
    }

    fn get_user(&self, access_token: &str) -> Result<User> {
        let res = self
            .client
            .request(Method::GET, "auth/v1/user", Some(access_token))?
            .send()?;
        Ok(check(res)?.json()?)
    }

    fn refresh(&self, refresh_token: &str) -> Result<Session> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
    }

    fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<User> {
        let mut body = serde_json::Map::new();
        if let Some(email) = &update.email {
            body.insert("email".into(), json!(email));
        }
        if let Some(name) = &update.name {
            body.insert("data".into(), json!({ "name": name }));
        }
        let res = self
            .client
            .request(Method::PUT, "auth/v1/user", Some(access_token))?
            .json(&body)
            .send()?;
        Ok(check(res)?.json()?)
    }

    fn sign_out(&self, access_token: &str) -> Result<()> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/logout", Some(access_token))?
            .send()?;
        check(res)?;
        Ok(())
    }
}

/// Sign-up answers with a full session when e-mail confirmation is off, and
/// with the bare user (sometimes wrapped in `user`) when it is on.
fn parse_sign_up(body: Value) -> Result<SignUp> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)?;
        let session: Session = token.into();
        return Ok(SignUp {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }
    let user_value = match body.get("user") {
        Some(u) if !u.is_null() => u.clone(),
        _ => body,
    };
    if user_value.get("id").is_none() {
        return Ok(SignUp::default());
    }
    Ok(SignUp {
        user: Some(serde_json::from_value(user_value)?),
        session: None,
    })
}
