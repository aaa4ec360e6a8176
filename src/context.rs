// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Wires the session gateway, the backend and the repositories together.
//! The backend follows the gateway's session through a subscription.

use crate::auth::{AuthProvider, OAuthProvider, Registration, SessionGateway, SignUp};
use crate::backend::Backend;
use crate::config::{AppConfig, BackendKind};
use crate::db::{self, SessionStore, SharedConn};
use crate::error::{Error, Result};
use crate::hosted::{HostedClient, RestAuth, RestBackend};
use crate::local::{LocalAuth, SqliteBackend};
use crate::models::{Profile, ProfileUpdate, Session, User};
use crate::repo::{CategoryRepository, ProfileRepository, TransactionRepository};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;

const LAST_EMAIL: &str = "last_email";

pub struct AppContext {
    pub session: SessionGateway,
    pub transactions: TransactionRepository,
    pub categories: CategoryRepository,
    pub profiles: ProfileRepository,
    conn: SharedConn,
}

impl AppContext {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let path = config.database_path()?;
        let conn = db::shared(db::open_or_init(&path)?);
        match config.backend {
            BackendKind::Local => Self::local(conn, bcrypt::DEFAULT_COST),
            BackendKind::Hosted => {
                tracing::debug!(url = %config.url, "using hosted backend");
                let client = HostedClient::new(&config.url, &config.anon_key)?;
                let backend = Arc::new(RestBackend::new(client.clone()));
                let provider = Arc::new(RestAuth::new(client));
                Self::assemble(conn, backend, provider, config.oauth_redirect.clone())
            }
        }
    }

    /// Everything on `conn`, with shared categories seeded. `cost` is the
    /// bcrypt cost for new password hashes.
    pub fn local(conn: SharedConn, cost: u32) -> Result<Self> {
        let backend = Arc::new(SqliteBackend::new(conn.clone()));
        backend.seed_default_categories()?;
        let provider = Arc::new(LocalAuth::new(conn.clone()).with_cost(cost));
        Self::assemble(conn, backend, provider, None)
    }

    fn assemble(
        conn: SharedConn,
        backend: Arc<dyn Backend>,
        provider: Arc<dyn AuthProvider>,
        oauth_redirect: Option<String>,
    ) -> Result<Self> {
        let session = SessionGateway::new(provider, SessionStore::new(conn.clone()))?
            .with_oauth_redirect(oauth_redirect);
        let follower = backend.clone();
        session.on_auth_state_change(move |event, s| {
            tracing::debug!(?event, signed_in = s.is_some(), "backend follows session");
            follower.set_session(s);
        });
        Ok(Self {
            session,
            transactions: TransactionRepository::new(backend.clone()),
            categories: CategoryRepository::new(backend.clone()),
            profiles: ProfileRepository::new(backend),
            conn,
        })
    }

    pub fn require_user(&self) -> Result<User> {
        self.session.require_user()
    }

    /// Create the account and, when the backend signs the user straight in,
    /// the profile row.
    pub fn register(&self, form: &Registration) -> Result<SignUp> {
        form.validate()?;
        let username = form.username.trim();
        let outcome = self
            .session
            .sign_up(&form.email, &form.password, json!({ "name": username }))?;
        if let Some(session) = &outcome.session {
            self.profiles.upsert(
                session.user.id,
                &ProfileUpdate {
                    username: Some(username.to_string()),
                    email: Some(form.email.trim().to_string()),
                    ..Default::default()
                },
            )?;
        }
        self.remember_email(&form.email)?;
        Ok(outcome)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.session.sign_in(email, password)?;
        self.ensure_profile(&session.user)?;
        self.remember_email(email)?;
        Ok(session)
    }

    pub fn oauth_url(&self, provider: OAuthProvider) -> Result<Url> {
        self.session.sign_in_with_oauth(provider)
    }

    pub fn complete_oauth(&self, callback_url: &str) -> Result<Session> {
        let session = self.session.complete_oauth(callback_url)?;
        self.ensure_profile(&session.user)?;
        Ok(session)
    }

    /// The user's profile, created from the account data when missing.
    pub fn ensure_profile(&self, user: &User) -> Result<Profile> {
        match self.profiles.get(user.id) {
            Ok(p) => Ok(p),
            Err(Error::NotFound(_)) => {
                let email = user.email.clone().unwrap_or_default();
                let username = user
                    .display_name()
                    .map(str::to_string)
                    .or_else(|| email.split('@').next().map(str::to_string))
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "user".to_string());
                tracing::info!(user = %user.id, "creating missing profile");
                self.profiles.upsert(
                    user.id,
                    &ProfileUpdate {
                        username: Some(username),
                        email: Some(email),
                        ..Default::default()
                    },
                )
            }
            Err(err) => Err(err),
        }
    }

    /// The e-mail of the last successful sign-in on this machine.
    pub fn last_email(&self) -> Result<Option<String>> {
        db::get_setting(&db::lock(&self.conn), LAST_EMAIL)
    }

    fn remember_email(&self, email: &str) -> Result<()> {
        db::set_setting(&db::lock(&self.conn), LAST_EMAIL, email.trim())
    }
}
