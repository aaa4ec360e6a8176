// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Session gateway over an [`AuthProvider`].
//!
//! The gateway owns the current session, persists it through
//! [`SessionStore`] and tells subscribers about every change. Subscribers run
//! synchronously, in subscription order, before the mutating call returns.

use crate::db::SessionStore;
use crate::error::{Error, Result};
use crate::models::{Session, User};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Sent once to each new subscriber with the session at that moment.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Gitlab,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Gitlab => "gitlab",
            OAuthProvider::Apple => "apple",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            "gitlab" => Ok(OAuthProvider::Gitlab),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(Error::validation(format!("Unknown OAuth provider '{}'", other))),
        }
    }
}

/// Outcome of a sign-up. Without e-mail confirmation the backend signs the
/// user straight in and `session` is set.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<()> {
        if self == &UserUpdate::default() {
            return Err(Error::validation("Nothing to update"));
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// The account operations of an authentication service.
pub trait AuthProvider: Send + Sync {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    fn sign_up(&self, email: &str, password: &str, metadata: serde_json::Value) -> Result<SignUp>;

    /// Where to send the user to start an OAuth sign-in.
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<Url>;

    fn get_user(&self, access_token: &str) -> Result<User>;

    fn refresh(&self, refresh_token: &str) -> Result<Session>;

    fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<User>;

    fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// The fields of the registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(Error::validation("Passwords do not match"));
        }
        if self.username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL.is_match(email.trim()) {
        return Err(Error::validation(format!("Invalid e-mail address '{}'", email)));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Handle returned by [`SessionGateway::on_auth_state_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

pub struct SessionGateway {
    provider: Arc<dyn AuthProvider>,
    store: SessionStore,
    current: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
    oauth_redirect: Option<String>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionGateway {
    /// Restores whatever session the store holds.
    pub fn new(provider: Arc<dyn AuthProvider>, store: SessionStore) -> Result<Self> {
        let current = store.load()?;
        if let Some(s) = &current {
            tracing::debug!(user = %s.user.id, "restored stored session");
        }
        Ok(Self {
            provider,
            store,
            current: Mutex::new(current),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            oauth_redirect: None,
        })
    }

    pub fn with_oauth_redirect(mut self, redirect: Option<String>) -> Self {
        self.oauth_redirect = redirect;
        self
    }

    pub fn on_auth_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        guard(&self.subscribers).push((id, callback.clone()));
        let current = self.snapshot();
        callback(AuthEvent::InitialSession, current.as_ref());
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        guard(&self.subscribers).retain(|(id, _)| *id != subscription.0);
    }

    fn snapshot(&self) -> Option<Session> {
        guard(&self.current).clone()
    }

    fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        // Callbacks may subscribe or unsubscribe, so run them unlocked.
        let callbacks: Vec<Callback> = guard(&self.subscribers)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in callbacks {
            cb(event, session);
        }
    }

    fn replace(&self, event: AuthEvent, session: Option<Session>) -> Result<()> {
        match &session {
            Some(s) => self.store.save(s)?,
            None => self.store.clear()?,
        }
        *guard(&self.current) = session.clone();
        self.emit(event, session.as_ref());
        Ok(())
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        let session = self
            .provider
            .sign_in_with_password(email.trim(), password)
            .inspect_err(|err| tracing::warn!("sign-in failed: {err}"))?;
        tracing::info!(user = %session.user.id, "signed in");
        self.replace(AuthEvent::SignedIn, Some(session.clone()))?;
        Ok(session)
    }

    pub fn sign_up(&self, email: &str, password: &str, metadata: serde_json::Value) -> Result<SignUp> {
        validate_email(email)?;
        validate_password(password)?;
        let outcome = self
            .provider
            .sign_up(email.trim(), password, metadata)
            .inspect_err(|err| tracing::warn!("sign-up failed: {err}"))?;
        if let Some(session) = &outcome.session {
            tracing::info!(user = %session.user.id, "signed up and signed in");
            self.replace(AuthEvent::SignedIn, Some(session.clone()))?;
        }
        Ok(outcome)
    }

    pub fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<Url> {
        self.provider
            .authorize_url(provider, self.oauth_redirect.as_deref())
    }

    /// Finish an OAuth sign-in from the URL the provider redirected to. The
    /// tokens travel in the fragment (implicit flow) or, failing that, in the
    /// query string.
    pub fn complete_oauth(&self, callback_url: &str) -> Result<Session> {
        let url = Url::parse(callback_url.trim())
            .map_err(|err| Error::validation(format!("Invalid callback URL: {}", err)))?;
        let encoded = url
            .fragment()
            .or_else(|| url.query())
            .ok_or_else(|| Error::validation("Callback URL carries no tokens"))?
            .to_string();
        let mut holder = url.clone();
        holder.set_fragment(None);
        holder.set_query(Some(&encoded));

        let mut access_token = None;
        let mut refresh_token = None;
        let mut expires_at = None;
        let mut expires_in = None;
        let mut error = None;
        for (k, v) in holder.query_pairs() {
            match k.as_ref() {
                "access_token" => access_token = Some(v.into_owned()),
                "refresh_token" => refresh_token = Some(v.into_owned()),
                "expires_at" => expires_at = v.parse::<i64>().ok(),
                "expires_in" => expires_in = v.parse::<i64>().ok(),
                "error_description" => error = Some(v.into_owned()),
                "error" if error.is_none() => error = Some(v.into_owned()),
                _ => {}
            }
        }
        if let Some(message) = error {
            return Err(Error::Unauthorized(message));
        }
        let access_token =
            access_token.ok_or_else(|| Error::validation("Callback URL has no access_token"))?;
        let expires_at = expires_at.or_else(|| expires_in.map(|s| Utc::now().timestamp() + s));

        let user = self.provider.get_user(&access_token)?;
        let session = Session {
            access_token,
            refresh_token,
            expires_at,
            user,
        };
        tracing::info!(user = %session.user.id, "signed in with OAuth");
        self.replace(AuthEvent::SignedIn, Some(session.clone()))?;
        Ok(session)
    }

    /// A token the backend already rejects counts as signed out.
    pub fn sign_out(&self) -> Result<()> {
        let Some(session) = self.snapshot() else {
            return Ok(());
        };
        match self.provider.sign_out(&session.access_token) {
            Ok(()) | Err(Error::Unauthorized(_)) | Err(Error::NotFound(_)) => {}
            Err(err) => {
                tracing::warn!("sign-out failed: {err}");
                return Err(err);
            }
        }
        tracing::info!(user = %session.user.id, "signed out");
        self.replace(AuthEvent::SignedOut, None)
    }

    /// The current session, refreshed first when it has expired. A refresh
    /// token the backend refuses ends the session.
    pub fn session(&self) -> Result<Option<Session>> {
        let Some(session) = self.snapshot() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            tracing::info!("session expired without refresh token");
            self.replace(AuthEvent::SignedOut, None)?;
            return Ok(None);
        };
        match self.provider.refresh(refresh_token) {
            Ok(fresh) => {
                tracing::debug!(user = %fresh.user.id, "session refreshed");
                self.replace(AuthEvent::TokenRefreshed, Some(fresh.clone()))?;
                Ok(Some(fresh))
            }
            Err(err @ (Error::Unauthorized(_) | Error::Backend { .. } | Error::NotFound(_))) => {
                tracing::warn!("session refresh refused: {err}");
                self.replace(AuthEvent::SignedOut, None)?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.session()?.map(|s| s.user))
    }

    pub fn require_user(&self) -> Result<User> {
        self.current_user()?.ok_or(Error::NotSignedIn)
    }

    pub fn update_user(&self, update: &UserUpdate) -> Result<User> {
        update.validate()?;
        let mut session = self.session()?.ok_or(Error::NotSignedIn)?;
        let user = self
            .provider
            .update_user(&session.access_token, update)
            .inspect_err(|err| tracing::warn!("account update failed: {err}"))?;
        session.user = user.clone();
        self.replace(AuthEvent::UserUpdated, Some(session))?;
        Ok(user)
    }
}
