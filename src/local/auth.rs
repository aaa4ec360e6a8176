// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::{AuthProvider, OAuthProvider, SignUp, UserUpdate};
use crate::db::{lock, SharedConn};
use crate::error::{Error, Result};
use crate::models::{Session, User};
use chrono::Utc;
use reqwest::Url;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

const ACCESS_TTL_SECS: i64 = 3600;

/// Accounts kept in the local `users` table with bcrypt password hashes.
/// Tokens are opaque random strings stored in `tokens`.
pub struct LocalAuth {
    conn: SharedConn,
    cost: u32,
}

impl LocalAuth {
    pub fn new(conn: SharedConn) -> Self {
        Self {
            conn,
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Lower bcrypt cost, for tests.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    fn issue(conn: &Connection, user: User) -> Result<Session> {
        let access = Uuid::new_v4().simple().to_string();
        let refresh = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now().timestamp() + ACCESS_TTL_SECS;
        let id = user.id.to_string();
        conn.execute(
            "INSERT INTO tokens(token, kind, user_id, expires_at) VALUES (?1, 'access', ?2, ?3)",
            params![access, id, expires_at],
        )?;
        conn.execute(
            "INSERT INTO tokens(token, kind, user_id, expires_at) VALUES (?1, 'refresh', ?2, NULL)",
            params![refresh, id],
        )?;
        Ok(Session {
            access_token: access,
            refresh_token: Some(refresh),
            expires_at: Some(expires_at),
            user,
        })
    }

    fn user_by_id(conn: &Connection, id: &str) -> Result<User> {
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT id, email, user_metadata FROM users WHERE id=?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        let (id, email, metadata) = row.ok_or_else(|| Error::NotFound("user not found".into()))?;
        to_user(&id, email, &metadata)
    }

    fn user_for_token(conn: &Connection, token: &str, kind: &str) -> Result<String> {
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM tokens WHERE token=?1 AND kind=?2",
                params![token, kind],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((user_id, None)) => Ok(user_id),
            Some((user_id, Some(exp))) if exp > Utc::now().timestamp() => Ok(user_id),
            _ => Err(Error::Unauthorized("invalid or expired token".into())),
        }
    }
}

fn to_user(id: &str, email: String, metadata: &str) -> Result<User> {
    let id = Uuid::parse_str(id).map_err(|e| Error::Backend {
        status: 500,
        message: format!("corrupt user id '{}': {}", id, e),
    })?;
    Ok(User {
        id,
        email: Some(email),
        user_metadata: serde_json::from_str(metadata)?,
    })
}

impl AuthProvider for LocalAuth {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let conn = lock(&self.conn);
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT id, email, password_hash, user_metadata FROM users WHERE email=?1",
                params![email],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        let invalid = || Error::Unauthorized("Invalid login credentials".into());
        let Some((id, email, hash, metadata)) = row else {
            return Err(invalid());
        };
        if !bcrypt::verify(password, &hash)? {
            return Err(invalid());
        }
        let user = to_user(&id, email, &metadata)?;
        Self::issue(&conn, user)
    }

    fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUp> {
        let hash = bcrypt::hash(password, self.cost)?;
        let conn = lock(&self.conn);
        let taken: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE email=?1", params![email], |r| {
                r.get(0)
            })
            .optional()?;
        if taken.is_some() {
            return Err(Error::Backend {
                status: 422,
                message: "User already registered".into(),
            });
        }
        let metadata = if metadata.is_null() {
            Value::Object(Default::default())
        } else {
            metadata
        };
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };
        conn.execute(
            "INSERT INTO users(id, email, password_hash, user_metadata) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                email,
                hash,
                serde_json::to_string(&user.user_metadata)?
            ],
        )?;
        // No e-mail confirmation locally: the new account is signed in.
        let session = Self::issue(&conn, user.clone())?;
        Ok(SignUp {
            user: Some(user),
            session: Some(session),
        })
    }

    fn authorize_url(&self, provider: OAuthProvider, _redirect_to: Option<&str>) -> Result<Url> {
        Err(Error::Unsupported(format!(
            "{} sign-in needs the hosted backend",
            provider
        )))
    }

    fn get_user(&self, access_token: &str) -> Result<User> {
        let conn = lock(&self.conn);
        let id = Self::user_for_token(&conn, access_token, "access")?;
        Self::user_by_id(&conn, &id)
    }

    fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let conn = lock(&self.conn);
        let id = Self::user_for_token(&conn, refresh_token, "refresh")?;
        // Refresh tokens are single use.
        conn.execute("DELETE FROM tokens WHERE token=?1", params![refresh_token])?;
        let user = Self::user_by_id(&conn, &id)?;
        Self::issue(&conn, user)
    }

    fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<User> {
        let conn = lock(&self.conn);
        let id = Self::user_for_token(&conn, access_token, "access")?;
        let mut user = Self::user_by_id(&conn, &id)?;
        if let Some(email) = &update.email {
            let clash: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE email=?1 AND id<>?2",
                    params![email, id],
                    |r| r.get(0),
                )
                .optional()?;
            if clash.is_some() {
                return Err(Error::Backend {
                    status: 422,
                    message: "A user with this email address has already been registered".into(),
                });
            }
            conn.execute("UPDATE users SET email=?1 WHERE id=?2", params![email, id])?;
            user.email = Some(email.clone());
        }
        if let Some(name) = &update.name {
            if !user.user_metadata.is_object() {
                user.user_metadata = Value::Object(Default::default());
            }
            if let Some(obj) = user.user_metadata.as_object_mut() {
                obj.insert("name".into(), Value::String(name.clone()));
            }
            conn.execute(
                "UPDATE users SET user_metadata=?1 WHERE id=?2",
                params![serde_json::to_string(&user.user_metadata)?, id],
            )?;
        }
        Ok(user)
    }

    fn sign_out(&self, access_token: &str) -> Result<()> {
        let conn = lock(&self.conn);
        let id = Self::user_for_token(&conn, access_token, "access")?;
        conn.execute("DELETE FROM tokens WHERE user_id=?1", params![id])?;
        Ok(())
    }
}
