// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use moneymap::auth::{AuthEvent, OAuthProvider, Registration, UserUpdate};
use moneymap::context::AppContext;
use moneymap::db::{self, SessionStore, SharedConn};
use moneymap::models::Session;
use moneymap::Error;
use std::sync::{Arc, Mutex};

fn conn() -> SharedConn {
    db::shared(db::open_in_memory().unwrap())
}

fn form(email: &str) -> Registration {
    Registration {
        email: email.into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
        username: "ana".into(),
    }
}

type Events = Arc<Mutex<Vec<(AuthEvent, bool)>>>;

fn record(ctx: &AppContext) -> Events {
    let events: Events = Arc::default();
    let sink = events.clone();
    ctx.session.on_auth_state_change(move |event, session| {
        sink.lock().unwrap().push((event, session.is_some()));
    });
    events
}

#[test]
fn subscribers_see_every_change() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let events = record(&ctx);

    ctx.register(&form("ana@example.com")).unwrap();
    ctx.session.sign_out().unwrap();
    ctx.login("ana@example.com", "secret1").unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            (AuthEvent::InitialSession, false),
            (AuthEvent::SignedIn, true),
            (AuthEvent::SignedOut, false),
            (AuthEvent::SignedIn, true),
        ]
    );
}

#[test]
fn unsubscribed_callbacks_stay_quiet() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let count = Arc::new(Mutex::new(0));
    let c = count.clone();
    let sub = ctx.session.on_auth_state_change(move |_, _| {
        *c.lock().unwrap() += 1;
    });
    ctx.session.unsubscribe(sub);
    ctx.register(&form("ana@example.com")).unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn registration_creates_the_profile() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let outcome = ctx.register(&form("ana@example.com")).unwrap();
    let user = outcome.user.unwrap();
    assert_eq!(user.display_name(), Some("ana"));

    let profile = ctx.profiles.get(user.id).unwrap();
    assert_eq!(profile.username, "ana");
    assert_eq!(profile.email, "ana@example.com");
    assert_eq!(ctx.last_email().unwrap().as_deref(), Some("ana@example.com"));
}

#[test]
fn registration_is_checked_before_sign_up() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let mut bad = form("ana@example.com");
    bad.confirm_password = "secret2".into();
    assert!(matches!(ctx.register(&bad), Err(Error::Validation(_))));
    assert!(ctx.session.session().unwrap().is_none());

    ctx.register(&form("ana@example.com")).unwrap();
    ctx.session.sign_out().unwrap();
    let err = ctx.register(&form("ANA@example.com")).unwrap_err();
    assert!(matches!(err, Error::Backend { status: 422, .. }));
}

#[test]
fn wrong_password_keeps_the_user_signed_out() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    ctx.register(&form("ana@example.com")).unwrap();
    ctx.session.sign_out().unwrap();

    let err = ctx.login("ana@example.com", "wrong-password").unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert!(matches!(ctx.require_user(), Err(Error::NotSignedIn)));
}

#[test]
fn session_survives_a_restart() {
    let shared = conn();
    let first = AppContext::local(shared.clone(), 4).unwrap();
    let user = first.register(&form("ana@example.com")).unwrap().user.unwrap();
    drop(first);

    let second = AppContext::local(shared, 4).unwrap();
    let events = record(&second);
    assert_eq!(second.require_user().unwrap().id, user.id);
    assert_eq!(*events.lock().unwrap(), vec![(AuthEvent::InitialSession, true)]);
    // The backend follows the restored session.
    assert!(second.categories.list(user.id).is_ok());
}

fn expire(store: &SessionStore, session: &Session, refresh: Option<&str>) {
    let mut stale = session.clone();
    stale.expires_at = Some(1);
    stale.refresh_token = refresh.map(str::to_string);
    store.save(&stale).unwrap();
}

#[test]
fn expired_session_is_refreshed() {
    let shared = conn();
    let first = AppContext::local(shared.clone(), 4).unwrap();
    let session = first.register(&form("ana@example.com")).unwrap().session.unwrap();
    expire(&SessionStore::new(shared.clone()), &session, session.refresh_token.as_deref());
    drop(first);

    let second = AppContext::local(shared.clone(), 4).unwrap();
    let events = record(&second);
    let fresh = second.session.session().unwrap().unwrap();
    assert_ne!(fresh.access_token, session.access_token);
    assert_ne!(fresh.refresh_token, session.refresh_token);
    assert_eq!(fresh.user.id, session.user.id);
    assert_eq!(events.lock().unwrap().last(), Some(&(AuthEvent::TokenRefreshed, true)));

    // The stored copy is the refreshed one.
    let stored = SessionStore::new(shared).load().unwrap().unwrap();
    assert_eq!(stored.access_token, fresh.access_token);
}

#[test]
fn refused_refresh_signs_out() {
    let shared = conn();
    let first = AppContext::local(shared.clone(), 4).unwrap();
    let session = first.register(&form("ana@example.com")).unwrap().session.unwrap();
    expire(&SessionStore::new(shared.clone()), &session, Some("not-a-token"));
    drop(first);

    let second = AppContext::local(shared.clone(), 4).unwrap();
    assert!(second.session.session().unwrap().is_none());
    assert!(SessionStore::new(shared).load().unwrap().is_none());
}

#[test]
fn oauth_needs_the_hosted_backend() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let err = ctx.oauth_url(OAuthProvider::Github).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn oauth_callback_reads_tokens_from_the_fragment() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    let session = ctx.register(&form("ana@example.com")).unwrap().session.unwrap();

    let url = format!(
        "http://localhost:3000/callback#access_token={}&refresh_token={}&expires_in=3600&token_type=bearer",
        session.access_token,
        session.refresh_token.clone().unwrap()
    );
    let restored = ctx.complete_oauth(&url).unwrap();
    assert_eq!(restored.user.id, session.user.id);
    assert!(restored.expires_at.is_some());

    let denied = "http://localhost:3000/callback#error=access_denied&error_description=User+denied+access";
    match ctx.complete_oauth(denied) {
        Err(Error::Unauthorized(msg)) => assert_eq!(msg, "User denied access"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn account_updates_notify_subscribers() {
    let ctx = AppContext::local(conn(), 4).unwrap();
    ctx.register(&form("ana@example.com")).unwrap();
    let events = record(&ctx);

    let user = ctx
        .session
        .update_user(&UserUpdate {
            name: Some("Ana Lopes".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(user.display_name(), Some("Ana Lopes"));
    assert_eq!(ctx.require_user().unwrap().display_name(), Some("Ana Lopes"));
    assert_eq!(events.lock().unwrap().last(), Some(&(AuthEvent::UserUpdated, true)));

    assert!(matches!(
        ctx.session.update_user(&UserUpdate::default()),
        Err(Error::Validation(_))
    ));
}
