// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use moneymap::auth::Registration;
use moneymap::backend::{Backend, Query};
use moneymap::context::AppContext;
use moneymap::local::SqliteBackend;
use moneymap::models::{NewTransaction, Session, TransactionPatch, TxType};
use moneymap::repo::{TransactionFilter, TransactionRepository};
use moneymap::{cli, commands::transactions, db, Error};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

fn setup() -> AppContext {
    let conn = db::shared(db::open_in_memory().unwrap());
    AppContext::local(conn, 4).unwrap()
}

fn sign_up(ctx: &AppContext, email: &str) -> Uuid {
    let form = Registration {
        email: email.into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
        username: email.split('@').next().unwrap().into(),
    };
    ctx.register(&form).unwrap().session.unwrap().user.id
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_tx(tx_type: TxType, amount: &str, category: &str, date: &str) -> NewTransaction {
    NewTransaction {
        tx_type,
        amount: Decimal::from_str(amount).unwrap(),
        category: category.into(),
        description: format!("{} on {}", category, date),
        date: d(date),
        icon: String::new(),
    }
}

fn seed(ctx: &AppContext, user: Uuid) {
    for (t, amt, cat, date) in [
        (TxType::Income, "3000", "Salary", "2025-01-01"),
        (TxType::Expense, "12.50", "Food", "2025-01-02"),
        (TxType::Expense, "40", "Transport", "2025-01-03"),
        (TxType::Expense, "7.25", "Food", "2025-02-01"),
    ] {
        ctx.transactions.create(&new_tx(t, amt, cat, date), user).unwrap();
    }
}

#[test]
fn list_limit_respected() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    seed(&ctx, user);
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["moneymap", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&ctx, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, d("2025-02-01"));
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn list_without_range_flags_is_unbounded() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    ctx.transactions
        .create(&new_tx(TxType::Expense, "9", "Food", "1999-12-31"), user)
        .unwrap();
    ctx.transactions
        .create(&new_tx(TxType::Income, "100", "Salary", "2025-01-01"), user)
        .unwrap();

    let list = |args: &[&str]| {
        let mut argv = vec!["moneymap", "tx", "list"];
        argv.extend_from_slice(args);
        let matches = cli::build_cli().get_matches_from(argv);
        let Some(("tx", tx_m)) = matches.subcommand() else {
            panic!("no tx subcommand");
        };
        let Some(("list", list_m)) = tx_m.subcommand() else {
            panic!("no list subcommand");
        };
        transactions::query_rows(&ctx, list_m).unwrap()
    };

    let rows = list(&[]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].date, d("1999-12-31"));
    assert_eq!(list(&["--period", "all"]).len(), 2);
    let old = list(&["--to", "1999-12-31"]);
    assert_eq!(old.len(), 1);
    assert_eq!(old[0].category, "Food");
}

#[test]
fn list_search_and_amount_sort() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    seed(&ctx, user);
    let matches = cli::build_cli().get_matches_from([
        "moneymap", "tx", "list", "--search", "FOOD", "--sort-by", "amount", "--order", "asc",
    ]);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    let Some(("list", list_m)) = tx_m.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = transactions::query_rows(&ctx, list_m).unwrap();
    let amounts: Vec<String> = rows.iter().map(|t| t.amount.to_string()).collect();
    assert_eq!(amounts, vec!["7.25", "12.50"]);
}

#[test]
fn filters_apply_on_the_backend() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    seed(&ctx, user);

    let january = ctx
        .transactions
        .list(user, &TransactionFilter::between(d("2025-01-01"), d("2025-01-31")))
        .unwrap();
    assert_eq!(january.len(), 3);
    assert!(january.windows(2).all(|w| w[0].date >= w[1].date));

    let expenses = ctx
        .transactions
        .list(
            user,
            &TransactionFilter {
                tx_type: Some(TxType::Expense),
                min_amount: Some(Decimal::from(10)),
                ..Default::default()
            },
        )
        .unwrap();
    let cats: Vec<&str> = expenses.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(cats, vec!["Transport", "Food"]);

    // Bounds apply independently of each other.
    let since_feb = ctx
        .transactions
        .list(
            user,
            &TransactionFilter {
                start_date: Some(d("2025-02-01")),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(since_feb.len(), 1);
}

#[test]
fn amount_bounds_are_exact_decimals() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    for amount in ["0.1", "0.10000000000000001", "0.2"] {
        ctx.transactions
            .create(&new_tx(TxType::Expense, amount, "Food", "2025-01-01"), user)
            .unwrap();
    }
    let amounts = |min: Option<&str>, max: Option<&str>| {
        let filter = TransactionFilter {
            min_amount: min.map(|m| Decimal::from_str(m).unwrap()),
            max_amount: max.map(|m| Decimal::from_str(m).unwrap()),
            ..Default::default()
        };
        let mut got: Vec<String> = ctx
            .transactions
            .list(user, &filter)
            .unwrap()
            .iter()
            .map(|t| t.amount.to_string())
            .collect();
        got.sort();
        got
    };
    assert_eq!(amounts(None, Some("0.1")), vec!["0.1"]);
    assert_eq!(amounts(Some("0.10000000000000001"), None), vec!["0.10000000000000001", "0.2"]);
    assert_eq!(
        amounts(Some("0.10000000000000001"), Some("0.10000000000000001")),
        vec!["0.10000000000000001"]
    );
}

#[test]
fn create_get_update_delete() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    let tx = ctx
        .transactions
        .create(&new_tx(TxType::Expense, "19.99", "Entertainment", "2025-03-04"), user)
        .unwrap();
    assert_eq!(tx.user_id, user);
    assert_eq!(tx.amount, Decimal::from_str("19.99").unwrap());
    assert!(tx.created_at.is_some());

    let fetched = ctx.transactions.get(tx.id).unwrap();
    assert_eq!(fetched, tx);

    let updated = ctx
        .transactions
        .update(
            tx.id,
            &TransactionPatch {
                amount: Some(Decimal::from(25)),
                description: Some("Cinema".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.amount, Decimal::from(25));
    assert_eq!(updated.description, "Cinema");
    assert_eq!(updated.category, "Entertainment");

    ctx.transactions.delete(tx.id).unwrap();
    assert!(matches!(ctx.transactions.get(tx.id), Err(Error::NotFound(_))));
    let left = ctx.transactions.list(user, &TransactionFilter::default()).unwrap();
    assert!(left.iter().all(|t| t.id != tx.id));
    // Deleting again is fine.
    ctx.transactions.delete(tx.id).unwrap();
}

#[test]
fn update_of_missing_row_is_not_found() {
    let ctx = setup();
    sign_up(&ctx, "ana@example.com");
    let err = ctx
        .transactions
        .update(
            Uuid::new_v4(),
            &TransactionPatch {
                category: Some("Food".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn rows_of_other_users_stay_hidden() {
    let ctx = setup();
    let ana = sign_up(&ctx, "ana@example.com");
    seed(&ctx, ana);
    let ana_tx = ctx.transactions.list(ana, &TransactionFilter::default()).unwrap();

    ctx.session.sign_out().unwrap();
    let bob = sign_up(&ctx, "bob@example.com");
    assert!(ctx.transactions.list(bob, &TransactionFilter::default()).unwrap().is_empty());
    // Asking for Ana's rows directly returns nothing.
    assert!(ctx.transactions.list(ana, &TransactionFilter::default()).unwrap().is_empty());
    assert!(matches!(ctx.transactions.get(ana_tx[0].id), Err(Error::NotFound(_))));

    // Writing a row for someone else is refused.
    let err = ctx
        .transactions
        .create(&new_tx(TxType::Expense, "1", "Food", "2025-01-01"), ana)
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[test]
fn signed_out_calls_are_unauthorized() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    ctx.session.sign_out().unwrap();
    let err = ctx.transactions.list(user, &TransactionFilter::default()).unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

/// Counts every call before passing it on.
struct Counting {
    inner: SqliteBackend,
    calls: AtomicUsize,
}

impl Counting {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Backend for Counting {
    fn select(&self, table: &str, query: &Query) -> moneymap::Result<Vec<Value>> {
        self.hit();
        self.inner.select(table, query)
    }
    fn insert(&self, table: &str, row: Value) -> moneymap::Result<Value> {
        self.hit();
        self.inner.insert(table, row)
    }
    fn update(&self, table: &str, query: &Query, patch: Value) -> moneymap::Result<Vec<Value>> {
        self.hit();
        self.inner.update(table, query, patch)
    }
    fn upsert(&self, table: &str, row: Value) -> moneymap::Result<Value> {
        self.hit();
        self.inner.upsert(table, row)
    }
    fn delete(&self, table: &str, query: &Query) -> moneymap::Result<usize> {
        self.hit();
        self.inner.delete(table, query)
    }
    fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> moneymap::Result<()> {
        self.hit();
        self.inner.upload(bucket, path, bytes, content_type)
    }
    fn download(&self, bucket: &str, path: &str) -> moneymap::Result<Vec<u8>> {
        self.hit();
        self.inner.download(bucket, path)
    }
    fn set_session(&self, session: Option<&Session>) {
        self.inner.set_session(session)
    }
}

#[test]
fn invalid_amounts_never_reach_the_backend() {
    let conn = db::shared(db::open_in_memory().unwrap());
    let backend = Arc::new(Counting {
        inner: SqliteBackend::new(conn),
        calls: AtomicUsize::new(0),
    });
    let repo = TransactionRepository::new(backend.clone());
    let user = Uuid::new_v4();

    for amount in ["0", "-5", "1000000000000.01", "79228162514264337593543950335"] {
        let err = repo
            .create(&new_tx(TxType::Expense, amount, "Food", "2025-01-01"), user)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
    let mut missing_description = new_tx(TxType::Expense, "5", "Food", "2025-01-01");
    missing_description.description = "  ".into();
    assert!(matches!(
        repo.create(&missing_description, user),
        Err(Error::Validation(_))
    ));
    let err = repo
        .update(Uuid::new_v4(), &TransactionPatch::default())
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
