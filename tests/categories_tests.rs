// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use moneymap::auth::Registration;
use moneymap::context::AppContext;
use moneymap::models::{CategoryPatch, CategoryType, NewCategory, TxType};
use moneymap::{db, Error};
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
        username: "someone".into(),
    };
    ctx.register(&form).unwrap().session.unwrap().user.id
}

fn category(name: &str, kind: CategoryType) -> NewCategory {
    NewCategory {
        name: name.into(),
        category_type: kind,
        icon: String::new(),
        color: "#000000".into(),
    }
}

#[test]
fn list_merges_shared_and_own_by_name() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    let shared = ctx.categories.list(user).unwrap();
    assert_eq!(shared.len(), 11);
    assert!(shared.iter().all(|c| c.is_global()));

    let mine = ctx
        .categories
        .create(&category("Coffee", CategoryType::Expense), user)
        .unwrap();
    assert_eq!(mine.user_id, Some(user));

    let all = ctx.categories.list(user).unwrap();
    assert_eq!(all.len(), 12);
    let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&"Coffee"));
}

#[test]
fn list_for_type_includes_both() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    let income = ctx.categories.list_for_type(user, TxType::Income).unwrap();
    let names: Vec<&str> = income.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Freelance", "Gifts", "Investments", "Other", "Salary"]);
}

#[test]
fn own_categories_can_change_shared_cannot() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    let mine = ctx
        .categories
        .create(&category("Coffee", CategoryType::Expense), user)
        .unwrap();
    let renamed = ctx
        .categories
        .update(
            mine.id,
            &CategoryPatch {
                name: Some("Cafés".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Cafés");
    assert_eq!(renamed.color, "#000000");

    let food = ctx
        .categories
        .list(user)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Food")
        .unwrap();
    let err = ctx
        .categories
        .update(
            food.id,
            &CategoryPatch {
                color: Some("#ffffff".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(matches!(ctx.categories.delete(food.id), Err(Error::Forbidden(_))));

    ctx.categories.delete(mine.id).unwrap();
    assert!(matches!(ctx.categories.delete(mine.id), Err(Error::NotFound(_))));
}

#[test]
fn personal_categories_are_private() {
    let ctx = setup();
    let ana = sign_up(&ctx, "ana@example.com");
    let coffee = ctx
        .categories
        .create(&category("Coffee", CategoryType::Expense), ana)
        .unwrap();

    ctx.session.sign_out().unwrap();
    let bob = sign_up(&ctx, "bob@example.com");
    let seen = ctx.categories.list(bob).unwrap();
    assert!(seen.iter().all(|c| c.name != "Coffee"));
    let err = ctx
        .categories
        .update(
            coffee.id,
            &CategoryPatch {
                name: Some("Mine now".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn blank_names_are_rejected() {
    let ctx = setup();
    let user = sign_up(&ctx, "ana@example.com");
    let err = ctx
        .categories
        .create(&category("  ", CategoryType::Both), user)
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(matches!(
        ctx.categories.update(Uuid::new_v4(), &CategoryPatch::default()),
        Err(Error::Validation(_))
    ));
}
