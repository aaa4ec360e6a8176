// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use moneymap::aggregate::{
    by_category, by_day, category_stats, filter_and_sort, totals, ListView, SortBy, SortOrder,
};
use moneymap::models::{Transaction, TxType};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn tx(tx_type: TxType, amount: &str, category: &str, date: &str, description: &str) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        tx_type,
        amount: Decimal::from_str(amount).unwrap(),
        category: category.into(),
        description: description.into(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        icon: String::new(),
        created_at: None,
        updated_at: None,
    }
}

fn sample() -> Vec<Transaction> {
    vec![
        tx(TxType::Income, "100", "Salary", "2025-01-05", "January pay"),
        tx(TxType::Expense, "40", "Food", "2025-01-03", "Groceries"),
        tx(TxType::Expense, "10", "Food", "2025-01-03", "Bakery"),
    ]
}

#[test]
fn totals_and_category_split_of_a_small_month() {
    let list = sample();
    let t = totals(&list);
    assert_eq!(t.income, Decimal::from(100));
    assert_eq!(t.expense, Decimal::from(50));
    assert_eq!(t.balance, Decimal::from(50));

    let shares = by_category(&list, TxType::Expense);
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].category, "Food");
    assert_eq!(shares[0].total, Decimal::from(50));
    assert_eq!(shares[0].percentage, Decimal::ONE_HUNDRED);
}

#[test]
fn same_day_transactions_share_one_entry() {
    let days = by_day(&sample());
    assert_eq!(days.len(), 2);
    let third = days[&NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()];
    assert_eq!(third.expense, Decimal::from(50));
    assert_eq!(third.income, Decimal::ZERO);
    let dates: Vec<NaiveDate> = days.keys().copied().collect();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn category_split_partitions_the_total() {
    let list = vec![
        tx(TxType::Expense, "33.33", "Food", "2025-01-01", ""),
        tx(TxType::Expense, "33.33", "Transport", "2025-01-02", ""),
        tx(TxType::Expense, "33.34", "Housing", "2025-01-03", ""),
        tx(TxType::Expense, "0.01", "Food", "2025-01-04", ""),
        tx(TxType::Income, "999", "Salary", "2025-01-04", ""),
    ];
    let shares = by_category(&list, TxType::Expense);
    let sum: Decimal = shares.iter().map(|s| s.total).sum();
    assert_eq!(sum, totals(&list).expense);

    let pct: Decimal = shares.iter().map(|s| s.percentage).sum();
    assert!((pct - Decimal::ONE_HUNDRED).abs() < Decimal::new(1, 6));

    // Largest first, ties broken by name.
    let names: Vec<&str> = shares.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, vec!["Food", "Housing", "Transport"]);
}

#[test]
fn no_expenses_means_no_shares() {
    let list = vec![tx(TxType::Income, "10", "Salary", "2025-01-01", "")];
    assert!(by_category(&list, TxType::Expense).is_empty());
    assert!(by_category(&[], TxType::Income).is_empty());
    assert_eq!(totals(&[]).balance, Decimal::ZERO);
}

#[test]
fn stats_for_one_category() {
    let s = category_stats(&sample(), "Food", TxType::Expense);
    assert_eq!(s.count, 2);
    assert_eq!(s.total, Decimal::from(50));
    assert_eq!(s.average, Decimal::from(25));

    let none = category_stats(&sample(), "Food", TxType::Income);
    assert_eq!(none.count, 0);
    assert_eq!(none.average, Decimal::ZERO);
}

#[test]
fn filter_and_sort_is_idempotent_and_stable() {
    let list = vec![
        tx(TxType::Expense, "5", "Food", "2025-01-02", "Coffee beans"),
        tx(TxType::Expense, "5", "Food", "2025-01-01", "Tea"),
        tx(TxType::Expense, "12", "Transport", "2025-01-03", "Bus pass"),
        tx(TxType::Income, "5", "Gifts", "2025-01-04", "From grandma"),
    ];
    let view = ListView {
        sort_by: SortBy::Amount,
        sort_order: SortOrder::Asc,
        ..Default::default()
    };
    let once = filter_and_sort(&list, &view);
    let twice = filter_and_sort(&once, &view);
    assert_eq!(once, twice);
    // Equal amounts keep their incoming order.
    let descs: Vec<&str> = once.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descs, vec!["Coffee beans", "Tea", "From grandma", "Bus pass"]);

    let searched = filter_and_sort(
        &list,
        &ListView {
            search: Some("  food ".into()),
            tx_type: Some(TxType::Expense),
            ..Default::default()
        },
    );
    let dates: Vec<String> = searched.iter().map(|t| t.date.to_string()).collect();
    assert_eq!(dates, vec!["2025-01-02", "2025-01-01"]);

    let by_category_name = filter_and_sort(
        &list,
        &ListView {
            category: Some("Transport".into()),
            ..Default::default()
        },
    );
    assert_eq!(by_category_name.len(), 1);
}

#[test]
fn sums_saturate_instead_of_overflowing() {
    let mut huge = vec![
        tx(TxType::Income, "1", "Salary", "2025-01-01", "a"),
        tx(TxType::Income, "1", "Salary", "2025-01-01", "b"),
        tx(TxType::Expense, "1", "Food", "2025-01-01", "c"),
    ];
    for t in &mut huge {
        t.amount = Decimal::MAX;
    }

    let t = totals(&huge);
    assert_eq!(t.income, Decimal::MAX);
    assert_eq!(t.expense, Decimal::MAX);
    assert_eq!(t.balance, Decimal::ZERO);

    let shares = by_category(&huge, TxType::Income);
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].total, Decimal::MAX);
    assert_eq!(shares[0].percentage, Decimal::ONE_HUNDRED);

    let day = by_day(&huge)[&NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()];
    assert_eq!(day.income, Decimal::MAX);

    let stats = category_stats(&huge, "Salary", TxType::Income);
    assert_eq!(stats.count, 2);
    assert_eq!(stats.total, Decimal::MAX);
}
