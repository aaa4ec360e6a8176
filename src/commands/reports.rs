// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, date_range, json_flags};
use crate::aggregate::{by_category, by_day, totals, Period};
use crate::context::AppContext;
use crate::models::{Transaction, TxType};
use crate::repo::TransactionFilter;
use crate::utils::{bar, fmt_money, fmt_percent, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

const BAR_WIDTH: usize = 20;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(ctx, sub)?,
        Some(("by-category", sub)) => categories(ctx, sub)?,
        Some(("by-day", sub)) => days(ctx, sub)?,
        _ => {}
    }
    Ok(())
}

/// The period's transactions for the signed-in user.
fn load(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<(NaiveDate, NaiveDate, Vec<Transaction>)> {
    let user = ctx.require_user()?;
    let (start, end) = date_range(sub, Period::Month)?;
    let list = ctx
        .transactions
        .list(user.id, &TransactionFilter::between(start, end))?;
    Ok((start, end, list))
}

fn summary(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let (start, end, list) = load(ctx, sub)?;
    let t = totals(&list);
    if !maybe_print_json(json_flag, jsonl_flag, &t)? {
        println!("{} .. {}", start, end);
        let rows = vec![vec![
            fmt_money(&t.income),
            fmt_money(&t.expense),
            fmt_money(&t.balance),
        ]];
        println!("{}", pretty_table(&["Income", "Expense", "Balance"], rows));
    }
    Ok(())
}

fn categories(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let tx_type: TxType = arg(sub, "type")?.parse()?;
    let (start, end, list) = load(ctx, sub)?;
    let shares = by_category(&list, tx_type);
    if !maybe_print_json(json_flag, jsonl_flag, &shares)? {
        println!("{} by category, {} .. {}", tx_type, start, end);
        let rows = shares
            .iter()
            .map(|s| {
                vec![
                    s.category.clone(),
                    fmt_money(&s.total),
                    fmt_percent(&s.percentage),
                    bar(&s.percentage, BAR_WIDTH),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Total", "Share", ""], rows));
    }
    Ok(())
}

#[derive(Serialize)]
struct DayRow {
    date: NaiveDate,
    income: Decimal,
    expense: Decimal,
}

fn days(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let (start, end, list) = load(ctx, sub)?;
    let data: Vec<DayRow> = by_day(&list)
        .into_iter()
        .map(|(date, t)| DayRow {
            date,
            income: t.income,
            expense: t.expense,
        })
        .collect();
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!("{} .. {}", start, end);
        let rows = data
            .iter()
            .map(|d| {
                vec![
                    d.date.to_string(),
                    fmt_money(&d.income),
                    fmt_money(&d.expense),
                    fmt_money(&(d.income - d.expense)),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Date", "Income", "Expense", "Net"], rows));
    }
    Ok(())
}
