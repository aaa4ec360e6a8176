// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, date_bounds, json_flags};
use crate::aggregate::{filter_and_sort, ListView};
use crate::context::AppContext;
use crate::models::{NewTransaction, Transaction, TransactionPatch, TxType};
use crate::repo::TransactionFilter;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, parse_id, pretty_table};
use anyhow::Result;
use uuid::Uuid;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(ctx, sub)?,
        Some(("show", sub)) => show(ctx, sub)?,
        Some(("add", sub)) => add(ctx, sub)?,
        Some(("edit", sub)) => edit(ctx, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(arg(sub, "id")?)?;
            ctx.require_user()?;
            ctx.transactions.delete(id)?;
            println!("Deleted {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let user = ctx.require_user()?;
    let tx_type: TxType = arg(sub, "type")?.parse()?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    let data = NewTransaction {
        tx_type,
        amount: parse_decimal(arg(sub, "amount")?)?,
        category: arg(sub, "category")?.trim().to_string(),
        description: arg(sub, "description")?.trim().to_string(),
        date,
        icon: sub.get_one::<String>("icon").cloned().unwrap_or_default(),
    };
    warn_unknown_category(ctx, user.id, &data.category, tx_type)?;
    let tx = ctx.transactions.create(&data, user.id)?;
    println!(
        "Recorded {} {} in '{}' on {} ({})",
        tx.tx_type,
        fmt_money(&tx.amount),
        tx.category,
        tx.date,
        tx.id
    );
    Ok(())
}

/// Category names are not tied to category rows, so an unknown one is only
/// a warning.
fn warn_unknown_category(ctx: &AppContext, user_id: Uuid, name: &str, tx_type: TxType) -> Result<()> {
    let allowed = ctx.categories.list_for_type(user_id, tx_type)?;
    if !allowed.iter().any(|c| c.name == name) {
        eprintln!("warning: no {} category named '{}'", tx_type, name);
    }
    Ok(())
}

fn edit(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let user = ctx.require_user()?;
    let id = parse_id(arg(sub, "id")?)?;
    let patch = TransactionPatch {
        tx_type: sub.get_one::<String>("type").map(|s| s.parse::<TxType>()).transpose()?,
        amount: sub.get_one::<String>("amount").map(|s| parse_decimal(s)).transpose()?,
        category: sub.get_one::<String>("category").map(|s| s.trim().to_string()),
        description: sub.get_one::<String>("description").map(|s| s.trim().to_string()),
        date: sub.get_one::<String>("date").map(|s| parse_date(s)).transpose()?,
        icon: sub.get_one::<String>("icon").cloned(),
    };
    if let Some(category) = &patch.category {
        let tx_type = match patch.tx_type {
            Some(t) => t,
            None => ctx.transactions.get(id)?.tx_type,
        };
        warn_unknown_category(ctx, user.id, category, tx_type)?;
    }
    let tx = ctx.transactions.update(id, &patch)?;
    println!("Updated {} ({} {} in '{}')", tx.id, tx.tx_type, fmt_money(&tx.amount), tx.category);
    Ok(())
}

fn show(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    ctx.require_user()?;
    let tx = ctx.transactions.get(parse_id(arg(sub, "id")?)?)?;
    if !maybe_print_json(json_flag, jsonl_flag, &tx)? {
        let rows = vec![
            vec!["id".into(), tx.id.to_string()],
            vec!["type".into(), tx.tx_type.to_string()],
            vec!["amount".into(), fmt_money(&tx.amount)],
            vec!["category".into(), tx.category.clone()],
            vec!["description".into(), tx.description.clone()],
            vec!["date".into(), tx.date.to_string()],
            vec!["icon".into(), tx.icon.clone()],
        ];
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}

fn list(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let data = query_rows(ctx, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Date", "Type", "Amount", "Category", "Description", "Id"],
                table_rows(&data),
            )
        );
    }
    Ok(())
}

pub fn table_rows(data: &[Transaction]) -> Vec<Vec<String>> {
    data.iter()
        .map(|t| {
            let amount = match t.tx_type {
                TxType::Income => format!("+{}", fmt_money(&t.amount)),
                TxType::Expense => format!("-{}", fmt_money(&t.amount)),
            };
            vec![
                t.date.to_string(),
                t.tx_type.to_string(),
                amount,
                t.category.clone(),
                t.description.clone(),
                t.id.to_string(),
            ]
        })
        .collect()
}

/// The signed-in user's transactions narrowed by the backend filters, then
/// searched and sorted locally.
pub fn query_rows(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<Vec<Transaction>> {
    let user = ctx.require_user()?;
    let (start_date, end_date) = date_bounds(sub)?;
    let tx_type = sub.get_one::<String>("type").map(|s| s.parse::<TxType>()).transpose()?;
    let filter = TransactionFilter {
        start_date,
        end_date,
        tx_type,
        category: sub.get_one::<String>("category").cloned(),
        min_amount: sub.get_one::<String>("min").map(|s| parse_decimal(s)).transpose()?,
        max_amount: sub.get_one::<String>("max").map(|s| parse_decimal(s)).transpose()?,
    };
    let fetched = ctx.transactions.list(user.id, &filter)?;
    let view = ListView {
        search: sub.get_one::<String>("search").cloned(),
        sort_by: arg(sub, "sort-by")?.parse()?,
        sort_order: arg(sub, "order")?.parse()?,
        ..Default::default()
    };
    let mut data = filter_and_sort(&fetched, &view);
    if let Some(limit) = sub.get_one::<usize>("limit") {
        data.truncate(*limit);
    }
    Ok(data)
}
