// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, date_range, json_flags};
use crate::aggregate::{category_stats, Period};
use crate::context::AppContext;
use crate::models::{CategoryPatch, CategoryType, NewCategory, TxType};
use crate::repo::TransactionFilter;
use crate::utils::{fmt_money, maybe_print_json, parse_id, pretty_table};
use anyhow::Result;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(ctx, sub)?,
        Some(("add", sub)) => {
            let user = ctx.require_user()?;
            let data = NewCategory {
                name: arg(sub, "name")?.trim().to_string(),
                category_type: arg(sub, "type")?.parse::<CategoryType>()?,
                icon: sub.get_one::<String>("icon").cloned().unwrap_or_default(),
                color: sub.get_one::<String>("color").cloned().unwrap_or_default(),
            };
            let c = ctx.categories.create(&data, user.id)?;
            println!("Created category '{}' ({}) {}", c.name, c.category_type, c.id);
        }
        Some(("edit", sub)) => {
            ctx.require_user()?;
            let id = parse_id(arg(sub, "id")?)?;
            let patch = CategoryPatch {
                name: sub.get_one::<String>("name").map(|s| s.trim().to_string()),
                category_type: sub
                    .get_one::<String>("type")
                    .map(|s| s.parse::<CategoryType>())
                    .transpose()?,
                icon: sub.get_one::<String>("icon").cloned(),
                color: sub.get_one::<String>("color").cloned(),
            };
            let c = ctx.categories.update(id, &patch)?;
            println!("Updated category '{}' ({})", c.name, c.category_type);
        }
        Some(("rm", sub)) => {
            ctx.require_user()?;
            let id = parse_id(arg(sub, "id")?)?;
            ctx.categories.delete(id)?;
            println!("Deleted category {}", id);
        }
        Some(("stats", sub)) => stats(ctx, sub)?,
        _ => {}
    }
    Ok(())
}

fn list(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let user = ctx.require_user()?;
    let data = match sub.get_one::<String>("type") {
        Some(t) => ctx.categories.list_for_type(user.id, t.parse::<TxType>()?)?,
        None => ctx.categories.list(user.id)?,
    };
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.category_type.to_string(),
                    c.icon.clone(),
                    c.color.clone(),
                    if c.is_global() { "shared".into() } else { "mine".into() },
                    c.id.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Name", "Type", "Icon", "Color", "Owner", "Id"], rows)
        );
    }
    Ok(())
}

fn stats(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = json_flags(sub);
    let user = ctx.require_user()?;
    let name = arg(sub, "name")?;
    let tx_type: TxType = arg(sub, "type")?.parse()?;
    let (start, end) = date_range(sub, Period::Month)?;
    let list = ctx
        .transactions
        .list(user.id, &TransactionFilter::between(start, end))?;
    let s = category_stats(&list, name, tx_type);
    if !maybe_print_json(json_flag, jsonl_flag, &s)? {
        let rows = vec![vec![
            name.clone(),
            fmt_money(&s.total),
            s.count.to_string(),
            fmt_money(&s.average),
        ]];
        println!("{} .. {}", start, end);
        println!("{}", pretty_table(&["Category", "Total", "Count", "Average"], rows));
    }
    Ok(())
}
