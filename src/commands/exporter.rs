// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{arg, date_bounds};
use crate::context::AppContext;
use crate::models::Transaction;
use crate::repo::TransactionFilter;
use anyhow::{bail, Result};
use std::path::Path;

pub fn handle(ctx: &AppContext, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(ctx, sub),
        _ => Ok(()),
    }
}

fn export_transactions(ctx: &AppContext, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = arg(sub, "format")?.to_lowercase();
    let out = arg(sub, "out")?;
    check_format(&fmt)?;
    let user = ctx.require_user()?;
    let (start_date, end_date) = date_bounds(sub)?;
    let filter = TransactionFilter {
        start_date,
        end_date,
        ..Default::default()
    };
    let mut list = ctx.transactions.list(user.id, &filter)?;
    list.reverse();
    write_transactions(&list, &fmt, Path::new(out))?;
    println!("Exported {} transactions to {}", list.len(), out);
    Ok(())
}

fn check_format(fmt: &str) -> Result<()> {
    match fmt {
        "csv" | "json" => Ok(()),
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
}

/// Write `list` as CSV or a pretty JSON array. An unknown format fails
/// before `out` is created.
pub fn write_transactions(list: &[Transaction], fmt: &str, out: &Path) -> Result<()> {
    check_format(fmt)?;
    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)?;
        wtr.write_record(["date", "type", "amount", "category", "description", "icon", "id"])?;
        for t in list {
            wtr.write_record([
                t.date.to_string(),
                t.tx_type.to_string(),
                t.amount.to_string(),
                t.category.clone(),
                t.description.clone(),
                t.icon.clone(),
                t.id.to_string(),
            ])?;
        }
        wtr.flush()?;
    } else {
        std::fs::write(out, serde_json::to_string_pretty(list)?)?;
    }
    Ok(())
}
