// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod auth;
pub mod categories;
pub mod doctor;
pub mod exporter;
pub mod profile;
pub mod reports;
pub mod transactions;

use crate::aggregate::Period;
use crate::utils::parse_date;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// A value clap already guarantees, by `required` or a default.
pub(crate) fn arg<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    m.get_one::<String>(name)
        .ok_or_else(|| anyhow!("missing argument --{}", name))
}

pub(crate) fn json_flags(m: &clap::ArgMatches) -> (bool, bool) {
    (m.get_flag("json"), m.get_flag("jsonl"))
}

/// Inclusive date range from `--period`, `--from` and `--to`. Explicit
/// bounds override the period; with only bounds given the other side is
/// open.
pub(crate) fn date_range(m: &clap::ArgMatches, default: Period) -> Result<(NaiveDate, NaiveDate)> {
    let from = m.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let to = m.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    let period = match m.get_one::<String>("period") {
        Some(p) => p.parse::<Period>()?,
        None if from.is_some() || to.is_some() => Period::All,
        None => default,
    };
    let (start, end) = period.range(chrono::Local::now().date_naive());
    let (start, end) = (from.unwrap_or(start), to.unwrap_or(end));
    if start > end {
        return Err(anyhow!("--from {} is after --to {}", start, end));
    }
    Ok((start, end))
}

/// Like [`date_range`] but unbounded on a side no flag names. Without
/// `--from` or `--to`, and with no period or `--period all`, both sides are
/// `None`.
pub(crate) fn date_bounds(m: &clap::ArgMatches) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let period = m.get_one::<String>("period").map(|p| p.parse::<Period>()).transpose()?;
    if matches!(period, Some(p) if p != Period::All) {
        let (start, end) = date_range(m, Period::All)?;
        return Ok((Some(start), Some(end)));
    }
    let from = m.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let to = m.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    if let (Some(start), Some(end)) = (from, to) {
        if start > end {
            return Err(anyhow!("--from {} is after --to {}", start, end));
        }
    }
    Ok((from, to))
}
