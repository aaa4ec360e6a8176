// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::Path;

use moneymap::{cli, commands, config::AppConfig, context::AppContext, logging};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let config = AppConfig::load(matches.get_one::<String>("config").map(Path::new))?;
    logging::init(&config.log_level);
    let ctx = AppContext::open(&config)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!(
                "Database initialized at {} ({:?} backend)",
                config.database_path()?.display(),
                config.backend
            );
        }
        Some(("auth", sub)) => commands::auth::handle(&ctx, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&ctx, sub)?,
        Some(("category", sub)) => commands::categories::handle(&ctx, sub)?,
        Some(("report", sub)) => commands::reports::handle(&ctx, sub)?,
        Some(("profile", sub)) => commands::profile::handle(&ctx, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&ctx, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&ctx)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
