// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    ]
}

fn range_args() -> [Arg; 3] {
    [
        Arg::new("period")
            .long("period")
            .value_parser(["week", "month", "year", "all"])
            .help("Calendar period around today [default: month]"),
        Arg::new("from")
            .long("from")
            .value_name("YYYY-MM-DD")
            .help("First day, inclusive"),
        Arg::new("to")
            .long("to")
            .value_name("YYYY-MM-DD")
            .help("Last day, inclusive"),
    ]
}

fn type_arg(required: bool) -> Arg {
    Arg::new("type")
        .long("type")
        .value_parser(["income", "expense"])
        .required(required)
}

fn id_arg() -> Arg {
    Arg::new("id").required(true).help("Row id (UUID)")
}

pub fn build_cli() -> Command {
    Command::new("moneymap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Track income and expenses by category")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .help("Config file [default: moneymap.toml in the config dir]"),
        )
        .subcommand(Command::new("init").about("Create the state database"))
        .subcommand(
            Command::new("auth")
                .about("Sign in, sign up and sign out")
                .subcommand_required(true)
                .subcommand(
                    Command::new("login")
                        .arg(Arg::new("email").long("email"))
                        .arg(
                            Arg::new("password")
                                .long("password")
                                .help("Prompted for when omitted"),
                        ),
                )
                .subcommand(
                    Command::new("signup")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("username").long("username").required(true))
                        .arg(
                            Arg::new("password")
                                .long("password")
                                .help("Prompted for, twice, when omitted"),
                        ),
                )
                .subcommand(
                    Command::new("oauth")
                        .about("Print the URL that starts an OAuth sign-in")
                        .arg(
                            Arg::new("provider")
                                .required(true)
                                .value_parser(["google", "github", "gitlab", "apple"]),
                        ),
                )
                .subcommand(
                    Command::new("callback")
                        .about("Finish an OAuth sign-in from the redirect URL")
                        .arg(Arg::new("url").required(true)),
                )
                .subcommand(Command::new("logout"))
                .subcommand(Command::new("whoami").args(json_args())),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .args(range_args())
                        .arg(type_arg(false))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("min").long("min").help("Smallest amount"))
                        .arg(Arg::new("max").long("max").help("Largest amount"))
                        .arg(
                            Arg::new("search")
                                .long("search")
                                .help("Match description or category, ignoring case"),
                        )
                        .arg(
                            Arg::new("sort-by")
                                .long("sort-by")
                                .value_parser(["date", "amount"])
                                .default_value("date"),
                        )
                        .arg(
                            Arg::new("order")
                                .long("order")
                                .value_parser(["asc", "desc"])
                                .default_value("desc"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .args(json_args()),
                )
                .subcommand(Command::new("show").arg(id_arg()).args(json_args()))
                .subcommand(
                    Command::new("add")
                        .arg(type_arg(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(
                            Arg::new("date")
                                .long("date")
                                .value_name("YYYY-MM-DD")
                                .help("Defaults to today"),
                        )
                        .arg(Arg::new("icon").long("icon")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg())
                        .arg(type_arg(false))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("date").long("date").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("icon").long("icon")),
                )
                .subcommand(Command::new("rm").arg(id_arg())),
        )
        .subcommand(
            Command::new("category")
                .about("Shared and personal categories")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .arg(type_arg(false).help("Only categories usable for this type"))
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense", "both"])
                                .required(true),
                        )
                        .arg(Arg::new("icon").long("icon"))
                        .arg(Arg::new("color").long("color")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(id_arg())
                        .arg(Arg::new("name").long("name"))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense", "both"]),
                        )
                        .arg(Arg::new("icon").long("icon"))
                        .arg(Arg::new("color").long("color")),
                )
                .subcommand(Command::new("rm").arg(id_arg()))
                .subcommand(
                    Command::new("stats")
                        .about("Total, count and average for one category")
                        .arg(Arg::new("name").required(true))
                        .arg(type_arg(false).default_value("expense"))
                        .args(range_args())
                        .args(json_args()),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Totals over a period")
                .subcommand_required(true)
                .subcommand(
                    Command::new("summary")
                        .args(range_args())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("by-category")
                        .arg(type_arg(false).default_value("expense"))
                        .args(range_args())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("by-day")
                        .args(range_args())
                        .args(json_args()),
                ),
        )
        .subcommand(
            Command::new("profile")
                .about("Username, e-mail and avatar")
                .subcommand_required(true)
                .subcommand(Command::new("show").args(json_args()))
                .subcommand(
                    Command::new("edit")
                        .arg(Arg::new("username").long("username"))
                        .arg(Arg::new("email").long("email"))
                        .arg(
                            Arg::new("name")
                                .long("name")
                                .help("Display name kept on the account"),
                        ),
                )
                .subcommand(
                    Command::new("avatar-upload").arg(Arg::new("file").required(true)),
                )
                .subcommand(
                    Command::new("avatar-download")
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .subcommand_required(true)
                .subcommand(
                    Command::new("transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv or json"),
                        )
                        .arg(Arg::new("out").long("out").required(true))
                        .args(range_args()),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Report transactions whose category is missing or of the wrong type"),
        )
}
