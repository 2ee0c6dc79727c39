// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{crate_version, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print a JSON document"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn backend_arg() -> Arg {
    Arg::new("backend").required(true).help("Backend name")
}

fn code_arg() -> Arg {
    Arg::new("code")
        .long("code")
        .help("One-time code answering a pending second factor")
}

pub fn build_cli() -> Command {
    Command::new("sitekit")
        .version(crate_version!())
        .about("Query website modules (banks, parcel carriers) from the command line")
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("backend")
                .about("Configure module instances")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("module").required(true))
                        .arg(
                            Arg::new("param")
                                .long("param")
                                .short('p')
                                .action(ArgAction::Append)
                                .help("key=value, repeatable"),
                        ),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").required(true))),
        )
        .subcommand(
            Command::new("config")
                .about("Global settings (user_agent, timeout_secs)")
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                ),
        )
        .subcommand(json_flags(
            Command::new("accounts")
                .about("List bank accounts")
                .arg(backend_arg())
                .arg(code_arg()),
        ))
        .subcommand(json_flags(
            Command::new("history")
                .about("List past operations of an account")
                .arg(backend_arg())
                .arg(Arg::new("account").required(true))
                .arg(code_arg()),
        ))
        .subcommand(json_flags(
            Command::new("coming")
                .about("List upcoming operations of an account")
                .arg(backend_arg())
                .arg(Arg::new("account").required(true))
                .arg(code_arg()),
        ))
        .subcommand(json_flags(
            Command::new("documents")
                .about("List documents of every subscription")
                .arg(backend_arg())
                .arg(code_arg())
                .arg(
                    Arg::new("download")
                        .long("download")
                        .value_name("DIR")
                        .help("Save every document file into DIR"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("profile")
                .about("Show the customer profile")
                .arg(backend_arg())
                .arg(code_arg()),
        ))
        .subcommand(json_flags(
            Command::new("track")
                .about("Track a parcel")
                .arg(backend_arg())
                .arg(Arg::new("id").required(true)),
        ))
        .subcommand(
            Command::new("watch")
                .about("Poll parcels and report status changes")
                .arg(backend_arg())
                .arg(Arg::new("id").required(true).action(ArgAction::Append))
                .arg(
                    Arg::new("every")
                        .long("every")
                        .default_value("600")
                        .value_parser(clap::value_parser!(u64))
                        .help("Seconds between checks"),
                )
                .arg(
                    Arg::new("times")
                        .long("times")
                        .value_parser(clap::value_parser!(u32))
                        .help("Stop after this many rounds"),
                ),
        )
        .subcommand(
            Command::new("state")
                .about("Saved browser sessions")
                .subcommand(Command::new("show").arg(backend_arg()))
                .subcommand(Command::new("clear").arg(backend_arg())),
        )
        .subcommand(
            Command::new("export").subcommand(
                Command::new("history")
                    .arg(backend_arg())
                    .arg(Arg::new("account").required(true))
                    .arg(code_arg())
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .required(true)
                            .value_parser(["csv", "json"]),
                    )
                    .arg(Arg::new("out").long("out").required(true)),
            ),
        )
}
