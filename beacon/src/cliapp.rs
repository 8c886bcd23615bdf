//! This module implements the definition of the command line app.

use clap::builder::{PossibleValuesParser, ValueParser};
use clap::{Arg, ArgAction, Command};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ABOUT: &str = "Sends sample events to an error monitoring service.";

/// Severities accepted by `beacon send`.
pub const LEVELS: [&str; 5] = ["debug", "info", "warning", "error", "critical"];

pub fn make_app() -> Command {
    Command::new("beacon")
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .propagate_version(true)
        .max_term_width(79)
        .version(VERSION)
        .about(ABOUT)
        .arg(
            Arg::new("config")
                .value_name("CONFIG")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(ValueParser::path_buf())
                .help("The path to the config folder."),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .global(true)
                .value_name("LEVEL")
                .env("BEACON_LOG_LEVEL")
                .help("The log level for Beacon."),
        )
        .arg(
            Arg::new("log_format")
                .long("log-format")
                .global(true)
                .value_name("FORMAT")
                .value_parser(PossibleValuesParser::new([
                    "auto",
                    "pretty",
                    "simplified",
                    "json",
                ]))
                .env("BEACON_LOG_FORMAT")
                .help("The format of log output."),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .global(true)
                .value_name("NAME")
                .env("BEACON_ENVIRONMENT")
                .help("The environment name attached to every event."),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .global(true)
                .value_name("URL")
                .env("BEACON_ENDPOINT")
                .help("The base URL of the monitoring service."),
        )
        .arg(
            Arg::new("access_token")
                .long("access-token")
                .global(true)
                .value_name("TOKEN")
                .env("BEACON_ACCESS_TOKEN")
                .hide_env_values(true)
                .help("Fallback access token used when none is saved."),
        )
        .subcommand(
            Command::new("run")
                .about("Run an interactive session")
                .after_help(
                    "This starts a line based session that keeps the history of all \
                     events sent in it.  Type 'help' for the list of commands.",
                ),
        )
        .subcommand(
            Command::new("send")
                .about("Send a sample log message")
                .arg(
                    Arg::new("level")
                        .value_name("LEVEL")
                        .required(true)
                        .value_parser(PossibleValuesParser::new(LEVELS))
                        .help("The severity of the message."),
                ),
        )
        .subcommand(Command::new("exception").about("Send a sample exception"))
        .subcommand(
            Command::new("replay")
                .about("Manage session recording")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .after_help(
                    "Turning recording on takes effect immediately where possible.  \
                     Turning it off reinitializes the monitoring client.",
                )
                .subcommand(Command::new("on").about("Turn session recording on"))
                .subcommand(Command::new("off").about("Turn session recording off"))
                .subcommand(Command::new("status").about("Show the recording preference")),
        )
        .subcommand(
            Command::new("token")
                .about("Manage the access token")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .after_help(
                    "The saved token takes precedence over the fallback token from the \
                     config file or the environment.",
                )
                .subcommand(
                    Command::new("set")
                        .about("Save a new access token")
                        .arg(
                            Arg::new("token")
                                .value_name("TOKEN")
                                .help("The token to save.  Prompts if omitted."),
                        ),
                )
                .subcommand(
                    Command::new("clear").about("Remove the saved token").arg(
                        Arg::new("yes")
                            .long("yes")
                            .action(ArgAction::SetTrue)
                            .help("Do not prompt for confirmation."),
                    ),
                )
                .subcommand(Command::new("show").about("Show the active token")),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the beacon config")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("init")
                        .about("Initialize a new beacon config")
                        .arg(
                            Arg::new("overwrite")
                                .long("overwrite")
                                .action(ArgAction::SetTrue)
                                .help("Overwrite an existing config file."),
                        ),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show the entire config out for debugging purposes")
                        .arg(
                            Arg::new("format")
                                .short('f')
                                .long("format")
                                .value_parser(PossibleValuesParser::new(["debug", "yaml"]))
                                .default_value("yaml")
                                .help("The output format."),
                        ),
                ),
        )
}
