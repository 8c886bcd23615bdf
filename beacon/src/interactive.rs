//! The line based session behind `beacon run`.

#![allow(clippy::print_stdout)]

use std::str::FromStr;

use anyhow::Result;
use beacon_client::{EventKind, Level};
use beacon_dispatch::Session;
use console::style;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

const HELP: &str = "\
commands:
  info, warning, error, debug, critical   send a sample message
  exception                               send a sample exception
  replay                                  turn session recording on or off
  history                                 show all events sent in this session
  token set <token>                       save an access token
  token clear                             remove the saved access token
  status                                  show token, recording and pending sends
  help                                    show this message
  quit                                    end the session";

/// A command entered in the interactive session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Send(EventKind),
    Replay,
    History,
    TokenSet(String),
    TokenClear,
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, type `help` for a list of commands")]
    Unknown(String),
    #[error("usage: token set <token> | token clear")]
    TokenUsage,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, rest)| (name, rest.trim()));

        let command = match name.to_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "exception" => Command::Send(EventKind::Exception),
            "replay" => Command::Replay,
            "history" => Command::History,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "token" => match rest.split_once(char::is_whitespace) {
                Some(("set", token)) => Command::TokenSet(token.trim().to_owned()),
                None if rest == "set" => Command::TokenSet(String::new()),
                None if rest == "clear" => Command::TokenClear,
                _ => return Err(CommandError::TokenUsage),
            },
            other => match other.parse::<Level>() {
                Ok(level) => Command::Send(EventKind::Log(level)),
                Err(_) => return Err(CommandError::Unknown(name.to_owned())),
            },
        };

        Ok(command)
    }
}

fn print_status(session: &Session) {
    let current = session.settings().current();
    println!("{}", render::token(current.as_ref()));

    let recording = if session.recording().is_active() { "on" } else { "off" };
    println!("session recording: {recording}");

    let slot = session.slot();
    let client = if slot.is_initialized() {
        "initialized"
    } else {
        "not initialized"
    };
    println!(
        "monitoring client: {client}, reinitialized {} times",
        slot.generation()
    );

    let sending = if session.dispatcher().is_busy() { "yes" } else { "no" };
    println!("sending: {sending}");
    println!("events sent: {}", session.dispatcher().history().len());

    if let Some(notice) = session.notices().current() {
        println!("{}", style(notice.message()).yellow());
    }
}

fn print_banner(session: &Session) {
    println!("{}", style("Beacon interactive session").bold());
    if session.settings().token_banner() {
        println!(
            "{}",
            style("No access token configured. Save one with `token set <token>` first.").yellow()
        );
    }
    println!("Type `help` for a list of commands.");
}

/// Runs the session until `quit` or the end of input.
///
/// Sends run in the background while further commands are read. A send triggered while another
/// one is still in flight is dropped.
pub async fn run(session: &Session) -> Result<()> {
    print_banner(session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            Some((kind, result)) = in_flight.next(), if !in_flight.is_empty() => {
                let notice = session.notices().current();
                println!("{}", render::dispatch(kind, &result, notice.as_ref().map(|n| n.message())));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match line.parse::<Command>() {
                    Ok(Command::Send(kind)) => {
                        in_flight.push(async move { (kind, session.dispatcher().send(kind).await) });
                    }
                    Ok(Command::Replay) => {
                        let toggle = session.recording().toggle();
                        let notice = session.notices().current();
                        println!("{}", render::toggle(toggle, notice.as_ref().map(|n| n.message())));
                    }
                    Ok(Command::History) => {
                        println!("{}", render::history_table(&session.dispatcher().history()));
                    }
                    Ok(Command::TokenSet(token)) => match session.settings().save_token(&token) {
                        Ok(token) => println!("saved access token {}", token.masked()),
                        Err(error) => println!("{}", style(error).red()),
                    },
                    Ok(Command::TokenClear) => match session.settings().clear_token() {
                        Ok(()) => println!("access token cleared"),
                        Err(error) => println!("{}", style(error).red()),
                    },
                    Ok(Command::Status) => print_status(session),
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Quit) => break,
                    Err(CommandError::Empty) => {}
                    Err(error) => println!("{}", style(error).red()),
                }
            }
        }
    }

    // Let sends that are already underway resolve before leaving.
    while let Some((kind, result)) = in_flight.next().await {
        let notice = session.notices().current();
        println!("{}", render::dispatch(kind, &result, notice.as_ref().map(|n| n.message())));
    }

    Ok(())
}
