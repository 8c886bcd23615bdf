#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use beacon_client::store::{self, FileStore};
use beacon_client::{EventKind, HttpConnector, Level};
use beacon_config::{Config, DEFAULT_CONFIG_DIR, OverridableConfig};
use beacon_dispatch::{Dispatch, Session, Toggle};
use clap::ArgMatches;
use clap::parser::ValueSource;
use dialoguer::{Confirm, Password};

use crate::{cliapp, interactive, render, setup};

fn config_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// Returns a string argument only if it was given explicitly or through the environment.
fn explicit_value(matches: &ArgMatches, id: &str) -> Option<String> {
    match matches.value_source(id) {
        Some(ValueSource::CommandLine | ValueSource::EnvVariable) => {
            matches.get_one::<String>(id).cloned()
        }
        _ => None,
    }
}

/// Extract config arguments from a parsed command-line arguments object.
pub fn extract_config_args(matches: &ArgMatches) -> OverridableConfig {
    OverridableConfig {
        environment: explicit_value(matches, "environment"),
        endpoint: explicit_value(matches, "endpoint"),
        access_token: explicit_value(matches, "access_token"),
        log_level: explicit_value(matches, "log_level"),
        log_format: explicit_value(matches, "log_format"),
    }
}

fn load_config(path: &Path, matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::from_path(path)?;
    config.apply_override(extract_config_args(matches))?;
    Ok(config)
}

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let app = cliapp::make_app();
    let matches = app.get_matches();
    let config_path = config_dir(&matches);

    // Commands that work without loaded config.
    if let Some(("config", sub)) = matches.subcommand()
        && let Some(("init", init)) = sub.subcommand()
    {
        return init_config(&config_path, &matches, init);
    }

    let config = load_config(&config_path, &matches)?;
    setup::init_logging(&config);
    setup::check_config(&config)?;
    setup::dump_spawn_infos(&config);

    match matches.subcommand() {
        Some(("config", sub)) => manage_config(&config, sub),
        Some((name, sub)) => run_session(Arc::new(config), name, sub),
        None => unreachable!(),
    }
}

fn init_config(path: &Path, matches: &ArgMatches, init: &ArgMatches) -> Result<()> {
    if Config::config_exists(path) && !init.get_flag("overwrite") {
        bail!(
            "a config already exists in {}, pass --overwrite to replace it",
            path.display()
        );
    }

    let mut config = Config::new(path);
    config.apply_override(extract_config_args(matches))?;
    config.save()?;

    println!("wrote config to {}", config.path().display());
    Ok(())
}

fn manage_config(config: &Config, matches: &ArgMatches) -> Result<()> {
    let Some(("show", sub)) = matches.subcommand() else {
        unreachable!();
    };

    match sub.get_one::<String>("format").map(String::as_str) {
        Some("debug") => println!("{config:#?}"),
        _ => print!("{}", config.to_yaml_string()?),
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start async runtime")
}

fn open_session(config: Arc<Config>) -> Result<Session> {
    let path = config.storage_path();
    let store = FileStore::open(&path)
        .with_context(|| format!("could not open local storage {}", path.display()))?;
    beacon_log::debug!("using local storage {}", store.path().display());

    Ok(Session::new(
        config,
        Arc::new(store),
        Arc::new(HttpConnector),
    ))
}

fn run_session(config: Arc<Config>, name: &str, matches: &ArgMatches) -> Result<()> {
    let session = open_session(config)?;

    match name {
        "run" => runtime()?.block_on(interactive::run(&session)),
        "send" => {
            let level = matches
                .get_one::<String>("level")
                .context("missing level")?
                .parse::<Level>()?;
            send_event(&session, EventKind::Log(level))
        }
        "exception" => send_event(&session, EventKind::Exception),
        "replay" => manage_replay(&session, matches),
        "token" => manage_token(&session, matches),
        _ => unreachable!(),
    }
}

fn current_notice(session: &Session) -> Option<String> {
    session
        .notices()
        .current()
        .map(|notice| notice.message().to_owned())
}

fn send_event(session: &Session, kind: EventKind) -> Result<()> {
    let dispatch = runtime()?.block_on(session.dispatcher().send(kind));
    let notice = current_notice(session);
    println!("{}", render::dispatch(kind, &dispatch, notice.as_deref()));

    match dispatch {
        Dispatch::Recorded(_) => Ok(()),
        Dispatch::Blocked => bail!("no access token configured"),
        Dispatch::Busy | Dispatch::Failed => bail!("could not send {kind}"),
    }
}

fn manage_replay(session: &Session, matches: &ArgMatches) -> Result<()> {
    let wanted = match matches.subcommand_name() {
        Some("on") => true,
        Some("off") => false,
        Some("status") => {
            let enabled = store::recording_enabled(session.slot().store().as_ref());
            println!("session recording: {}", if enabled { "on" } else { "off" });
            return Ok(());
        }
        _ => unreachable!(),
    };

    if session.recording().is_active() == wanted {
        println!(
            "session recording is already {}",
            if wanted { "on" } else { "off" }
        );
        return Ok(());
    }

    let toggle = session.recording().toggle();
    let notice = current_notice(session);
    println!("{}", render::toggle(toggle, notice.as_deref()));

    match toggle {
        Toggle::Applied { .. } | Toggle::Reinitialized { .. } => Ok(()),
        Toggle::Blocked => bail!("no access token configured"),
        Toggle::Failed => bail!("could not change session recording"),
    }
}

fn manage_token(session: &Session, matches: &ArgMatches) -> Result<()> {
    let settings = session.settings();

    match matches.subcommand() {
        Some(("set", sub)) => {
            let input = match sub.get_one::<String>("token") {
                Some(token) => token.clone(),
                None => Password::new()
                    .with_prompt("Access token")
                    .allow_empty_password(true)
                    .interact()?,
            };
            let token = settings.save_token(&input)?;
            println!("saved access token {}", token.masked());
        }
        Some(("clear", sub)) => {
            if !sub.get_flag("yes")
                && !Confirm::new()
                    .with_prompt("Remove the saved access token?")
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }
            settings.clear_token()?;
            println!("access token cleared");
            if let Some((_, source)) = settings.current() {
                println!("falling back to the {source} token");
            }
        }
        Some(("show", _)) => {
            println!("{}", render::token(settings.current().as_ref()));
        }
        _ => unreachable!(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_overrides_only() {
        let matches = cliapp::make_app()
            .try_get_matches_from([
                "beacon",
                "--environment",
                "staging",
                "--endpoint",
                "http://localhost:3000/",
                "exception",
            ])
            .unwrap();

        let overrides = extract_config_args(&matches);
        assert_eq!(overrides.environment.as_deref(), Some("staging"));
        assert_eq!(overrides.endpoint.as_deref(), Some("http://localhost:3000/"));
    }

    #[test]
    fn test_default_config_dir() {
        let matches = cliapp::make_app()
            .try_get_matches_from(["beacon", "token", "show"])
            .unwrap();
        assert_eq!(config_dir(&matches), PathBuf::from(DEFAULT_CONFIG_DIR));

        let matches = cliapp::make_app()
            .try_get_matches_from(["beacon", "token", "show", "--config", "/tmp/beacon"])
            .unwrap();
        assert_eq!(config_dir(&matches), PathBuf::from("/tmp/beacon"));
    }
}
