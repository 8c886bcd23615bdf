//! Beacon sends sample events to an error monitoring service and shows how the service answered.
//!
//! It is meant for trying out a monitoring project: every command sends a message of a chosen
//! severity or a sample exception and prints the identifier the service assigned to it. The
//! interactive `run` command additionally keeps a history of everything sent during the session.
//!
//! # Access Token
//!
//! Events are only sent once an access token is configured. The token saved with `beacon token
//! set` takes precedence over the `fallback_token` from the config file, the `BEACON_ACCESS_TOKEN`
//! environment variable and a token compiled into the binary.
//!
//! # Session Recording
//!
//! `beacon replay on` asks the monitoring client to record the session. Where the running client
//! cannot start recording directly, and whenever recording is turned off, the client is
//! reinitialized with the new preference.
//!
//! # Workspace Crates
//!
//! Beacon is split into the following workspace crates:
//!
//!  - `beacon`: Main entry point and command line interface.
//!  - [`beacon-client`]: Monitoring client adapter, credentials and local storage.
//!  - [`beacon-config`]: Static configuration for the CLI.
//!  - [`beacon-dispatch`]: Event dispatch, history and recording toggle.
//!  - [`beacon-log`]: Error reporting and logging.
//!
//! [`beacon-client`]: ../beacon_client/index.html
//! [`beacon-config`]: ../beacon_config/index.html
//! [`beacon-dispatch`]: ../beacon_dispatch/index.html
//! [`beacon-log`]: ../beacon_log/index.html

mod cli;
mod cliapp;
mod interactive;
mod render;
mod setup;

use std::process;

use beacon_log::Hub;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            beacon_log::ensure_error(&err);
            1
        }
    };

    Hub::current().client().map(|x| x.close(None));
    process::exit(exit_code);
}
