//! Configuration for the Beacon CLI and session.
//!
//! Beacon reads its static configuration from a config folder, `.beacon` by default. The folder
//! contains a `config.yml` file, which may be absent, and the local key-value storage file that
//! holds the access token and the recording preference.
//!
//! ```yaml
//! beacon:
//!   environment: staging
//!   endpoint: https://api.rollbar.com/
//! session:
//!   notice_ttl: 3000
//! logging:
//!   level: debug
//! ```
//!
//! Values can be overridden from the environment or the command line through
//! [`OverridableConfig`].

#![warn(missing_docs)]

mod config;

pub use crate::config::*;
