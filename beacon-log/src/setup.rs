use std::borrow::Cow;
use std::env;
use std::fmt;
use std::str::FromStr;

use sentry::types::Dsn;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

/// The full release name including the Beacon version and SHA.
const RELEASE: &str = std::env!("BEACON_RELEASE");

// Import CRATE_NAMES, which lists all crates in the workspace.
include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

/// Controls the log format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO beacon::setup: launching beacon session
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z  INFO beacon::setup: launching beacon session
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2020-12-04T12:11:08.729716Z","level":"INFO","target":"beacon::setup","message":"launching beacon session"}
    /// ```
    Json,
}

/// The logging level parse error.
#[derive(Clone, Debug)]
pub struct LevelParseError(String);

impl fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as level: expected one of "error", "warn", "info", "debug", "trace", "off""#,
            self.0
        )
    }
}

impl std::error::Error for LevelParseError {}

/// The maximum verbosity of log messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings and informational messages.
    Info,
    /// Everything up to debug output.
    Debug,
    /// All messages.
    Trace,
    /// Logging is disabled.
    Off,
}

impl Level {
    /// Returns the tracing [`LevelFilter`].
    pub const fn level_filter(&self) -> LevelFilter {
        match self {
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
            Level::Off => LevelFilter::OFF,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
            Level::Off => "off",
        };

        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s.to_ascii_lowercase().as_str() {
            "error" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "info" => Level::Info,
            "debug" => Level::Debug,
            "trace" => Level::Trace,
            "off" => Level::Off,
            _ => return Err(LevelParseError(s.into())),
        };

        Ok(result)
    }
}

impl TryFrom<String> for Level {
    type Error = LevelParseError;

    fn try_from(value: String) -> Result<Self, LevelParseError> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for Beacon.
    pub level: Level,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,

    /// When set to `true`, backtraces are forced on.
    ///
    /// Otherwise, backtraces can be enabled by setting the `RUST_BACKTRACE` variable to `full`.
    pub enable_backtraces: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: LogFormat::Auto,
            enable_backtraces: false,
        }
    }
}

/// Controls internal reporting to Sentry.
///
/// This only covers failures of Beacon itself, not the demo events it sends.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SentryConfig {
    /// The [`DSN`](sentry::types::Dsn) specifying the Project to report to.
    pub dsn: Option<Dsn>,

    /// Enables reporting to Sentry.
    pub enabled: bool,

    /// Sets the environment for this service.
    pub environment: Option<Cow<'static, str>>,
}

impl SentryConfig {
    /// Returns a reference to the [`DSN`](sentry::types::Dsn) if Sentry is enabled.
    pub fn enabled_dsn(&self) -> Option<&Dsn> {
        self.dsn.as_ref().filter(|_| self.enabled)
    }
}

/// Builds the default filter: `INFO` for third-party crates, `TRACE` for workspace crates.
///
/// The configured [`LogConfig::level`] is applied on top of this filter.
fn default_filters() -> EnvFilter {
    // Connection pooling and TLS are very spammy on INFO.
    let mut env_filter = EnvFilter::new("INFO,hyper=WARN,hyper_util=WARN,reqwest=WARN,rustls=WARN");

    for name in CRATE_NAMES {
        if let Ok(directive) = format!("{name}=TRACE").parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    env_filter
}

/// Initialize the logging system and reporting to Sentry.
///
/// Calling this more than once keeps the first subscriber.
///
/// # Example
///
/// ```
/// let log_config = beacon_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// let sentry_config = beacon_log::SentryConfig::default();
///
/// beacon_log::init(&log_config, &sentry_config);
/// ```
pub fn init(config: &LogConfig, sentry: &SentryConfig) {
    if config.enable_backtraces {
        // SAFETY: Called during startup before the runtime spawns any threads.
        unsafe { env::set_var("RUST_BACKTRACE", "full") };
    }

    let subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let format = match (config.format, console::user_attended_stderr()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => {
            subscriber.compact().without_time().boxed()
        }
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            subscriber.with_ansi(false).boxed()
        }
        (LogFormat::Json, _) => subscriber
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    let env_filter = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => EnvFilter::new(value),
        Err(_) => default_filters(),
    };

    tracing_subscriber::registry()
        .with(format.with_filter(config.level.level_filter()))
        .with(sentry::integrations::tracing::layer())
        .with(env_filter)
        .try_init()
        .ok();

    if let Some(dsn) = sentry.enabled_dsn() {
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn).cloned(),
            in_app_include: vec!["beacon"],
            release: Some(RELEASE.into()),
            attach_stacktrace: config.enable_backtraces,
            environment: sentry.environment.clone(),
            ..Default::default()
        });

        // Keep the client initialized. The client is flushed manually in `main`.
        std::mem::forget(guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("trace".parse::<Level>().unwrap(), Level::Trace);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_try_from_string() {
        assert_eq!(Level::try_from("Error".to_owned()).unwrap(), Level::Error);

        let error = Level::try_from("loud".to_owned()).unwrap_err();
        assert!(error.to_string().starts_with(r#"error parsing "loud" as level"#));

        let result = serde_json::from_value::<LogConfig>(serde_json::json!({"level": "loud"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_log_config_partial() {
        let config: LogConfig = serde_json::from_value(serde_json::json!({
            "level": "debug",
            "format": "json",
        }))
        .unwrap();

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.enable_backtraces);
    }

    #[test]
    fn test_sentry_disabled_by_default() {
        let config = SentryConfig {
            dsn: "https://public@sentry.example.com/1".parse().ok(),
            ..SentryConfig::default()
        };
        assert!(config.enabled_dsn().is_none());
    }
}
