use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_log::{Level, LogConfig, LogFormat, SentryConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// The name of the default configuration folder.
pub const DEFAULT_CONFIG_DIR: &str = ".beacon";

/// Access token baked into the binary at compile time.
///
/// Set `BEACON_ACCESS_TOKEN` while building to ship a binary that works without configuring a
/// token first.
const BUILD_ACCESS_TOKEN: Option<&str> = option_env!("BEACON_ACCESS_TOKEN");

/// Defines the source of a config error.
#[derive(Debug)]
enum ConfigErrorSource {
    /// An error occurring independently.
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var, or a CLI parameter).
    FieldOverride(String),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn for_field<E>(cause: E, name: &'static str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(cause, ConfigErrorKind::InvalidValue).field(name)
    }

    #[inline]
    fn file(mut self, p: impl AsRef<Path>) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => write!(f, "{}", self.kind),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Failed to save a file.
    #[error("could not write config file")]
    CouldNotWriteFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config file")]
    BadJson,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

trait ConfigObject: DeserializeOwned + Serialize + Default {
    /// The basename of the config file, including the extension.
    fn file_name() -> &'static str;

    /// The full path of the config file.
    fn path(base: &Path) -> PathBuf {
        base.join(Self::file_name())
    }

    /// Loads the config file from within the given directory, or returns defaults if there is no
    /// such file.
    fn load_or_default(base: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(base);

        let f = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(&path));
            }
        };

        serde_yaml::from_reader(io::BufReader::new(f))
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(&path))
    }

    /// Writes the configuration to a file within the given directory location.
    fn save(&self, base: &Path) -> Result<(), ConfigError> {
        let path = Self::path(base);
        let mut options = fs::OpenOptions::new();
        options.write(true).truncate(true).create(true);

        // Remove all non-user permissions for the newly created file.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut f = options
            .open(&path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotWriteFile).file(&path))?;

        serde_yaml::to_writer(&mut f, self)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotWriteFile).file(&path))?;
        f.write_all(b"\n").ok();

        Ok(())
    }
}

/// Structure used to hold information about configuration overrides via
/// CLI parameters or environment variables.
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The environment name attached to every event.
    pub environment: Option<String>,
    /// The base URL of the monitoring service.
    pub endpoint: Option<String>,
    /// The fallback access token used when no token is stored locally.
    pub access_token: Option<String>,
    /// The log level.
    pub log_level: Option<String>,
    /// The log format.
    pub log_format: Option<String>,
}

fn default_environment() -> String {
    "development".to_owned()
}

fn default_endpoint() -> Url {
    Url::parse("https://api.rollbar.com/").expect("static endpoint is a valid URL")
}

fn default_fallback_token() -> Option<String> {
    BUILD_ACCESS_TOKEN
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn is_build_token(token: &Option<String>) -> bool {
    *token == default_fallback_token()
}

fn default_code_version() -> String {
    "1.0.0".to_owned()
}

fn default_timeout() -> u64 {
    10
}

/// Placeholder written in place of secrets when showing the config.
const REDACTED: &str = "[redacted]";

/// Connection and identity of the monitoring client.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct Monitoring {
    /// The environment name attached to every event.
    environment: String,
    /// The base URL of the monitoring service's item API.
    endpoint: Url,
    /// Token used when none is stored locally.
    ///
    /// The token compiled into the binary is never written back to the config file.
    #[serde(skip_serializing_if = "is_build_token")]
    fallback_token: Option<String>,
    /// The code version reported with every event.
    code_version: String,
    /// Timeout for a single item submission in seconds.
    timeout: u64,
}

impl fmt::Debug for Monitoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitoring")
            .field("environment", &self.environment)
            .field("endpoint", &self.endpoint)
            .field("fallback_token", &self.fallback_token.as_ref().map(|_| REDACTED))
            .field("code_version", &self.code_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            endpoint: default_endpoint(),
            fallback_token: default_fallback_token(),
            code_version: default_code_version(),
            timeout: default_timeout(),
        }
    }
}

/// Controls the interactive session.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
struct Session {
    /// How long a warning notice stays visible in milliseconds.
    notice_ttl: u64,
    /// Name of the local key-value storage file, relative to the config folder.
    storage: PathBuf,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            notice_ttl: 3000,
            storage: PathBuf::from("storage.json"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct ConfigValues {
    #[serde(rename = "beacon")]
    monitoring: Monitoring,
    session: Session,
    logging: LogConfig,
    sentry: SentryConfig,
}

impl ConfigObject for ConfigValues {
    fn file_name() -> &'static str {
        "config.yml"
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    std::env::current_dir()
        .map(|x| x.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Config struct.
#[derive(Debug, Default)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl Config {
    /// Loads a config from a given config folder.
    ///
    /// A missing `config.yml` results in the default configuration.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = absolute_path(path.as_ref());

        Ok(Config {
            values: ConfigValues::load_or_default(&path)?,
            path,
        })
    }

    /// Creates the default configuration for a config folder without reading it.
    pub fn new<P: AsRef<Path>>(path: P) -> Config {
        Config {
            values: ConfigValues::default(),
            path: absolute_path(path.as_ref()),
        }
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Config, ConfigError> {
        Ok(Config {
            values: serde_json::from_value(value)
                .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::BadJson))?,
            path: PathBuf::new(),
        })
    }

    /// Override configuration with values coming from other sources (e.g. env variables or
    /// command line parameters).
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let monitoring = &mut self.values.monitoring;

        if let Some(environment) = overrides.environment {
            if environment.trim().is_empty() {
                return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("environment"));
            }
            monitoring.environment = environment;
        }

        if let Some(endpoint) = overrides.endpoint {
            monitoring.endpoint = endpoint
                .parse::<Url>()
                .map_err(|err| ConfigError::for_field(err, "endpoint"))?;
        }

        if let Some(token) = overrides.access_token {
            // An empty variable unsets the compiled-in fallback.
            monitoring.fallback_token = Some(token).filter(|t| !t.is_empty());
        }

        let logging = &mut self.values.logging;

        if let Some(level) = overrides.log_level {
            logging.level = level
                .parse::<Level>()
                .map_err(|err| ConfigError::for_field(err, "log_level"))?;
        }

        if let Some(format) = overrides.log_format {
            logging.format = match format.to_lowercase().as_str() {
                "auto" => LogFormat::Auto,
                "pretty" => LogFormat::Pretty,
                "simplified" => LogFormat::Simplified,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("log_format"));
                }
            };
        }

        Ok(self)
    }

    /// Writes this configuration into the config folder, creating the folder if necessary.
    pub fn save(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.path).map_err(|e| {
            ConfigError::wrap(e, ConfigErrorKind::CouldNotWriteFile).file(&self.path)
        })?;
        self.values.save(&self.path)
    }

    /// Returns `true` if the config folder already contains a config file.
    pub fn config_exists<P: AsRef<Path>>(path: P) -> bool {
        ConfigValues::path(path.as_ref()).exists()
    }

    /// Returns the filename of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dumps out a YAML string of the values with the fallback token redacted.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        let mut value = serde_yaml::to_value(&self.values)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::CouldNotWriteFile))?;

        if let Some(token) = value
            .get_mut("beacon")
            .and_then(|monitoring| monitoring.get_mut("fallback_token"))
        {
            *token = serde_yaml::Value::from(REDACTED);
        }

        serde_yaml::to_string(&value)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::CouldNotWriteFile))
    }

    /// Returns the environment name attached to every event.
    pub fn environment(&self) -> &str {
        &self.values.monitoring.environment
    }

    /// Returns the base URL of the monitoring service.
    pub fn endpoint(&self) -> &Url {
        &self.values.monitoring.endpoint
    }

    /// Returns the access token used when none is stored locally.
    pub fn fallback_token(&self) -> Option<&str> {
        self.values.monitoring.fallback_token.as_deref()
    }

    /// Returns the code version reported with every event.
    pub fn code_version(&self) -> &str {
        &self.values.monitoring.code_version
    }

    /// Returns the timeout for submitting a single item.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.values.monitoring.timeout)
    }

    /// Returns how long warning notices stay visible.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.values.session.notice_ttl)
    }

    /// Returns the path of the local key-value storage file.
    pub fn storage_path(&self) -> PathBuf {
        self.path.join(&self.values.session.storage)
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns logging configuration for internal error reporting.
    pub fn sentry(&self) -> &SentryConfig {
        &self.values.sentry
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json_value(serde_json::json!({})).unwrap();

        assert_eq!(config.environment(), "development");
        assert_eq!(config.endpoint().as_str(), "https://api.rollbar.com/");
        assert_eq!(config.code_version(), "1.0.0");
        assert_eq!(config.notice_ttl(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.storage_path(), PathBuf::from("storage.json"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_path(dir.path()).unwrap();

        assert_eq!(config.environment(), "development");
        assert_eq!(config.storage_path(), dir.path().join("storage.json"));
    }

    #[test]
    fn test_new_ignores_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "beacon:\n  environment: staging\n").unwrap();

        let config = Config::new(dir.path());
        assert_eq!(config.environment(), "development");
        assert_eq!(config.path(), dir.path());
    }

    #[test]
    fn test_from_path_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "beacon:\n  environment: staging\n  fallback_token: abc123\nsession:\n  notice_ttl: 500\n",
        )
        .unwrap();

        let config = Config::from_path(dir.path()).unwrap();
        assert_eq!(config.environment(), "staging");
        assert_eq!(config.fallback_token(), Some("abc123"));
        assert_eq!(config.notice_ttl(), Duration::from_millis(500));
    }

    #[test]
    fn test_from_path_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "beacon: [unclosed").unwrap();

        let error = Config::from_path(dir.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert!(error.to_string().starts_with("could not parse yaml config file (file "));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_path(dir.path().join("nested")).unwrap();
        config
            .apply_override(OverridableConfig {
                environment: Some("production".to_owned()),
                ..Default::default()
            })
            .unwrap();
        config.save().unwrap();

        assert!(Config::config_exists(dir.path().join("nested")));
        let loaded = Config::from_path(dir.path().join("nested")).unwrap();
        assert_eq!(loaded.environment(), "production");
    }

    #[test]
    fn test_save_omits_build_token() {
        let dir = tempfile::tempdir().unwrap();
        Config::new(dir.path()).save().unwrap();

        let written = fs::read_to_string(dir.path().join("config.yml")).unwrap();
        assert!(!written.contains("fallback_token"));
    }

    #[test]
    fn test_save_keeps_explicit_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(dir.path());
        config
            .apply_override(OverridableConfig {
                access_token: Some("from-cli".to_owned()),
                ..Default::default()
            })
            .unwrap();
        config.save().unwrap();

        let loaded = Config::from_path(dir.path()).unwrap();
        assert_eq!(loaded.fallback_token(), Some("from-cli"));
    }

    #[test]
    fn test_show_redacts_token() {
        let config = Config::from_json_value(serde_json::json!({
            "beacon": {"fallback_token": "secret-token"}
        }))
        .unwrap();

        let yaml = config.to_yaml_string().unwrap();
        assert!(!yaml.contains("secret-token"));
        assert!(yaml.contains("[redacted]"));

        let debug = format!("{config:#?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[redacted]"));

        assert_eq!(config.fallback_token(), Some("secret-token"));
    }

    #[test]
    fn test_apply_override() {
        let mut config = Config::default();
        config
            .apply_override(OverridableConfig {
                endpoint: Some("http://localhost:3000/".to_owned()),
                access_token: Some("from-env".to_owned()),
                log_level: Some("debug".to_owned()),
                log_format: Some("JSON".to_owned()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.endpoint().as_str(), "http://localhost:3000/");
        assert_eq!(config.fallback_token(), Some("from-env"));
        assert_eq!(config.logging().level, Level::Debug);
        assert_eq!(config.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_apply_override_empty_token_unsets_fallback() {
        let mut config = Config::from_json_value(serde_json::json!({
            "beacon": {"fallback_token": "compiled"}
        }))
        .unwrap();

        config
            .apply_override(OverridableConfig {
                access_token: Some(String::new()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.fallback_token(), None);
    }

    #[test]
    fn test_apply_override_invalid_field() {
        let mut config = Config::default();
        let error = config
            .apply_override(OverridableConfig {
                endpoint: Some("not a url".to_owned()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.to_string(), "invalid config value (field endpoint)");
    }

    #[test]
    fn test_serialize_session() {
        let session = Session::default();
        assert_json_snapshot!(session, @r###"
        {
          "notice_ttl": 3000,
          "storage": "storage.json"
        }
        "###);
    }
}
