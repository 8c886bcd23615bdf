use anyhow::Result;
use beacon_config::Config;

/// Validates settings that cannot be checked while parsing the config.
pub fn check_config(config: &Config) -> Result<()> {
    let endpoint = config.endpoint();
    if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
        anyhow::bail!("the configured endpoint `{endpoint}` is not an http(s) base URL");
    }

    if config.request_timeout().is_zero() {
        anyhow::bail!("the configured `beacon.timeout` must be at least one second");
    }

    Ok(())
}

/// Initialize the logging system.
pub fn init_logging(config: &Config) {
    beacon_log::init(config.logging(), config.sentry());
}

/// Print spawn infos to the log.
pub fn dump_spawn_infos(config: &Config) {
    if config.path().as_os_str().is_empty() {
        beacon_log::debug!("launching beacon without config folder");
    } else {
        beacon_log::debug!(
            "launching beacon from config folder {}",
            config.path().display()
        );
    }
    beacon_log::debug!("  environment: {}", config.environment());
    beacon_log::debug!("  endpoint: {}", config.endpoint());
    beacon_log::debug!("  log level: {}", config.logging().level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_default_config() {
        let config = Config::from_json_value(serde_json::json!({})).unwrap();
        assert!(check_config(&config).is_ok());
    }

    #[test]
    fn test_check_endpoint_scheme() {
        let config = Config::from_json_value(serde_json::json!({
            "beacon": {"endpoint": "ftp://example.com/"}
        }))
        .unwrap();
        assert!(check_config(&config).is_err());
    }

    #[test]
    fn test_check_zero_timeout() {
        let config = Config::from_json_value(serde_json::json!({
            "beacon": {"timeout": 0}
        }))
        .unwrap();
        assert!(check_config(&config).is_err());
    }
}
