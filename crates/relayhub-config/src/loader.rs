//! Configuration loader.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Config::default());
        }
        Self::load(path)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.relayhub`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.path, "/ws");
    }

    #[test]
    fn test_load_sections() {
        let content = r#"
            [server]
            host = "127.0.0.1"
            port = 9100
            outbound_buffer = 8

            [client]
            retry_interval_ms = 500
            connect_timeout_ms = 5000

            [notify]
            event = "relay:update"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.server.address(), "127.0.0.1:9100");
        assert_eq!(config.server.outbound_buffer, 8);
        assert_eq!(config.client.retry_interval_ms, 500);
        assert_eq!(config.client.connect_timeout_ms, 5000);
        assert_eq!(config.client.relay_capacity, 10);
        assert_eq!(config.notify.event, "relay:update");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "port = 5000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/relayhub.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/relayhub.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable name, not read anywhere else
        unsafe {
            std::env::set_var("RELAYHUB_TEST_HOST", "10.0.0.7");
        }
        let config = ConfigLoader::load_str("[server]\nhost = \"${RELAYHUB_TEST_HOST}\"").unwrap();
        assert_eq!(config.server.host, "10.0.0.7");
        unsafe {
            std::env::remove_var("RELAYHUB_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${RELAYHUB_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/.relayhub");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/.relayhub"));
    }
}
