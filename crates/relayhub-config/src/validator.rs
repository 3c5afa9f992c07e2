//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Fail with the first error, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_client(config, &mut result);
        Self::validate_notify(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_endpoint_path(field: &str, path: &str, result: &mut ValidationResult) {
        if !path.starts_with('/') {
            result.add_error(ValidationError::new(
                field,
                "Endpoint path must start with '/'",
            ));
        }
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }

        if config.server.port == 0 {
            result.add_warning(ValidationWarning::new(
                "server.port",
                "Port 0 binds an ephemeral port",
            ));
        }

        Self::validate_endpoint_path("server.path", &config.server.path, result);

        if config.server.outbound_buffer == 0 {
            result.add_error(ValidationError::new(
                "server.outbound_buffer",
                "outbound_buffer must be greater than 0",
            ));
        }

        if config.server.shutdown_grace_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "server.shutdown_grace_ms",
                "No grace period, in-flight handshakes are cut on stop",
            ));
        }
    }

    fn validate_client(config: &Config, result: &mut ValidationResult) {
        if config.client.port == 0 {
            result.add_error(ValidationError::new("client.port", "Port cannot be 0"));
        }

        Self::validate_endpoint_path("client.path", &config.client.path, result);

        if config.client.retry_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "client.retry_interval_ms",
                "retry_interval_ms must be greater than 0",
            ));
        }

        if config.client.retry_interval_ms > config.client.connect_timeout_ms {
            result.add_error(ValidationError::new(
                "client.retry_interval_ms",
                "retry_interval_ms cannot exceed connect_timeout_ms",
            ));
        }

        if config.client.relay_capacity == 0 {
            result.add_error(ValidationError::new(
                "client.relay_capacity",
                "relay_capacity must be greater than 0",
            ));
        }
    }

    fn validate_notify(config: &Config, result: &mut ValidationResult) {
        if config.notify.event.is_empty() {
            result.add_error(ValidationError::new("notify.event", "Event name cannot be empty"));
        }

        if config.notify.capacity == 0 {
            result.add_error(ValidationError::new(
                "notify.capacity",
                "capacity must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.file && config.logging.dir.is_empty() {
            result.add_error(ValidationError::new(
                "logging.dir",
                "Log directory cannot be empty when file logging is on",
            ));
        }
    }
}
