use crate::types::HarnessConfig;
use crate::ConfigError;

impl HarnessConfig {
    /// Validate the configuration and return a list of errors.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.thread_count == 0 {
            errors.push(ConfigError::OutOfRange {
                field: "thread_count",
                value: self.thread_count.to_string(),
                reason: "pool needs at least one worker".to_string(),
            });
        }

        if self.item_count == 0 {
            errors.push(ConfigError::OutOfRange {
                field: "item_count",
                value: self.item_count.to_string(),
                reason: "key universe must not be empty".to_string(),
            });
        }

        if self.timeout.as_duration().is_zero() {
            errors.push(ConfigError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }

        errors
    }

    /// Validate and return Ok(()) if valid, or Err with the first error.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
