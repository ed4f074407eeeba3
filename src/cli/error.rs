// Error classification for consistent messages and exit codes

use thiserror::Error;
use crate::engine::EngineError;
use crate::workflow::ConfigError;

/// Invalid input from the person at the terminal
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Exit code 1 for user errors (bad input, unknown task, invalid config),
/// 2 for internal failures (database, IO)
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if is_user_error(err) {
        1
    } else {
        2
    }
}

pub fn is_user_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<UsageError>().is_some() {
            return true;
        }
        if let Some(engine) = cause.downcast_ref::<EngineError>() {
            return matches!(engine, EngineError::TaskNotFound(_));
        }
        if let Some(config) = cause.downcast_ref::<ConfigError>() {
            return !matches!(config, ConfigError::Store(_) | ConfigError::Io { .. });
        }
        false
    })
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), UsageError> {
    if value.trim().is_empty() {
        Err(UsageError(format!("{} cannot be empty", field_name)))
    } else {
        Ok(())
    }
}

/// Validate an image reference: a lowercase hex SHA-256 digest
pub fn validate_image_hash(hash: &str) -> Result<(), UsageError> {
    if hash.len() == 64 && hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
        Ok(())
    } else {
        Err(UsageError(format!(
            "Invalid image hash: '{}'. Expected a 64-character lowercase hex SHA-256 digest.",
            hash
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::StoreError;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("alice", "user").is_ok());
        assert!(validate_non_empty("", "user").is_err());
        assert!(validate_non_empty("   ", "user").is_err());
    }

    #[test]
    fn test_validate_image_hash() {
        let good = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(validate_image_hash(good).is_ok());
        assert!(validate_image_hash(&good.to_uppercase()).is_err());
        assert!(validate_image_hash("abc").is_err());
        assert!(validate_image_hash(&good.replace('e', "g")).is_err());
    }

    #[test]
    fn test_exit_codes() {
        let usage = anyhow::Error::new(UsageError::new("bad value"));
        assert_eq!(exit_code(&usage), 1);

        let missing = anyhow::Error::new(EngineError::TaskNotFound("x".to_string()));
        assert_eq!(exit_code(&missing.context("Failed to pick next image")), 1);

        let config = anyhow::Error::new(ConfigError::NoTasks);
        assert_eq!(exit_code(&config), 1);

        let store = anyhow::Error::new(EngineError::Store(StoreError::ImageNotFound("h".to_string())));
        assert_eq!(exit_code(&store), 2);
    }
}
