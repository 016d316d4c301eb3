//! Configuration loading and startup validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::ConvolensConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load full configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<ConvolensConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ConvolensConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ConvolensConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.llm.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "llm.api_base must not be empty".to_string(),
        ));
    }

    if config.classification.model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "classification.model must not be empty".to_string(),
        ));
    }

    if config.classification.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "classification.max_attempts must be > 0".to_string(),
        ));
    }

    if config.classification.max_tokens == 0 {
        return Err(ConfigError::Invalid(
            "classification.max_tokens must be > 0".to_string(),
        ));
    }

    if config.summary.model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "summary.model must not be empty".to_string(),
        ));
    }

    if config.summary.max_tokens == 0 {
        return Err(ConfigError::Invalid(
            "summary.max_tokens must be > 0".to_string(),
        ));
    }

    if config.taxonomy.csv_path.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "taxonomy.csv_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConvolensConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "classification:\n  max_attempts: 5\n";
        let config: ConvolensConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.classification.max_attempts, 5);
        assert_eq!(config.classification.model, "deepseek-chat");
        assert_eq!(config.server.port, 8008);
        assert_eq!(
            config.classification.level3_parents,
            vec!["飞享会员", "提额卡", "新提额卡"]
        );
    }

    #[test]
    fn test_zero_retry_budget_rejected() {
        let mut config = ConvolensConfig::default();
        config.classification.max_attempts = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_chat_endpoint_joins_without_double_slash() {
        let mut config = ConvolensConfig::default();
        config.llm.api_base = "http://localhost:3888/v1/".to_string();
        assert_eq!(
            config.llm.chat_endpoint(),
            "http://localhost:3888/v1/chat/completions"
        );
    }
}
