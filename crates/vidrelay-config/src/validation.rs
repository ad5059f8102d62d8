// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::HashSet;

use secrecy::ExposeSecret;

use crate::diagnostic::ConfigError;
use crate::model::VidrelayConfig;

/// Largest page a single history request may ask for.
pub const MAX_BATCH_SIZE: usize = 100;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of failing fast.
pub fn validate_config(config: &VidrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !(1..=MAX_BATCH_SIZE).contains(&config.relay.batch_size) {
        errors.push(ConfigError::Validation {
            message: format!(
                "relay.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                config.relay.batch_size
            ),
        });
    }

    if config.telegram.progress_every < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "telegram.progress_every must be non-negative, got {}",
                config.telegram.progress_every
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.health.enabled && config.health.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "health.host must not be empty".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    for (i, credential) in config.credentials.iter().enumerate() {
        if credential.id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("credentials[{i}].id must not be empty"),
            });
        } else if !seen_ids.insert(credential.id.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate credential id `{}` in [[credentials]] array",
                    credential.id
                ),
            });
        }
        if credential.session_token.expose_secret().trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("credentials[{i}].session_token must not be empty"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Relaying needs at least one credential in the pool.
pub fn require_credentials(config: &VidrelayConfig) -> Result<(), ConfigError> {
    if config.credentials.is_empty() {
        return Err(ConfigError::MissingKey {
            key: "credentials".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::model::CredentialConfig;

    fn credential(id: &str) -> CredentialConfig {
        CredentialConfig {
            id: id.to_string(),
            application_id: None,
            application_secret: None,
            session_token: SecretString::from("token".to_string()),
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&VidrelayConfig::default()).is_ok());
    }

    #[test]
    fn batch_size_out_of_range_fails() {
        let mut config = VidrelayConfig::default();
        config.relay.batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size"))
        ));

        config.relay.batch_size = 101;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn duplicate_credential_ids_fail() {
        let mut config = VidrelayConfig::default();
        config.credentials = vec![credential("a"), credential("b"), credential("a")];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("duplicate credential id `a`"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = VidrelayConfig::default();
        config.relay.batch_size = 0;
        config.storage.database_path = " ".to_string();
        config.credentials = vec![credential("")];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn require_credentials_rejects_empty_pool() {
        let mut config = VidrelayConfig::default();
        assert!(matches!(
            require_credentials(&config),
            Err(ConfigError::MissingKey { .. })
        ));
        config.credentials.push(credential("primary"));
        assert!(require_credentials(&config).is_ok());
    }
}
