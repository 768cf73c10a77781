//! Connection pool configuration.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Settings applied to every physical connection the pool creates.
///
/// The exception listener is not part of the file configuration; set it on
/// the factory with
/// [`set_exception_listener`](crate::pool::PoolConnectionFactory::set_exception_listener).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Client ID applied once to each physical connection before it starts.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Discard a physical connection after an asynchronous failure so the
    /// next handle obtains a fresh one.
    #[serde(default)]
    pub reconnect_on_exception: bool,
    /// Maximum number of physical connections shared by handles.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

const fn default_pool_size() -> usize {
    1
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            reconnect_on_exception: false,
            pool_size: default_pool_size(),
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// - `pool_size` must be > 0
    /// - `client_id`, when set, must not be blank
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        if let Some(client_id) = &self.client_id {
            if client_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "client_id",
                    reason: "must not be blank".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.client_id, None);
        assert!(!config.reconnect_on_exception);
        assert_eq!(config.pool_size, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_pool_size() {
        let config = PoolConfig {
            pool_size: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_client_id() {
        let config = PoolConfig {
            client_id: Some("  ".into()),
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
