//! Realtime layer configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Realtime layer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Seconds between presence reconciliation sweeps
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Upper bound in seconds for any single presence store operation
    #[serde(default = "default_presence_op_timeout")]
    pub presence_op_timeout_secs: u64,

    /// Seconds this instance's occupancy records outlive their last renewal
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_secs: u64,
}

impl WebSocketConfig {
    /// Get the reconciliation interval as Duration
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Get the presence operation timeout as Duration
    pub fn presence_op_timeout(&self) -> Duration {
        Duration::from_secs(self.presence_op_timeout_secs)
    }

    /// Get the occupancy record TTL as Duration
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reconcile_interval_secs == 0 {
            return Err(ValidationError::InvalidReconcileInterval);
        }
        if self.presence_op_timeout_secs == 0 {
            return Err(ValidationError::InvalidPresenceTimeout);
        }
        // Records renewed every sweep must survive at least one missed tick.
        if self.presence_ttl_secs <= self.reconcile_interval_secs {
            return Err(ValidationError::InvalidPresenceTtl);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            presence_op_timeout_secs: default_presence_op_timeout(),
            presence_ttl_secs: default_presence_ttl(),
        }
    }
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_presence_op_timeout() -> u64 {
    3
}

fn default_presence_ttl() -> u64 {
    180
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_config_defaults() {
        let config = WebSocketConfig::default();
        assert_eq!(config.reconcile_interval(), Duration::from_secs(60));
        assert_eq!(config.presence_op_timeout(), Duration::from_secs(3));
        assert_eq!(config.presence_ttl(), Duration::from_secs(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_zero_intervals() {
        let config = WebSocketConfig {
            reconcile_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WebSocketConfig {
            presence_op_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_ttl_not_exceeding_sweep_interval() {
        let config = WebSocketConfig {
            reconcile_interval_secs: 60,
            presence_ttl_secs: 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WebSocketConfig {
            reconcile_interval_secs: 60,
            presence_ttl_secs: 61,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
