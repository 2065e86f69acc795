use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for tracked messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AckConfig {
    /// How long to wait for an ack before sending again.
    ///
    /// Default: 30 seconds.
    pub retry_timeout_secs: u64,

    /// Total transmissions per message, the first one included. When the
    /// last one goes unanswered the message is abandoned.
    ///
    /// Default: 3.
    pub max_attempts: u32,

    /// How often the retry timer looks for overdue entries.
    ///
    /// Default: 5 seconds.
    pub scan_interval_secs: u64,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            retry_timeout_secs: 30,
            max_attempts: 3,
            scan_interval_secs: 5,
        }
    }
}

impl AckConfig {
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = AckConfig::default();
        assert_eq!(cfg.retry_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.scan_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: AckConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.retry_timeout_secs, 30);
    }

    #[test]
    fn test_scan_interval_never_zero() {
        let cfg = AckConfig {
            scan_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.scan_interval(), Duration::from_secs(1));
    }
}
