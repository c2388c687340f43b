use std::time::Duration;

use serde::Deserialize;

use crate::FailureRule;

/// Tuning of the completion worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LanderSettings {
    /// How long to wait for a broadcast completion to be included
    pub confirmation_timeout_secs: u64,
    /// Pause after a failed nonce reload and base of the unknown failure backoff
    pub retry_delay_ms: u64,
    /// Cap of the unknown failure backoff
    pub max_retry_delay_secs: u64,
    /// How many times a transfer is retried after unrecognized failures.
    /// Zero drops it on the first one.
    pub max_unknown_retries: u32,
    /// Extra classification rules, checked before the built in ones
    pub failure_rules: Vec<FailureRule>,
}

impl Default for LanderSettings {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 300,
            retry_delay_ms: 1000,
            max_retry_delay_secs: 60,
            max_unknown_retries: 0,
            failure_rules: vec![],
        }
    }
}

impl LanderSettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Delay before the `attempt`th retry (1-based): the retry delay doubled
    /// per attempt, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.retry_delay()
            .saturating_mul(factor)
            .min(Duration::from_secs(self.max_retry_delay_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureClass;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let settings = LanderSettings {
            retry_delay_ms: 500,
            max_retry_delay_secs: 3,
            ..Default::default()
        };
        assert_eq!(settings.backoff(1), Duration::from_millis(500));
        assert_eq!(settings.backoff(2), Duration::from_secs(1));
        assert_eq!(settings.backoff(3), Duration::from_secs(2));
        assert_eq!(settings.backoff(4), Duration::from_secs(3));
        assert_eq!(settings.backoff(40), Duration::from_secs(3));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let settings: LanderSettings = serde_json::from_str(
            r#"{"max_unknown_retries": 2, "failure_rules": [{"pattern": "out of gas", "class": "terminal_skip"}]}"#,
        )
        .unwrap();
        assert_eq!(settings.max_unknown_retries, 2);
        assert_eq!(settings.confirmation_timeout(), Duration::from_secs(300));
        assert_eq!(
            settings.failure_rules,
            vec![FailureRule::new("out of gas", FailureClass::TerminalSkip)]
        );
    }
}
