use serde::Deserialize;
use strum::IntoStaticStr;

use mrl_core::ChainCommunicationError;

/// How a failed completion attempt is handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureClass {
    /// The transfer can never succeed. Drop it.
    TerminalSkip,
    /// The transfer was already completed by someone else. Drop it.
    TerminalDuplicate,
    /// The nonce we used is out of sync with the chain. Resync and retry the
    /// same transfer first.
    RetryableStale,
    /// Anything we don't recognize.
    RetryableUnknown,
}

impl FailureClass {
    /// Whether the transfer is resolved by a failure of this class
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalSkip | Self::TerminalDuplicate)
    }
}

/// Maps an error text containing `pattern` (case-insensitive) to `class`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailureRule {
    pub pattern: String,
    pub class: FailureClass,
}

impl FailureRule {
    pub fn new(pattern: impl AsRef<str>, class: FailureClass) -> Self {
        Self {
            pattern: pattern.as_ref().to_lowercase(),
            class,
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        !self.pattern.is_empty() && haystack.contains(&self.pattern)
    }
}

/// Known failure messages of the GMP precompile and the node. Earlier rules win.
const DEFAULT_RULES: &[(&str, FailureClass)] = &[
    ("transfer already completed", FailureClass::TerminalDuplicate),
    ("invalid gmp payload", FailureClass::TerminalSkip),
    ("nonce too low", FailureClass::RetryableStale),
    ("nonce is too low", FailureClass::RetryableStale),
    ("nonce too high", FailureClass::RetryableStale),
    ("nonce has already been used", FailureClass::RetryableStale),
    // another transaction from us is still pending with this nonce
    ("replacement transaction underpriced", FailureClass::RetryableStale),
    ("already known", FailureClass::RetryableStale),
];

/// Classifies failure detail by substring, in table order.
///
/// Matching is done on the lowercased text so it does not depend on how a
/// particular node capitalizes its errors.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<FailureRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(pattern, class)| FailureRule::new(pattern, *class))
                .collect(),
        }
    }
}

impl ErrorClassifier {
    /// The default table with `extra` rules ahead of it, so operators can both
    /// add patterns and override the built in ones.
    pub fn with_rules(extra: impl IntoIterator<Item = FailureRule>) -> Self {
        let mut rules: Vec<FailureRule> = extra
            .into_iter()
            .map(|rule| FailureRule::new(rule.pattern, rule.class))
            .collect();
        rules.extend(Self::default().rules);
        Self { rules }
    }

    pub fn rules(&self) -> &[FailureRule] {
        &self.rules
    }

    pub fn classify(&self, detail: &str) -> FailureClass {
        let haystack = detail.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&haystack))
            .map(|rule| rule.class)
            .unwrap_or(FailureClass::RetryableUnknown)
    }

    /// Classify on both renderings of the error: provider errors only carry
    /// the node's message in their `Debug` form.
    pub fn classify_error(&self, err: &ChainCommunicationError) -> FailureClass {
        self.classify(&format!("{err} {err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use mrl_core::{ChainCommunicationError, MrlProtocolError};

    use super::*;

    #[test]
    fn classifies_known_failures() {
        let classifier = ErrorClassifier::default();
        assert_eq!(
            classifier.classify("execution reverted: Transfer already completed"),
            FailureClass::TerminalDuplicate
        );
        assert_eq!(
            classifier.classify("execution reverted: invalid GMP Payload"),
            FailureClass::TerminalSkip
        );
        assert_eq!(
            classifier.classify("(code: -32603, message: nonce too low, data: None)"),
            FailureClass::RetryableStale
        );
        assert_eq!(
            classifier.classify("Nonce has already been used"),
            FailureClass::RetryableStale
        );
        assert_eq!(
            classifier.classify("(code: -32000, message: replacement transaction underpriced, data: None)"),
            FailureClass::RetryableStale
        );
        assert_eq!(
            classifier.classify("(code: -32000, message: already known, data: None)"),
            FailureClass::RetryableStale
        );
    }

    #[test]
    fn unmatched_and_empty_detail_is_unknown() {
        let classifier = ErrorClassifier::default();
        assert_eq!(
            classifier.classify("connection reset by peer"),
            FailureClass::RetryableUnknown
        );
        assert_eq!(classifier.classify(""), FailureClass::RetryableUnknown);
    }

    #[test]
    fn earlier_rules_take_priority() {
        let classifier = ErrorClassifier::default();
        assert_eq!(
            classifier.classify("transfer already completed (nonce too low)"),
            FailureClass::TerminalDuplicate
        );
    }

    #[test]
    fn extra_rules_are_lowercased_and_override_defaults() {
        let classifier = ErrorClassifier::with_rules([
            FailureRule {
                pattern: "Insufficient Balance".into(),
                class: FailureClass::TerminalSkip,
            },
            FailureRule::new("nonce too low", FailureClass::RetryableUnknown),
        ]);
        assert_eq!(
            classifier.classify("INSUFFICIENT BALANCE for transfer"),
            FailureClass::TerminalSkip
        );
        assert_eq!(
            classifier.classify("nonce too low"),
            FailureClass::RetryableUnknown
        );
        // defaults are still there
        assert_eq!(
            classifier.classify("invalid gmp payload"),
            FailureClass::TerminalSkip
        );
    }

    #[test]
    fn empty_patterns_never_match() {
        let classifier = ErrorClassifier::with_rules([FailureRule::new(
            "",
            FailureClass::TerminalSkip,
        )]);
        assert_eq!(
            classifier.classify("anything"),
            FailureClass::RetryableUnknown
        );
    }

    #[test]
    fn classifies_chain_errors() {
        let classifier = ErrorClassifier::default();
        let revert = ChainCommunicationError::Revert("Transfer already completed".into());
        assert_eq!(
            classifier.classify_error(&revert),
            FailureClass::TerminalDuplicate
        );
        let other = ChainCommunicationError::from_other_str("nonce too low");
        assert_eq!(
            classifier.classify_error(&other),
            FailureClass::RetryableStale
        );
        let protocol: ChainCommunicationError = MrlProtocolError::UnsupportedVaaVersion(2).into();
        assert_eq!(
            classifier.classify_error(&protocol),
            FailureClass::RetryableUnknown
        );
    }

    #[test]
    fn rules_deserialize_from_config() {
        let rule: FailureRule =
            serde_json::from_str(r#"{"pattern": "gas too low", "class": "retryable_stale"}"#)
                .unwrap();
        assert_eq!(
            rule,
            FailureRule {
                pattern: "gas too low".into(),
                class: FailureClass::RetryableStale
            }
        );
        assert_eq!(<&str>::from(FailureClass::TerminalDuplicate), "terminal_duplicate");
        assert!(FailureClass::TerminalSkip.is_terminal());
        assert!(!FailureClass::RetryableStale.is_terminal());
    }
}
