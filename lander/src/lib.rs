//! Serializes transfer completions into a strictly ordered stream of
//! submissions from a single signing account.
//!
//! The [`CompletionQueue`] is the only handle the rest of the relayer gets.
//! Any number of tasks may enqueue through it; one [`CompletionWorker`] owns
//! the [`NonceTracker`] and the chain connection and works the queue one
//! transfer at a time, classifying failures with the [`ErrorClassifier`].

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]
#![cfg_attr(not(test), deny(clippy::arithmetic_side_effects))]

pub use classifier::{ErrorClassifier, FailureClass, FailureRule};
pub use error::LanderError;
pub use metrics::LanderMetrics;
pub use nonce::NonceTracker;
pub use queue::{CompletionHandle, CompletionQueue, CompletionStatus, CompletionWorker};
pub use settings::LanderSettings;

mod classifier;
mod error;
mod metrics;
mod nonce;
mod queue;
mod settings;
