use crate::H256;

/// The result of one submission attempt once it has been included.
///
/// Never persisted; consumed by the completion queue as soon as it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The completion transaction executed successfully
    Confirmed(H256),
    /// The completion transaction was included but did not execute
    Rejected(String),
}
