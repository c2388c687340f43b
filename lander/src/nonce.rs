use mrl_core::{ChainResult, TransferCompleter};

/// The nonce the next completion transaction of the signing account uses.
///
/// Every mutation takes `&mut self` and the type is deliberately not `Clone`:
/// the completion worker owns the only instance, which is what keeps two
/// submissions from ever sharing a nonce.
#[derive(Debug, PartialEq, Eq)]
pub struct NonceTracker {
    next: u64,
}

impl NonceTracker {
    pub fn new(next: u64) -> Self {
        Self { next }
    }

    /// Start from the account's pending transaction count.
    pub async fn from_chain(completer: &dyn TransferCompleter) -> ChainResult<Self> {
        completer.transaction_count().await.map(Self::new)
    }

    pub fn current(&self) -> u64 {
        self.next
    }

    /// Move past a nonce that was consumed by a confirmed transaction.
    pub fn advance(&mut self) -> u64 {
        self.next = self.next.saturating_add(1);
        self.next
    }

    /// Replace the local value with what the chain reports, returning the
    /// value that was discarded.
    pub fn resync(&mut self, chain_reported: u64) -> u64 {
        std::mem::replace(&mut self.next, chain_reported)
    }
}
