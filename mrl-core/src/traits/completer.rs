use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{ChainResult, SubmissionOutcome, TransferRecord, H160, H256};

/// Completes transfers on the destination chain from a single signing
/// account.
///
/// `submit` broadcasts a transaction and is not idempotent. Callers must never
/// submit the same transfer twice without first learning the outcome of the
/// earlier attempt, which is why every submission is preceded by `dry_run`.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait TransferCompleter: Send + Sync + Debug {
    /// The account that signs completion transactions.
    fn account(&self) -> H160;

    /// The number of transactions the chain reports for the signing account,
    /// i.e. the next nonce the chain will accept.
    async fn transaction_count(&self) -> ChainResult<u64>;

    /// Simulate the completion call with the given nonce without
    /// broadcasting it.
    async fn dry_run(&self, record: &TransferRecord, nonce: u64) -> ChainResult<()>;

    /// Broadcast the completion call with the given nonce and return the
    /// transaction hash.
    async fn submit(&self, record: &TransferRecord, nonce: u64) -> ChainResult<H256>;

    /// Wait until the transaction is included and report whether it executed.
    async fn await_confirmation(&self, tx_hash: H256) -> ChainResult<SubmissionOutcome>;
}
