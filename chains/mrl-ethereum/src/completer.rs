#![allow(clippy::enum_variant_names)]
#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::contract::{abigen, builders::ContractCall, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{
    Http, HttpRateLimitRetryPolicy, Middleware, MiddlewareError, PendingTransaction, Provider,
    RetryClient, RetryClientBuilder,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{BlockId, BlockNumber, TransactionReceipt, TransactionRequest};
use tracing::{debug, info, instrument, warn};

use mrl_core::{
    ChainCommunicationError, ChainResult, SubmissionOutcome, TransferCompleter, TransferRecord,
    H160, H256,
};

use crate::ConnectionConf;

abigen!(
    GmpPrecompileInternal,
    r#"[
        function wormholeTransferERC20(bytes vaa) external
    ]"#,
);

/// Middleware stack used to talk to the destination chain
pub type SigningProvider = SignerMiddleware<Provider<RetryClient<Http>>, LocalWallet>;

/// Completes transfers by calling `wormholeTransferERC20` on the GMP
/// precompile.
#[derive(Debug)]
pub struct EthereumGmpCompleter<M>
where
    M: Middleware,
{
    contract: Arc<GmpPrecompileInternal<M>>,
    provider: Arc<M>,
    account: H160,
    polling_interval: Duration,
}

impl<M> EthereumGmpCompleter<M>
where
    M: Middleware + 'static,
{
    pub fn new(provider: Arc<M>, contract: H160, account: H160, polling_interval: Duration) -> Self {
        Self {
            contract: Arc::new(GmpPrecompileInternal::new(contract, provider.clone())),
            provider,
            account,
            polling_interval,
        }
    }

    fn completion_call(&self, record: &TransferRecord, nonce: u64) -> ContractCall<M, ()> {
        self.contract
            .wormhole_transfer_erc20(record.payload.clone())
            .from(self.account)
            .nonce(nonce)
    }

    /// Replay a reverted transaction at its block to recover the reason.
    async fn revert_reason(&self, receipt: &TransactionReceipt) -> Option<String> {
        let tx = match self.provider.get_transaction(receipt.transaction_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = ?err, "Failed to fetch reverted transaction");
                return None;
            }
        };
        let mut request = TransactionRequest::new()
            .from(tx.from)
            .data(tx.input)
            .value(tx.value);
        if let Some(to) = tx.to {
            request = request.to(to);
        }
        let block = receipt
            .block_number
            .map(|number| BlockId::Number(BlockNumber::Number(number)));
        match self.provider.call(&request.into(), block).await {
            // the replay succeeding means state changed within the block
            Ok(_) => None,
            Err(err) => Some(
                err.as_error_response()
                    .and_then(|response| response.decode_revert_data::<String>())
                    .unwrap_or_else(|| err.to_string()),
            ),
        }
    }
}

/// Build a completer from its connection configuration, checking that the
/// node serves the configured chain.
pub async fn connect(conf: &ConnectionConf) -> ChainResult<EthereumGmpCompleter<SigningProvider>> {
    let http = Http::new(conf.url.clone());
    let client = RetryClientBuilder::default()
        .rate_limit_retries(conf.rpc_max_retries)
        .timeout_retries(conf.rpc_max_retries)
        .initial_backoff(conf.rpc_initial_backoff())
        .build(http, Box::<HttpRateLimitRetryPolicy>::default());
    let provider = Provider::new(client).interval(conf.polling_interval());

    let chain_id = provider.get_chainid().await?;
    if chain_id.as_u64() != conf.chain_id {
        return Err(ChainCommunicationError::from_other_str(format!(
            "Node at {} serves chain {chain_id}, expected {}",
            conf.url, conf.chain_id
        )));
    }

    let wallet = conf.signer.try_into_wallet(conf.chain_id)?;
    let account = wallet.address();
    info!(?account, chain_id = conf.chain_id, contract = ?conf.contract, "Connected to destination chain");
    Ok(EthereumGmpCompleter::new(
        Arc::new(SignerMiddleware::new(provider, wallet)),
        conf.contract,
        account,
        conf.polling_interval(),
    ))
}

/// Prefer the decoded revert string; it is what the precompile's failure
/// messages are matched on.
fn contract_error<M>(err: ContractError<M>) -> ChainCommunicationError
where
    M: Middleware + 'static,
{
    match err.decode_revert::<String>() {
        Some(reason) => ChainCommunicationError::Revert(reason),
        None => ChainCommunicationError::from_contract_error(err),
    }
}

pub(crate) fn outcome_from_receipt(
    receipt: &TransactionReceipt,
    revert_reason: Option<String>,
) -> SubmissionOutcome {
    if receipt.status.map(|status| status.as_u64()) == Some(1) {
        return SubmissionOutcome::Confirmed(receipt.transaction_hash);
    }
    let tx_hash = receipt.transaction_hash;
    match revert_reason {
        Some(reason) => {
            SubmissionOutcome::Rejected(format!("Transaction {tx_hash:?} reverted: {reason}"))
        }
        None => SubmissionOutcome::Rejected(format!("Transaction {tx_hash:?} reverted")),
    }
}

#[async_trait]
impl<M> TransferCompleter for EthereumGmpCompleter<M>
where
    M: Middleware + 'static,
{
    fn account(&self) -> H160 {
        self.account
    }

    #[instrument(err, skip(self))]
    async fn transaction_count(&self) -> ChainResult<u64> {
        let count = self
            .provider
            .get_transaction_count(self.account, Some(BlockNumber::Pending.into()))
            .await
            .map_err(ChainCommunicationError::from_other)?;
        Ok(count.as_u64())
    }

    #[instrument(skip(self, record), fields(sequence = record.sequence))]
    async fn dry_run(&self, record: &TransferRecord, nonce: u64) -> ChainResult<()> {
        self.completion_call(record, nonce)
            .call()
            .await
            .map_err(contract_error)
    }

    #[instrument(skip(self, record), fields(sequence = record.sequence))]
    async fn submit(&self, record: &TransferRecord, nonce: u64) -> ChainResult<H256> {
        let call = self.completion_call(record, nonce);
        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash: H256 = *pending;
        info!(?tx_hash, nonce, "Dispatched completion transaction");
        Ok(tx_hash)
    }

    #[instrument(skip(self))]
    async fn await_confirmation(&self, tx_hash: H256) -> ChainResult<SubmissionOutcome> {
        let pending = PendingTransaction::new(tx_hash, self.provider.provider())
            .interval(self.polling_interval);
        match pending.await {
            Ok(Some(receipt)) => {
                debug!(block = ?receipt.block_number, status = ?receipt.status, "Got receipt");
                let reason = if receipt.status.map(|status| status.as_u64()) == Some(1) {
                    None
                } else {
                    self.revert_reason(&receipt).await
                };
                Ok(outcome_from_receipt(&receipt, reason))
            }
            // ethers-rs will return None if it can no longer poll for the tx in the mempool
            Ok(None) => Err(ChainCommunicationError::TransactionDropped(tx_hash)),
            Err(err) => Err(err.into()),
        }
    }
}
