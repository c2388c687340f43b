use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;

use mrl_core::test_utils::{encode_transfer_with_payload, encode_vaa};
use mrl_core::{
    ChainId, ChainResult, SignedVaa, SubmissionOutcome, TokenBridgePayload, TransferCompleter,
    TransferFetcher, TransferRecord, H160, H256,
};
use mrl_lander::{CompletionQueue, LanderMetrics, LanderSettings, NonceTracker};

use crate::ingress::IngressFilter;

pub const MOONBEAM: ChainId = ChainId(16);

mock! {
    pub Fetcher {}

    #[async_trait]
    impl TransferFetcher for Fetcher {
        async fn fetch_by_sequence(
            &self,
            chain: ChainId,
            emitter: H256,
            sequence: u64,
        ) -> ChainResult<Option<TokenBridgePayload>>;
        async fn fetch_signed_vaa(
            &self,
            chain: ChainId,
            emitter: H256,
            sequence: u64,
        ) -> ChainResult<Option<SignedVaa>>;
    }
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockFetcher")
    }
}

/// Confirms everything it is given; the tx hash is the nonce.
#[derive(Debug)]
pub struct AcceptingChain;

#[async_trait]
impl TransferCompleter for AcceptingChain {
    fn account(&self) -> H160 {
        H160::repeat_byte(0xaa)
    }
    async fn transaction_count(&self) -> ChainResult<u64> {
        Ok(0)
    }
    async fn dry_run(&self, _record: &TransferRecord, _nonce: u64) -> ChainResult<()> {
        Ok(())
    }
    async fn submit(&self, _record: &TransferRecord, nonce: u64) -> ChainResult<H256> {
        Ok(H256::from_low_u64_be(nonce))
    }
    async fn await_confirmation(&self, tx_hash: H256) -> ChainResult<SubmissionOutcome> {
        Ok(SubmissionOutcome::Confirmed(tx_hash))
    }
}

pub fn target() -> H256 {
    H256::from_low_u64_be(0x816)
}

pub fn emitter() -> H256 {
    H256::repeat_byte(0x3e)
}

/// An ingress filter for [`MOONBEAM`] backed by a running worker on
/// `completer`.
pub fn ingress_filter(
    fetcher: impl TransferFetcher + 'static,
    completer: impl TransferCompleter + 'static,
) -> IngressFilter {
    let (queue, worker) = CompletionQueue::new(
        "moonbeam",
        Arc::new(completer),
        NonceTracker::new(0),
        LanderSettings::default(),
        LanderMetrics::dummy_instance(),
    );
    worker.spawn();
    IngressFilter::new(MOONBEAM, target(), queue, Arc::new(fetcher))
}

/// A signed VAA from the ethereum token bridge
pub fn signed_vaa(sequence: u64, payload: &[u8]) -> SignedVaa {
    let raw = encode_vaa(1, ChainId(2), emitter(), sequence, payload);
    SignedVaa::parse(raw, Some(format!("0x{sequence:x}"))).unwrap()
}

/// A signed transfer to `to` on `to_chain`
pub fn signed_transfer(sequence: u64, to: H256, to_chain: ChainId) -> SignedVaa {
    signed_vaa(sequence, &encode_transfer_with_payload(to, to_chain, &[1]))
}
