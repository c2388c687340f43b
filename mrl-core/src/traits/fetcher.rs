use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{ChainId, ChainResult, SignedVaa, TokenBridgePayload, H256};

/// Looks attestations up out of band, for when the delivered attestation
/// arrives without a usable payload or when polling for new ones.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait TransferFetcher: Send + Sync + Debug {
    /// Fetch the decoded token bridge payload for the attestation with this
    /// emitter and sequence. `Ok(None)` means the source does not know it.
    async fn fetch_by_sequence(
        &self,
        chain: ChainId,
        emitter: H256,
        sequence: u64,
    ) -> ChainResult<Option<TokenBridgePayload>>;

    /// Fetch the signed VAA with this emitter and sequence. `Ok(None)` means
    /// it has not been observed yet.
    async fn fetch_signed_vaa(
        &self,
        chain: ChainId,
        emitter: H256,
        sequence: u64,
    ) -> ChainResult<Option<SignedVaa>>;
}
