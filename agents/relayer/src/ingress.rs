use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use mrl_core::{
    ChainId, Decode, SignedVaa, TokenBridgePayload, TokenBridgePayloadType, TransferFetcher,
    TransferRecord, H256,
};
use mrl_lander::{CompletionHandle, CompletionQueue, LanderError};

/// Why an attestation does not need a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No token bridge payload could be recovered from any source
    NoPayload,
    /// A token bridge message other than a transfer with payload
    PayloadType(TokenBridgePayloadType),
    /// Addressed to another chain
    OtherChain(ChainId),
    /// Addressed to another recipient on our chain
    OtherRecipient(H256),
}

impl IgnoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            IgnoreReason::NoPayload => "no_payload",
            IgnoreReason::PayloadType(_) => "payload_type",
            IgnoreReason::OtherChain(_) => "other_chain",
            IgnoreReason::OtherRecipient(_) => "other_recipient",
        }
    }
}

impl Display for IgnoreReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::NoPayload => write!(f, "no payload available from any source"),
            IgnoreReason::PayloadType(payload_type) => {
                write!(f, "payload type {payload_type:?} is not processed")
            }
            IgnoreReason::OtherChain(chain) => write!(f, "addressed to chain {chain}"),
            IgnoreReason::OtherRecipient(to) => write!(f, "addressed to recipient {to:?}"),
        }
    }
}

/// What happened to a delivered attestation.
#[derive(Debug)]
pub enum Delivery {
    /// Nothing to complete; acknowledged right away
    Ignored(IgnoreReason),
    /// Queued for completion
    Enqueued(CompletionHandle),
}

/// Decides which attestations are transfers to complete and hands those to
/// the completion queue.
#[derive(Debug)]
pub struct IngressFilter {
    destination: ChainId,
    target: H256,
    queue: CompletionQueue,
    fetcher: Arc<dyn TransferFetcher>,
}

impl IngressFilter {
    pub fn new(
        destination: ChainId,
        target: H256,
        queue: CompletionQueue,
        fetcher: Arc<dyn TransferFetcher>,
    ) -> Self {
        Self {
            destination,
            target,
            queue,
            fetcher,
        }
    }

    /// A transfer is ours iff it carries a payload and is addressed to the
    /// target on the destination chain.
    pub fn check(&self, transfer: &TokenBridgePayload) -> Result<(), IgnoreReason> {
        if transfer.payload_type != TokenBridgePayloadType::TransferWithPayload {
            return Err(IgnoreReason::PayloadType(transfer.payload_type));
        }
        if transfer.to_chain != self.destination {
            return Err(IgnoreReason::OtherChain(transfer.to_chain));
        }
        if transfer.to != self.target {
            return Err(IgnoreReason::OtherRecipient(transfer.to));
        }
        Ok(())
    }

    /// Hand an attestation to the relayer. `payload` is the token bridge
    /// payload if the caller already decoded it.
    ///
    /// Only fails when the completion queue is gone.
    pub async fn deliver(
        &self,
        signed: SignedVaa,
        payload: Option<TokenBridgePayload>,
    ) -> Result<Delivery, LanderError> {
        let vaa = &signed.vaa;
        let span = info_span!(
            "deliver",
            source_chain = %vaa.emitter_chain,
            sequence = vaa.sequence,
            source_tx = ?signed.source_tx_hash,
        );
        let payload = match payload {
            Some(payload) => Some(payload),
            None => self.recover_payload(&signed).await,
        };

        let _entered = span.enter();
        let Some(payload) = payload else {
            info!(reason = %IgnoreReason::NoPayload, "Attestation not for processing");
            return Ok(Delivery::Ignored(IgnoreReason::NoPayload));
        };
        if let Err(reason) = self.check(&payload) {
            info!(%reason, "Attestation not for processing");
            return Ok(Delivery::Ignored(reason));
        }

        info!(to = ?payload.to, "Found transfer to complete");
        let record = TransferRecord::new(&signed, &payload);
        self.queue.enqueue(record).map(Delivery::Enqueued)
    }

    /// Decode the payload from the VAA, falling back to the attestation API.
    async fn recover_payload(&self, signed: &SignedVaa) -> Option<TokenBridgePayload> {
        let vaa = &signed.vaa;
        match TokenBridgePayload::decode(vaa.payload.as_ref()) {
            Ok(payload) => return Some(payload),
            Err(err) => debug!(error = %err, "Payload not decodable, loading it from the API"),
        }
        match self
            .fetcher
            .fetch_by_sequence(vaa.emitter_chain, vaa.emitter_address, vaa.sequence)
            .await
        {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = ?err, "Failed to load payload from the API");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mrl_core::{ChainCommunicationError, U256};
    use mrl_lander::CompletionStatus;

    use crate::test_utils::{
        emitter, ingress_filter, signed_transfer, signed_vaa, target, AcceptingChain,
        MockFetcher, MOONBEAM,
    };

    use super::*;

    fn transfer(payload_type: TokenBridgePayloadType) -> TokenBridgePayload {
        TokenBridgePayload {
            payload_type,
            amount: U256::from(1),
            token_address: H256::zero(),
            token_chain: ChainId(2),
            to: target(),
            to_chain: MOONBEAM,
            from_address: None,
            fee: None,
            transfer_payload: Default::default(),
        }
    }

    #[tokio::test]
    async fn relevant_transfer_is_enqueued_and_completed() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch_by_sequence().never();
        let filter = ingress_filter(fetcher, AcceptingChain);

        let vaa = signed_transfer(7, target(), MOONBEAM);
        let Delivery::Enqueued(handle) = filter.deliver(vaa, None).await.unwrap() else {
            panic!("transfer should have been enqueued");
        };
        assert_eq!(handle.id().sequence, 7);
        assert_eq!(handle.await, CompletionStatus::Completed(H256::zero()));
    }

    #[tokio::test]
    async fn irrelevant_transfers_are_acknowledged_immediately() {
        let filter = ingress_filter(MockFetcher::new(), AcceptingChain);

        let other_chain = signed_transfer(7, target(), ChainId(2));
        assert!(matches!(
            filter.deliver(other_chain, None).await.unwrap(),
            Delivery::Ignored(IgnoreReason::OtherChain(ChainId(2)))
        ));

        let other_recipient = signed_transfer(8, H256::repeat_byte(9), MOONBEAM);
        assert!(matches!(
            filter.deliver(other_recipient, None).await.unwrap(),
            Delivery::Ignored(IgnoreReason::OtherRecipient(_))
        ));

        let plain = transfer(TokenBridgePayloadType::Transfer);
        assert!(matches!(
            filter.deliver(signed_vaa(9, &[]), Some(plain)).await.unwrap(),
            Delivery::Ignored(IgnoreReason::PayloadType(
                TokenBridgePayloadType::Transfer
            ))
        ));
    }

    #[tokio::test]
    async fn undecodable_payload_falls_back_to_the_api() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_by_sequence()
            .withf(|chain, emitter_address, sequence| {
                *chain == ChainId(2) && *emitter_address == emitter() && *sequence == 7
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(transfer(TokenBridgePayloadType::TransferWithPayload))));
        let filter = ingress_filter(fetcher, AcceptingChain);

        let delivery = filter.deliver(signed_vaa(7, &[0xff; 4]), None).await.unwrap();
        assert!(matches!(delivery, Delivery::Enqueued(_)));
    }

    #[tokio::test]
    async fn missing_payload_everywhere_is_ignored() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_by_sequence()
            .times(1)
            .returning(|_, _, _| Ok(None));
        let filter = ingress_filter(fetcher, AcceptingChain);
        assert!(matches!(
            filter.deliver(signed_vaa(7, &[]), None).await.unwrap(),
            Delivery::Ignored(IgnoreReason::NoPayload)
        ));
    }

    #[tokio::test]
    async fn api_failure_is_treated_as_missing_payload() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_by_sequence()
            .times(1)
            .returning(|_, _, _| Err(ChainCommunicationError::from_other_str("503")));
        let filter = ingress_filter(fetcher, AcceptingChain);
        assert!(matches!(
            filter.deliver(signed_vaa(7, &[]), None).await.unwrap(),
            Delivery::Ignored(IgnoreReason::NoPayload)
        ));
    }

    #[test]
    fn reasons_render_for_logs() {
        assert_eq!(
            IgnoreReason::OtherChain(ChainId(2)).to_string(),
            "addressed to chain ethereum(2)"
        );
        assert_eq!(IgnoreReason::NoPayload.label(), "no_payload");
    }
}
