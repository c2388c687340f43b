use std::fmt::{Display, Formatter};

use tracing::{info_span, Span};

use crate::{Bytes, ChainId, SignedVaa, TokenBridgePayload, H256};

/// Identifies an attestation uniquely: wormhole's `chain/emitter/sequence`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransferId {
    /// Emitter chain
    pub chain: ChainId,
    /// Emitter address
    pub emitter: H256,
    /// Emitter sequence
    pub sequence: u64,
}

impl Display for TransferId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.chain.0,
            hex::encode(self.emitter.as_bytes()),
            self.sequence
        )
    }
}

/// A transfer that needs a completion call on the destination chain.
///
/// Built once from a verified attestation and never mutated. The span carries
/// the correlation context every log line about this transfer is emitted in.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    /// Chain the attestation was emitted on
    pub source_chain: ChainId,
    /// Emitter of the attestation
    pub emitter: H256,
    /// Attestation sequence number
    pub sequence: u64,
    /// Source chain transaction, when known
    pub source_tx_hash: Option<String>,
    /// Chain the transfer is addressed to
    pub destination_chain: ChainId,
    /// 32 byte recipient the transfer is addressed to
    pub destination_contract: H256,
    /// Opaque argument of the completion call (the signed VAA)
    pub payload: Bytes,
    /// Correlation context
    pub span: Span,
}

impl TransferRecord {
    /// Build the record for a signed VAA carrying `transfer`.
    pub fn new(signed: &SignedVaa, transfer: &TokenBridgePayload) -> Self {
        let vaa = &signed.vaa;
        let span = info_span!(
            "transfer",
            source_chain = %vaa.emitter_chain,
            sequence = vaa.sequence,
            source_tx = ?signed.source_tx_hash,
            destination = %transfer.to_chain,
        );
        Self {
            source_chain: vaa.emitter_chain,
            emitter: vaa.emitter_address,
            sequence: vaa.sequence,
            source_tx_hash: signed.source_tx_hash.clone(),
            destination_chain: transfer.to_chain,
            destination_contract: transfer.to,
            payload: signed.bytes.clone(),
            span,
        }
    }

    /// The attestation this record was built from
    pub fn id(&self) -> TransferId {
        TransferId {
            chain: self.source_chain,
            emitter: self.emitter,
            sequence: self.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{encode_transfer_with_payload, encode_vaa};
    use crate::Decode;

    use super::*;

    #[test]
    fn record_carries_vaa_bytes_and_routing() {
        let target = H256::from_low_u64_be(0x816);
        let emitter = H256::repeat_byte(0x3e);
        let payload = encode_transfer_with_payload(target, ChainId(16), &[1, 2, 3]);
        let raw = encode_vaa(1, ChainId(12), emitter, 3358, &payload);
        let signed = SignedVaa::parse(raw.clone(), Some("0xabc".into())).unwrap();
        let transfer = TokenBridgePayload::decode(signed.vaa.payload.as_ref()).unwrap();

        let record = TransferRecord::new(&signed, &transfer);
        assert_eq!(record.payload.as_ref(), raw.as_slice());
        assert_eq!(record.destination_chain, ChainId(16));
        assert_eq!(record.destination_contract, target);
        assert_eq!(record.source_tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(
            record.id(),
            TransferId {
                chain: ChainId(12),
                emitter,
                sequence: 3358
            }
        );
    }

    #[test]
    fn transfer_id_renders_like_the_attestation_api_path() {
        let id = TransferId {
            chain: ChainId(2),
            emitter: H256::from_low_u64_be(1),
            sequence: 7,
        };
        assert_eq!(
            id.to_string(),
            "2/0000000000000000000000000000000000000000000000000000000000000001/7"
        );
    }
}
