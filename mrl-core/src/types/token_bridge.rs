use std::io::Read;

use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::{Bytes, ChainId, Decode, MrlProtocolError, H256, U256};

/// Token bridge payload ids
#[derive(FromRepr, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenBridgePayloadType {
    /// A plain token transfer with a relayer fee
    Transfer = 1,
    /// Token metadata attestation
    AttestMeta = 2,
    /// A token transfer carrying an arbitrary payload for the recipient
    TransferWithPayload = 3,
}

/// A decoded token bridge transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBridgePayload {
    /// Which kind of transfer this is
    pub payload_type: TokenBridgePayloadType,
    /// Normalized amount (8 decimals)
    pub amount: U256,
    /// Token address on its native chain
    pub token_address: H256,
    /// Native chain of the token
    pub token_chain: ChainId,
    /// Recipient, left-padded to 32 bytes
    pub to: H256,
    /// Chain of the recipient
    pub to_chain: ChainId,
    /// Sender on the source chain, only present on `TransferWithPayload`
    pub from_address: Option<H256>,
    /// Relayer fee, only present on `Transfer`
    pub fee: Option<U256>,
    /// Payload for the recipient, only non-empty on `TransferWithPayload`
    pub transfer_payload: Bytes,
}

impl TokenBridgePayload {
    /// Whether this transfer carries a payload for the recipient contract
    pub fn is_transfer_with_payload(&self) -> bool {
        self.payload_type == TokenBridgePayloadType::TransferWithPayload
    }
}

impl Decode for TokenBridgePayload {
    fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
    where
        R: Read,
    {
        let id = u8::read_from(reader)?;
        let payload_type = TokenBridgePayloadType::from_repr(id)
            .ok_or(MrlProtocolError::UnknownPayloadType(id))?;
        if payload_type == TokenBridgePayloadType::AttestMeta {
            return Err(MrlProtocolError::NotATransfer(id));
        }

        let amount = U256::read_from(reader)?;
        let token_address = H256::read_from(reader)?;
        let token_chain = ChainId(u16::read_from(reader)?);
        let to = H256::read_from(reader)?;
        let to_chain = ChainId(u16::read_from(reader)?);

        let (fee, from_address, transfer_payload) = match payload_type {
            TokenBridgePayloadType::Transfer => (Some(U256::read_from(reader)?), None, vec![]),
            _ => {
                let from_address = H256::read_from(reader)?;
                let mut rest = vec![];
                reader.read_to_end(&mut rest)?;
                (None, Some(from_address), rest)
            }
        };

        Ok(Self {
            payload_type,
            amount,
            token_address,
            token_chain,
            to,
            to_chain,
            from_address,
            fee,
            transfer_payload: transfer_payload.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::encode_transfer_with_payload;
    use super::*;

    #[test]
    fn decodes_transfer_with_payload() {
        let to = H256::from_low_u64_be(0x816);
        let raw = encode_transfer_with_payload(to, ChainId(16), &[0xde, 0xad]);

        let payload = TokenBridgePayload::decode(&raw).unwrap();
        assert!(payload.is_transfer_with_payload());
        assert_eq!(payload.amount, U256::from(1000));
        assert_eq!(payload.token_chain, ChainId(2));
        assert_eq!(payload.to, to);
        assert_eq!(payload.to_chain, ChainId(16));
        assert_eq!(payload.from_address, Some(H256::repeat_byte(0x22)));
        assert_eq!(payload.fee, None);
        assert_eq!(payload.transfer_payload.as_ref(), &[0xde, 0xad]);
    }

    #[test]
    fn decodes_plain_transfer_with_fee() {
        let mut raw = encode_transfer_with_payload(H256::zero(), ChainId(16), &[]);
        raw[0] = 1;
        // a plain transfer ends with a 32 byte fee where the sender would be
        let payload = TokenBridgePayload::decode(&raw).unwrap();
        assert_eq!(payload.payload_type, TokenBridgePayloadType::Transfer);
        assert_eq!(payload.fee, Some(U256::from_big_endian(&[0x22; 32])));
        assert!(payload.from_address.is_none());
        assert!(!payload.is_transfer_with_payload());
    }

    #[test]
    fn rejects_attestations_and_unknown_ids() {
        assert!(matches!(
            TokenBridgePayload::decode(&[2u8; 100]).unwrap_err(),
            MrlProtocolError::NotATransfer(2)
        ));
        assert!(matches!(
            TokenBridgePayload::decode(&[9u8; 100]).unwrap_err(),
            MrlProtocolError::UnknownPayloadType(9)
        ));
    }
}
