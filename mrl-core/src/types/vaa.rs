use std::io::Read;

use crate::{Bytes, ChainId, Decode, MrlProtocolError, H256};

/// Length of one guardian signature entry: guardian index plus a 65 byte
/// recoverable signature.
const SIGNATURE_LEN: usize = 66;

/// A guardian's signature over the VAA body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianSignature {
    /// Index of the guardian in the guardian set
    pub index: u8,
    /// r, s, v
    pub signature: [u8; 65],
}

/// A decoded version 1 VAA.
///
/// Signatures are decoded but not verified; the destination contract is the
/// authority on validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vaa {
    /// Guardian set that signed this VAA
    pub guardian_set_index: u32,
    /// Guardian signatures
    pub signatures: Vec<GuardianSignature>,
    /// Observation time on the source chain
    pub timestamp: u32,
    /// Emitter-chosen nonce, unrelated to transaction nonces
    pub nonce: u32,
    /// Chain the message was emitted on
    pub emitter_chain: ChainId,
    /// Contract that emitted the message, left-padded to 32 bytes
    pub emitter_address: H256,
    /// Per-emitter sequence number
    pub sequence: u64,
    /// Finality level requested by the emitter
    pub consistency_level: u8,
    /// Application payload
    pub payload: Bytes,
}

impl Decode for Vaa {
    fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
    where
        R: Read,
    {
        let version = u8::read_from(reader)?;
        if version != 1 {
            return Err(MrlProtocolError::UnsupportedVaaVersion(version));
        }
        let guardian_set_index = u32::read_from(reader)?;

        let signature_count = u8::read_from(reader)?;
        let mut signatures = Vec::with_capacity(signature_count as usize);
        for _ in 0..signature_count {
            let mut entry = [0u8; SIGNATURE_LEN];
            reader.read_exact(&mut entry)?;
            let mut signature = [0u8; 65];
            signature.copy_from_slice(&entry[1..]);
            signatures.push(GuardianSignature {
                index: entry[0],
                signature,
            });
        }

        let timestamp = u32::read_from(reader)?;
        let nonce = u32::read_from(reader)?;
        let emitter_chain = ChainId(u16::read_from(reader)?);
        let emitter_address = H256::read_from(reader)?;
        let sequence = u64::read_from(reader)?;
        let consistency_level = u8::read_from(reader)?;

        let mut payload = vec![];
        reader.read_to_end(&mut payload)?;

        Ok(Self {
            guardian_set_index,
            signatures,
            timestamp,
            nonce,
            emitter_chain,
            emitter_address,
            sequence,
            consistency_level,
            payload: payload.into(),
        })
    }
}

/// A VAA together with the exact bytes the guardians signed over, which is
/// what the destination contract consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedVaa {
    /// Decoded form
    pub vaa: Vaa,
    /// Raw wire bytes
    pub bytes: Bytes,
    /// Hash of the source chain transaction that emitted the message, if the
    /// delivery source knows it
    pub source_tx_hash: Option<String>,
}

impl SignedVaa {
    /// Decode raw VAA bytes
    pub fn parse(
        bytes: impl Into<Bytes>,
        source_tx_hash: Option<String>,
    ) -> Result<Self, MrlProtocolError> {
        let bytes = bytes.into();
        let vaa = Vaa::decode(bytes.as_ref())?;
        Ok(Self {
            vaa,
            bytes,
            source_tx_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::encode_vaa;
    use super::*;

    #[test]
    fn decodes_header_and_body() {
        let emitter = H256::repeat_byte(0xab);
        let raw = encode_vaa(2, ChainId(2), emitter, 499_562, &[3, 4, 5]);

        let signed = SignedVaa::parse(raw.clone(), Some("0xfeed".into())).unwrap();
        let vaa = &signed.vaa;
        assert_eq!(vaa.guardian_set_index, 3);
        assert_eq!(vaa.signatures.len(), 2);
        assert_eq!(vaa.signatures[1].index, 1);
        assert_eq!(vaa.emitter_chain, ChainId(2));
        assert_eq!(vaa.emitter_address, emitter);
        assert_eq!(vaa.sequence, 499_562);
        assert_eq!(vaa.consistency_level, 15);
        assert_eq!(vaa.payload.as_ref(), &[3, 4, 5]);
        assert_eq!(signed.bytes.as_ref(), raw.as_slice());
        assert_eq!(signed.source_tx_hash.as_deref(), Some("0xfeed"));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut raw = encode_vaa(0, ChainId(2), H256::zero(), 1, &[]);
        raw[0] = 2;
        let err = Vaa::decode(&raw).unwrap_err();
        assert!(matches!(err, MrlProtocolError::UnsupportedVaaVersion(2)));
    }

    #[test]
    fn truncated_vaa_is_an_io_error() {
        let raw = encode_vaa(1, ChainId(2), H256::zero(), 1, &[]);
        let err = Vaa::decode(&raw[..40]).unwrap_err();
        assert!(matches!(err, MrlProtocolError::IoError(_)));
    }
}
