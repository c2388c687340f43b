//! Wire encoders for building attestations in tests.

use crate::{ChainId, H256};

/// Encode a version 1 VAA with `signatures` zeroed guardian signatures.
pub fn encode_vaa(
    signatures: u8,
    emitter_chain: ChainId,
    emitter_address: H256,
    sequence: u64,
    payload: &[u8],
) -> Vec<u8> {
    let mut out = vec![1u8];
    out.extend_from_slice(&3u32.to_be_bytes());
    out.push(signatures);
    for i in 0..signatures {
        out.push(i);
        out.extend_from_slice(&[0u8; 65]);
    }
    out.extend_from_slice(&1_700_000_000u32.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&emitter_chain.0.to_be_bytes());
    out.extend_from_slice(emitter_address.as_bytes());
    out.extend_from_slice(&sequence.to_be_bytes());
    out.push(15);
    out.extend_from_slice(payload);
    out
}

/// Encode a type 3 transfer of 1000 units to `to` on `to_chain`.
pub fn encode_transfer_with_payload(to: H256, to_chain: ChainId, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![3u8];
    let mut amount = [0u8; 32];
    amount[30..].copy_from_slice(&1000u16.to_be_bytes());
    out.extend_from_slice(&amount);
    out.extend_from_slice(H256::repeat_byte(0x11).as_bytes());
    out.extend_from_slice(&2u16.to_be_bytes());
    out.extend_from_slice(to.as_bytes());
    out.extend_from_slice(&to_chain.0.to_be_bytes());
    out.extend_from_slice(H256::repeat_byte(0x22).as_bytes());
    out.extend_from_slice(payload);
    out
}
