use std::io::Read;

use crate::{MrlProtocolError, H256, U256};

/// Types that can be read from wormhole's big-endian wire format
pub trait Decode {
    /// Try to read from some source
    fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
    where
        R: Read,
        Self: Sized;

    /// Decode from a byte slice, ignoring trailing bytes
    fn decode(mut bytes: &[u8]) -> Result<Self, MrlProtocolError>
    where
        Self: Sized,
    {
        Self::read_from(&mut bytes)
    }
}

impl Decode for H256 {
    fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
    where
        R: Read,
    {
        let mut h = H256::zero();
        reader.read_exact(h.as_mut())?;
        Ok(h)
    }
}

impl Decode for U256 {
    fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
    where
        R: Read,
    {
        let mut buf = [0u8; 32];
        reader.read_exact(&mut buf)?;
        Ok(U256::from_big_endian(&buf))
    }
}

macro_rules! decode_be_int {
    ($($t:ty),*) => {$(
        impl Decode for $t {
            fn read_from<R>(reader: &mut R) -> Result<Self, MrlProtocolError>
            where
                R: Read,
            {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                reader.read_exact(&mut buf)?;
                Ok(<$t>::from_be_bytes(buf))
            }
        }
    )*};
}

decode_be_int!(u8, u16, u32, u64);
