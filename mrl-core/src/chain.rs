use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, FromRepr, IntoStaticStr};

/// A wormhole chain id, as it appears in VAA bodies and token bridge payloads.
///
/// This is not an EVM chain id; Moonbeam is `16` here and `1284` on the EVM
/// side.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChainId(pub u16);

impl ChainId {
    /// The known chain with this id, if any.
    pub fn known(&self) -> Option<KnownChain> {
        KnownChain::from_repr(self.0)
    }
}

impl From<u16> for ChainId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl From<KnownChain> for ChainId {
    fn from(chain: KnownChain) -> Self {
        Self(chain as u16)
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.known() {
            Some(chain) => write!(f, "{chain}({})", self.0),
            None => write!(f, "unknown({})", self.0),
        }
    }
}

/// Wormhole chains this relayer has names for.
#[derive(
    FromRepr, EnumString, IntoStaticStr, EnumIter, Debug, Copy, Clone, PartialEq, Eq, Hash,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum KnownChain {
    Solana = 1,
    Ethereum = 2,
    Terra = 3,
    Bsc = 4,
    Polygon = 5,
    Avalanche = 6,
    Oasis = 7,
    Algorand = 8,
    Aurora = 9,
    Fantom = 10,
    Karura = 11,
    Acala = 12,
    Klaytn = 13,
    Celo = 14,
    Near = 15,
    Moonbeam = 16,
    Sui = 21,
    Aptos = 22,
    Arbitrum = 23,
    Optimism = 24,
    Base = 30,
}

impl Display for KnownChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = self.into();
        f.write_str(name)
    }
}
