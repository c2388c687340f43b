use std::fmt::{Debug, Formatter};
use std::time::Duration;

use ethers::signers::{LocalWallet, Signer};
use url::Url;

use mrl_core::{ChainCommunicationError, ChainResult, H160};

/// Ethereum signer types
#[derive(Clone, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignerConf {
    /// A local hex key
    HexKey {
        /// Hex string of private key, with or without 0x prefix
        key: String,
    },
}

impl Debug for SignerConf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerConf::HexKey { .. } => f.write_str("HexKey { key: <redacted> }"),
        }
    }
}

impl SignerConf {
    /// Build the wallet for transactions on `chain_id`
    pub fn try_into_wallet(&self, chain_id: u64) -> ChainResult<LocalWallet> {
        match self {
            SignerConf::HexKey { key } => key
                .trim_start_matches("0x")
                .parse::<LocalWallet>()
                .map(|wallet| wallet.with_chain_id(chain_id))
                .map_err(ChainCommunicationError::from_other),
        }
    }
}

/// Connection to the EVM destination chain and the GMP precompile on it
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConnectionConf {
    /// JSON-RPC endpoint
    pub url: Url,
    /// EVM chain id, checked against the node on connect
    pub chain_id: u64,
    /// Address of the GMP precompile
    pub contract: H160,
    /// Signer of completion transactions
    pub signer: SignerConf,
    /// How often to poll for receipts
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Retries of rate limited or timed out RPC requests
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u32,
    /// Initial backoff between RPC retries
    #[serde(default = "default_rpc_initial_backoff_ms")]
    pub rpc_initial_backoff_ms: u64,
}

fn default_polling_interval_ms() -> u64 {
    2000
}

fn default_rpc_max_retries() -> u32 {
    10
}

fn default_rpc_initial_backoff_ms() -> u64 {
    500
}

impl ConnectionConf {
    /// Receipt polling interval
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Initial RPC retry backoff
    pub fn rpc_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.rpc_initial_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    // well known development key
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn parses_connection_with_defaults() {
        let conf: ConnectionConf = serde_json::from_str(&format!(
            r#"{{
                "url": "https://rpc.api.moonbeam.network",
                "chain_id": 1284,
                "contract": "0x0000000000000000000000000000000000000816",
                "signer": {{"type": "hexKey", "key": "{KEY}"}}
            }}"#
        ))
        .unwrap();
        assert_eq!(conf.chain_id, 1284);
        assert_eq!(conf.contract, H160::from_low_u64_be(0x816));
        assert_eq!(conf.polling_interval(), Duration::from_secs(2));
        assert_eq!(conf.rpc_max_retries, 10);
    }

    #[test]
    fn builds_wallet_for_chain() {
        let signer = SignerConf::HexKey { key: KEY.into() };
        let wallet = signer.try_into_wallet(1284).unwrap();
        assert_eq!(wallet.chain_id(), 1284);
        assert_eq!(
            wallet.address(),
            H160::from_str("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap()
        );
    }

    #[test]
    fn bad_key_is_an_error() {
        let signer = SignerConf::HexKey {
            key: "not a key".into(),
        };
        assert!(signer.try_into_wallet(1).is_err());
    }

    #[test]
    fn debug_never_prints_the_key() {
        let signer = SignerConf::HexKey { key: KEY.into() };
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains(&KEY[2..]));
    }
}
