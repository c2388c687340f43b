//! Relayer configuration.
//!
//! Settings are merged from, in increasing order of precedence:
//! 1. every `*.json` file in `./config`
//! 2. the comma separated file paths in `CONFIG_FILES`
//! 3. environment variables prefixed with `MRL_`, nested with `__`, e.g.
//!    `MRL_DESTINATION__CONNECTION__SIGNER__KEY` or
//!    `MRL_ORIGINS__ETHEREUM__START_SEQUENCE`

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::error::Error;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use eyre::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use mrl_core::{ChainId, H256};
use mrl_ethereum::ConnectionConf;
use mrl_lander::LanderSettings;

pub use self::trace::TracingConfig;

mod trace;

const ENV_PREFIX: &str = "MRL";

/// The chain transfers are completed on
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConf {
    /// Wormhole chain id
    pub chain: ChainId,
    /// 32 byte recipient a transfer must be addressed to
    pub target: H256,
    /// RPC and signer
    pub connection: ConnectionConf,
}

/// A token bridge emitter to watch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OriginConf {
    /// Wormhole chain id of the emitter
    pub chain: ChainId,
    /// Token bridge emitter address
    pub emitter: H256,
    /// First sequence to deliver
    pub start_sequence: u64,
}

/// Where signed attestations are fetched from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttestationApiConf {
    /// Base url of the Wormholescan API
    pub url: String,
    /// Pause between polls when there is nothing new
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Attestations per origin that may be awaiting completion at once
    pub max_in_flight: usize,
}

impl Default for AttestationApiConf {
    fn default() -> Self {
        Self {
            url: "https://api.wormholescan.io".into(),
            poll_interval_ms: 5000,
            request_timeout_secs: 30,
            max_in_flight: 16,
        }
    }
}

impl AttestationApiConf {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.url).with_context(|| format!("Invalid attestation API url {}", self.url))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings of the relayer agent
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerSettings {
    #[serde(default = "default_name")]
    pub name: String,
    pub destination: DestinationConf,
    /// Origins by name
    pub origins: BTreeMap<String, OriginConf>,
    #[serde(default)]
    pub api: AttestationApiConf,
    #[serde(default)]
    pub lander: LanderSettings,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_name() -> String {
    "mrl-relayer".into()
}

fn default_metrics_port() -> u16 {
    9090
}

impl RelayerSettings {
    /// Load settings from the default locations and the process environment.
    pub fn load() -> Result<Self> {
        let config_files: Vec<String> = env::var("CONFIG_FILES")
            .map(|s| s.split(',').map(|s| s.to_string()).collect())
            .unwrap_or_default();
        load_settings_object(Path::new("./config"), &config_files, env::vars().collect())
    }
}

/// Load a settings object from `config_dir`, `config_files` and `env`.
pub(crate) fn load_settings_object<T>(
    config_dir: &Path,
    config_files: &[String],
    env: HashMap<String, String>,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut config_sources = vec![];
    let mut builder = Config::builder();

    if config_dir.is_dir() {
        let mut paths = config_dir
            .read_dir()
            .with_context(|| format!("Failed to open config directory {config_dir:?}"))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        paths.sort();
        for path in paths {
            config_sources.push(format!("{path:?}"));
            builder = builder.add_source(File::from(path));
        }
    }

    let builder = config_files.iter().fold(builder, |builder, path| {
        builder.add_source(File::with_name(path))
    });

    let config_deserializer = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(Some(env)),
        )
        .build()?;

    match config_deserializer.try_deserialize::<T>() {
        Ok(settings) => Ok(settings),
        Err(err) => {
            let mut err = if let Some(source_err) = err.source() {
                let source = format!("Config error source: {source_err}");
                Err(err).context(source)
            } else {
                Err(err.into())
            };
            for path in config_sources.iter().chain(config_files.iter()) {
                err = err.with_context(|| format!("Config loaded: {path}"));
            }
            err.context("Config deserialization error")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mrl_core::KnownChain;

    use super::*;

    fn shipped_config() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../config"))
    }

    fn key_env() -> HashMap<String, String> {
        HashMap::from([(
            "MRL_DESTINATION__CONNECTION__SIGNER__KEY".to_string(),
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        )])
    }

    #[test]
    fn loads_shipped_mainnet_config() {
        let settings: RelayerSettings =
            load_settings_object(shipped_config(), &[], key_env()).unwrap();

        assert_eq!(settings.destination.chain, KnownChain::Moonbeam.into());
        assert_eq!(settings.destination.target, H256::from_low_u64_be(0x816));
        assert_eq!(settings.destination.connection.chain_id, 1284);
        assert!(settings
            .destination
            .connection
            .signer
            .try_into_wallet(1284)
            .is_ok());

        let origins = settings
            .origins
            .values()
            .map(|origin| (origin.chain, origin.start_sequence))
            .collect::<BTreeMap<_, _>>();
        assert_eq!(origins.get(&ChainId(12)), Some(&3358));
        assert_eq!(origins.get(&ChainId(2)), Some(&499562));
        assert_eq!(origins.get(&ChainId(1)), Some(&1211243));
        assert_eq!(origins.get(&ChainId(21)), Some(&217370));

        assert_eq!(settings.lander.max_unknown_retries, 0);
        assert_eq!(
            settings.api.base_url().unwrap().as_str(),
            "https://api.wormholescan.io/"
        );
    }

    #[test]
    fn env_overrides_files() {
        let mut env = key_env();
        env.insert(
            "MRL_ORIGINS__ETHEREUM__START_SEQUENCE".into(),
            "500000".into(),
        );
        env.insert("MRL_LANDER__MAX_UNKNOWN_RETRIES".into(), "3".into());
        env.insert("MRL_METRICS_PORT".into(), "9191".into());
        // unrelated variables are ignored
        env.insert("HOME".into(), "/root".into());

        let settings: RelayerSettings =
            load_settings_object(shipped_config(), &[], env).unwrap();
        assert_eq!(settings.origins["ethereum"].start_sequence, 500000);
        assert_eq!(settings.lander.max_unknown_retries, 3);
        assert_eq!(settings.metrics_port, 9191);
    }

    #[test]
    fn extra_config_files_are_layered_on_top() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"origins": {{"sui": {{"chain": 21, "emitter": "0xccceeb29348f71bdd22ffef43a2a19c1f5b5e17c5cca5411529120182672ade5", "start_sequence": 1}}}}, "api": {{"max_in_flight": 2}}}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let settings: RelayerSettings =
            load_settings_object(shipped_config(), &[path], key_env()).unwrap();
        assert_eq!(settings.origins["sui"].start_sequence, 1);
        assert_eq!(settings.api.max_in_flight, 2);
        // untouched origins keep their file values
        assert_eq!(settings.origins["acala"].start_sequence, 3358);
    }

    #[test]
    fn missing_signer_is_a_config_error() {
        let err = load_settings_object::<RelayerSettings>(shipped_config(), &[], HashMap::new())
            .unwrap_err();
        assert!(format!("{err:?}").contains("Config deserialization error"));
    }
}
