//! The relayer polls the attestation API for token bridge transfers addressed
//! to the Moonbeam GMP precompile and completes them on Moonbeam.

#![forbid(unsafe_code)]

use eyre::Result;
use tracing::info;

use crate::relayer::Relayer;
use crate::settings::RelayerSettings;

mod ingress;
mod metrics;
mod poller;
mod relayer;
mod server;
mod settings;
mod wormholescan;

#[cfg(test)]
mod test_utils;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // Logging is not initialised at this point, so, using `println!`
    println!("Relayer starting up...");

    color_eyre::install()?;
    let settings = RelayerSettings::load()?;
    settings.tracing.start_tracing()?;
    info!(name = %settings.name, origins = settings.origins.len(), "Loaded settings");

    let relayer = Relayer::from_settings(settings).await?;
    relayer.run().await?;
    info!("Shutting down relayer...");
    Ok(())
}
