use std::sync::Arc;

use eyre::{eyre, Context, Result};
use futures_util::future::select_all;
use prometheus::Registry;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use mrl_core::{TransferCompleter, TransferFetcher};
use mrl_lander::{CompletionQueue, LanderMetrics, NonceTracker};

use crate::ingress::IngressFilter;
use crate::metrics::RelayerMetrics;
use crate::poller::SequencePoller;
use crate::server::Server;
use crate::settings::RelayerSettings;
use crate::wormholescan::WormholeScanClient;

/// Completes token bridge transfers addressed to the GMP precompile.
#[derive(Debug)]
pub struct Relayer {
    settings: RelayerSettings,
    registry: Registry,
    metrics: RelayerMetrics,
    ingress: Arc<IngressFilter>,
    fetcher: Arc<dyn TransferFetcher>,
    queue_worker: mrl_lander::CompletionWorker,
}

impl Relayer {
    /// Connect to the destination, learn the signer's next nonce and wire the
    /// queue, ingress and fetcher together.
    pub async fn from_settings(settings: RelayerSettings) -> Result<Self> {
        let registry = Registry::new();
        let metrics = RelayerMetrics::new(&registry)?;
        let lander_metrics = LanderMetrics::new(registry.clone())?;

        let destination = &settings.destination;
        let completer = mrl_ethereum::connect(&destination.connection)
            .await
            .context("Failed to connect to the destination chain")?;
        let completer: Arc<dyn TransferCompleter> = Arc::new(completer);
        let nonces = NonceTracker::from_chain(completer.as_ref())
            .await
            .context("Failed to load the signer's transaction count")?;
        info!(
            signer = ?completer.account(),
            next_nonce = nonces.current(),
            "Connected to destination"
        );

        let (queue, queue_worker) = CompletionQueue::new(
            destination.chain.to_string(),
            completer,
            nonces,
            settings.lander.clone(),
            lander_metrics,
        );

        let fetcher: Arc<dyn TransferFetcher> = Arc::new(WormholeScanClient::new(
            settings.api.base_url()?,
            settings.api.request_timeout(),
        )?);
        let ingress = Arc::new(IngressFilter::new(
            destination.chain,
            destination.target,
            queue,
            fetcher.clone(),
        ));

        Ok(Self {
            settings,
            registry,
            metrics,
            ingress,
            fetcher,
            queue_worker,
        })
    }

    /// Run until a task stops or the process is interrupted.
    pub async fn run(self) -> Result<()> {
        let mut tasks: Vec<JoinHandle<Result<()>>> = vec![];

        let worker = self.queue_worker.spawn();
        tasks.push(tokio::spawn(async move {
            worker.await?.map_err(eyre::Report::from)?;
            Err(eyre!("Completion worker stopped"))
        }));

        for (name, origin) in &self.settings.origins {
            let poller = SequencePoller::new(
                name.clone(),
                origin.clone(),
                self.fetcher.clone(),
                self.ingress.clone(),
                self.settings.api.poll_interval(),
                self.settings.api.max_in_flight,
                self.metrics.clone(),
            );
            tasks.push(poller.spawn().into_inner());
        }
        // The pollers hold the only producers now
        drop(self.ingress);

        tasks.push(Server::new(self.settings.metrics_port, self.registry).run());

        tasks.push(tokio::spawn(
            async move {
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for ctrl-c")?;
                info!("Received ctrl-c");
                Ok(())
            }
            .instrument(info_span!("Signal handler")),
        ));

        let (result, index, remaining) = select_all(tasks).await;
        for task in remaining {
            task.abort();
        }
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(task = index, error = ?err, "Relayer task failed");
                Err(err)
            }
            Err(err) => {
                error!(task = index, error = ?err, "Relayer task panicked");
                Err(err.into())
            }
        }
    }
}
