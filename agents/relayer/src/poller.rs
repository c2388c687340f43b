use std::sync::Arc;
use std::time::Duration;

use derive_new::new;
use eyre::{bail, Result};
use futures_util::future::{self, BoxFuture};
use futures_util::stream::{FuturesOrdered, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, info_span, instrument::Instrumented, warn, Instrument};

use mrl_core::TransferFetcher;
use mrl_lander::CompletionStatus;

use crate::ingress::{Delivery, IngressFilter};
use crate::metrics::RelayerMetrics;
use crate::settings::OriginConf;

/// How a polled sequence was finished with
#[derive(Debug)]
enum Acknowledgement {
    Ignored(&'static str),
    Resolved(CompletionStatus),
}

/// Polls the attestation API for consecutive sequences of one token bridge
/// emitter and delivers each signed VAA to the ingress filter.
///
/// Up to `max_in_flight` sequences may await completion at once. The
/// checkpoint only moves past a sequence once it and every sequence before it
/// are acknowledged, so a sequence that is never observed holds the poller
/// there.
#[derive(new)]
pub struct SequencePoller {
    origin: String,
    conf: OriginConf,
    fetcher: Arc<dyn TransferFetcher>,
    ingress: Arc<IngressFilter>,
    poll_interval: Duration,
    max_in_flight: usize,
    metrics: RelayerMetrics,
}

impl std::fmt::Debug for SequencePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencePoller")
            .field("origin", &self.origin)
            .field("conf", &self.conf)
            .finish()
    }
}

impl SequencePoller {
    pub fn spawn(self) -> Instrumented<JoinHandle<Result<()>>> {
        let span = info_span!(
            "SequencePoller",
            origin = %self.origin,
            chain = %self.conf.chain,
        );
        tokio::spawn(async move { self.run().await }.instrument(span.clone())).instrument(span)
    }

    async fn run(self) -> Result<()> {
        let mut next_sequence = self.conf.start_sequence;
        let mut checkpoint = next_sequence;
        let max_in_flight = self.max_in_flight.max(1);
        let mut in_flight: FuturesOrdered<BoxFuture<'static, (u64, Acknowledgement)>> =
            FuturesOrdered::new();
        self.metrics
            .update_checkpoint_metric(&self.origin, checkpoint);
        info!(start_sequence = next_sequence, "Starting poller");

        loop {
            while in_flight.len() < max_in_flight {
                let Some(delivery) = self.deliver_next(next_sequence).await? else {
                    break;
                };
                in_flight.push_back(acknowledgement(next_sequence, delivery));
                next_sequence = next_sequence.saturating_add(1);
                self.metrics
                    .update_next_sequence_metric(&self.origin, next_sequence);
            }

            if in_flight.is_empty() {
                sleep(self.poll_interval).await;
                continue;
            }

            tokio::select! {
                Some((sequence, ack)) = in_flight.next() => {
                    self.acknowledge(sequence, ack)?;
                    checkpoint = sequence.saturating_add(1);
                    self.metrics.update_checkpoint_metric(&self.origin, checkpoint);
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Fetch `sequence` and hand it to the ingress filter. `None` if it
    /// could not be fetched yet.
    async fn deliver_next(&self, sequence: u64) -> Result<Option<Delivery>> {
        let signed = match self
            .fetcher
            .fetch_signed_vaa(self.conf.chain, self.conf.emitter, sequence)
            .await
        {
            Ok(Some(signed)) => signed,
            Ok(None) => {
                debug!(sequence, "Sequence not observed yet");
                return Ok(None);
            }
            Err(err) => {
                warn!(sequence, error = ?err, "Failed to fetch attestation");
                return Ok(None);
            }
        };
        if signed.vaa.sequence != sequence {
            bail!(
                "Attestation API returned sequence {} for {}",
                signed.vaa.sequence,
                sequence
            );
        }
        Ok(Some(self.ingress.deliver(signed, None).await?))
    }

    fn acknowledge(&self, sequence: u64, ack: Acknowledgement) -> Result<()> {
        let result = match &ack {
            Acknowledgement::Ignored(reason) => *reason,
            Acknowledgement::Resolved(status) => status.label(),
        };
        self.metrics.update_deliveries_metric(&self.origin, result);
        match ack {
            Acknowledgement::Resolved(CompletionStatus::Abandoned) => {
                bail!("Completion of sequence {sequence} was abandoned")
            }
            Acknowledgement::Resolved(CompletionStatus::Failed(reason)) => {
                warn!(sequence, %reason, "Transfer could not be completed")
            }
            _ => debug!(sequence, result, "Sequence acknowledged"),
        }
        Ok(())
    }
}

fn acknowledgement(sequence: u64, delivery: Delivery) -> BoxFuture<'static, (u64, Acknowledgement)> {
    match delivery {
        Delivery::Ignored(reason) => {
            Box::pin(future::ready((sequence, Acknowledgement::Ignored(reason.label()))))
        }
        Delivery::Enqueued(handle) => Box::pin(async move {
            (sequence, Acknowledgement::Resolved(handle.await))
        }),
    }
}
