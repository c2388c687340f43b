use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use mrl_core::{SubmissionOutcome, TransferCompleter, TransferId, TransferRecord, H256};

use crate::{
    ErrorClassifier, FailureClass, LanderError, LanderMetrics, LanderSettings, NonceTracker,
};


/// How an enqueued transfer was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Our completion transaction was confirmed
    Completed(H256),
    /// The transfer had already been completed on the destination
    AlreadyCompleted,
    /// The transfer can never be completed
    Skipped(String),
    /// Gave up after unrecognized failures
    Failed(String),
    /// The worker stopped before resolving the transfer
    Abandoned,
}

impl CompletionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::AlreadyCompleted => "already_completed",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether the transfer ended up completed on the destination, by us or
    /// by someone else
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::AlreadyCompleted)
    }
}

/// Resolves once the enqueued transfer is terminally handled.
///
/// Dropping the handle does not cancel the transfer.
pub struct CompletionHandle {
    id: TransferId,
    rx: oneshot::Receiver<CompletionStatus>,
}

impl CompletionHandle {
    pub fn id(&self) -> TransferId {
        self.id
    }
}

impl Debug for CompletionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("id", &self.id)
            .finish()
    }
}

impl Future for CompletionHandle {
    type Output = CompletionStatus;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|status| status.unwrap_or(CompletionStatus::Abandoned))
    }
}

/// A transfer waiting in the queue, with its retry bookkeeping.
struct QueueEntry {
    record: TransferRecord,
    enqueued_at: Instant,
    attempts: u32,
    unknown_failures: u32,
    on_complete: oneshot::Sender<CompletionStatus>,
}

impl QueueEntry {
    fn resolve(self, status: CompletionStatus) {
        if self.on_complete.send(status).is_err() {
            debug!("Completion handle was dropped before the transfer resolved");
        }
    }
}

/// What the worker does with an entry after an attempt.
enum Resolution {
    Resolved(CompletionStatus),
    /// Put it back at the head of the queue and attempt it again.
    Retry,
}

/// Where in an attempt a failure happened
#[derive(Debug, Clone, Copy)]
enum Stage {
    DryRun,
    Submit,
    Confirmation,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::DryRun => "dry_run",
            Stage::Submit => "submit",
            Stage::Confirmation => "confirmation",
        }
    }
}

/// Producer side of the completion queue. Cheap to clone and safe to use from
/// any number of tasks; the order of `enqueue` calls is the order transfers
/// are attempted in.
#[derive(Clone)]
pub struct CompletionQueue {
    domain: String,
    tx: mpsc::UnboundedSender<QueueEntry>,
    metrics: LanderMetrics,
}

impl Debug for CompletionQueue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionQueue")
            .field("domain", &self.domain)
            .finish()
    }
}

impl CompletionQueue {
    /// Create the queue and the worker that drains it. The worker has to be
    /// run for anything to be submitted.
    pub fn new(
        domain: impl Into<String>,
        completer: Arc<dyn TransferCompleter>,
        nonces: NonceTracker,
        settings: LanderSettings,
        metrics: LanderMetrics,
    ) -> (Self, CompletionWorker) {
        let domain = domain.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let classifier = ErrorClassifier::with_rules(settings.failure_rules.clone());
        let signer = format!("{:?}", completer.account());
        metrics.update_next_nonce_metric(nonces.current(), &signer, &domain);
        let worker = CompletionWorker {
            domain: domain.clone(),
            signer,
            rx,
            pending: VecDeque::new(),
            nonces,
            completer,
            classifier,
            settings,
            metrics: metrics.clone(),
        };
        (
            Self {
                domain,
                tx,
                metrics,
            },
            worker,
        )
    }

    /// Append a transfer to the tail of the queue.
    ///
    /// Never blocks on submission. Fails only once the worker has stopped.
    pub fn enqueue(&self, record: TransferRecord) -> Result<CompletionHandle, LanderError> {
        let (on_complete, rx) = oneshot::channel();
        let id = record.id();
        record.span.in_scope(|| debug!("Transfer enqueued for completion"));
        let entry = QueueEntry {
            record,
            enqueued_at: Instant::now(),
            attempts: 0,
            unknown_failures: 0,
            on_complete,
        };
        self.tx
            .send(entry)
            .map_err(|_| LanderError::QueueClosed)?;
        self.metrics.transfer_enqueued(&self.domain);
        Ok(CompletionHandle { id, rx })
    }
}

/// Drains the completion queue one transfer at a time.
///
/// At most one completion transaction from the signing account is in flight
/// at any moment: the next entry is only taken once the previous one is
/// resolved or put back at the head of the queue.
pub struct CompletionWorker {
    domain: String,
    signer: String,
    rx: mpsc::UnboundedReceiver<QueueEntry>,
    /// Entries taken off the channel that have not been resolved yet. Retried
    /// entries go back to the front.
    pending: VecDeque<QueueEntry>,
    nonces: NonceTracker,
    completer: Arc<dyn TransferCompleter>,
    classifier: ErrorClassifier,
    settings: LanderSettings,
    metrics: LanderMetrics,
}

impl Debug for CompletionWorker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionWorker")
            .field("domain", &self.domain)
            .field("signer", &self.signer)
            .field("pending", &self.pending.len())
            .field("nonces", &self.nonces)
            .finish()
    }
}

impl CompletionWorker {
    pub fn spawn(mut self) -> JoinHandle<Result<(), LanderError>> {
        let span = info_span!("CompletionWorker", destination = %self.domain, signer = %self.signer);
        tokio::spawn(async move { self.run().await }.instrument(span))
    }

    /// Work the queue until every producer handle is dropped and all
    /// enqueued transfers are resolved.
    pub async fn run(&mut self) -> Result<(), LanderError> {
        info!(next_nonce = self.nonces.current(), "Starting completion worker");
        while let Some(entry) = self.next_entry().await {
            self.metrics.update_liveness_metric(&self.domain);
            self.process(entry).await;
        }
        info!("Completion queue closed, stopping worker");
        Ok(())
    }

    /// The nonce the next submission will use
    pub fn next_nonce(&self) -> u64 {
        self.nonces.current()
    }

    async fn next_entry(&mut self) -> Option<QueueEntry> {
        while let Ok(entry) = self.rx.try_recv() {
            self.pending.push_back(entry);
        }
        if let Some(entry) = self.pending.pop_front() {
            return Some(entry);
        }
        self.rx.recv().await
    }

    async fn process(&mut self, mut entry: QueueEntry) {
        let span = entry.record.span.clone();
        let resolution = self.attempt(&mut entry).instrument(span).await;
        match resolution {
            Resolution::Resolved(status) => {
                self.metrics.transfer_resolved(status.label(), &self.domain);
                entry.resolve(status);
            }
            Resolution::Retry => self.pending.push_front(entry),
        }
    }

    async fn attempt(&mut self, entry: &mut QueueEntry) -> Resolution {
        entry.attempts = entry.attempts.saturating_add(1);
        let nonce = self.nonces.current();
        debug!(
            nonce,
            attempt = entry.attempts,
            queued_for = ?entry.enqueued_at.elapsed(),
            "Simulating transfer completion"
        );

        if let Err(err) = self.completer.dry_run(&entry.record, nonce).await {
            let class = self.classifier.classify_error(&err);
            return self
                .on_failure(entry, Stage::DryRun, err.to_string(), class)
                .await;
        }

        info!(nonce, "Submitting transfer completion");
        let tx_hash = match self.completer.submit(&entry.record, nonce).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                let class = self.classifier.classify_error(&err);
                return self
                    .on_failure(entry, Stage::Submit, err.to_string(), class)
                    .await;
            }
        };
        self.metrics
            .update_transaction_submissions_metric(&self.domain);

        let confirmation_timeout = self.settings.confirmation_timeout();
        let outcome = match timeout(
            confirmation_timeout,
            self.completer.await_confirmation(tx_hash),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                let class = self.classifier.classify_error(&err);
                return self
                    .on_failure(entry, Stage::Confirmation, err.to_string(), class)
                    .await;
            }
            Err(_) => {
                let detail = format!(
                    "Transaction {tx_hash:?} not included within {confirmation_timeout:?}"
                );
                // The transaction may still be pending and holding this nonce
                self.resync_nonce().await;
                return self
                    .on_failure(
                        entry,
                        Stage::Confirmation,
                        detail,
                        FailureClass::RetryableUnknown,
                    )
                    .await;
            }
        };

        match outcome {
            SubmissionOutcome::Confirmed(tx_hash) => {
                let next_nonce = self.nonces.advance();
                self.metrics
                    .update_next_nonce_metric(next_nonce, &self.signer, &self.domain);
                info!(?tx_hash, nonce, next_nonce, "Transfer completed");
                Resolution::Resolved(CompletionStatus::Completed(tx_hash))
            }
            SubmissionOutcome::Rejected(detail) => {
                let class = self.classifier.classify(&detail);
                self.on_failure(entry, Stage::Confirmation, detail, class)
                    .await
            }
        }
    }

    async fn on_failure(
        &mut self,
        entry: &mut QueueEntry,
        stage: Stage,
        detail: String,
        class: FailureClass,
    ) -> Resolution {
        let stage = stage.as_str();
        self.metrics
            .update_submission_failures_metric(stage, class, &self.domain);
        match class {
            FailureClass::TerminalDuplicate => {
                info!(stage, "Transfer was already completed, skipping");
                Resolution::Resolved(CompletionStatus::AlreadyCompleted)
            }
            FailureClass::TerminalSkip => {
                error!(stage, error = %detail, "Transfer can not be completed, skipping");
                Resolution::Resolved(CompletionStatus::Skipped(detail))
            }
            FailureClass::RetryableStale => {
                warn!(
                    stage,
                    nonce = self.nonces.current(),
                    error = %detail,
                    "Nonce out of sync, reloading it before retrying the transfer"
                );
                self.resync_nonce().await;
                Resolution::Retry
            }
            FailureClass::RetryableUnknown
                if entry.unknown_failures < self.settings.max_unknown_retries =>
            {
                entry.unknown_failures = entry.unknown_failures.saturating_add(1);
                let delay = self.settings.backoff(entry.unknown_failures);
                warn!(
                    stage,
                    error = %detail,
                    retry = entry.unknown_failures,
                    max_retries = self.settings.max_unknown_retries,
                    ?delay,
                    "Unrecognized failure, retrying transfer"
                );
                sleep(delay).await;
                Resolution::Retry
            }
            FailureClass::RetryableUnknown => {
                error!(
                    stage,
                    error = %detail,
                    attempts = entry.attempts,
                    "Unrecognized failure, giving up on transfer"
                );
                Resolution::Resolved(CompletionStatus::Failed(detail))
            }
        }
    }

    /// Replace the local nonce with the chain's. On failure the local nonce
    /// is left alone and the caller's retry triggers another reload if it is
    /// still wrong.
    async fn resync_nonce(&mut self) {
        match self.completer.transaction_count().await {
            Ok(count) => {
                let previous = self.nonces.resync(count);
                self.metrics.update_nonce_resyncs_metric(&self.domain);
                self.metrics
                    .update_next_nonce_metric(count, &self.signer, &self.domain);
                info!(previous, current = count, "Reloaded nonce from chain");
            }
            Err(err) => {
                error!(error = ?err, "Failed to reload nonce from chain");
                sleep(self.settings.retry_delay()).await;
            }
        }
    }
}
