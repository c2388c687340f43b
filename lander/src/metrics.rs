use std::time::UNIX_EPOCH;

use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    IntCounterVec, IntGaugeVec, Registry,
};

use crate::FailureClass;

const METRICS_NAMESPACE: &str = "mrl_lander";

/// Prefix a metric name with the namespace.
fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

/// Metrics for the completion queue of one destination
#[derive(Clone, Debug)]
pub struct LanderMetrics {
    /// Metrics registry for adding new metrics and gathering reports
    registry: Registry,
    // timestamp of the last worker loop iteration
    pub task_liveness: IntGaugeVec,
    // enqueued transfers that are not resolved yet, including the one in flight
    pub queue_length: IntGaugeVec,
    /// Nonce the next submission will use
    pub next_nonce: IntGaugeVec,
    pub transaction_submissions: IntCounterVec,
    // with a label for how the transfer was resolved
    pub resolved_transfers: IntCounterVec,
    // with labels for the stage that failed and how the failure was classified
    pub submission_failures: IntCounterVec,
    pub nonce_resyncs: IntCounterVec,
}

impl LanderMetrics {
    pub fn new(registry: Registry) -> eyre::Result<Self> {
        let task_liveness = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("task_liveness"),
                "The liveness of the completion worker, expressed as a timestamp since the epoch",
            ),
            &["destination",],
            registry.clone()
        )?;
        let queue_length = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("queue_length"),
                "The number of transfers waiting for completion",
            ),
            &["destination",],
            registry.clone()
        )?;
        let next_nonce = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("next_nonce"),
                "The nonce the next completion transaction will use",
            ),
            &["destination", "signer",],
            registry.clone()
        )?;
        let transaction_submissions = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("transaction_submissions"),
                "The number of completion transactions broadcast",
            ),
            &["destination",],
            registry.clone()
        )?;
        let resolved_transfers = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("resolved_transfers"),
                "The number of transfers resolved, by resolution",
            ),
            &["destination", "status",],
            registry.clone()
        )?;
        let submission_failures = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("submission_failures"),
                "The number of failed completion attempts",
            ),
            &["destination", "stage", "class",],
            registry.clone()
        )?;
        let nonce_resyncs = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("nonce_resyncs"),
                "The number of times the nonce was reloaded from chain",
            ),
            &["destination",],
            registry.clone()
        )?;
        Ok(Self {
            registry,
            task_liveness,
            queue_length,
            next_nonce,
            transaction_submissions,
            resolved_transfers,
            submission_failures,
            nonce_resyncs,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn update_liveness_metric(&self, domain: &str) {
        self.task_liveness.with_label_values(&[domain]).set(
            UNIX_EPOCH
                .elapsed()
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
                .unwrap_or(0),
        );
    }

    pub fn update_next_nonce_metric(&self, nonce: u64, signer: &str, domain: &str) {
        self.next_nonce
            .with_label_values(&[domain, signer])
            .set(i64::try_from(nonce).unwrap_or(i64::MAX));
    }

    pub fn update_transaction_submissions_metric(&self, domain: &str) {
        self.transaction_submissions
            .with_label_values(&[domain])
            .inc();
    }

    pub fn update_submission_failures_metric(
        &self,
        stage: &str,
        class: FailureClass,
        domain: &str,
    ) {
        self.submission_failures
            .with_label_values(&[domain, stage, class.into()])
            .inc();
    }

    pub fn update_nonce_resyncs_metric(&self, domain: &str) {
        self.nonce_resyncs.with_label_values(&[domain]).inc();
    }

    pub(crate) fn transfer_enqueued(&self, domain: &str) {
        self.queue_length.with_label_values(&[domain]).inc();
    }

    pub(crate) fn transfer_resolved(&self, status: &str, domain: &str) {
        self.queue_length.with_label_values(&[domain]).dec();
        self.resolved_transfers
            .with_label_values(&[domain, status])
            .inc();
    }

    #[cfg(any(test, feature = "test-utils"))]
    #[allow(clippy::unwrap_used)]
    pub fn dummy_instance() -> Self {
        Self::new(Registry::new()).unwrap()
    }
}
