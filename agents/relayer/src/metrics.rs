use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    IntCounterVec, IntGaugeVec, Registry,
};

const METRICS_NAMESPACE: &str = "mrl_relayer";

fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

/// Metrics of the attestation pollers
#[derive(Clone, Debug)]
pub struct RelayerMetrics {
    /// Every sequence below this one has been handled, per origin
    pub checkpoint: IntGaugeVec,
    /// Next sequence to fetch, per origin
    pub next_sequence: IntGaugeVec,
    // with a label for how the attestation was handled
    pub deliveries: IntCounterVec,
}

impl RelayerMetrics {
    pub fn new(registry: &Registry) -> eyre::Result<Self> {
        let checkpoint = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("checkpoint"),
                "The lowest sequence per origin that has not been fully handled",
            ),
            &["origin",],
            registry.clone()
        )?;
        let next_sequence = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("next_sequence"),
                "The next sequence per origin to fetch from the attestation API",
            ),
            &["origin",],
            registry.clone()
        )?;
        let deliveries = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("deliveries"),
                "The number of attestations handled, by result",
            ),
            &["origin", "result",],
            registry.clone()
        )?;
        Ok(Self {
            checkpoint,
            next_sequence,
            deliveries,
        })
    }

    pub fn update_checkpoint_metric(&self, origin: &str, checkpoint: u64) {
        self.checkpoint
            .with_label_values(&[origin])
            .set(checkpoint as i64);
    }

    pub fn update_next_sequence_metric(&self, origin: &str, sequence: u64) {
        self.next_sequence
            .with_label_values(&[origin])
            .set(sequence as i64);
    }

    pub fn update_deliveries_metric(&self, origin: &str, result: &str) {
        self.deliveries.with_label_values(&[origin, result]).inc();
    }

    #[cfg(test)]
    pub fn dummy_instance() -> Self {
        Self::new(&Registry::new()).unwrap()
    }
}
