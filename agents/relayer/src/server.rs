use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use derive_new::new;
use eyre::{Context, Result};
use prometheus::Registry;
use tokio::task::JoinHandle;

/// Serves the relayer's metrics
#[derive(new, Debug)]
pub struct Server {
    listen_port: u16,
    registry: Registry,
}

impl Server {
    /// Run an HTTP server
    ///
    /// routes:
    ///  - metrics - serving OpenMetrics format reports on `/metrics`
    ///     (this is compatible with Prometheus, which ought to be configured to scrape this endpoint)
    pub fn run(self) -> JoinHandle<Result<()>> {
        let port = self.listen_port;
        tracing::info!(port, "starting server on 0.0.0.0");

        let registry = self.registry;
        let app = Router::new().route("/metrics", get(move || Self::gather_metrics(registry)));

        tokio::spawn(async move {
            let url = format!("0.0.0.0:{}", port);
            let listener = tokio::net::TcpListener::bind(&url)
                .await
                .with_context(|| format!("Failed to bind to {url}"))?;
            axum::serve(listener, app)
                .await
                .context("Metrics server stopped")
        })
    }

    /// Gather available metrics into an encoded (plaintext, OpenMetrics format)
    /// report.
    async fn gather_metrics(registry: Registry) -> impl IntoResponse {
        tracing::debug!("Traversing route for /metrics endpoint for serving Prometheus metrics");
        let mut out_buf = Vec::with_capacity(1024 * 64);
        let encoder = prometheus::TextEncoder::new();
        if prometheus::Encoder::encode(&encoder, &registry.gather(), &mut out_buf).is_err() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to gather metrics".to_string(),
            );
        }
        match String::from_utf8(out_buf) {
            Ok(metrics) => (StatusCode::OK, metrics),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        }
    }
}
