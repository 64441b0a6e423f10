//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose a Prometheus scrape endpoint at `general.metrics_bind`.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use deadwatch_core::config::GeneralConfig;
use deadwatch_core::metrics::{INGEST_DURATION_BUCKETS, LOG_PIPELINE_INGEST_DURATION_SECONDS};

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process. After calling this,
/// all `metrics::counter!()`, `metrics::gauge!()` and `metrics::histogram!()`
/// macros record to the Prometheus registry.
///
/// # Errors
///
/// - The bind address is invalid
/// - Socket binding fails
/// - A global recorder is already installed
pub fn install_metrics_recorder(config: &GeneralConfig) -> Result<()> {
    let addr: SocketAddr = config
        .metrics_bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{}': {}", config.metrics_bind, e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            bind = %addr,
            "metrics endpoint is exposed on all interfaces; restrict metrics_bind in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(LOG_PIPELINE_INGEST_DURATION_SECONDS.to_owned()),
            &INGEST_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("failed to configure histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    // Register metric descriptions
    deadwatch_core::metrics::describe_all();

    tracing::info!(bind = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
