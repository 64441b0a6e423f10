//! Daemon orchestrator.
//!
//! Owns the pipeline lifecycle: builds the enabled pipelines from the
//! loaded configuration, wires them to a shared event channel, starts
//! them, and coordinates graceful shutdown on SIGTERM/SIGINT. Events
//! flowing out of the pipelines are consumed by a logger task; daemon
//! level gauges (uptime, build info, tracked servers) are kept fresh by
//! a background updater.

use std::time::{Duration, Instant};

use anyhow::Context;
use deadwatch_core::config::DeadwatchConfig;
use deadwatch_core::event::ServerEvent;
use deadwatch_core::metrics as metric_names;
use deadwatch_core::pipeline::Pipeline;
use deadwatch_killfeed::{KillfeedPipeline, KillfeedPipelineBuilder, KillfeedPipelineConfig};
use deadwatch_log_pipeline::{IngestConfig, LogIngestPipeline, LogIngestPipelineBuilder};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::sink::{NotificationSink, TracingSink};
use crate::source::LocalFileSource;
use crate::store::JsonStateStore;

/// Interval between daemon uptime gauge refreshes.
const UPTIME_REFRESH: Duration = Duration::from_secs(10);

type LogPipeline = LogIngestPipeline<LocalFileSource, JsonStateStore>;
type Killfeed = KillfeedPipeline<LocalFileSource, JsonStateStore>;

/// Supervises the ingest pipelines and background tasks.
pub struct Orchestrator {
    config: DeadwatchConfig,
    log_pipeline: Option<LogPipeline>,
    killfeed: Option<Killfeed>,
    event_rx: Option<mpsc::Receiver<ServerEvent>>,
    shutdown_tx: broadcast::Sender<()>,
    start_time: Instant,
    background_tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Load configuration from a TOML file and build an orchestrator.
    pub async fn build(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let config = DeadwatchConfig::load(path)
            .await
            .context("failed to load config")?;
        Self::build_from_config(config)
    }

    /// Access the loaded configuration.
    pub fn config(&self) -> &DeadwatchConfig {
        &self.config
    }

    /// Build an orchestrator from a validated configuration.
    ///
    /// Pipelines disabled in the configuration are not constructed.
    /// Returns an error when every pipeline is disabled, since the
    /// daemon would have nothing to do.
    pub fn build_from_config(config: DeadwatchConfig) -> anyhow::Result<Self> {
        let ingest_config = IngestConfig::from_core(&config.log_pipeline);
        let killfeed_config = KillfeedPipelineConfig::from_core(&config.killfeed);

        if !ingest_config.enabled && !killfeed_config.enabled {
            anyhow::bail!("both pipelines are disabled; nothing to run");
        }

        let endpoints = config.endpoints();
        let source = LocalFileSource::new(&config.source);
        let store = JsonStateStore::new(&config.general.data_dir);

        // Both pipelines share a single event channel
        let capacity = ingest_config
            .event_channel_capacity
            .max(killfeed_config.event_channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let log_pipeline = if ingest_config.enabled {
            let (pipeline, _) = LogIngestPipelineBuilder::new(source.clone(), store.clone())
                .config(ingest_config)
                .servers(endpoints.clone())
                .event_sender(event_tx.clone())
                .build()
                .context("failed to build log pipeline")?;
            Some(pipeline)
        } else {
            tracing::info!("log pipeline disabled by configuration");
            None
        };

        let killfeed = if killfeed_config.enabled {
            let (pipeline, _) = KillfeedPipelineBuilder::new(source, store)
                .config(killfeed_config)
                .servers(endpoints)
                .event_sender(event_tx)
                .build()
                .context("failed to build killfeed pipeline")?;
            Some(pipeline)
        } else {
            tracing::info!("killfeed pipeline disabled by configuration");
            None
        };

        let (shutdown_tx, _) = broadcast::channel(4);

        Ok(Self {
            config,
            log_pipeline,
            killfeed,
            event_rx: Some(event_rx),
            shutdown_tx,
            start_time: Instant::now(),
            background_tasks: Vec::new(),
        })
    }

    /// Start everything and block until a shutdown signal arrives.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.record_daemon_metrics();
        self.start_pipelines().await?;

        if let Some(event_rx) = self.event_rx.take() {
            self.background_tasks.push(spawn_event_consumer(
                event_rx,
                self.shutdown_tx.subscribe(),
                TracingSink,
            ));
        }
        self.background_tasks.push(spawn_uptime_updater(
            self.start_time,
            self.shutdown_tx.subscribe(),
        ));

        tracing::info!(
            servers = self.config.servers.len(),
            log_pipeline = self.log_pipeline.is_some(),
            killfeed = self.killfeed.is_some(),
            "daemon started"
        );

        wait_for_shutdown_signal().await?;
        self.shutdown().await;
        Ok(())
    }

    /// Start the enabled pipelines.
    pub async fn start_pipelines(&mut self) -> anyhow::Result<()> {
        if let Some(pipeline) = &mut self.log_pipeline {
            pipeline
                .start()
                .await
                .context("failed to start log pipeline")?;
        }
        if let Some(pipeline) = &mut self.killfeed {
            pipeline
                .start()
                .await
                .context("failed to start killfeed pipeline")?;
        }
        Ok(())
    }

    /// Stop pipelines and background tasks in order.
    pub async fn shutdown(&mut self) {
        tracing::info!("shutting down");
        // Notify background tasks first so they exit before join
        let _ = self.shutdown_tx.send(());

        if let Some(pipeline) = &mut self.log_pipeline {
            if let Err(err) = pipeline.stop().await {
                tracing::error!(error = %err, "log pipeline stop failed");
            }
        }
        if let Some(pipeline) = &mut self.killfeed {
            if let Err(err) = pipeline.stop().await {
                tracing::error!(error = %err, "killfeed pipeline stop failed");
            }
        }

        for task in self.background_tasks.drain(..) {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "background task join failed");
            }
        }

        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "daemon stopped"
        );
    }

    /// Current health across all running pipelines.
    pub async fn health(&self) -> DaemonHealth {
        let mut modules = Vec::new();
        if let Some(pipeline) = &self.log_pipeline {
            modules.push(ModuleHealth {
                name: pipeline.name().to_owned(),
                status: pipeline.health_check().await,
            });
        }
        if let Some(pipeline) = &self.killfeed {
            modules.push(ModuleHealth {
                name: pipeline.name().to_owned(),
                status: pipeline.health_check().await,
            });
        }
        DaemonHealth {
            status: aggregate_status(&modules),
            modules,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn record_daemon_metrics(&self) {
        metrics::gauge!(
            metric_names::DAEMON_BUILD_INFO,
            "version" => env!("CARGO_PKG_VERSION"),
        )
        .set(1.0);
        metrics::gauge!(metric_names::DAEMON_SERVERS_TRACKED)
            .set(self.config.servers.len() as f64);
    }
}

/// Forward pipeline events to the configured sink.
///
/// Notification delivery (Discord and the like) hangs off the same
/// channel in deployments that enable it; the default sink only records
/// what happened.
fn spawn_event_consumer<N>(
    mut event_rx: mpsc::Receiver<ServerEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
    sink: N,
) -> JoinHandle<()>
where
    N: NotificationSink + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => sink.deliver(&event).await,
                        None => break,
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        // Drain anything still queued before exiting
        while let Ok(event) = event_rx.try_recv() {
            sink.deliver(&event).await;
        }
        tracing::debug!("event consumer stopped");
    })
}

/// Keep the uptime gauge fresh until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_REFRESH);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    metrics::gauge!(metric_names::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    })
}

/// Wait for SIGTERM or SIGINT.
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for SIGINT")?;
            tracing::info!("received SIGINT");
        }
    }
    Ok(())
}
