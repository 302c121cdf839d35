//! Telemetry primitives shared across the Cellarr workspace.
//!
//! This crate centralises logging and metrics so the pipeline services can
//! adopt a consistent observability story: a `tracing` subscriber driven by
//! `RUST_LOG`, and a Prometheus registry wrapped in a cloneable handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Options controlling the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Fallback filter directive, e.g. `info` or `cellarr_import=debug`.
    pub level: &'a str,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            json: false,
        }
    }
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));

    if config.json {
        fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    } else {
        fmt()
            .with_env_filter(env_filter)
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    }

    Ok(())
}

/// Prometheus-backed metrics registry shared across pipeline services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    import_decisions_total: IntCounterVec,
    sample_detections_total: IntCounterVec,
    transfer_operations_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total approved import decisions observed.
    pub imports_approved_total: u64,
    /// Total rejected import decisions observed.
    pub imports_rejected_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let import_decisions_total = IntCounterVec::new(
            Opts::new(
                "import_decisions_total",
                "Import decisions produced by result",
            ),
            &["result"],
        )?;
        let sample_detections_total = IntCounterVec::new(
            Opts::new(
                "sample_detections_total",
                "Sample classifier verdicts by kind",
            ),
            &["verdict"],
        )?;
        let transfer_operations_total = IntCounterVec::new(
            Opts::new(
                "transfer_operations_total",
                "Disk transfer operations by method and status",
            ),
            &["method", "status"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )?;

        registry
            .register(Box::new(import_decisions_total.clone()))
            .context("failed to register import decision counter")?;
        registry
            .register(Box::new(sample_detections_total.clone()))
            .context("failed to register sample detection counter")?;
        registry
            .register(Box::new(transfer_operations_total.clone()))
            .context("failed to register transfer operation counter")?;
        registry
            .register(Box::new(events_emitted_total.clone()))
            .context("failed to register event counter")?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                import_decisions_total,
                sample_detections_total,
                transfer_operations_total,
                events_emitted_total,
            }),
        })
    }

    /// Record one import decision by result (`approved` or `rejected`).
    pub fn inc_import_decision(&self, result: &str) {
        self.inner
            .import_decisions_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record one classifier verdict (`sample`, `trailer`, `content`).
    pub fn inc_sample_detection(&self, verdict: &str) {
        self.inner
            .sample_detections_total
            .with_label_values(&[verdict])
            .inc();
    }

    /// Record one disk transfer by achieved method and final status.
    pub fn inc_transfer_operation(&self, method: &str, status: &str) {
        self.inner
            .transfer_operations_total
            .with_label_values(&[method, status])
            .inc();
    }

    /// Record one emitted domain event by type.
    pub fn inc_event(&self, kind: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Summarise the counters most useful for health endpoints.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            imports_approved_total: self
                .inner
                .import_decisions_total
                .with_label_values(&["approved"])
                .get(),
            imports_rejected_total: self
                .inner
                .import_decisions_total
                .with_label_values(&["rejected"])
                .get(),
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode metrics")?;
        String::from_utf8(buffer).context("metrics exposition was not valid UTF-8")
    }
}
