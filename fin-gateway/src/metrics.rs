//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `fin_messages_assembled_total` - FIN texts assembled (previews and releases)
//! - `fin_lifecycle_transitions_total{event}` - Successful lifecycle transitions
//! - `fin_validation_failures_total` - Assemblies or transitions rejected by validation
//! - `fin_inbound_ingested_total` - Inbound payloads stored
//! - `fin_inbound_parse_errors_total` - Inbound payloads stored with parse errors
//! - `fin_network_nacks_total` - Simulated network rejections

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector; every instance owns its registry
#[derive(Clone)]
pub struct GatewayMetrics {
    /// FIN texts assembled
    pub assembled_total: IntCounter,

    /// Transitions by event name
    pub transitions_total: IntCounterVec,

    /// Validation failures
    pub validation_failures_total: IntCounter,

    /// Inbound payloads stored
    pub ingested_total: IntCounter,

    /// Inbound payloads with parse errors
    pub parse_errors_total: IntCounter,

    /// Simulated network rejections
    pub nacks_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics")
            .field("assembled_total", &self.assembled_total.get())
            .field("ingested_total", &self.ingested_total.get())
            .finish_non_exhaustive()
    }
}

impl GatewayMetrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let assembled_total = IntCounter::new("fin_messages_assembled_total", "FIN texts assembled")?;
        registry.register(Box::new(assembled_total.clone()))?;

        let transitions_total = IntCounterVec::new(
            Opts::new("fin_lifecycle_transitions_total", "Successful lifecycle transitions"),
            &["event"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        let validation_failures_total = IntCounter::new(
            "fin_validation_failures_total",
            "Assemblies or transitions rejected by validation",
        )?;
        registry.register(Box::new(validation_failures_total.clone()))?;

        let ingested_total = IntCounter::new("fin_inbound_ingested_total", "Inbound payloads stored")?;
        registry.register(Box::new(ingested_total.clone()))?;

        let parse_errors_total = IntCounter::new(
            "fin_inbound_parse_errors_total",
            "Inbound payloads stored with parse errors",
        )?;
        registry.register(Box::new(parse_errors_total.clone()))?;

        let nacks_total = IntCounter::new("fin_network_nacks_total", "Simulated network rejections")?;
        registry.register(Box::new(nacks_total.clone()))?;

        Ok(Self {
            assembled_total,
            transitions_total,
            validation_failures_total,
            ingested_total,
            parse_errors_total,
            nacks_total,
            registry,
        })
    }

    /// Record an assembled FIN text
    pub fn record_assembled(&self) {
        self.assembled_total.inc();
    }

    /// Record a successful transition
    pub fn record_transition(&self, event: &str) {
        self.transitions_total.with_label_values(&[event]).inc();
    }

    /// Record a validation failure
    pub fn record_validation_failure(&self) {
        self.validation_failures_total.inc();
    }

    /// Record an ingested payload
    pub fn record_ingested(&self, had_errors: bool) {
        self.ingested_total.inc();
        if had_errors {
            self.parse_errors_total.inc();
        }
    }

    /// Record a network rejection
    pub fn record_nack(&self) {
        self.nacks_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
