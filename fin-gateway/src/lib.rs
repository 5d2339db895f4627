//! # FIN Gateway
//!
//! Runs the FIN engine as a service:
//! - In-memory store with one lock per message
//! - Draft editing, preview and lifecycle transitions
//! - Simulated network delivery with ACK / NACK reports
//! - Inbound ingestion, review and archiving
//! - Prometheus metrics and tracing setup

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod store;

pub use config::{GatewayConfig, LogFormat};
pub use error::{GatewayError, Result};
pub use metrics::GatewayMetrics;
pub use service::{DraftRequest, GatewayService};
pub use store::MessageStore;
