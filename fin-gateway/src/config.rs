//! Gateway configuration

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Engine settings (originator, sequencing, validation, inbound)
    pub engine: fin_engine::Config,

    /// Operator name stamped on simulated network reports
    pub operator: String,

    /// Collect Prometheus metrics
    pub metrics_enabled: bool,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            engine: fin_engine::Config::default(),
            operator: "fin-gateway".to_string(),
            metrics_enabled: true,
            log_format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig =
            toml::from_str(&content).map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load from environment variables (`FIN_*` for the engine, `GATEWAY_*` here)
    pub fn from_env() -> Result<Self> {
        let mut config = GatewayConfig {
            engine: fin_engine::Config::from_env()?,
            ..GatewayConfig::default()
        };

        if let Ok(operator) = std::env::var("GATEWAY_OPERATOR") {
            config.operator = operator;
        }

        if let Ok(format) = std::env::var("GATEWAY_LOG_FORMAT") {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(GatewayError::Config(format!(
                        "GATEWAY_LOG_FORMAT must be 'text' or 'json', got '{}'",
                        other
                    )))
                }
            };
        }

        if let Ok(flag) = std::env::var("GATEWAY_METRICS_ENABLED") {
            config.metrics_enabled = flag
                .parse()
                .map_err(|e| GatewayError::Config(format!("GATEWAY_METRICS_ENABLED: {}", e)))?;
        }

        Ok(config)
    }
}
