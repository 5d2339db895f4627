//! Simulated SWIFT network acknowledgement
//!
//! There is no real connectivity: delivery re-parses the released text,
//! checks its structure and trailer CHK, and answers with an ACK or NACK
//! report. PKI, access and release codes are placeholders.

use crate::error::LifecycleError;
use crate::lifecycle::LifecycleEvent;
use crate::message::MtMessage;
use crate::parser::{InboundParser, LineScanner};
use crate::types::MessageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// NACK code for a trailer that does not match the body
pub const CHK_MISMATCH: &str = "CHK_MISMATCH";

/// Network report attached to a released message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkReport {
    /// CHK seen by the network
    pub chk: String,
    /// Tracking reference (UETR)
    pub tracking: Option<Uuid>,
    /// Placeholder signature
    pub pki_signature: String,
    /// Placeholder access code
    pub access_code: String,
    /// Placeholder release code
    pub release_code: String,
    /// Message category name
    pub category: String,
    /// Report creation time
    pub creation_time: DateTime<Utc>,
    /// Application (`FIN`)
    pub application: String,
    /// Releasing operator
    pub operator: String,
    /// Human readable report
    pub raw_text: String,
}

/// Outcome of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted
    Ack(NetworkReport),
    /// Rejected with a reason code
    Nack {
        /// Reason code
        code: String,
        /// Report
        report: NetworkReport,
    },
}

impl Delivery {
    /// Lifecycle event recording this outcome
    pub fn into_event(self) -> LifecycleEvent {
        match self {
            Delivery::Ack(report) => LifecycleEvent::Ack { report: Some(report) },
            Delivery::Nack { code, report } => LifecycleEvent::Nack {
                code,
                report: Some(report),
            },
        }
    }

    /// Accepted by the network
    pub fn is_ack(&self) -> bool {
        matches!(self, Delivery::Ack(_))
    }
}

/// Stand-in for the network interface
pub struct SimulatedNetwork {
    parser: Box<dyn InboundParser>,
    operator: String,
}

impl std::fmt::Debug for SimulatedNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedNetwork")
            .field("operator", &self.operator)
            .finish()
    }
}

impl SimulatedNetwork {
    /// Network answering on behalf of `operator`
    pub fn new(operator: impl Into<String>) -> Self {
        Self::with_parser(operator, Box::new(LineScanner::default()))
    }

    /// Network using a custom parser
    pub fn with_parser(operator: impl Into<String>, parser: Box<dyn InboundParser>) -> Self {
        Self {
            parser,
            operator: operator.into(),
        }
    }

    /// Deliver a released message
    pub fn deliver(&self, message: &MtMessage) -> Result<Delivery, LifecycleError> {
        let fin = match (message.message_status, message.fin_message.as_deref()) {
            (MessageStatus::ReleasedToSwift, Some(fin)) => fin,
            _ => return Err(LifecycleError::invalid(message.message_status, "deliver")),
        };

        let parsed = self.parser.parse(fin);
        let chk = parsed
            .chk
            .clone()
            .or_else(|| message.swift_header.chk.clone())
            .unwrap_or_default();
        let tracking = parsed.uetr.or(message.swift_header.uetr);
        let rejection = match parsed.errors.first() {
            Some(error) => Some(error.code.as_str().to_string()),
            None if !parsed.checksum_verified => Some(CHK_MISMATCH.to_string()),
            None => None,
        };

        let status = if rejection.is_some() { "NACK" } else { "ACK" };
        let category = category_name(message.mt_type.category());
        let creation_time = Utc::now();
        let mut raw_text = format!(
            "Message Status: {}\nApplication: FIN\nMessage Type: {}\nReference: {}\nTracking: {}\nCHK: {}\nCategory: {}\nCreation Time: {}\nOperator: {}",
            status,
            message.mt_type,
            message.transaction_reference_number,
            tracking.map(|u| u.to_string()).unwrap_or_default(),
            chk,
            category,
            creation_time.format("%Y-%m-%d %H:%M:%S"),
            self.operator,
        );
        if let Some(code) = &rejection {
            raw_text.push_str(&format!("\nError Code: {}", code));
        }

        let placeholder = Uuid::new_v4().simple().to_string().to_uppercase();
        let report = NetworkReport {
            chk,
            tracking,
            pki_signature: "SIMULATED-NO-PKI".to_string(),
            access_code: placeholder[..8].to_string(),
            release_code: placeholder[8..16].to_string(),
            category: category.to_string(),
            creation_time,
            application: "FIN".to_string(),
            operator: self.operator.clone(),
            raw_text,
        };

        Ok(match rejection {
            Some(code) => {
                warn!(id = %message.id, code = %code, "Simulated network NACK");
                Delivery::Nack { code, report }
            }
            None => {
                info!(id = %message.id, "Simulated network ACK");
                Delivery::Ack(report)
            }
        })
    }
}

/// SWIFT category name for an MT category digit
pub fn category_name(category: u8) -> &'static str {
    match category {
        1 => "Customer Payments and Cheques",
        2 => "Financial Institution Transfers",
        3 => "Treasury Markets",
        4 => "Collections and Cash Letters",
        5 => "Securities Markets",
        6 => "Precious Metals and Syndications",
        7 => "Documentary Credits and Guarantees",
        8 => "Travellers Cheques",
        9 => "Cash Management and Customer Status",
        _ => "Unknown",
    }
}
