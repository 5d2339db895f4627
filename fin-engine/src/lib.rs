//! # FIN Engine
//!
//! Builds, validates and tracks SWIFT MT (FIN) messages:
//! - Field validation against the SWIFT X character set, BIC / IBAN / ISIN / currency rules
//! - Auto fields: session and sequence numbers, UETR, trailer CHK
//! - Block 1-5 assembly into the FIN wire format
//! - Lifecycle with four-eyes approval, release, ACK / NACK and repair
//! - Inbound parsing of raw FIN text
//!
//! ## Architecture
//!
//! ```text
//! MtMessage ──► LifecycleStateMachine ──► MessageAssembler ──► BlockBuilder
//!                                              │
//!                                              ├── FieldValidator (validation, mt)
//!                                              └── AutoFieldGenerator
//!
//! raw text ──► InboundParser ──► IncomingMessage
//! ```
//!
//! ## Wire format
//!
//! ```text
//! {1:F01<LT><SESSION><SEQUENCE>}{2:I<MT><RECEIVER><PRIORITY>}{3:{121:<UETR>}}{4:
//! :20:...
//! -}{5:{CHK:<12 HEX>}}
//! ```
//!
//! ## Safety
//!
//! - `#![forbid(unsafe_code)]`
//! - Released FIN text is frozen; re-release is rejected
//! - Validation reports every error in one pass

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    clippy::all
)]

pub mod assembler;
pub mod auto_fields;
pub mod blocks;
pub mod config;
pub mod error;
pub mod inbound;
pub mod lifecycle;
pub mod message;
pub mod mt;
pub mod network;
pub mod parser;
pub mod types;
pub mod validation;

pub use assembler::{AssembledMessage, AssemblyRequest, MessageAssembler};
pub use auto_fields::{AutoFieldGenerator, AutoFields};
pub use config::Config;
pub use error::{Error, LifecycleError, Result, ValidationFailure};
pub use inbound::{IncomingMessage, IncomingStatus};
pub use lifecycle::{LifecycleEvent, LifecycleStateMachine};
pub use message::MtMessage;
pub use mt::MtPayload;
pub use network::{Delivery, NetworkReport, SimulatedNetwork};
pub use parser::{InboundParser, LineScanner, ParsedMessage};
pub use types::*;
pub use validation::{ValidationCode, ValidationError, ValidationReport};

/// Block 1 application identifier for FIN
pub const APPLICATION_FIN: char = 'F';

/// Block 1 service identifier for FIN/GPA
pub const SERVICE_FIN: &str = "01";

/// Maximum length of a free-format narrative (:79:)
pub const NARRATIVE_MAX_LENGTH: usize = mt::NARRATIVE_MAX_LENGTH;
