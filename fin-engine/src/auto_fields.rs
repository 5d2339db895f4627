//! Protocol-mandatory values that an operator never types
//!
//! - **Session / sequence**: one counter pair per sending logical terminal.
//!   The sequence runs 1..=999999; on wrap the session advances (1..=9999),
//!   so an assigned pair does not repeat within that space.
//! - **UETR**: random UUID v4, 36 characters.
//! - **CHK**: SHA-256 over blocks 1-4, first 6 bytes as 12 uppercase hex
//!   characters. A tamper-evidence trailer inside the simulation, nothing more.
//!
//! Any of these already present on the header is reused as-is, so
//! regenerating a message yields the same values.

use crate::config::SequencingConfig;
use crate::types::SwiftHeader;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Highest session number
pub const MAX_SESSION: u32 = 9_999;

/// Highest input sequence number
pub const MAX_SEQUENCE: u32 = 999_999;

/// Number of hex characters in a CHK value
pub const CHK_LENGTH: usize = 12;

/// Derived, read-only view of the machine-generated header values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFields {
    /// 12 character sender logical terminal address
    pub sender_lt: String,

    /// Block 1 application identifier
    pub application_id: char,

    /// Session number, absent on drafts that were never numbered
    pub session_number: Option<u32>,

    /// Input sequence number, absent on drafts that were never numbered
    pub sequence_number: Option<u32>,

    /// End-to-end reference carried in block 3
    pub uetr: Option<Uuid>,

    /// Message user reference (`{108:}`)
    pub mur: Option<String>,

    /// Straight-through-processing marker (`{119:STP}`)
    pub stp: bool,
}

/// Header values after reuse / generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNumbers {
    /// Session number
    pub session_number: Option<u32>,
    /// Sequence number
    pub sequence_number: Option<u32>,
    /// UETR
    pub uetr: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
struct SessionCounter {
    session: u32,
    next_sequence: u32,
}

impl SessionCounter {
    fn new(config: &SequencingConfig) -> Self {
        Self {
            session: config.initial_session.clamp(1, MAX_SESSION),
            next_sequence: config.initial_sequence.clamp(1, MAX_SEQUENCE),
        }
    }

    fn advance(&mut self) -> (u32, u32) {
        let assigned = (self.session, self.next_sequence);
        if self.next_sequence >= MAX_SEQUENCE {
            self.next_sequence = 1;
            self.session = if self.session >= MAX_SESSION { 1 } else { self.session + 1 };
        } else {
            self.next_sequence += 1;
        }
        assigned
    }
}

/// Generator for session/sequence numbers, UETRs and checksums
#[derive(Debug)]
pub struct AutoFieldGenerator {
    config: SequencingConfig,

    /// Counter per sender logical terminal address
    counters: Mutex<HashMap<String, SessionCounter>>,
}

impl AutoFieldGenerator {
    /// Create a generator
    pub fn new(config: SequencingConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Assign the next (session, sequence) pair for a logical terminal
    pub fn next_session_sequence(&self, logical_terminal: &str) -> (u32, u32) {
        let mut counters = self.counters.lock();
        counters
            .entry(logical_terminal.to_string())
            .or_insert_with(|| SessionCounter::new(&self.config))
            .advance()
    }

    /// Fresh UETR
    pub fn generate_uetr(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Resolve session, sequence and UETR for a message.
    ///
    /// Values on the header always win. Missing ones are generated only
    /// when `with_auto_fields` is set; a draft preview leaves them empty.
    pub fn resolve(&self, header: &SwiftHeader, sender_lt: &str, with_auto_fields: bool) -> ResolvedNumbers {
        if !with_auto_fields {
            return ResolvedNumbers {
                session_number: header.session_number,
                sequence_number: header.sequence_number,
                uetr: header.uetr,
            };
        }

        let (session_number, sequence_number) = match (header.session_number, header.sequence_number) {
            (Some(session), Some(sequence)) => (session, sequence),
            (session, sequence) => {
                let (next_session, next_sequence) = self.next_session_sequence(sender_lt);
                (session.unwrap_or(next_session), sequence.unwrap_or(next_sequence))
            }
        };

        ResolvedNumbers {
            session_number: Some(session_number),
            sequence_number: Some(sequence_number),
            uetr: Some(header.uetr.unwrap_or_else(|| self.generate_uetr())),
        }
    }
}

impl Default for AutoFieldGenerator {
    fn default() -> Self {
        Self::new(SequencingConfig::default())
    }
}

/// Compute the CHK trailer value over the bytes of blocks 1-4
pub fn compute_chk(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex::encode_upper(&digest[..CHK_LENGTH / 2])
}

/// Whether `value` has the CHK shape (12 uppercase hex characters)
pub fn is_chk_shaped(value: &str) -> bool {
    value.len() == CHK_LENGTH && value.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

/// 12 character logical terminal address: BIC8 + terminal code + branch
/// (`XXX` when the BIC has no branch)
pub fn logical_terminal_address(bic: &str, terminal: char) -> String {
    let bic8: String = bic.chars().take(8).collect();
    let branch: String = bic.chars().skip(8).take(3).collect();
    let branch = if branch.len() == 3 { branch } else { "XXX".to_string() };
    format!("{}{}{}", bic8, terminal, branch)
}

/// 11 character BIC address used in block 2
pub fn bic11(bic: &str) -> String {
    if bic.len() == 8 {
        format!("{}XXX", bic)
    } else {
        bic.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_increments_per_terminal() {
        let generator = AutoFieldGenerator::default();
        assert_eq!(generator.next_session_sequence("BANKDEFFAXXX"), (1, 1));
        assert_eq!(generator.next_session_sequence("BANKDEFFAXXX"), (1, 2));
        assert_eq!(generator.next_session_sequence("OTHRGB2LAXXX"), (1, 1));
    }

    #[test]
    fn test_sequence_wrap_advances_session() {
        let generator = AutoFieldGenerator::new(SequencingConfig {
            initial_session: 7,
            initial_sequence: MAX_SEQUENCE,
        });
        assert_eq!(generator.next_session_sequence("LT"), (7, MAX_SEQUENCE));
        assert_eq!(generator.next_session_sequence("LT"), (8, 1));
    }

    #[test]
    fn test_resolve_reuses_header_values() {
        let generator = AutoFieldGenerator::default();
        let uetr = Uuid::new_v4();
        let header = SwiftHeader {
            session_number: Some(12),
            sequence_number: Some(345),
            uetr: Some(uetr),
            ..SwiftHeader::to("COBADEFFXXX")
        };
        let resolved = generator.resolve(&header, "SIMUGB2LAXXX", true);
        assert_eq!(resolved.session_number, Some(12));
        assert_eq!(resolved.sequence_number, Some(345));
        assert_eq!(resolved.uetr, Some(uetr));
        // counter untouched
        assert_eq!(generator.next_session_sequence("SIMUGB2LAXXX"), (1, 1));
    }

    #[test]
    fn test_resolve_draft_generates_nothing() {
        let generator = AutoFieldGenerator::default();
        let resolved = generator.resolve(&SwiftHeader::to("COBADEFFXXX"), "SIMUGB2LAXXX", false);
        assert_eq!(resolved.session_number, None);
        assert_eq!(resolved.uetr, None);
    }

    #[test]
    fn test_uetr_shape() {
        let uetr = AutoFieldGenerator::default().generate_uetr().to_string();
        assert_eq!(uetr.len(), 36);
        assert_eq!(uetr.chars().nth(14), Some('4'));
    }

    #[test]
    fn test_chk_is_deterministic_and_fixed_width() {
        let a = compute_chk("{1:F01SIMUGB2LAXXX0001000001}");
        let b = compute_chk("{1:F01SIMUGB2LAXXX0001000001}");
        let c = compute_chk("{1:F01SIMUGB2LAXXX0001000002}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(is_chk_shaped(&a));
    }

    #[test]
    fn test_addresses() {
        assert_eq!(logical_terminal_address("COBADEFF", 'A'), "COBADEFFAXXX");
        assert_eq!(logical_terminal_address("COBADEFF123", 'B'), "COBADEFFB123");
        assert_eq!(bic11("COBADEFF"), "COBADEFFXXX");
        assert_eq!(bic11("COBADEFF123"), "COBADEFF123");
    }
}
