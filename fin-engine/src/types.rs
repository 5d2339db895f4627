//! Core types shared by the encoder, the lifecycle and the inbound parser

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Numeric MT message type (e.g. 103, 202, 199)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MtType(u16);

impl MtType {
    /// Single customer credit transfer
    pub const MT103: MtType = MtType(103);
    /// General financial institution transfer
    pub const MT202: MtType = MtType(202);
    /// Foreign exchange confirmation
    pub const MT300: MtType = MtType(300);
    /// Issue of a documentary credit
    pub const MT700: MtType = MtType(700);
    /// Receive free
    pub const MT540: MtType = MtType(540);
    /// Receive against payment
    pub const MT541: MtType = MtType(541);
    /// Deliver free
    pub const MT542: MtType = MtType(542);
    /// Deliver against payment
    pub const MT543: MtType = MtType(543);

    /// Create from a three digit code (100..=999)
    pub fn new(code: u16) -> Option<Self> {
        (100..=999).contains(&code).then_some(Self(code))
    }

    /// Build `n<suffix>` for a category digit, e.g. category 1 + 99 = MT199
    pub(crate) fn from_category(category: u8, suffix: u16) -> Self {
        Self(u16::from(category.clamp(1, 9)) * 100 + suffix)
    }

    /// Numeric code
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Message category (first digit)
    pub fn category(&self) -> u8 {
        (self.0 / 100) as u8
    }

    /// Last two digits, identifying the message within its category
    pub fn suffix(&self) -> u16 {
        self.0 % 100
    }

    /// Whether the engine models this type
    pub fn is_supported(&self) -> bool {
        matches!(self.0, 103 | 202 | 300 | 700 | 540..=543) || matches!(self.suffix(), 92 | 99)
    }
}

impl fmt::Display for MtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MT{:03}", self.0)
    }
}

impl FromStr for MtType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("MT")
            .or_else(|| trimmed.strip_prefix("mt"))
            .unwrap_or(trimmed);
        if digits.len() != 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid MT type: {}", s));
        }
        digits
            .parse::<u16>()
            .ok()
            .and_then(MtType::new)
            .ok_or_else(|| format!("invalid MT type: {}", s))
    }
}

impl TryFrom<String> for MtType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MtType> for String {
    fn from(mt: MtType) -> Self {
        mt.to_string()
    }
}

/// Block 2 priority flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessagePriority {
    /// Normal delivery
    #[default]
    #[serde(rename = "N")]
    Normal,
    /// Urgent delivery
    #[serde(rename = "U")]
    Urgent,
}

impl MessagePriority {
    /// Wire character
    pub fn as_char(&self) -> char {
        match self {
            MessagePriority::Normal => 'N',
            MessagePriority::Urgent => 'U',
        }
    }

    /// Parse the wire character
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(MessagePriority::Normal),
            'U' => Some(MessagePriority::Urgent),
            _ => None,
        }
    }
}

/// Header context of an outbound message.
///
/// The session number, sequence number, UETR and CHK are filled in at
/// release and never change afterwards. When an upstream replay supplies
/// them, the assembler reuses them as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwiftHeader {
    /// Sender BIC; falls back to the originator configuration when absent
    pub sender_bic: Option<String>,

    /// Receiver BIC (8 or 11 characters)
    pub receiver_bic: String,

    /// Logical terminal code (9th character of the sender address)
    pub logical_terminal: Option<char>,

    /// Priority flag
    pub message_priority: MessagePriority,

    /// Session number (4 digits on the wire)
    pub session_number: Option<u32>,

    /// Input sequence number (6 digits on the wire)
    pub sequence_number: Option<u32>,

    /// Unique end-to-end transaction reference
    pub uetr: Option<Uuid>,

    /// Trailer checksum
    pub chk: Option<String>,
}

impl SwiftHeader {
    /// Header addressed to `receiver_bic` with every other value defaulted
    pub fn to(receiver_bic: impl Into<String>) -> Self {
        Self {
            receiver_bic: receiver_bic.into(),
            ..Self::default()
        }
    }

    /// Set the priority flag
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.message_priority = priority;
        self
    }
}

/// Message status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Editable draft
    #[serde(rename = "Draft")]
    Draft,
    /// Passed field validation
    #[serde(rename = "Validated")]
    Validated,
    /// Waiting for two approvers
    #[serde(rename = "Pending Approval")]
    PendingApproval,
    /// Approved by two distinct approvers
    #[serde(rename = "Approved")]
    Approved,
    /// FIN text frozen and handed to the network
    #[serde(rename = "Released to SWIFT")]
    ReleasedToSwift,
    /// Network acknowledged
    #[serde(rename = "ACK Received")]
    AckReceived,
    /// Network rejected
    #[serde(rename = "NACK Received")]
    NackReceived,
    /// Cancelled before delivery
    #[serde(rename = "Cancelled")]
    Cancelled,
    /// Final state after acknowledgement
    #[serde(rename = "Completed")]
    Completed,
}

impl MessageStatus {
    /// Display string, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Draft => "Draft",
            MessageStatus::Validated => "Validated",
            MessageStatus::PendingApproval => "Pending Approval",
            MessageStatus::Approved => "Approved",
            MessageStatus::ReleasedToSwift => "Released to SWIFT",
            MessageStatus::AckReceived => "ACK Received",
            MessageStatus::NackReceived => "NACK Received",
            MessageStatus::Cancelled => "Cancelled",
            MessageStatus::Completed => "Completed",
        }
    }

    /// No further transitions possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Cancelled | MessageStatus::Completed)
    }

    /// The FIN text has been released and is immutable
    pub fn is_released(&self) -> bool {
        matches!(
            self,
            MessageStatus::ReleasedToSwift
                | MessageStatus::AckReceived
                | MessageStatus::NackReceived
                | MessageStatus::Completed
        )
    }

    /// All statuses, in lifecycle order
    pub fn all() -> [MessageStatus; 9] {
        [
            MessageStatus::Draft,
            MessageStatus::Validated,
            MessageStatus::PendingApproval,
            MessageStatus::Approved,
            MessageStatus::ReleasedToSwift,
            MessageStatus::AckReceived,
            MessageStatus::NackReceived,
            MessageStatus::Cancelled,
            MessageStatus::Completed,
        ]
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID (UUIDv7, time-ordered)
    pub id: Uuid,

    /// Event name (e.g. `release`, `validation_failed`)
    pub event: String,

    /// Acting user, if any
    pub actor_id: Option<i64>,

    /// When the event was recorded
    pub timestamp: DateTime<Utc>,

    /// Free-form details
    pub details: String,
}

impl AuditEntry {
    /// Create an entry stamped now
    pub fn new(event: impl Into<String>, actor_id: Option<i64>, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            event: event.into(),
            actor_id,
            timestamp: Utc::now(),
            details: details.into(),
        }
    }
}

/// One block-4 field: a tag and its value split into lines
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagValue {
    /// Tag without colons, e.g. `20`, `32A`
    pub tag: String,

    /// First line followed by continuation lines
    pub value_lines: Vec<String>,
}

impl TagValue {
    /// Split `value` on newline boundaries (CRLF or LF)
    pub fn new(tag: impl Into<String>, value: &str) -> Self {
        let value_lines = value
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self {
            tag: tag.into(),
            value_lines,
        }
    }

    /// Value with lines joined by `\n`
    pub fn value(&self) -> String {
        self.value_lines.join("\n")
    }

    /// Value lines after the first
    pub fn continuation_lines(&self) -> &[String] {
        self.value_lines.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}:{}", self.tag, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mt_type_parse_and_display() {
        let mt: MtType = "MT199".parse().unwrap();
        assert_eq!(mt.code(), 199);
        assert_eq!(mt.category(), 1);
        assert_eq!(mt.to_string(), "MT199");
        assert_eq!("103".parse::<MtType>().unwrap(), MtType::MT103);
        assert!("MT1".parse::<MtType>().is_err());
        assert!("MT099".parse::<MtType>().is_err());
    }

    #[test]
    fn test_supported_types() {
        assert!(MtType::MT103.is_supported());
        assert!(MtType::new(299).unwrap().is_supported());
        assert!(MtType::new(992).unwrap().is_supported());
        assert!(!MtType::new(101).unwrap().is_supported());
    }

    #[test]
    fn test_status_serializes_with_display_names() {
        let json = serde_json::to_string(&MessageStatus::ReleasedToSwift).unwrap();
        assert_eq!(json, "\"Released to SWIFT\"");
        let back: MessageStatus = serde_json::from_str("\"Pending Approval\"").unwrap();
        assert_eq!(back, MessageStatus::PendingApproval);
    }

    #[test]
    fn test_tag_value_splits_crlf() {
        let tv = TagValue::new("79", "line one\r\nline two");
        assert_eq!(tv.value_lines, vec!["line one", "line two"]);
        assert_eq!(tv.value(), "line one\nline two");
        assert_eq!(tv.continuation_lines(), &["line two".to_string()]);
    }
}
