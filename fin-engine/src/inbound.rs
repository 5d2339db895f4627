//! Inbound message records
//!
//! The raw payload is stored exactly as received and hashed once; everything
//! else on the record is derived from it by an [`InboundParser`] and may be
//! recomputed with [`IncomingMessage::reparse`].

use crate::error::LifecycleError;
use crate::parser::{InboundParser, ParseError, ParsedMessage};
use crate::types::{AuditEntry, MtType, TagValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

/// Inbound record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingStatus {
    /// Parsed without errors
    Parsed,
    /// Parsed with at least one error
    ParseError,
    /// Held for manual review
    UnderReview,
    /// Closed; no further changes
    Archived,
}

impl IncomingStatus {
    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomingStatus::Parsed => "PARSED",
            IncomingStatus::ParseError => "PARSE_ERROR",
            IncomingStatus::UnderReview => "UNDER_REVIEW",
            IncomingStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for IncomingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound message and what was decoded from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Record ID
    pub id: Uuid,
    /// Payload as received
    pub raw_payload: String,
    /// SHA-256 of the raw payload (lowercase hex)
    pub checksum_sha256: String,
    /// Record status
    pub status: IncomingStatus,
    /// MT type from block 2
    pub mt_type: Option<MtType>,
    /// Sending institution
    pub sender_bic: Option<String>,
    /// Receiving institution
    pub receiver_bic: Option<String>,
    /// `{121:}` from block 3
    pub uetr: Option<Uuid>,
    /// Transaction reference
    pub ref20: Option<String>,
    /// Related reference
    pub ref21: Option<String>,
    /// Block 4 fields as `:TAG:value` lines, or the raw payload when no field was found
    pub normalized_text: String,
    /// Block 4 fields in input order
    pub normalized_json: Vec<TagValue>,
    /// Parse problems
    pub parse_errors: Vec<ParseError>,
    /// Trailer CHK matched blocks 1-4
    pub checksum_verified: bool,
    /// Append-only audit trail
    pub audit_log: Vec<AuditEntry>,
    /// Arrival time
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Store and parse a raw payload. Never fails: problems end up in
    /// `parse_errors` and the `PARSE_ERROR` status.
    pub fn ingest(raw_payload: impl Into<String>, parser: &dyn InboundParser, actor_id: Option<i64>) -> Self {
        let raw_payload = raw_payload.into();
        let checksum_sha256 = hex::encode(Sha256::digest(raw_payload.as_bytes()));

        let mut message = Self {
            id: Uuid::now_v7(),
            raw_payload,
            checksum_sha256,
            status: IncomingStatus::Parsed,
            mt_type: None,
            sender_bic: None,
            receiver_bic: None,
            uetr: None,
            ref20: None,
            ref21: None,
            normalized_text: String::new(),
            normalized_json: Vec::new(),
            parse_errors: Vec::new(),
            checksum_verified: false,
            audit_log: Vec::new(),
            received_at: Utc::now(),
        };
        let parsed = parser.parse(&message.raw_payload);
        message.apply(parsed);
        if message.status == IncomingStatus::ParseError {
            warn!(id = %message.id, errors = message.parse_errors.len(), "Inbound message has parse errors");
        } else {
            info!(id = %message.id, mt_type = ?message.mt_type, "Inbound message parsed");
        }
        message.audit_log.push(AuditEntry::new(
            "ingested",
            actor_id,
            format!("{} tag(s), {} error(s)", message.normalized_json.len(), message.parse_errors.len()),
        ));
        message
    }

    /// Recompute every derived field from the stored payload.
    ///
    /// A record under review stays under review.
    pub fn reparse(&mut self, parser: &dyn InboundParser, actor_id: Option<i64>) -> Result<(), LifecycleError> {
        if self.status == IncomingStatus::Archived {
            return Err(LifecycleError::invalid(self.status, "reparse"));
        }
        let under_review = self.status == IncomingStatus::UnderReview;
        let parsed = parser.parse(&self.raw_payload);
        self.apply(parsed);
        if under_review {
            self.status = IncomingStatus::UnderReview;
        }
        self.audit_log.push(AuditEntry::new(
            "reparsed",
            actor_id,
            format!("{} tag(s), {} error(s)", self.normalized_json.len(), self.parse_errors.len()),
        ));
        info!(id = %self.id, status = %self.status, "Inbound message reparsed");
        Ok(())
    }

    /// Hold for manual review
    pub fn flag_for_review(&mut self, reason: &str, actor_id: Option<i64>) -> Result<(), LifecycleError> {
        if self.status == IncomingStatus::Archived {
            return Err(LifecycleError::invalid(self.status, "flag_for_review"));
        }
        self.status = IncomingStatus::UnderReview;
        self.audit_log.push(AuditEntry::new("flagged_for_review", actor_id, reason));
        Ok(())
    }

    /// Close the record
    pub fn archive(&mut self, actor_id: Option<i64>) -> Result<(), LifecycleError> {
        if self.status == IncomingStatus::Archived {
            return Err(LifecycleError::invalid(self.status, "archive"));
        }
        let from = self.status;
        self.status = IncomingStatus::Archived;
        self.audit_log
            .push(AuditEntry::new("archived", actor_id, format!("archived from {}", from)));
        Ok(())
    }

    fn apply(&mut self, parsed: ParsedMessage) {
        self.ref20 = parsed.reference();
        self.ref21 = parsed.related_reference();
        self.normalized_text = if parsed.tags.is_empty() {
            self.raw_payload.clone()
        } else {
            parsed.normalized_text()
        };
        self.status = if parsed.errors.is_empty() {
            IncomingStatus::Parsed
        } else {
            IncomingStatus::ParseError
        };
        self.mt_type = parsed.mt_type;
        self.sender_bic = parsed.sender_bic;
        self.receiver_bic = parsed.receiver_bic;
        self.uetr = parsed.uetr;
        self.normalized_json = parsed.tags;
        self.parse_errors = parsed.errors;
        self.checksum_verified = parsed.checksum_verified;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LineScanner, ParseErrorCode};

    const MT199: &str = "{1:F01COBADEFFAXXX0001000001}{2:I199SIMUGB2LXXXN}{4:\n:20:REF123456\n:79:Hello\nsecond line\n-}";

    #[test]
    fn test_ingest_parsed() {
        let message = IncomingMessage::ingest(MT199, &LineScanner::default(), Some(4));
        assert_eq!(message.raw_payload, MT199);
        assert_eq!(message.checksum_sha256.len(), 64);
        assert_eq!(message.ref20.as_deref(), Some("REF123456"));
        assert_eq!(message.mt_type, MtType::new(199));
        assert_eq!(message.normalized_json.len(), 2);
        assert_eq!(message.normalized_text, ":20:REF123456\n:79:Hello\nsecond line");
        assert_eq!(message.audit_log.len(), 1);
    }

    #[test]
    fn test_ingest_without_text_block_keeps_raw() {
        let raw = "just some text";
        let message = IncomingMessage::ingest(raw, &LineScanner::default(), None);
        assert_eq!(message.status, IncomingStatus::ParseError);
        assert!(message.normalized_json.is_empty());
        assert_eq!(message.normalized_text, raw);
        assert!(message
            .parse_errors
            .iter()
            .any(|e| e.code == ParseErrorCode::MissingTextBlock));
    }

    #[test]
    fn test_review_survives_reparse_and_archive_is_final() {
        let scanner = LineScanner::default();
        let mut message = IncomingMessage::ingest(MT199, &scanner, None);
        message.flag_for_review("sanctions hit", Some(2)).unwrap();
        message.reparse(&scanner, Some(2)).unwrap();
        assert_eq!(message.status, IncomingStatus::UnderReview);

        message.archive(Some(2)).unwrap();
        assert!(message.reparse(&scanner, Some(2)).is_err());
        assert!(message.flag_for_review("again", None).is_err());
        assert_eq!(message.raw_payload, MT199);
        assert_eq!(message.audit_log.len(), 4);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&IncomingStatus::UnderReview).unwrap();
        assert_eq!(json, "\"UNDER_REVIEW\"");
    }
}
