//! Outbound message envelope

use crate::assembler::AssemblyRequest;
use crate::error::LifecycleError;
use crate::mt::{CancellationRequest, MtPayload};
use crate::network::NetworkReport;
use crate::types::{AuditEntry, MessageStatus, MtType, SwiftHeader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A release cycle replaced by repair, kept for the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupersededRelease {
    /// The FIN text as released
    pub fin_message: String,
    /// Network report of that release, if one was attached
    pub network_report: Option<NetworkReport>,
    /// When the release was superseded
    pub superseded_at: DateTime<Utc>,
}

/// Outbound MT message and its lifecycle state.
///
/// Fields are public for reading and serialization; status, approvals,
/// flags and the released text are changed only through
/// [`LifecycleStateMachine`](crate::lifecycle::LifecycleStateMachine) and
/// [`MtMessage::update_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtMessage {
    /// Record ID (UUIDv7)
    pub id: Uuid,

    /// MT type, derived from the payload
    pub mt_type: MtType,

    /// Field :20
    pub transaction_reference_number: String,

    /// Field :21
    pub related_reference: Option<String>,

    /// Lifecycle status
    pub message_status: MessageStatus,

    /// Header context; numbers, UETR and CHK frozen at release
    pub swift_header: SwiftHeader,

    /// Typed payload
    pub payload: MtPayload,

    /// Released FIN text
    pub fin_message: Option<String>,

    /// Append-only audit trail
    pub audit_log: Vec<AuditEntry>,

    /// Simulated network acknowledgement
    pub network_report: Option<NetworkReport>,

    /// Set by a failed validation or release, or a NACK
    pub repair_required_flag: bool,

    /// Cancellation requested after release
    pub cancellation_requested_flag: bool,

    /// First approver
    pub approved_by_1: Option<i64>,

    /// Second approver
    pub approved_by_2: Option<i64>,

    /// Earlier releases replaced by repair
    pub superseded_releases: Vec<SupersededRelease>,

    /// When the FIN text was frozen
    pub released_at: Option<DateTime<Utc>>,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl MtMessage {
    /// New draft
    pub fn new(
        transaction_reference_number: impl Into<String>,
        related_reference: Option<String>,
        swift_header: SwiftHeader,
        payload: MtPayload,
        actor_id: Option<i64>,
    ) -> Self {
        let mt_type = payload.mt_type();
        Self {
            id: Uuid::now_v7(),
            mt_type,
            transaction_reference_number: transaction_reference_number.into(),
            related_reference,
            message_status: MessageStatus::Draft,
            swift_header,
            payload,
            fin_message: None,
            audit_log: vec![AuditEntry::new("created", actor_id, format!("{} draft created", mt_type))],
            network_report: None,
            repair_required_flag: false,
            cancellation_requested_flag: false,
            approved_by_1: None,
            approved_by_2: None,
            superseded_releases: Vec::new(),
            released_at: None,
            created_at: Utc::now(),
        }
    }

    /// Assembly input for this message
    pub fn assembly_request(&self, with_auto_fields: bool) -> AssemblyRequest<'_> {
        AssemblyRequest {
            transaction_reference: &self.transaction_reference_number,
            related_reference: self.related_reference.as_deref(),
            payload: &self.payload,
            header: &self.swift_header,
            with_auto_fields,
        }
    }

    /// Content may be changed
    pub fn can_edit(&self) -> bool {
        crate::lifecycle::can_edit(self)
    }

    /// Replace references, header and payload of an editable message.
    ///
    /// Session, sequence and UETR already assigned are kept; the CHK is
    /// dropped because the body changes.
    pub fn update_content(
        &mut self,
        transaction_reference_number: impl Into<String>,
        related_reference: Option<String>,
        mut swift_header: SwiftHeader,
        payload: MtPayload,
        actor_id: Option<i64>,
    ) -> Result<(), LifecycleError> {
        if !self.can_edit() {
            return Err(LifecycleError::invalid(self.message_status, "update"));
        }
        swift_header.session_number = self.swift_header.session_number;
        swift_header.sequence_number = self.swift_header.sequence_number;
        swift_header.uetr = self.swift_header.uetr;
        swift_header.chk = None;

        self.transaction_reference_number = transaction_reference_number.into();
        self.related_reference = related_reference;
        self.mt_type = payload.mt_type();
        self.swift_header = swift_header;
        self.payload = payload;
        self.audit_log.push(AuditEntry::new("updated", actor_id, "content edited"));
        Ok(())
    }

    /// Draft MTn92 asking the receiver to cancel this released message
    pub fn cancellation_request(
        &self,
        transaction_reference_number: impl Into<String>,
        reason: Option<String>,
        actor_id: Option<i64>,
    ) -> Result<MtMessage, LifecycleError> {
        let released_at = match (self.message_status.is_released(), self.released_at) {
            (true, Some(at)) if self.message_status != MessageStatus::Completed => at,
            _ => return Err(LifecycleError::invalid(self.message_status, "request_cancellation")),
        };
        let header = SwiftHeader {
            sender_bic: self.swift_header.sender_bic.clone(),
            logical_terminal: self.swift_header.logical_terminal,
            ..SwiftHeader::to(self.swift_header.receiver_bic.clone())
        };
        let payload = MtPayload::CancellationRequest(CancellationRequest {
            category: self.mt_type.category(),
            original_mt: self.mt_type,
            original_date: released_at.date_naive(),
            narrative: reason,
        });
        Ok(MtMessage::new(
            transaction_reference_number,
            Some(self.transaction_reference_number.clone()),
            header,
            payload,
            actor_id,
        ))
    }

    /// Last audit entry
    pub fn last_event(&self) -> Option<&AuditEntry> {
        self.audit_log.last()
    }
}
