//! Message lifecycle
//!
//! ```text
//! Draft → Validated → Pending Approval → Approved → Released to SWIFT
//!                                                   ├→ ACK Received → Completed
//!                                                   └→ NACK Received
//! ```
//!
//! Legal moves are listed in [`target_status`]; anything else is
//! `INVALID_TRANSITION` and leaves the message untouched. Each successful
//! transition appends exactly one audit entry. Release is the only step that
//! assembles with auto fields and freezes the FIN text.

use crate::assembler::MessageAssembler;
use crate::error::LifecycleError;
use crate::message::{MtMessage, SupersededRelease};
use crate::network::NetworkReport;
use crate::types::{AuditEntry, MessageStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Run field validation
    Validate,
    /// Hand over for approval
    SubmitForApproval,
    /// Record one approval
    Approve {
        /// Approving user
        approver_id: i64,
    },
    /// Freeze the FIN text and release it
    Release,
    /// Network acknowledged
    Ack {
        /// Network report
        #[serde(default)]
        report: Option<NetworkReport>,
    },
    /// Network rejected
    Nack {
        /// Reason code
        code: String,
        /// Network report
        #[serde(default)]
        report: Option<NetworkReport>,
    },
    /// Close an acknowledged message
    Complete,
    /// Cancel, or request cancellation once released
    Cancel,
    /// Reopen a message flagged for repair as a draft
    Repair,
}

impl LifecycleEvent {
    /// Event name used in audit entries and errors
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Validate => "validate",
            LifecycleEvent::SubmitForApproval => "submit_for_approval",
            LifecycleEvent::Approve { .. } => "approve",
            LifecycleEvent::Release => "release",
            LifecycleEvent::Ack { .. } => "ack",
            LifecycleEvent::Nack { .. } => "nack",
            LifecycleEvent::Complete => "complete",
            LifecycleEvent::Cancel => "cancel",
            LifecycleEvent::Repair => "repair",
        }
    }
}

/// Two distinct, positive approver identifiers
pub fn require_four_eyes(approver_1: i64, approver_2: i64) -> bool {
    approver_1 > 0 && approver_2 > 0 && approver_1 != approver_2
}

/// Content may be edited: a draft, or a live message flagged for repair
pub fn can_edit(message: &MtMessage) -> bool {
    message.message_status == MessageStatus::Draft
        || (message.repair_required_flag && !message.message_status.is_terminal())
}

/// Transition table: the status `event` leads to from `from`, if legal.
///
/// Approve names the status reached once both approvals are in; a
/// cancellation request after release keeps the status.
pub fn target_status(from: MessageStatus, event: &LifecycleEvent) -> Option<MessageStatus> {
    use LifecycleEvent as E;
    use MessageStatus as S;

    match (from, event) {
        (S::Draft | S::Validated, E::Validate) => Some(S::Validated),
        (S::Validated, E::SubmitForApproval) => Some(S::PendingApproval),
        (S::PendingApproval, E::Approve { .. }) => Some(S::Approved),
        (S::Approved, E::Release) => Some(S::ReleasedToSwift),
        (S::ReleasedToSwift, E::Ack { .. }) => Some(S::AckReceived),
        (S::ReleasedToSwift, E::Nack { .. }) => Some(S::NackReceived),
        (S::AckReceived, E::Complete) => Some(S::Completed),
        (S::Draft | S::Validated | S::PendingApproval | S::Approved | S::NackReceived, E::Cancel) => {
            Some(S::Cancelled)
        }
        (S::ReleasedToSwift | S::AckReceived, E::Cancel) => Some(from),
        (S::Validated | S::PendingApproval | S::Approved | S::NackReceived, E::Repair) => Some(S::Draft),
        _ => None,
    }
}

/// Applies lifecycle events to messages
#[derive(Debug, Clone)]
pub struct LifecycleStateMachine {
    assembler: Arc<MessageAssembler>,
}

impl LifecycleStateMachine {
    /// Create a state machine using `assembler` for validation and release
    pub fn new(assembler: Arc<MessageAssembler>) -> Self {
        Self { assembler }
    }

    /// Assembler used for validation and release
    pub fn assembler(&self) -> &Arc<MessageAssembler> {
        &self.assembler
    }

    /// Apply `event` and return the resulting status.
    ///
    /// On error the message is unchanged, except that a failed validation or
    /// release sets the repair flag and records the failure in the audit log.
    pub fn transition(
        &self,
        message: &mut MtMessage,
        event: LifecycleEvent,
        actor_id: Option<i64>,
    ) -> Result<MessageStatus, LifecycleError> {
        let from = message.message_status;
        let Some(target) = target_status(from, &event) else {
            return Err(LifecycleError::invalid(from, event.name()));
        };
        let name = event.name();

        let (actor_id, details) = match event {
            LifecycleEvent::Validate => {
                let report = self.assembler.validate(&message.assembly_request(false));
                if report.has_errors() {
                    let failure = report.into_failure();
                    warn!(id = %message.id, errors = failure.errors.len(), "Validation failed; repair required");
                    message.repair_required_flag = true;
                    message
                        .audit_log
                        .push(AuditEntry::new("validation_failed", actor_id, failure.to_string()));
                    return Err(LifecycleError::Validation(failure));
                }
                message.repair_required_flag = false;
                (actor_id, format!("{} warning(s)", report.warnings.len()))
            }
            LifecycleEvent::SubmitForApproval => {
                if message.repair_required_flag {
                    return Err(LifecycleError::RepairRequired);
                }
                (actor_id, "submitted for approval".to_string())
            }
            LifecycleEvent::Approve { approver_id } => {
                return self.approve(message, approver_id);
            }
            LifecycleEvent::Release => {
                return self.release(message, actor_id);
            }
            LifecycleEvent::Ack { report } => {
                let details = self.attach_report(message, report)?;
                (actor_id, format!("acknowledged{}", details))
            }
            LifecycleEvent::Nack { code, report } => {
                let details = self.attach_report(message, report)?;
                message.repair_required_flag = true;
                (actor_id, format!("rejected with {}{}", code, details))
            }
            LifecycleEvent::Complete => (actor_id, "completed".to_string()),
            LifecycleEvent::Cancel if target == from => {
                if message.cancellation_requested_flag {
                    return Err(LifecycleError::invalid(from, name));
                }
                message.cancellation_requested_flag = true;
                message.audit_log.push(AuditEntry::new(
                    "cancellation_requested",
                    actor_id,
                    format!("cancellation requested in status {}", from),
                ));
                info!(id = %message.id, status = %from, "Cancellation requested after release");
                return Ok(from);
            }
            LifecycleEvent::Cancel => (actor_id, format!("cancelled from {}", from)),
            LifecycleEvent::Repair => {
                if !message.repair_required_flag {
                    return Err(LifecycleError::invalid(from, name));
                }
                self.reopen(message);
                (actor_id, format!("reopened from {}", from))
            }
        };

        message.message_status = target;
        message.audit_log.push(AuditEntry::new(name, actor_id, details));
        info!(id = %message.id, from = %from, to = %target, event = name, "Lifecycle transition");
        Ok(target)
    }

    fn approve(&self, message: &mut MtMessage, approver_id: i64) -> Result<MessageStatus, LifecycleError> {
        if approver_id <= 0 {
            return Err(LifecycleError::FourEyesViolation(format!(
                "approver id {} must be positive",
                approver_id
            )));
        }

        match message.approved_by_1 {
            None => {
                message.approved_by_1 = Some(approver_id);
                message
                    .audit_log
                    .push(AuditEntry::new("approve", Some(approver_id), "first approval recorded"));
                info!(id = %message.id, approver = approver_id, "First approval recorded");
                Ok(message.message_status)
            }
            Some(first) if require_four_eyes(first, approver_id) => {
                message.approved_by_2 = Some(approver_id);
                message.message_status = MessageStatus::Approved;
                message
                    .audit_log
                    .push(AuditEntry::new("approve", Some(approver_id), "second approval recorded"));
                info!(id = %message.id, first, second = approver_id, "Message approved");
                Ok(MessageStatus::Approved)
            }
            Some(first) => Err(LifecycleError::FourEyesViolation(format!(
                "approver {} already approved this message",
                first
            ))),
        }
    }

    fn release(&self, message: &mut MtMessage, actor_id: Option<i64>) -> Result<MessageStatus, LifecycleError> {
        match (message.approved_by_1, message.approved_by_2) {
            (Some(a), Some(b)) if require_four_eyes(a, b) => {}
            _ => {
                return Err(LifecycleError::FourEyesViolation(
                    "release needs two distinct approvers".to_string(),
                ))
            }
        }

        let assembled = match self.assembler.assemble(&message.assembly_request(true)) {
            Ok(assembled) => assembled,
            Err(failure) => {
                warn!(id = %message.id, errors = failure.errors.len(), "Release assembly failed; repair required");
                message.repair_required_flag = true;
                message
                    .audit_log
                    .push(AuditEntry::new("release_failed", actor_id, failure.to_string()));
                return Err(LifecycleError::Validation(failure));
            }
        };

        let header = &mut message.swift_header;
        header.session_number = assembled.auto_fields.session_number;
        header.sequence_number = assembled.auto_fields.sequence_number;
        header.uetr = assembled.auto_fields.uetr;
        header.chk = Some(assembled.chk.clone());

        message.fin_message = Some(assembled.fin_message);
        message.released_at = Some(Utc::now());
        message.message_status = MessageStatus::ReleasedToSwift;
        message.audit_log.push(AuditEntry::new(
            "release",
            actor_id,
            format!(
                "released session {:?} sequence {:?} CHK {}",
                assembled.auto_fields.session_number, assembled.auto_fields.sequence_number, assembled.chk
            ),
        ));
        info!(
            id = %message.id,
            uetr = ?assembled.auto_fields.uetr,
            chk = %assembled.chk,
            "Message released to SWIFT"
        );
        Ok(MessageStatus::ReleasedToSwift)
    }

    fn attach_report(&self, message: &mut MtMessage, report: Option<NetworkReport>) -> Result<String, LifecycleError> {
        match report {
            Some(_) if message.network_report.is_some() => Err(LifecycleError::ReportAlreadyAttached),
            Some(report) => {
                let details = format!(" (report CHK {})", report.chk);
                message.network_report = Some(report);
                Ok(details)
            }
            None => Ok(String::new()),
        }
    }

    /// Move a rejected release aside and clear approvals
    fn reopen(&self, message: &mut MtMessage) {
        if let Some(fin_message) = message.fin_message.take() {
            message.superseded_releases.push(SupersededRelease {
                fin_message,
                network_report: message.network_report.take(),
                superseded_at: Utc::now(),
            });
            message.swift_header.session_number = None;
            message.swift_header.sequence_number = None;
            message.swift_header.chk = None;
            message.released_at = None;
        }
        message.approved_by_1 = None;
        message.approved_by_2 = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mt::{FreeFormat, MtPayload};
    use crate::types::SwiftHeader;

    fn machine() -> LifecycleStateMachine {
        LifecycleStateMachine::new(Arc::new(MessageAssembler::new(&Config::default())))
    }

    fn draft(narrative: &str) -> MtMessage {
        MtMessage::new(
            "REF123456",
            None,
            SwiftHeader::to("COBADEFFXXX"),
            MtPayload::FreeFormat(FreeFormat {
                category: 1,
                narrative: narrative.to_string(),
            }),
            Some(1),
        )
    }

    fn approved(machine: &LifecycleStateMachine) -> MtMessage {
        let mut message = draft("Test message");
        machine.transition(&mut message, LifecycleEvent::Validate, Some(1)).unwrap();
        machine.transition(&mut message, LifecycleEvent::SubmitForApproval, Some(1)).unwrap();
        machine.transition(&mut message, LifecycleEvent::Approve { approver_id: 5 }, None).unwrap();
        machine.transition(&mut message, LifecycleEvent::Approve { approver_id: 7 }, None).unwrap();
        message
    }

    #[test]
    fn test_four_eyes_rule() {
        assert!(!require_four_eyes(5, 5));
        assert!(require_four_eyes(5, 7));
        assert!(!require_four_eyes(0, 7));
        assert!(!require_four_eyes(-1, 7));
    }

    #[test]
    fn test_release_from_draft_is_invalid() {
        let machine = machine();
        let mut message = draft("Test message");
        let err = machine.transition(&mut message, LifecycleEvent::Release, Some(1)).unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(message.message_status, MessageStatus::Draft);
        assert_eq!(message.audit_log.len(), 1);
        assert!(message.fin_message.is_none());
    }

    #[test]
    fn test_validation_failure_flags_repair() {
        let machine = machine();
        let mut message = draft(&"A".repeat(3501));
        let err = machine.transition(&mut message, LifecycleEvent::Validate, Some(1)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert_eq!(message.message_status, MessageStatus::Draft);
        assert!(message.repair_required_flag);
        assert_eq!(message.last_event().map(|e| e.event.as_str()), Some("validation_failed"));
        assert!(can_edit(&message));
    }

    #[test]
    fn test_same_approver_twice() {
        let machine = machine();
        let mut message = draft("Test message");
        machine.transition(&mut message, LifecycleEvent::Validate, None).unwrap();
        machine.transition(&mut message, LifecycleEvent::SubmitForApproval, None).unwrap();
        assert_eq!(
            machine.transition(&mut message, LifecycleEvent::Approve { approver_id: 5 }, None),
            Ok(MessageStatus::PendingApproval)
        );
        let err = machine
            .transition(&mut message, LifecycleEvent::Approve { approver_id: 5 }, None)
            .unwrap_err();
        assert_eq!(err.code(), "FOUR_EYES_VIOLATION");
        assert_eq!(message.message_status, MessageStatus::PendingApproval);
        assert_eq!(message.approved_by_2, None);

        let err = machine
            .transition(&mut message, LifecycleEvent::Approve { approver_id: 0 }, None)
            .unwrap_err();
        assert_eq!(err.code(), "FOUR_EYES_VIOLATION");
    }

    #[test]
    fn test_release_freezes_header_and_rejects_retry() {
        let machine = machine();
        let mut message = approved(&machine);
        assert_eq!(message.message_status, MessageStatus::Approved);
        machine.transition(&mut message, LifecycleEvent::Release, Some(9)).unwrap();

        assert_eq!(message.message_status, MessageStatus::ReleasedToSwift);
        assert!(message.swift_header.uetr.is_some());
        assert_eq!(message.swift_header.session_number, Some(1));
        let fin = message.fin_message.clone().unwrap();
        assert!(fin.contains(message.swift_header.chk.as_deref().unwrap()));

        let err = machine.transition(&mut message, LifecycleEvent::Release, Some(9)).unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(message.fin_message.as_deref(), Some(fin.as_str()));
    }

    #[test]
    fn test_cancel_after_release_is_a_request() {
        let machine = machine();
        let mut message = approved(&machine);
        machine.transition(&mut message, LifecycleEvent::Release, None).unwrap();
        assert_eq!(
            machine.transition(&mut message, LifecycleEvent::Cancel, Some(3)),
            Ok(MessageStatus::ReleasedToSwift)
        );
        assert!(message.cancellation_requested_flag);
        assert!(machine.transition(&mut message, LifecycleEvent::Cancel, Some(3)).is_err());
    }

    #[test]
    fn test_nack_repair_cycle() {
        let machine = machine();
        let mut message = approved(&machine);
        machine.transition(&mut message, LifecycleEvent::Release, None).unwrap();
        let uetr = message.swift_header.uetr;
        machine
            .transition(
                &mut message,
                LifecycleEvent::Nack {
                    code: "T27".to_string(),
                    report: None,
                },
                None,
            )
            .unwrap();
        assert!(message.repair_required_flag);
        assert!(can_edit(&message));

        machine.transition(&mut message, LifecycleEvent::Repair, Some(1)).unwrap();
        assert_eq!(message.message_status, MessageStatus::Draft);
        assert_eq!(message.superseded_releases.len(), 1);
        assert_eq!(message.swift_header.session_number, None);
        assert_eq!(message.swift_header.uetr, uetr);
        assert_eq!(message.approved_by_1, None);

        machine.transition(&mut message, LifecycleEvent::Validate, Some(1)).unwrap();
        assert!(!message.repair_required_flag);
    }

    #[test]
    fn test_transition_table_rejects_terminal_states() {
        for event in [LifecycleEvent::Validate, LifecycleEvent::Cancel, LifecycleEvent::Release] {
            assert_eq!(target_status(MessageStatus::Completed, &event), None);
            assert_eq!(target_status(MessageStatus::Cancelled, &event), None);
        }
    }
}
