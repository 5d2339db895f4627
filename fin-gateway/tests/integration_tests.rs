//! Gateway integration tests: per-message serialization, delivery and inbound handling

use fin_engine::{mt::FreeFormat, IncomingStatus, LifecycleEvent, MessageStatus, MtPayload, SwiftHeader};
use fin_gateway::{DraftRequest, GatewayConfig, GatewayError, GatewayService};
use std::sync::Arc;
use uuid::Uuid;

fn draft(reference: &str, narrative: &str) -> DraftRequest {
    DraftRequest {
        transaction_reference_number: reference.to_string(),
        related_reference: None,
        swift_header: SwiftHeader::to("COBADEFFXXX"),
        payload: MtPayload::FreeFormat(FreeFormat {
            category: 1,
            narrative: narrative.to_string(),
        }),
    }
}

fn service() -> Arc<GatewayService> {
    Arc::new(GatewayService::new(&GatewayConfig::default()).unwrap())
}

async fn pending_approval(service: &GatewayService) -> Uuid {
    let id = service.create_draft(draft("REF123456", "Test message"), Some(1)).id;
    service.transition(id, LifecycleEvent::Validate, Some(1)).await.unwrap();
    service
        .transition(id, LifecycleEvent::SubmitForApproval, Some(1))
        .await
        .unwrap();
    id
}

async fn released(service: &GatewayService) -> Uuid {
    let id = pending_approval(service).await;
    service
        .transition(id, LifecycleEvent::Approve { approver_id: 5 }, Some(5))
        .await
        .unwrap();
    service
        .transition(id, LifecycleEvent::Approve { approver_id: 7 }, Some(7))
        .await
        .unwrap();
    service.transition(id, LifecycleEvent::Release, Some(1)).await.unwrap();
    id
}

#[tokio::test]
async fn test_concurrent_approvals_by_same_user() {
    let service = service();
    let id = pending_approval(&service).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .transition(id, LifecycleEvent::Approve { approver_id: 42 }, Some(42))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.code(), "FOUR_EYES_VIOLATION"),
        }
    }
    assert_eq!(accepted, 1);

    let message = service.get(id).await.unwrap();
    assert_eq!(message.message_status, MessageStatus::PendingApproval);
    assert_eq!(message.approved_by_1, Some(42));
    assert_eq!(message.approved_by_2, None);
}

#[tokio::test]
async fn test_concurrent_approve_and_cancel_serialize() {
    let service = service();
    let id = pending_approval(&service).await;
    service
        .transition(id, LifecycleEvent::Approve { approver_id: 5 }, Some(5))
        .await
        .unwrap();

    let approve = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .transition(id, LifecycleEvent::Approve { approver_id: 7 }, Some(7))
                .await
        })
    };
    let cancel = {
        let service = service.clone();
        tokio::spawn(async move { service.transition(id, LifecycleEvent::Cancel, Some(9)).await })
    };
    let approve = approve.await.unwrap();
    let cancel = cancel.await.unwrap();

    // whichever ran second saw the first one's result
    assert!(cancel.is_ok());
    let message = service.get(id).await.unwrap();
    assert_eq!(message.message_status, MessageStatus::Cancelled);
    match approve {
        Ok(_) => assert_eq!(message.approved_by_2, Some(7)),
        Err(e) => {
            assert_eq!(e.code(), "INVALID_TRANSITION");
            assert_eq!(message.approved_by_2, None);
        }
    }
    let last = message.audit_log.last().unwrap();
    assert_eq!(last.event, "cancel");
}

#[tokio::test]
async fn test_concurrent_release_happens_once() {
    let service = service();
    let id = pending_approval(&service).await;
    for approver in [5, 7] {
        service
            .transition(id, LifecycleEvent::Approve { approver_id: approver }, Some(approver))
            .await
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.transition(id, LifecycleEvent::Release, Some(1)).await })
        })
        .collect();
    let mut released = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            released += 1;
        }
    }
    assert_eq!(released, 1);

    let message = service.get(id).await.unwrap();
    assert_eq!(message.swift_header.sequence_number, Some(1));
    assert_eq!(message.audit_log.iter().filter(|e| e.event == "release").count(), 1);
}

#[tokio::test]
async fn test_update_draft_rules() {
    let service = service();
    let id = service.create_draft(draft("REF1", "First"), Some(1)).id;

    let updated = service.update_draft(id, draft("REF1", "Second"), Some(1)).await.unwrap();
    assert_eq!(updated.audit_log.len(), 2);
    let preview = service.preview(id).await.unwrap();
    assert!(preview.fin_message.contains(":79:Second"));
    assert!(preview.fin_message.starts_with("{1:F01SIMUGB2LAXXX0000000000}"));

    service.transition(id, LifecycleEvent::Validate, Some(1)).await.unwrap();
    let err = service.update_draft(id, draft("REF1", "Third"), Some(1)).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotEditable { .. }));

    let err = service.update_draft(Uuid::new_v4(), draft("REF1", "x"), None).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_deliver_and_complete() {
    let service = service();
    let id = released(&service).await;

    let message = service.deliver(id).await.unwrap();
    assert_eq!(message.message_status, MessageStatus::AckReceived);
    assert!(message.network_report.is_some());

    // a second delivery is not a legal move any more
    assert!(service.deliver(id).await.is_err());

    service.transition(id, LifecycleEvent::Complete, Some(1)).await.unwrap();
    let completed = service.list_messages(Some(MessageStatus::Completed)).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, id);

    let metrics = service.metrics().unwrap();
    assert_eq!(metrics.transitions_total.with_label_values(&["release"]).get(), 1);
    assert_eq!(metrics.transitions_total.with_label_values(&["ack"]).get(), 1);
    assert_eq!(metrics.assembled_total.get(), 1);
}

#[tokio::test]
async fn test_request_cancellation_stores_n92_draft() {
    let service = service();
    let id = released(&service).await;

    let request = service
        .request_cancellation(id, "CXL1".to_string(), Some("DUPLICATE".to_string()), Some(3))
        .await
        .unwrap();
    assert_eq!(request.mt_type.code(), 192);
    assert_eq!(request.related_reference.as_deref(), Some("REF123456"));

    let original = service.get(id).await.unwrap();
    assert!(original.cancellation_requested_flag);
    assert_eq!(original.message_status, MessageStatus::ReleasedToSwift);

    let err = service
        .request_cancellation(id, "CXL2".to_string(), None, Some(3))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
    assert_eq!(service.list_messages(None).await.len(), 2);
}

#[tokio::test]
async fn test_validation_failure_is_counted_and_flags_repair() {
    let service = service();
    let id = service
        .create_draft(draft("REF1", &"A".repeat(3501)), Some(1))
        .id;

    let err = service.transition(id, LifecycleEvent::Validate, Some(1)).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");
    let message = service.get(id).await.unwrap();
    assert!(message.repair_required_flag);
    assert_eq!(service.metrics().unwrap().validation_failures_total.get(), 1);
}

#[tokio::test]
async fn test_inbound_flow() {
    let service = service();
    let raw = "{1:F01COBADEFFAXXX0001000001}{2:I199SIMUGB2LXXXN}{4:\n:20:IN0001\n:79:Hello\n-}";
    let good = service.ingest(raw, Some(4));
    let bad = service.ingest("garbage", Some(4));
    assert_eq!(good.status, IncomingStatus::Parsed);
    assert_eq!(bad.status, IncomingStatus::ParseError);
    assert_eq!(bad.raw_payload, "garbage");

    service.flag_for_review(good.id, "manual check", Some(4)).await.unwrap();
    let reparsed = service.reparse(good.id, Some(4)).await.unwrap();
    assert_eq!(reparsed.status, IncomingStatus::UnderReview);

    service.archive(bad.id, Some(4)).await.unwrap();
    assert!(service.reparse(bad.id, Some(4)).await.is_err());

    assert_eq!(service.list_incoming(Some(IncomingStatus::Archived)).await.len(), 1);
    assert_eq!(service.list_incoming(None).await.len(), 2);
    let metrics = service.metrics().unwrap();
    assert_eq!(metrics.ingested_total.get(), 2);
    assert_eq!(metrics.parse_errors_total.get(), 1);

    let err = service.get_incoming(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}
