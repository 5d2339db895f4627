//! Gateway service: drafts, lifecycle, simulated delivery and inbound handling

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::metrics::GatewayMetrics;
use crate::store::MessageStore;
use fin_engine::{
    lifecycle::target_status, AssembledMessage, AssemblyRequest, Delivery, IncomingMessage, IncomingStatus,
    LifecycleError, LifecycleEvent, LifecycleStateMachine, LineScanner, MessageAssembler, MessageStatus, MtMessage,
    MtPayload, SimulatedNetwork, SwiftHeader,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Content of a draft: references, header and typed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Field :20
    pub transaction_reference_number: String,

    /// Field :21
    #[serde(default)]
    pub related_reference: Option<String>,

    /// Header context
    pub swift_header: SwiftHeader,

    /// Typed payload
    pub payload: MtPayload,
}

impl DraftRequest {
    /// Assembly input for this content
    pub fn assembly_request(&self, with_auto_fields: bool) -> AssemblyRequest<'_> {
        AssemblyRequest {
            transaction_reference: &self.transaction_reference_number,
            related_reference: self.related_reference.as_deref(),
            payload: &self.payload,
            header: &self.swift_header,
            with_auto_fields,
        }
    }
}

/// Gateway service
#[derive(Debug)]
pub struct GatewayService {
    machine: LifecycleStateMachine,
    network: SimulatedNetwork,
    parser: LineScanner,
    store: MessageStore,
    metrics: Option<GatewayMetrics>,
}

impl GatewayService {
    /// Create a service with an empty store
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let assembler = Arc::new(MessageAssembler::new(&config.engine));
        let metrics = if config.metrics_enabled {
            Some(GatewayMetrics::new()?)
        } else {
            None
        };
        Ok(Self {
            machine: LifecycleStateMachine::new(assembler),
            network: SimulatedNetwork::new(config.operator.clone()),
            parser: LineScanner::new(config.engine.inbound.max_parse_bytes),
            store: MessageStore::new(),
            metrics,
        })
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&GatewayMetrics> {
        self.metrics.as_ref()
    }

    /// Underlying store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Assemble without storing anything
    pub fn assemble(&self, draft: &DraftRequest, with_auto_fields: bool) -> Result<AssembledMessage> {
        let result = self.machine.assembler().assemble(&draft.assembly_request(with_auto_fields));
        self.record_assembly(result.is_ok());
        Ok(result?)
    }

    /// Store a new draft
    pub fn create_draft(&self, draft: DraftRequest, actor_id: Option<i64>) -> MtMessage {
        let message = MtMessage::new(
            draft.transaction_reference_number,
            draft.related_reference,
            draft.swift_header,
            draft.payload,
            actor_id,
        );
        info!(id = %message.id, mt_type = %message.mt_type, "Draft created");
        self.store.insert_outbound(message.clone());
        message
    }

    /// Replace the content of an editable message
    pub async fn update_draft(&self, id: Uuid, draft: DraftRequest, actor_id: Option<i64>) -> Result<MtMessage> {
        let record = self.store.outbound(id)?;
        let mut message = record.lock().await;
        if !message.can_edit() {
            return Err(GatewayError::NotEditable {
                id,
                status: message.message_status.to_string(),
            });
        }
        message.update_content(
            draft.transaction_reference_number,
            draft.related_reference,
            draft.swift_header,
            draft.payload,
            actor_id,
        )?;
        Ok(message.clone())
    }

    /// FIN text as it would look now, without auto fields
    pub async fn preview(&self, id: Uuid) -> Result<AssembledMessage> {
        let record = self.store.outbound(id)?;
        let message = record.lock().await;
        let result = self.machine.assembler().assemble(&message.assembly_request(false));
        self.record_assembly(result.is_ok());
        Ok(result?)
    }

    /// Apply a lifecycle event
    pub async fn transition(&self, id: Uuid, event: LifecycleEvent, actor_id: Option<i64>) -> Result<MtMessage> {
        let record = self.store.outbound(id)?;
        let mut message = record.lock().await;
        self.apply(&mut message, event, actor_id)?;
        Ok(message.clone())
    }

    /// Flag a released message for cancellation and store the MTn92 draft
    /// asking the receiver to cancel it.
    ///
    /// Returns the new request draft.
    pub async fn request_cancellation(
        &self,
        id: Uuid,
        transaction_reference_number: String,
        reason: Option<String>,
        actor_id: Option<i64>,
    ) -> Result<MtMessage> {
        let record = self.store.outbound(id)?;
        let mut message = record.lock().await;

        let status = message.message_status;
        if target_status(status, &LifecycleEvent::Cancel) != Some(status) {
            return Err(LifecycleError::InvalidTransition {
                from: status.to_string(),
                event: "request_cancellation".to_string(),
            }
            .into());
        }
        let request = message.cancellation_request(transaction_reference_number, reason, actor_id)?;
        self.apply(&mut message, LifecycleEvent::Cancel, actor_id)?;

        info!(id = %id, request = %request.id, mt_type = %request.mt_type, "Cancellation request drafted");
        self.store.insert_outbound(request.clone());
        Ok(request)
    }

    /// Hand a released message to the simulated network and record the answer
    pub async fn deliver(&self, id: Uuid) -> Result<MtMessage> {
        let record = self.store.outbound(id)?;
        let mut message = record.lock().await;

        let delivery = self.network.deliver(&message)?;
        if let (Delivery::Nack { .. }, Some(metrics)) = (&delivery, &self.metrics) {
            metrics.record_nack();
        }
        self.apply(&mut message, delivery.into_event(), None)?;
        Ok(message.clone())
    }

    /// Snapshot of one outbound message
    pub async fn get(&self, id: Uuid) -> Result<MtMessage> {
        let record = self.store.outbound(id)?;
        let message = record.lock().await;
        Ok(message.clone())
    }

    /// Outbound messages, optionally filtered by status
    pub async fn list_messages(&self, status: Option<MessageStatus>) -> Vec<MtMessage> {
        self.store.list_outbound(status).await
    }

    /// Store and parse an inbound payload; never fails
    pub fn ingest(&self, raw_payload: impl Into<String>, actor_id: Option<i64>) -> IncomingMessage {
        let message = IncomingMessage::ingest(raw_payload, &self.parser, actor_id);
        if let Some(metrics) = &self.metrics {
            metrics.record_ingested(!message.parse_errors.is_empty());
        }
        self.store.insert_inbound(message.clone());
        message
    }

    /// Parse the stored payload again
    pub async fn reparse(&self, id: Uuid, actor_id: Option<i64>) -> Result<IncomingMessage> {
        let record = self.store.inbound(id)?;
        let mut message = record.lock().await;
        message.reparse(&self.parser, actor_id)?;
        Ok(message.clone())
    }

    /// Hold an inbound message for review
    pub async fn flag_for_review(&self, id: Uuid, reason: &str, actor_id: Option<i64>) -> Result<IncomingMessage> {
        let record = self.store.inbound(id)?;
        let mut message = record.lock().await;
        message.flag_for_review(reason, actor_id)?;
        Ok(message.clone())
    }

    /// Archive an inbound message
    pub async fn archive(&self, id: Uuid, actor_id: Option<i64>) -> Result<IncomingMessage> {
        let record = self.store.inbound(id)?;
        let mut message = record.lock().await;
        message.archive(actor_id)?;
        Ok(message.clone())
    }

    /// Snapshot of one inbound message
    pub async fn get_incoming(&self, id: Uuid) -> Result<IncomingMessage> {
        let record = self.store.inbound(id)?;
        let message = record.lock().await;
        Ok(message.clone())
    }

    /// Inbound messages, optionally filtered by status
    pub async fn list_incoming(&self, status: Option<IncomingStatus>) -> Vec<IncomingMessage> {
        self.store.list_inbound(status).await
    }

    fn apply(&self, message: &mut MtMessage, event: LifecycleEvent, actor_id: Option<i64>) -> Result<MessageStatus> {
        let name = event.name();
        let releasing = matches!(event, LifecycleEvent::Release);
        match self.machine.transition(message, event, actor_id) {
            Ok(status) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_transition(name);
                    if releasing {
                        metrics.record_assembled();
                    }
                }
                Ok(status)
            }
            Err(e) => {
                if let (LifecycleError::Validation(_), Some(metrics)) = (&e, &self.metrics) {
                    metrics.record_validation_failure();
                }
                warn!(id = %message.id, event = name, code = e.code(), "Transition rejected");
                Err(e.into())
            }
        }
    }

    fn record_assembly(&self, ok: bool) {
        if let Some(metrics) = &self.metrics {
            if ok {
                metrics.record_assembled();
            } else {
                metrics.record_validation_failure();
            }
        }
    }
}
