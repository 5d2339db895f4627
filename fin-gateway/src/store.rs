//! In-memory message store
//!
//! Each record sits behind its own async mutex. Work on one message takes
//! that lock for the whole read-modify-write, so two transitions on the same
//! id never interleave; different messages never wait on each other.

use crate::error::{GatewayError, Result};
use dashmap::DashMap;
use fin_engine::{IncomingMessage, IncomingStatus, MessageStatus, MtMessage};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shared handle to one stored record
pub type Record<T> = Arc<Mutex<T>>;

/// Outbound and inbound messages keyed by id
#[derive(Debug, Default)]
pub struct MessageStore {
    outbound: DashMap<Uuid, Record<MtMessage>>,
    inbound: DashMap<Uuid, Record<IncomingMessage>>,
}

impl MessageStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an outbound message
    pub fn insert_outbound(&self, message: MtMessage) -> Record<MtMessage> {
        let id = message.id;
        let record = Arc::new(Mutex::new(message));
        self.outbound.insert(id, record.clone());
        record
    }

    /// Store an inbound message
    pub fn insert_inbound(&self, message: IncomingMessage) -> Record<IncomingMessage> {
        let id = message.id;
        let record = Arc::new(Mutex::new(message));
        self.inbound.insert(id, record.clone());
        record
    }

    /// Outbound record by id
    pub fn outbound(&self, id: Uuid) -> Result<Record<MtMessage>> {
        self.outbound
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(GatewayError::MessageNotFound(id))
    }

    /// Inbound record by id
    pub fn inbound(&self, id: Uuid) -> Result<Record<IncomingMessage>> {
        self.inbound
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(GatewayError::IncomingNotFound(id))
    }

    /// Snapshot of outbound messages, oldest first, optionally filtered by status
    pub async fn list_outbound(&self, status: Option<MessageStatus>) -> Vec<MtMessage> {
        let records: Vec<Record<MtMessage>> = self.outbound.iter().map(|entry| entry.value().clone()).collect();
        let mut messages = Vec::with_capacity(records.len());
        for record in records {
            let message = record.lock().await;
            if status.map_or(true, |s| message.message_status == s) {
                messages.push(message.clone());
            }
        }
        messages.sort_by_key(|m| m.id);
        messages
    }

    /// Snapshot of inbound messages, oldest first, optionally filtered by status
    pub async fn list_inbound(&self, status: Option<IncomingStatus>) -> Vec<IncomingMessage> {
        let records: Vec<Record<IncomingMessage>> = self.inbound.iter().map(|entry| entry.value().clone()).collect();
        let mut messages = Vec::with_capacity(records.len());
        for record in records {
            let message = record.lock().await;
            if status.map_or(true, |s| message.status == s) {
                messages.push(message.clone());
            }
        }
        messages.sort_by_key(|m| m.id);
        messages
    }

    /// Number of outbound messages
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Number of inbound messages
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }
}
