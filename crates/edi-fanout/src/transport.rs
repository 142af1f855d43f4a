//! Inbound messages, outbound units and the outbound transport collaborator

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::partition::PartitionKey;

/// A message received from the inbound session-enabled queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub body: Vec<u8>,
    pub session_id: Option<String>,
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            session_id: None,
            message_id: None,
        }
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Session id, unless absent or blank
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// One serialized shipment ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundUnit {
    pub partition_key: PartitionKey,
    pub shipment_id: String,
    /// Position among the interchange's shipments
    pub index: usize,
    pub agreement_name: String,
    /// XML encoded load tender
    pub payload: String,
}

/// Transport error
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unit rejected: {0}")]
    Rejected(String),

    #[error("transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers outbound units to partitioned, ordered storage
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn send(&self, unit: OutboundUnit) -> Result<(), TransportError>;

    /// Transport name for logging
    fn name(&self) -> &'static str {
        "transport"
    }
}

/// Transport that records units in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutboundUnit>>,
    fail_after: Option<usize>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `count` units, then reject every further one
    #[must_use]
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Reject all further units
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Units accepted so far, in send order
    pub fn units(&self) -> Vec<OutboundUnit> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accepted units grouped by partition, each group in send order
    pub fn by_partition(&self) -> BTreeMap<PartitionKey, Vec<OutboundUnit>> {
        let mut partitions: BTreeMap<PartitionKey, Vec<OutboundUnit>> = BTreeMap::new();
        for unit in self.units() {
            partitions.entry(unit.partition_key.clone()).or_default().push(unit);
        }
        partitions
    }

    /// Remove and return every accepted unit
    pub fn drain(&self) -> Vec<OutboundUnit> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl OutboundTransport for MemoryTransport {
    async fn send(&self, unit: OutboundUnit) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(TransportError::Rejected(format!(
                "capacity of {} unit(s) reached",
                sent.len()
            )));
        }
        trace!(partition = %unit.partition_key, bytes = unit.payload.len(), "unit accepted");
        sent.push(unit);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(session: &str, shipment: &str, index: usize) -> OutboundUnit {
        OutboundUnit {
            partition_key: PartitionKey::new(session, shipment),
            shipment_id: shipment.to_string(),
            index,
            agreement_name: "ACME-WIDGETCO-001".to_string(),
            payload: format!("<TS204>{shipment}</TS204>"),
        }
    }

    #[test]
    fn test_blank_session_is_absent() {
        assert_eq!(InboundMessage::new("x").session_id(), None);
        assert_eq!(InboundMessage::new("x").with_session_id("  ").session_id(), None);
        assert_eq!(
            InboundMessage::new("x").with_session_id("sess-42").session_id(),
            Some("sess-42")
        );
    }

    #[tokio::test]
    async fn test_groups_by_partition() {
        let transport = MemoryTransport::new();
        transport.send(unit("s1", "A", 0)).await.unwrap();
        transport.send(unit("s1", "B", 1)).await.unwrap();
        transport.send(unit("s2", "A", 0)).await.unwrap();
        transport.send(unit("s1", "A", 0)).await.unwrap();

        let partitions = transport.by_partition();
        assert_eq!(partitions.len(), 3);
        assert_eq!(partitions[&PartitionKey::new("s1", "A")].len(), 2);
        assert_eq!(transport.drain().len(), 4);
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_fail_after_and_close() {
        let transport = MemoryTransport::new().fail_after(1);
        transport.send(unit("s", "A", 0)).await.unwrap();
        assert!(matches!(
            transport.send(unit("s", "B", 1)).await,
            Err(TransportError::Rejected(_))
        ));

        let closed = MemoryTransport::new();
        closed.close();
        assert!(matches!(
            closed.send(unit("s", "A", 0)).await,
            Err(TransportError::Closed)
        ));
        assert_eq!(transport.len(), 1);
    }
}
