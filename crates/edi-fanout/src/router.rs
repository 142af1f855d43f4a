//! Interchange-to-session fan-out
//!
//! [`FanOutRouter::route`] turns one parsed interchange into one
//! [`OutboundUnit`] per 204 load tender. [`FanOutRouter::process`] is the
//! whole invocation: validate the inbound message, read the X12 payload,
//! route it and hand the units to the transport in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use edi_adapter_x12::{X12Parser, XmlEncoder};
use edi_ir::Interchange;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::AgreementCache;
use crate::decompose::decompose;
use crate::locator::ShipmentIdLocator;
use crate::partition::PartitionKey;
use crate::transport::{InboundMessage, OutboundTransport, OutboundUnit};
use crate::{Error, Result};

/// Counters shared by all invocations of one router
#[derive(Debug, Default)]
pub struct RouterStats {
    routed: AtomicU64,
    failed: AtomicU64,
    units_built: AtomicU64,
    units_emitted: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStatsSnapshot {
    /// Interchanges turned into units
    pub routed: u64,
    /// Invocations that ended with an error
    pub failed: u64,
    pub units_built: u64,
    /// Units accepted by a transport
    pub units_emitted: u64,
}

impl RouterStats {
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            routed: self.routed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            units_built: self.units_built.load(Ordering::Relaxed),
            units_emitted: self.units_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of one successful [`FanOutRouter::process`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    pub session_id: String,
    pub message_id: Option<String>,
    pub units: Vec<OutboundUnit>,
}

/// Fans interchanges out to per-shipment partitions
pub struct FanOutRouter {
    cache: Arc<AgreementCache>,
    locator: Arc<ShipmentIdLocator>,
    parser: X12Parser,
    encoder: XmlEncoder,
    stats: RouterStats,
}

impl FanOutRouter {
    pub fn new(cache: Arc<AgreementCache>, locator: Arc<ShipmentIdLocator>) -> Self {
        Self {
            cache,
            locator,
            parser: X12Parser::new(),
            encoder: XmlEncoder::new(),
            stats: RouterStats::default(),
        }
    }

    /// Use a reader with partner schema overlays
    #[must_use]
    pub fn with_parser(mut self, parser: X12Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn cache(&self) -> &Arc<AgreementCache> {
        &self.cache
    }

    pub fn locator(&self) -> &Arc<ShipmentIdLocator> {
        &self.locator
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Build one unit per shipment, in interchange order.
    ///
    /// Fails before touching the directory when the session id is blank.
    /// No unit is returned unless every shipment could be built.
    pub async fn route(
        &self,
        interchange: &Interchange,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutboundUnit>> {
        let result = self.build_units(interchange, session_id, cancel).await;
        match &result {
            Ok(units) => {
                self.stats.routed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .units_built
                    .fetch_add(units.len() as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn build_units(
        &self,
        interchange: &Interchange,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutboundUnit>> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }

        let decomposition = decompose(interchange)?;
        let agreement = self.cache.resolve(decomposition.header, cancel).await?;
        let path = self.locator.path_for(&agreement.name);

        let mut units = Vec::with_capacity(decomposition.len());
        for shipment in &decomposition.shipments {
            let shipment_id = shipment.shipment_id(&path).ok_or_else(|| {
                warn!(
                    session_id,
                    agreement = %agreement.name,
                    control_number = shipment.control_number(),
                    path = %path,
                    "shipment id not found"
                );
                Error::ShipmentIdMissing {
                    session_id: session_id.to_string(),
                    agreement: agreement.name.clone(),
                    control_number: shipment.control_number().to_string(),
                    path: path.to_string(),
                }
            })?;

            if PartitionKey::is_ambiguous(session_id, shipment_id) {
                warn!(
                    session_id,
                    shipment_id, "partition separator inside an id; key may collide"
                );
            }

            let payload = self
                .encoder
                .encode_load_tender(shipment.transaction)
                .map_err(|source| Error::Serialization {
                    shipment_id: shipment_id.to_string(),
                    source,
                })?;

            let unit = OutboundUnit {
                partition_key: PartitionKey::new(session_id, shipment_id),
                shipment_id: shipment_id.to_string(),
                index: shipment.index,
                agreement_name: agreement.name.clone(),
                payload,
            };
            debug!(partition = %unit.partition_key, index = unit.index, "built outbound unit");
            units.push(unit);
        }

        info!(
            session_id,
            agreement = %agreement.name,
            control_number = %decomposition.header.control_number,
            prepared_at = ?decomposition.header.prepared_at(),
            units = units.len(),
            "interchange routed"
        );
        Ok(units)
    }

    /// Read, route and emit one inbound message.
    ///
    /// All units are built before the first handoff. A transport failure
    /// reports how many units were already accepted.
    pub async fn process(
        &self,
        message: &InboundMessage,
        transport: &dyn OutboundTransport,
        cancel: &CancellationToken,
    ) -> Result<RouteReport> {
        let result = self.process_inner(message, transport, cancel).await;
        if let Err(err) = &result {
            error!(
                session_id = message.session_id.as_deref().unwrap_or(""),
                message_id = message.message_id.as_deref().unwrap_or(""),
                kind = %err.kind(),
                retryable = err.is_retryable(),
                error = %err,
                "inbound message failed"
            );
        }
        result
    }

    async fn process_inner(
        &self,
        message: &InboundMessage,
        transport: &dyn OutboundTransport,
        cancel: &CancellationToken,
    ) -> Result<RouteReport> {
        let Some(session_id) = message.session_id() else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            return Err(Error::MissingSessionId);
        };

        let source = message.message_id.as_deref().unwrap_or(session_id);
        let interchange = self.parser.parse(&message.body, source).map_err(|e| {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            Error::Parse(e)
        })?;

        let units = self.route(&interchange, session_id, cancel).await?;

        for (emitted, unit) in units.iter().enumerate() {
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => Err("cancelled".to_string()),
                sent = transport.send(unit.clone()) => sent.map_err(|e| e.to_string()),
            };

            if let Err(reason) = sent {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return Err(Error::TransportFailure {
                    session_id: session_id.to_string(),
                    shipment_id: unit.shipment_id.clone(),
                    emitted,
                    reason,
                });
            }
            self.stats.units_emitted.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            session_id,
            transport = transport.name(),
            units = units.len(),
            "units handed off"
        );

        Ok(RouteReport {
            session_id: session_id.to_string(),
            message_id: message.message_id.clone(),
            units,
        })
    }
}
