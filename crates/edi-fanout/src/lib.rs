#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # edi-fanout
//!
//! Routes one inbound X12 interchange to one outbound unit per shipment.
//!
//! The [`FanOutRouter`] decomposes the interchange into its ISA header and
//! 204 load tenders, resolves the trading-partner [`Agreement`] for the
//! header through a shared [`AgreementCache`], and tags every shipment with
//! a [`PartitionKey`] of the form `{session}+{shipment}` so all traffic for
//! one shipment lands in the same ordered partition.
//!
//! The agreement directory and the outbound transport are collaborators
//! behind async traits; [`StaticDirectory`] and [`MemoryTransport`] are the
//! in-process implementations.

pub mod agreement;
pub mod cache;
pub mod config;
pub mod decompose;
pub mod directory;
pub mod locator;
pub mod partition;
pub mod router;
pub mod transport;

pub use agreement::{Agreement, BusinessIdentity};
pub use cache::{AgreementCache, RefreshPolicy};
pub use config::RouterConfig;
pub use decompose::{Decomposition, ShipmentUnit, decompose};
pub use directory::{AgreementDirectory, AgreementPage, DirectoryError, DirectoryScope, StaticDirectory};
pub use locator::{DEFAULT_SHIPMENT_ID_PATH, ShipmentIdLocator};
pub use partition::{PARTITION_SEPARATOR, PartitionKey};
pub use router::{FanOutRouter, RouteReport, RouterStats, RouterStatsSnapshot};
pub use transport::{InboundMessage, MemoryTransport, OutboundTransport, OutboundUnit, TransportError};

use std::fmt;

use edi_ir::PartnerIdentity;
use thiserror::Error;

/// Errors that abort a routing invocation
#[derive(Error, Debug)]
pub enum Error {
    #[error("inbound message has no session id")]
    MissingSessionId,

    #[error("interchange has no ISA header")]
    HeaderMissing,

    #[error("payload carries {count} ISA envelopes; exactly one is routed")]
    MultipleInterchanges { count: usize },

    #[error(
        "no unique agreement for sender {sender_qualifier}:{sender_id} and receiver \
         {receiver_qualifier}:{receiver_id} ({matches} matched)"
    )]
    AgreementNotFound {
        sender_qualifier: String,
        sender_id: String,
        receiver_qualifier: String,
        receiver_id: String,
        matches: usize,
    },

    #[error("agreement directory {scope} unavailable: {reason}")]
    DirectoryUnavailable { scope: String, reason: String },

    #[error(
        "transport failed for session {session_id} shipment {shipment_id} after {emitted} unit(s): {reason}"
    )]
    TransportFailure {
        session_id: String,
        shipment_id: String,
        emitted: usize,
        reason: String,
    },

    #[error("cannot read interchange: {0}")]
    Parse(#[source] edi_adapter_x12::Error),

    #[error(
        "shipment id not found at {path} in transaction set {control_number} \
         (session {session_id}, agreement {agreement})"
    )]
    ShipmentIdMissing {
        session_id: String,
        agreement: String,
        control_number: String,
        path: String,
    },

    #[error("cannot serialize shipment {shipment_id}: {source}")]
    Serialization {
        shipment_id: String,
        #[source]
        source: edi_adapter_x12::Error,
    },

    #[error("invalid router configuration: {0}")]
    Config(String),
}

/// Coarse classification used to choose between retry and dead-letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingSessionId,
    HeaderMissing,
    MultipleInterchanges,
    AgreementNotFound,
    DirectoryUnavailable,
    TransportFailure,
    Parse,
    ShipmentIdMissing,
    Serialization,
    Config,
}

impl ErrorKind {
    /// Stable snake_case label for logs and exit messages
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingSessionId => "missing_session_id",
            ErrorKind::HeaderMissing => "header_missing",
            ErrorKind::MultipleInterchanges => "multiple_interchanges",
            ErrorKind::AgreementNotFound => "agreement_not_found",
            ErrorKind::DirectoryUnavailable => "directory_unavailable",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::Parse => "parse",
            ErrorKind::ShipmentIdMissing => "shipment_id_missing",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Build an agreement-not-found error from the identity that failed to resolve
    pub fn agreement_not_found(identity: &PartnerIdentity, matches: usize) -> Self {
        Self::AgreementNotFound {
            sender_qualifier: identity.sender_qualifier.clone(),
            sender_id: identity.sender_id.clone(),
            receiver_qualifier: identity.receiver_qualifier.clone(),
            receiver_id: identity.receiver_id.clone(),
            matches,
        }
    }

    /// Build a directory-unavailable error for a scope
    pub fn directory_unavailable(scope: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::DirectoryUnavailable {
            scope: scope.to_string(),
            reason: reason.into(),
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingSessionId => ErrorKind::MissingSessionId,
            Error::HeaderMissing => ErrorKind::HeaderMissing,
            Error::MultipleInterchanges { .. } => ErrorKind::MultipleInterchanges,
            Error::AgreementNotFound { .. } => ErrorKind::AgreementNotFound,
            Error::DirectoryUnavailable { .. } => ErrorKind::DirectoryUnavailable,
            Error::TransportFailure { .. } => ErrorKind::TransportFailure,
            Error::Parse(_) => ErrorKind::Parse,
            Error::ShipmentIdMissing { .. } => ErrorKind::ShipmentIdMissing,
            Error::Serialization { .. } => ErrorKind::Serialization,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether redelivering the same message may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DirectoryUnavailable | ErrorKind::TransportFailure
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_not_found_message_names_identity() {
        let identity = PartnerIdentity::new("ZZ", "ACME", "ZZ", "WIDGETCO");
        let err = Error::agreement_not_found(&identity, 2);

        let message = err.to_string();
        assert!(message.contains("ZZ:ACME"));
        assert!(message.contains("ZZ:WIDGETCO"));
        assert!(message.contains("2 matched"));
        assert_eq!(err.kind(), ErrorKind::AgreementNotFound);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::directory_unavailable("sub/rg/acct", "timeout").is_retryable());
        assert!(
            Error::TransportFailure {
                session_id: "s".into(),
                shipment_id: "x".into(),
                emitted: 0,
                reason: "closed".into(),
            }
            .is_retryable()
        );
        assert!(!Error::MissingSessionId.is_retryable());
        assert!(!Error::HeaderMissing.is_retryable());
        assert!(!Error::agreement_not_found(&PartnerIdentity::new("", "", "", ""), 0).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ErrorKind::MissingSessionId.to_string(), "missing_session_id");
        assert_eq!(Error::Config("x".into()).kind().as_str(), "config");
    }
}
