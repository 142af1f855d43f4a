//! Interchange model: envelopes, transaction sets and partner identity
#![allow(clippy::must_use_candidate)] // Accessors read clearly without #[must_use] noise.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::metadata::{Position, SourceInfo};
use crate::node::Node;

/// One parsed inbound message: the ordered sequence of typed items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interchange {
    /// Items in the order they appeared on the wire
    pub items: Vec<EdiItem>,

    /// Where the message came from, if known
    pub source: Option<SourceInfo>,
}

/// A typed item of an interchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdiItem {
    /// Interchange control header (ISA)
    InterchangeHeader(InterchangeHeader),
    /// Functional group header (GS)
    GroupHeader(GroupHeader),
    /// Transaction set (ST..SE)
    Transaction(TransactionSet),
    /// Functional group trailer (GE)
    GroupTrailer(GroupTrailer),
    /// Interchange control trailer (IEA)
    InterchangeTrailer(InterchangeTrailer),
}

/// ISA usage indicator (ISA15)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageIndicator {
    #[default]
    Production,
    Test,
    Information,
}

impl UsageIndicator {
    /// Map the ISA15 code; unknown codes are treated as production
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "T" => UsageIndicator::Test,
            "I" => UsageIndicator::Information,
            _ => UsageIndicator::Production,
        }
    }
}

/// Interchange control header (ISA).
///
/// ISA fields are fixed width and space padded; values are kept as read and
/// [`InterchangeHeader::identity`] exposes the trimmed routing identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeHeader {
    /// ISA01
    pub authorization_qualifier: String,
    /// ISA02
    pub authorization_information: String,
    /// ISA03
    pub security_qualifier: String,
    /// ISA04
    pub security_information: String,
    /// ISA05
    pub sender_qualifier: String,
    /// ISA06
    pub sender_id: String,
    /// ISA07
    pub receiver_qualifier: String,
    /// ISA08
    pub receiver_id: String,
    /// ISA09, YYMMDD
    pub date: String,
    /// ISA10, HHMM
    pub time: String,
    /// ISA11, repetition separator or standards identifier
    pub repetition_separator: String,
    /// ISA12
    pub control_version: String,
    /// ISA13
    pub control_number: String,
    /// ISA14
    pub acknowledgment_requested: bool,
    /// ISA15
    pub usage: UsageIndicator,
    /// ISA16
    pub component_separator: char,
}

/// Trimmed sender/receiver identity of an interchange
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerIdentity {
    pub sender_qualifier: String,
    pub sender_id: String,
    pub receiver_qualifier: String,
    pub receiver_id: String,
}

impl PartnerIdentity {
    /// Build an identity, trimming every field
    pub fn new(
        sender_qualifier: impl AsRef<str>,
        sender_id: impl AsRef<str>,
        receiver_qualifier: impl AsRef<str>,
        receiver_id: impl AsRef<str>,
    ) -> Self {
        Self {
            sender_qualifier: sender_qualifier.as_ref().trim().to_string(),
            sender_id: sender_id.as_ref().trim().to_string(),
            receiver_qualifier: receiver_qualifier.as_ref().trim().to_string(),
            receiver_id: receiver_id.as_ref().trim().to_string(),
        }
    }
}

impl fmt::Display for PartnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.sender_qualifier, self.sender_id, self.receiver_qualifier, self.receiver_id
        )
    }
}

impl InterchangeHeader {
    /// Header carrying only routing identity; remaining fields defaulted
    pub fn new(
        sender_qualifier: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_qualifier: impl Into<String>,
        receiver_id: impl Into<String>,
    ) -> Self {
        Self {
            sender_qualifier: sender_qualifier.into(),
            sender_id: sender_id.into(),
            receiver_qualifier: receiver_qualifier.into(),
            receiver_id: receiver_id.into(),
            component_separator: '>',
            ..Self::default()
        }
    }

    /// Trimmed identity used for agreement resolution
    pub fn identity(&self) -> PartnerIdentity {
        PartnerIdentity::new(
            &self.sender_qualifier,
            &self.sender_id,
            &self.receiver_qualifier,
            &self.receiver_id,
        )
    }

    /// ISA09/ISA10 as a timestamp, when both are well formed
    pub fn prepared_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%y%m%d").ok()?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H%M").ok()?;
        Some(date.and_time(time))
    }
}

/// Functional group header (GS)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeader {
    /// GS01, e.g. `SM` for load tenders
    pub functional_id: String,
    /// GS02
    pub application_sender: String,
    /// GS03
    pub application_receiver: String,
    /// GS04, CCYYMMDD
    pub date: String,
    /// GS05
    pub time: String,
    /// GS06
    pub control_number: String,
    /// GS07
    pub responsible_agency: String,
    /// GS08, e.g. `004010`
    pub version: String,
}

/// Functional group trailer (GE)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTrailer {
    /// GE01
    pub transaction_count: String,
    /// GE02
    pub control_number: String,
}

/// Interchange control trailer (IEA)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeTrailer {
    /// IEA01
    pub group_count: String,
    /// IEA02
    pub control_number: String,
}

/// Classification of a transaction set by its ST01 identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// 204 Motor Carrier Load Tender, the shipment transaction
    MotorCarrierLoadTender,
    /// 990 Response to a Load Tender
    LoadTenderResponse,
    /// 214 Shipment Status Message
    ShipmentStatus,
    /// 997 Functional Acknowledgment
    FunctionalAcknowledgment,
    /// Any other transaction set
    Other(String),
}

impl TransactionKind {
    /// Map an ST01 transaction set identifier
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier.trim() {
            "204" => TransactionKind::MotorCarrierLoadTender,
            "990" => TransactionKind::LoadTenderResponse,
            "214" => TransactionKind::ShipmentStatus,
            "997" => TransactionKind::FunctionalAcknowledgment,
            other => TransactionKind::Other(other.to_string()),
        }
    }

    /// Whether this kind carries one shipment per transaction
    pub fn is_shipment(&self) -> bool {
        matches!(self, TransactionKind::MotorCarrierLoadTender)
    }
}

/// A transaction set (ST..SE) with its schema-named body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSet {
    /// ST01 transaction set identifier
    pub identifier: String,
    /// ST02 transaction set control number
    pub control_number: String,
    /// Position of the ST segment in the source
    pub position: Position,
    /// Body rooted at a `TS{identifier}` message node, ST and SE included
    pub body: Node,
}

impl TransactionSet {
    /// Create a transaction set
    pub fn new(identifier: impl Into<String>, control_number: impl Into<String>, body: Node) -> Self {
        Self {
            identifier: identifier.into(),
            control_number: control_number.into(),
            position: Position::default(),
            body,
        }
    }

    /// Record where the transaction started
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Classify by ST01
    pub fn kind(&self) -> TransactionKind {
        TransactionKind::from_identifier(&self.identifier)
    }
}

impl Interchange {
    /// Create an empty interchange
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interchange from already typed items
    pub fn from_items(items: Vec<EdiItem>) -> Self {
        Self {
            items,
            source: None,
        }
    }

    /// Attach source information
    #[must_use]
    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = Some(source);
        self
    }

    /// Append an item
    pub fn push(&mut self, item: EdiItem) {
        self.items.push(item);
    }

    /// All interchange headers in order
    pub fn headers(&self) -> impl Iterator<Item = &InterchangeHeader> + '_ {
        self.items.iter().filter_map(|item| match item {
            EdiItem::InterchangeHeader(header) => Some(header),
            _ => None,
        })
    }

    /// All transaction sets in order, across functional groups
    pub fn transactions(&self) -> impl Iterator<Item = &TransactionSet> + '_ {
        self.items.iter().filter_map(|item| match item {
            EdiItem::Transaction(transaction) => Some(transaction),
            _ => None,
        })
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the interchange holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn tender(control: &str) -> EdiItem {
        EdiItem::Transaction(TransactionSet::new(
            "204",
            control,
            Node::new("TS204", NodeType::Message),
        ))
    }

    #[test]
    fn test_identity_is_trimmed() {
        let header = InterchangeHeader::new("ZZ", "ACME           ", " ZZ", "WIDGETCO       ");
        let identity = header.identity();

        assert_eq!(identity.sender_id, "ACME");
        assert_eq!(identity.receiver_qualifier, "ZZ");
        assert_eq!(identity.receiver_id, "WIDGETCO");
        assert_eq!(identity.to_string(), "ZZ:ACME -> ZZ:WIDGETCO");
    }

    #[test]
    fn test_prepared_at() {
        let mut header = InterchangeHeader::new("ZZ", "ACME", "ZZ", "WIDGETCO");
        header.date = "240315".to_string();
        header.time = "0930".to_string();

        let prepared = header.prepared_at().unwrap();
        assert_eq!(prepared.to_string(), "2024-03-15 09:30:00");

        header.time = "9999".to_string();
        assert!(header.prepared_at().is_none());
    }

    #[test]
    fn test_transaction_kinds() {
        assert!(TransactionKind::from_identifier("204").is_shipment());
        assert!(!TransactionKind::from_identifier("990").is_shipment());
        assert_eq!(
            TransactionKind::from_identifier("856"),
            TransactionKind::Other("856".to_string())
        );
    }

    #[test]
    fn test_usage_indicator_codes() {
        assert_eq!(UsageIndicator::from_code("T"), UsageIndicator::Test);
        assert_eq!(UsageIndicator::from_code("P"), UsageIndicator::Production);
        assert_eq!(UsageIndicator::from_code("I"), UsageIndicator::Information);
    }

    #[test]
    fn test_interchange_accessors_preserve_order() {
        let mut interchange = Interchange::new();
        interchange.push(EdiItem::InterchangeHeader(InterchangeHeader::new(
            "ZZ", "ACME", "ZZ", "WIDGETCO",
        )));
        interchange.push(EdiItem::GroupHeader(GroupHeader::default()));
        interchange.push(tender("0001"));
        interchange.push(tender("0002"));
        interchange.push(EdiItem::GroupTrailer(GroupTrailer::default()));

        let controls: Vec<_> = interchange
            .transactions()
            .map(|t| t.control_number.as_str())
            .collect();

        assert_eq!(interchange.len(), 5);
        assert_eq!(interchange.headers().count(), 1);
        assert_eq!(controls, vec!["0001", "0002"]);
    }

    #[test]
    fn test_interchange_serializes() {
        let interchange = Interchange::from_items(vec![tender("0001")]);
        let json = serde_json::to_string(&interchange).unwrap();
        let back: Interchange = serde_json::from_str(&json).unwrap();

        assert_eq!(back, interchange);
    }
}
