//! Interchange decomposition into header and shipments

use edi_ir::{Cursor, EdiItem, FieldPath, Interchange, InterchangeHeader, Node, TransactionSet};
use tracing::debug;

use crate::{Error, Result};

/// One shipment transaction borrowed from its interchange
#[derive(Debug, Clone, Copy)]
pub struct ShipmentUnit<'a> {
    /// Position among the interchange's shipments, from zero
    pub index: usize,
    pub transaction: &'a TransactionSet,
}

impl<'a> ShipmentUnit<'a> {
    pub fn control_number(&self) -> &'a str {
        &self.transaction.control_number
    }

    pub fn body(&self) -> &'a Node {
        &self.transaction.body
    }

    /// Trimmed, non-empty value at `path`
    pub fn shipment_id(&self, path: &FieldPath) -> Option<&'a str> {
        Cursor::new(self.body())
            .value_at(path)
            .ok()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Header and shipments of one interchange
#[derive(Debug, Clone)]
pub struct Decomposition<'a> {
    pub header: &'a InterchangeHeader,
    pub shipments: Vec<ShipmentUnit<'a>>,
}

impl Decomposition<'_> {
    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shipments.len()
    }
}

/// Split an interchange into its ISA header and its 204 load tenders.
///
/// Shipments keep their wire order across functional groups. An interchange
/// without shipments decomposes into an empty list. A payload with more than
/// one ISA envelope is rejected, since every shipment must be authorized by
/// the header it travels under.
pub fn decompose(interchange: &Interchange) -> Result<Decomposition<'_>> {
    let mut headers = interchange.headers();
    let header = headers.next().ok_or(Error::HeaderMissing)?;
    let extra = headers.count();
    if extra > 0 {
        return Err(Error::MultipleInterchanges { count: extra + 1 });
    }

    let shipments: Vec<ShipmentUnit<'_>> = interchange
        .items
        .iter()
        .filter_map(|item| match item {
            EdiItem::Transaction(transaction) if transaction.kind().is_shipment() => Some(transaction),
            _ => None,
        })
        .enumerate()
        .map(|(index, transaction)| ShipmentUnit { index, transaction })
        .collect();

    debug!(
        identity = %header.identity(),
        shipments = shipments.len(),
        "decomposed interchange"
    );

    Ok(Decomposition { header, shipments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_ir::{GroupHeader, NodeType};

    fn tender(shipment_id: &str, control: &str) -> EdiItem {
        let body = Node::new("TS204", NodeType::Message).child(
            Node::new("B2", NodeType::Segment).child(Node::with_value(
                "ShipmentIdentificationNumber_04",
                NodeType::Element,
                shipment_id,
            )),
        );
        EdiItem::Transaction(TransactionSet::new("204", control, body))
    }

    fn response(control: &str) -> EdiItem {
        EdiItem::Transaction(TransactionSet::new(
            "990",
            control,
            Node::new("TS990", NodeType::Message),
        ))
    }

    fn header(sender: &str) -> EdiItem {
        EdiItem::InterchangeHeader(InterchangeHeader::new("ZZ", sender, "ZZ", "WIDGETCO"))
    }

    #[test]
    fn test_selects_shipments_in_order() {
        let interchange = Interchange::from_items(vec![
            header("ACME"),
            EdiItem::GroupHeader(GroupHeader::default()),
            tender("SHP100", "0001"),
            response("0002"),
            EdiItem::GroupHeader(GroupHeader::default()),
            tender("SHP200", "0003"),
        ]);

        let decomposition = decompose(&interchange).unwrap();
        let controls: Vec<_> = decomposition.shipments.iter().map(ShipmentUnit::control_number).collect();

        assert_eq!(controls, vec!["0001", "0003"]);
        assert_eq!(decomposition.shipments[1].index, 1);
        assert_eq!(decomposition.header.sender_id, "ACME");
    }

    #[test]
    fn test_second_envelope_is_rejected() {
        let interchange = Interchange::from_items(vec![
            header("ACME"),
            tender("SHP100", "0001"),
            header("GLOBEX"),
            tender("SHP666", "0001"),
        ]);

        assert!(matches!(
            decompose(&interchange),
            Err(Error::MultipleInterchanges { count: 2 })
        ));
    }

    #[test]
    fn test_missing_header() {
        let interchange = Interchange::from_items(vec![tender("SHP100", "0001")]);
        assert!(matches!(decompose(&interchange), Err(Error::HeaderMissing)));
    }

    #[test]
    fn test_shipment_id_lookup() {
        let interchange = Interchange::from_items(vec![header("ACME"), tender("  SHP100 ", "0001"), tender("", "0002")]);
        let decomposition = decompose(&interchange).unwrap();
        let path = FieldPath::parse("B2/ShipmentIdentificationNumber_04").unwrap();

        assert_eq!(decomposition.shipments[0].shipment_id(&path), Some("SHP100"));
        assert_eq!(decomposition.shipments[1].shipment_id(&path), None);

        let missing = FieldPath::parse("L11/ReferenceIdentification_01").unwrap();
        assert_eq!(decomposition.shipments[0].shipment_id(&missing), None);
    }
}
