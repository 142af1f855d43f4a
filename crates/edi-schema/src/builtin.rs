//! Built-in X12 004010 transaction layouts

use crate::model::{ElementDefinition, LoopDefinition, SegmentDefinition, TransactionSchema};

/// Version string of the built-in layouts
pub const X12_004010: &str = "004010";

/// Transaction set identifier of the motor carrier load tender
pub const LOAD_TENDER: &str = "204";

/// Segments shared by every transaction set
fn control_segments() -> Vec<SegmentDefinition> {
    vec![
        SegmentDefinition::new("ST", "Transaction Set Header").with_element_names(&[
            "TransactionSetIdentifierCode_01",
            "TransactionSetControlNumber_02",
            "ImplementationConventionReference_03",
        ]),
        SegmentDefinition::new("SE", "Transaction Set Trailer").with_element_names(&[
            "NumberofIncludedSegments_01",
            "TransactionSetControlNumber_02",
        ]),
    ]
}

/// 204 Motor Carrier Load Tender
pub fn load_tender() -> TransactionSchema {
    let mut segments = control_segments();
    segments.extend([
        SegmentDefinition::new("B2", "Beginning Segment for Shipment Information Transaction")
            .with_element_names(&[
                "TariffServiceCode_01",
                "StandardCarrierAlphaCode_02",
                "StandardPointLocationCode_03",
                "ShipmentIdentificationNumber_04",
                "WeightUnitCode_05",
                "ShipmentMethodofPayment_06",
                "ShipmentQualifier_07",
                "TotalEquipment_08",
                "ShipmentWeightCode_09",
                "CustomsDocumentationHandlingCode_10",
                "TransportationTermsCode_11",
                "PaymentMethodCode_12",
            ]),
        SegmentDefinition::new("B2A", "Set Purpose").with_element_names(&[
            "TransactionSetPurposeCode_01",
            "ApplicationType_02",
        ]),
        SegmentDefinition::new("L11", "Business Instructions and Reference Number")
            .with_element_names(&[
                "ReferenceIdentification_01",
                "ReferenceIdentificationQualifier_02",
                "Description_03",
            ]),
        SegmentDefinition::new("G62", "Date/Time").with_element_names(&[
            "DateQualifier_01",
            "Date_02",
            "TimeQualifier_03",
            "Time_04",
            "TimeCode_05",
        ]),
        SegmentDefinition::new("MS3", "Interline Information").with_element_names(&[
            "StandardCarrierAlphaCode_01",
            "RoutingSequenceCode_02",
            "CityName_03",
            "TransportationMethodTypeCode_04",
            "StateorProvinceCode_05",
        ]),
        SegmentDefinition::new("AT5", "Bill of Lading Handling Requirements").with_element_names(&[
            "SpecialHandlingCode_01",
            "SpecialServicesCode_02",
            "SpecialHandlingDescription_03",
        ]),
        SegmentDefinition::new("PLD", "Pallet Information").with_element_names(&[
            "QuantityofPalletsShipped_01",
            "PalletExchangeCode_02",
            "WeightQualifier_03",
            "Weight_04",
        ]),
        SegmentDefinition::new("NTE", "Note/Special Instruction").with_element_names(&[
            "NoteReferenceCode_01",
            "Description_02",
        ]),
        SegmentDefinition::new("N1", "Name").with_element_names(&[
            "EntityIdentifierCode_01",
            "Name_02",
            "IdentificationCodeQualifier_03",
            "IdentificationCode_04",
        ]),
        SegmentDefinition::new("N2", "Additional Name Information").with_element_names(&[
            "Name_01",
            "Name_02",
        ]),
        SegmentDefinition::new("N3", "Address Information").with_element_names(&[
            "AddressInformation_01",
            "AddressInformation_02",
        ]),
        SegmentDefinition::new("N4", "Geographic Location").with_element_names(&[
            "CityName_01",
            "StateorProvinceCode_02",
            "PostalCode_03",
            "CountryCode_04",
            "LocationQualifier_05",
            "LocationIdentifier_06",
        ]),
        SegmentDefinition::new("G61", "Contact").with_element_names(&[
            "ContactFunctionCode_01",
            "Name_02",
            "CommunicationNumberQualifier_03",
            "CommunicationNumber_04",
        ]),
        SegmentDefinition::new("N7", "Equipment Details").with_element_names(&[
            "EquipmentInitial_01",
            "EquipmentNumber_02",
            "Weight_03",
            "WeightQualifier_04",
        ]),
        SegmentDefinition::new("S5", "Stop Off Details").with_element_names(&[
            "StopSequenceNumber_01",
            "StopReasonCode_02",
            "Weight_03",
            "WeightUnitCode_04",
            "NumberofUnitsShipped_05",
            "UnitorBasisforMeasurementCode_06",
            "Volume_07",
            "VolumeUnitQualifier_08",
        ]),
        SegmentDefinition::new("AT8", "Shipment Weight, Packaging and Quantity Data")
            .with_element_names(&[
                "WeightQualifier_01",
                "WeightUnitCode_02",
                "Weight_03",
                "LadingQuantity_04",
                "LadingQuantity_05",
                "VolumeUnitQualifier_06",
                "Volume_07",
            ]),
        SegmentDefinition::new("LAD", "Lading Detail").with_element_names(&[
            "PackagingFormCode_01",
            "LadingQuantity_02",
        ]),
        SegmentDefinition::new("OID", "Order Identification Detail").with_element_names(&[
            "ReferenceIdentification_01",
            "PurchaseOrderNumber_02",
            "ReferenceIdentification_03",
            "UnitorBasisforMeasurementCode_04",
            "Quantity_05",
            "WeightUnitCode_06",
            "Weight_07",
        ]),
        SegmentDefinition::new("L5", "Description, Marks and Numbers").with_element_names(&[
            "LadingLineItemNumber_01",
            "LadingDescription_02",
            "CommodityCode_03",
            "CommodityCodeQualifier_04",
        ]),
        SegmentDefinition::new("L3", "Total Weight and Charges").with_element_names(&[
            "Weight_01",
            "WeightQualifier_02",
            "FreightRate_03",
            "RateValueQualifier_04",
            "Charge_05",
        ]),
    ]);

    let mut schema = TransactionSchema::new(LOAD_TENDER, X12_004010)
        .with_segments(segments)
        .with_loops(vec![
            LoopDefinition::new("Loop_0100", "N1", &["N2", "N3", "N4", "G61"]),
            LoopDefinition::new("Loop_0200", "N7", &[]),
            LoopDefinition::new(
                "Loop_0300",
                "S5",
                &[
                    "L11", "G62", "AT8", "LAD", "AT5", "PLD", "NTE", "N1", "N2", "N3", "N4",
                    "G61", "OID", "L5",
                ],
            ),
        ]);

    // MS3 carries a composite in some partner guides; name its parts.
    if let Some(ms3) = schema.segments.iter_mut().find(|s| s.tag == "MS3") {
        if let Some(routing) = ms3.elements.iter_mut().find(|e| e.position == 2) {
            *routing = ElementDefinition::new(2, "RoutingSequenceCode_02")
                .with_components(&["RoutingSequence_01", "RoutingQualifier_02"]);
        }
    }

    schema
}

/// Fallback layout for transaction sets without a registered schema
pub fn generic(transaction_set: &str) -> TransactionSchema {
    TransactionSchema::new(transaction_set, X12_004010).with_segments(control_segments())
}
