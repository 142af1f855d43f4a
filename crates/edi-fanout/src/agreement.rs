//! Trading-partner agreements and identity matching

use edi_ir::PartnerIdentity;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A qualified partner identity as stored in the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessIdentity {
    pub qualifier: String,
    pub value: String,
}

impl BusinessIdentity {
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }

    /// Trimmed comparison; directory entries are often space padded
    pub fn matches(&self, qualifier: &str, value: &str) -> bool {
        self.qualifier.trim() == qualifier.trim() && self.value.trim() == value.trim()
    }
}

/// A known sender/receiver pairing authorized to exchange interchanges.
///
/// The guest is the interchange sender (ISA05/ISA06) and the host is the
/// receiver (ISA07/ISA08).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub name: String,
    pub guest_identity: BusinessIdentity,
    pub host_identity: BusinessIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_partner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_partner: Option<String>,
}

impl Agreement {
    pub fn new(name: impl Into<String>, guest: BusinessIdentity, host: BusinessIdentity) -> Self {
        Self {
            name: name.into(),
            guest_identity: guest,
            host_identity: host,
            guest_partner: None,
            host_partner: None,
        }
    }

    /// All four identity fields must match
    pub fn matches(&self, identity: &PartnerIdentity) -> bool {
        self.guest_identity
            .matches(&identity.sender_qualifier, &identity.sender_id)
            && self
                .host_identity
                .matches(&identity.receiver_qualifier, &identity.receiver_id)
    }
}

/// Agreements matching an identity, in directory order
pub fn find_matches<'a>(agreements: &'a [Agreement], identity: &PartnerIdentity) -> Vec<&'a Agreement> {
    agreements.iter().filter(|a| a.matches(identity)).collect()
}

/// The single agreement matching an identity.
///
/// No match and several matches are the same failure: routing never picks
/// between ambiguous agreements.
pub fn select_unique<'a>(agreements: &'a [Agreement], identity: &PartnerIdentity) -> Result<&'a Agreement> {
    match find_matches(agreements, identity).as_slice() {
        [agreement] => Ok(*agreement),
        matches => Err(Error::agreement_not_found(identity, matches.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Agreement {
        Agreement::new(
            "ACME-WIDGETCO-001",
            BusinessIdentity::new("ZZ", "ACME"),
            BusinessIdentity::new("ZZ", "WIDGETCO"),
        )
    }

    fn identity() -> PartnerIdentity {
        PartnerIdentity::new("ZZ", "ACME           ", "ZZ", "WIDGETCO       ")
    }

    #[test]
    fn test_four_field_match() {
        assert!(acme().matches(&identity()));

        let reversed = PartnerIdentity::new("ZZ", "WIDGETCO", "ZZ", "ACME");
        assert!(!acme().matches(&reversed));

        let other_qualifier = PartnerIdentity::new("ZZ", "ACME", "01", "WIDGETCO");
        assert!(!acme().matches(&other_qualifier));
    }

    #[test]
    fn test_directory_padding_is_ignored() {
        let padded = Agreement::new(
            "PADDED",
            BusinessIdentity::new(" ZZ", "ACME  "),
            BusinessIdentity::new("ZZ ", " WIDGETCO"),
        );
        assert!(padded.matches(&identity()));
    }

    #[test]
    fn test_receiver_qualifier_is_compared_to_qualifier() {
        // Comparing the receiver qualifier against the host value would
        // never match a well-formed agreement.
        let agreement = acme();
        let id = identity();
        let qualifier_against_value = agreement.host_identity.value == id.receiver_qualifier;

        assert!(!qualifier_against_value);
        assert!(agreement.matches(&id));
    }

    #[test]
    fn test_select_unique() {
        let agreements = vec![
            acme(),
            Agreement::new(
                "GLOBEX-WIDGETCO-002",
                BusinessIdentity::new("ZZ", "GLOBEX"),
                BusinessIdentity::new("ZZ", "WIDGETCO"),
            ),
        ];

        let found = select_unique(&agreements, &identity()).unwrap();
        assert_eq!(found.name, "ACME-WIDGETCO-001");
    }

    #[test]
    fn test_ambiguous_is_not_found() {
        let mut duplicate = acme();
        duplicate.name = "ACME-WIDGETCO-LEGACY".to_string();
        let agreements = vec![acme(), duplicate];

        let err = select_unique(&agreements, &identity()).unwrap_err();
        assert!(matches!(err, Error::AgreementNotFound { matches: 2, .. }));
    }

    #[test]
    fn test_no_match_is_not_found() {
        let err = select_unique(&[], &identity()).unwrap_err();
        assert!(matches!(err, Error::AgreementNotFound { matches: 0, .. }));
    }

    #[test]
    fn test_camel_case_json() {
        let json = r#"{
            "name": "ACME-WIDGETCO-001",
            "guestIdentity": {"qualifier": "ZZ", "value": "ACME"},
            "hostIdentity": {"qualifier": "ZZ", "value": "WIDGETCO"},
            "hostPartner": "Widget Co"
        }"#;
        let agreement: Agreement = serde_json::from_str(json).unwrap();

        assert_eq!(agreement.guest_identity.value, "ACME");
        assert_eq!(agreement.guest_partner, None);
        assert_eq!(agreement.host_partner.as_deref(), Some("Widget Co"));

        let written = serde_json::to_string(&agreement).unwrap();
        assert!(written.contains("\"hostIdentity\""));
        assert!(!written.contains("guestPartner"));
    }
}
