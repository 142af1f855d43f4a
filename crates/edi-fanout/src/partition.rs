//! Partition keys for ordered delivery

use std::fmt;

use serde::{Deserialize, Serialize};

/// Joins the session id and the shipment id
pub const PARTITION_SEPARATOR: char = '+';

/// `{session}+{shipment}`: every unit of one shipment shares a partition.
///
/// The key is a plain concatenation. Ids that themselves contain the
/// separator can produce the same key for different pairs; see
/// [`PartitionKey::is_ambiguous`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(session_id: &str, shipment_id: &str) -> Self {
        Self(format!("{session_id}{PARTITION_SEPARATOR}{shipment_id}"))
    }

    /// Whether either part contains the separator
    pub fn is_ambiguous(session_id: &str, shipment_id: &str) -> bool {
        session_id.contains(PARTITION_SEPARATOR) || shipment_id.contains(PARTITION_SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<PartitionKey> for String {
    fn from(key: PartitionKey) -> Self {
        key.0
    }
}
