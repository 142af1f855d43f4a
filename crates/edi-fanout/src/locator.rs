//! Per-agreement shipment id location
//!
//! Partners do not all carry the shipment id in B2-04. The locator keeps a
//! default field path plus overrides keyed by agreement name; overrides can
//! be changed while routing is in progress.

use std::collections::BTreeMap;

use dashmap::DashMap;
use edi_ir::FieldPath;
use tracing::debug;

use crate::{Error, Result};

/// Field path of the shipment id when no override applies
pub const DEFAULT_SHIPMENT_ID_PATH: &str = "B2/ShipmentIdentificationNumber_04";

const DEFAULT_SEGMENT: &str = "B2";
const DEFAULT_ELEMENT: &str = "ShipmentIdentificationNumber_04";

#[derive(Debug)]
pub struct ShipmentIdLocator {
    default_path: FieldPath,
    overrides: DashMap<String, FieldPath>,
}

impl ShipmentIdLocator {
    pub fn new() -> Self {
        Self::with_default_path(default_path())
    }

    pub fn with_default_path(default_path: FieldPath) -> Self {
        Self {
            default_path,
            overrides: DashMap::new(),
        }
    }

    /// Build from configured `agreement -> path` strings
    pub fn from_paths(default_path: &str, overrides: &BTreeMap<String, String>) -> Result<Self> {
        let locator = Self::with_default_path(parse_path(default_path)?);
        for (agreement, path) in overrides {
            locator.set_override(agreement.clone(), parse_path(path)?);
        }
        Ok(locator)
    }

    pub fn default_path(&self) -> &FieldPath {
        &self.default_path
    }

    /// Install an override, returning the previous one
    pub fn set_override(&self, agreement: impl Into<String>, path: FieldPath) -> Option<FieldPath> {
        let agreement = agreement.into();
        debug!(%agreement, %path, "shipment id path override set");
        self.overrides.insert(agreement, path)
    }

    pub fn remove_override(&self, agreement: &str) -> Option<FieldPath> {
        self.overrides.remove(agreement).map(|(_, path)| path)
    }

    /// Path used for an agreement
    pub fn path_for(&self, agreement: &str) -> FieldPath {
        self.overrides
            .get(agreement)
            .map_or_else(|| self.default_path.clone(), |entry| entry.value().clone())
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Default for ShipmentIdLocator {
    fn default() -> Self {
        Self::new()
    }
}

fn default_path() -> FieldPath {
    FieldPath::segment_element(DEFAULT_SEGMENT, DEFAULT_ELEMENT)
}

fn parse_path(path: &str) -> Result<FieldPath> {
    FieldPath::parse(path).map_err(|e| Error::Config(format!("shipment id path: {e}")))
}
