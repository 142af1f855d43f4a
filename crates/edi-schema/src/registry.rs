//! Schema registry keyed by transaction set identifier

use crate::builtin;
use crate::model::TransactionSchema;
use std::collections::HashMap;
use tracing::debug;

/// Registry of transaction layouts used to name parsed elements
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, TransactionSchema>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in 004010 layouts
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtin::load_tender());
        registry
    }

    /// Register a schema, replacing any schema for the same transaction set
    pub fn register(&mut self, schema: TransactionSchema) {
        debug!(schema = %schema.qualified_name(), "registering transaction schema");
        self.schemas.insert(schema.transaction_set.clone(), schema);
    }

    /// Overlay a schema onto the registered one, or register it if new
    pub fn extend(&mut self, overlay: TransactionSchema) {
        match self.schemas.get_mut(&overlay.transaction_set) {
            Some(existing) => {
                debug!(schema = %overlay.qualified_name(), "merging transaction schema overlay");
                existing.merge(overlay);
            }
            None => self.register(overlay),
        }
    }

    /// Get a schema by transaction set identifier
    pub fn get(&self, transaction_set: &str) -> Option<&TransactionSchema> {
        self.schemas.get(transaction_set)
    }

    /// Registered schema, or an envelope-only fallback
    pub fn resolve(&self, transaction_set: &str) -> TransactionSchema {
        self.get(transaction_set)
            .cloned()
            .unwrap_or_else(|| builtin::generic(transaction_set))
    }

    /// Check if a schema exists
    pub fn contains(&self, transaction_set: &str) -> bool {
        self.schemas.contains_key(transaction_set)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SegmentDefinition;

    #[test]
    fn test_builtins_registered() {
        let registry = SchemaRegistry::default();

        assert!(registry.contains("204"));
        assert!(!registry.contains("990"));
    }

    #[test]
    fn test_resolve_falls_back_to_generic() {
        let registry = SchemaRegistry::new();
        let schema = registry.resolve("214");

        assert_eq!(schema.transaction_set, "214");
        assert_eq!(schema.element_name("ST", 2), "TransactionSetControlNumber_02");
    }

    #[test]
    fn test_extend_merges_existing() {
        let mut registry = SchemaRegistry::with_builtins();
        registry.extend(
            TransactionSchema::new("204", "004010").with_segments(vec![
                SegmentDefinition::new("B2", "Partner B2")
                    .with_element_names(&["A", "B", "C", "CarrierShipmentId"]),
            ]),
        );

        let schema = registry.get("204").unwrap();
        assert_eq!(schema.element_name("B2", 4), "CarrierShipmentId");
        assert_eq!(schema.element_name("S5", 1), "StopSequenceNumber_01");
    }
}
