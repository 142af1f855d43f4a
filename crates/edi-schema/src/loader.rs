//! Schema loader for partner-specific transaction layouts

use crate::model::{ElementDefinition, LoopDefinition, SegmentDefinition, TransactionSchema};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Serializable schema format for loading from files
#[derive(Debug, Deserialize)]
struct SchemaFile {
    transaction_set: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    segments: Vec<SegmentFile>,
    #[serde(default)]
    loops: Vec<LoopDefinition>,
}

#[derive(Debug, Deserialize)]
struct SegmentFile {
    tag: String,
    #[serde(default)]
    name: String,
    /// Element names in position order; shorthand for `elements`
    #[serde(default)]
    element_names: Vec<String>,
    #[serde(default)]
    elements: Vec<ElementDefinition>,
}

fn default_version() -> String {
    crate::builtin::X12_004010.to_string()
}

/// Loads schema overlays from YAML or JSON files
pub struct SchemaLoader {
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a new schema loader for the given files or directories
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self { schema_paths }
    }

    /// Load every configured schema and overlay it onto the registry
    pub fn load_into(&self, registry: &mut SchemaRegistry) -> Result<usize> {
        let mut loaded = 0;
        for path in &self.schema_paths {
            for file in Self::schema_files(path)? {
                let schema = self.load_from_file(&file)?;
                info!(schema = %schema.qualified_name(), file = %file.display(), "loaded schema overlay");
                registry.extend(schema);
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Load a schema from a specific file path
    pub fn load_from_file(&self, path: &Path) -> Result<TransactionSchema> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.load_from_yaml(&content)
        } else {
            self.load_from_json(&content)
        }
    }

    /// Load a schema from JSON string
    pub fn load_from_json(&self, json: &str) -> Result<TransactionSchema> {
        let schema_file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;

        self.convert_schema_file(schema_file)
    }

    /// Load a schema from YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<TransactionSchema> {
        let schema_file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;

        self.convert_schema_file(schema_file)
    }

    fn convert_schema_file(&self, schema_file: SchemaFile) -> Result<TransactionSchema> {
        let mut segments = Vec::with_capacity(schema_file.segments.len());

        for segment in schema_file.segments {
            if !segment.element_names.is_empty() && !segment.elements.is_empty() {
                return Err(Error::InvalidFormat(format!(
                    "segment {} declares both element_names and elements",
                    segment.tag
                )));
            }

            let names: Vec<&str> = segment.element_names.iter().map(String::as_str).collect();
            let mut definition =
                SegmentDefinition::new(segment.tag, segment.name).with_element_names(&names);
            if !segment.elements.is_empty() {
                definition.elements = segment.elements;
            }
            segments.push(definition);
        }

        for definition in &schema_file.loops {
            if definition.trigger.is_empty() {
                return Err(Error::InvalidFormat(format!(
                    "loop {} has no trigger segment",
                    definition.name
                )));
            }
        }

        debug!(
            transaction_set = %schema_file.transaction_set,
            segments = segments.len(),
            loops = schema_file.loops.len(),
            "converted schema file"
        );

        Ok(TransactionSchema::new(schema_file.transaction_set, schema_file.version)
            .with_segments(segments)
            .with_loops(schema_file.loops))
    }

    fn schema_files(path: &Path) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            if path.exists() {
                return Ok(vec![path.to_path_buf()]);
            }
            return Err(Error::NotFound(path.display().to_string()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file
                .extension()
                .is_some_and(|e| e == "yaml" || e == "yml" || e == "json")
            {
                files.push(file);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERLAY: &str = r"
transaction_set: '204'
segments:
  - tag: B2
    name: Partner B2
    element_names: [Tariff, Scac, Spl, PartnerShipmentId]
  - tag: K1
    elements:
      - position: 1
        name: FreeFormMessage_01
loops:
  - name: Loop_0300
    trigger: S5
    members: [L11, G62, K1]
";

    #[test]
    fn test_load_from_yaml() {
        let loader = SchemaLoader::new(Vec::new());
        let schema = loader.load_from_yaml(OVERLAY).unwrap();

        assert_eq!(schema.transaction_set, "204");
        assert_eq!(schema.version, "004010");
        assert_eq!(schema.element_name("B2", 4), "PartnerShipmentId");
        assert_eq!(schema.element_name("K1", 1), "FreeFormMessage_01");
        assert!(schema.loop_for_trigger("S5").unwrap().accepts("K1"));
    }

    #[test]
    fn test_load_from_json() {
        let loader = SchemaLoader::new(Vec::new());
        let schema = loader
            .load_from_json(r#"{"transaction_set":"990","segments":[{"tag":"B1","element_names":["Scac","ShipmentId"]}]}"#)
            .unwrap();

        assert_eq!(schema.element_name("B1", 2), "ShipmentId");
    }

    #[test]
    fn test_rejects_ambiguous_segment() {
        let loader = SchemaLoader::new(Vec::new());
        let yaml = r"
transaction_set: '204'
segments:
  - tag: B2
    element_names: [A]
    elements:
      - position: 1
        name: B
";
        assert!(matches!(
            loader.load_from_yaml(yaml),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_load_into_registry_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("partner_204.yaml"), OVERLAY).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = SchemaRegistry::with_builtins();
        let loaded = SchemaLoader::new(vec![dir.path().to_path_buf()])
            .load_into(&mut registry)
            .unwrap();

        assert_eq!(loaded, 1);
        let schema = registry.get("204").unwrap();
        assert_eq!(schema.element_name("B2", 4), "PartnerShipmentId");
        assert_eq!(schema.element_name("N4", 1), "CityName_01");
    }

    #[test]
    fn test_missing_path() {
        let mut registry = SchemaRegistry::new();
        let result = SchemaLoader::new(vec![PathBuf::from("/no/such/schema.yaml")])
            .load_into(&mut registry);

        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
