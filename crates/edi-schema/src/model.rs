//! Schema model definitions

use serde::{Deserialize, Serialize};

/// Layout of one X12 transaction set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSchema {
    /// ST01 identifier, e.g. `204`
    pub transaction_set: String,
    /// GS08 version, e.g. `004010`
    pub version: String,
    pub segments: Vec<SegmentDefinition>,
    #[serde(default)]
    pub loops: Vec<LoopDefinition>,
}

/// Definition of a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementDefinition>,
}

/// Definition of a data element at a 1-based position within its segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub position: usize,
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Component names when the element is a composite
    #[serde(default)]
    pub components: Vec<String>,
}

/// A loop started by a trigger segment and continued by its members.
///
/// A segment that is neither the trigger nor a member closes the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDefinition {
    pub name: String,
    pub trigger: String,
    #[serde(default)]
    pub members: Vec<String>,
}

fn default_data_type() -> String {
    "AN".to_string()
}

impl TransactionSchema {
    pub fn new(transaction_set: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            transaction_set: transaction_set.into(),
            version: version.into(),
            segments: Vec::new(),
            loops: Vec::new(),
        }
    }

    pub fn with_segments(mut self, segments: Vec<SegmentDefinition>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_loops(mut self, loops: Vec<LoopDefinition>) -> Self {
        self.loops = loops;
        self
    }

    /// Qualified name used in logs, e.g. `204: 004010`
    pub fn qualified_name(&self) -> String {
        format!("{}: {}", self.transaction_set, self.version)
    }

    pub fn segment(&self, tag: &str) -> Option<&SegmentDefinition> {
        self.segments.iter().find(|s| s.tag == tag)
    }

    /// Loop started by the given segment tag
    pub fn loop_for_trigger(&self, tag: &str) -> Option<&LoopDefinition> {
        self.loops.iter().find(|l| l.trigger == tag)
    }

    /// Canonical name of the element at `position` (1-based) of `tag`
    pub fn element_name(&self, tag: &str, position: usize) -> String {
        self.segment(tag)
            .and_then(|segment| segment.element(position))
            .map_or_else(|| positional_name(tag, position), |e| e.name.clone())
    }

    /// Canonical name of component `component` (1-based) of a composite element
    pub fn component_name(&self, tag: &str, position: usize, component: usize) -> String {
        self.segment(tag)
            .and_then(|segment| segment.element(position))
            .and_then(|e| {
                component
                    .checked_sub(1)
                    .and_then(|idx| e.components.get(idx))
                    .cloned()
            })
            .unwrap_or_else(|| format!("{}_{component:02}", self.element_name(tag, position)))
    }

    /// Overlay another schema: segments replace by tag, loops replace by name
    pub fn merge(&mut self, overlay: TransactionSchema) {
        for segment in overlay.segments {
            match self.segments.iter_mut().find(|s| s.tag == segment.tag) {
                Some(existing) => *existing = segment,
                None => self.segments.push(segment),
            }
        }
        for definition in overlay.loops {
            match self.loops.iter_mut().find(|l| l.name == definition.name) {
                Some(existing) => *existing = definition,
                None => self.loops.push(definition),
            }
        }
    }
}

impl SegmentDefinition {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            elements: Vec::new(),
        }
    }

    /// Build a segment from element names listed in position order
    pub fn with_element_names(mut self, names: &[&str]) -> Self {
        self.elements = names
            .iter()
            .enumerate()
            .map(|(idx, name)| ElementDefinition::new(idx + 1, *name))
            .collect();
        self
    }

    pub fn element(&self, position: usize) -> Option<&ElementDefinition> {
        self.elements.iter().find(|e| e.position == position)
    }
}

impl ElementDefinition {
    pub fn new(position: usize, name: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            data_type: default_data_type(),
            components: Vec::new(),
        }
    }

    pub fn with_components(mut self, components: &[&str]) -> Self {
        self.components = components.iter().map(|c| (*c).to_string()).collect();
        self
    }
}

impl LoopDefinition {
    pub fn new(name: impl Into<String>, trigger: impl Into<String>, members: &[&str]) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            members: members.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    /// Whether a segment continues this loop
    pub fn accepts(&self, tag: &str) -> bool {
        self.members.iter().any(|m| m == tag)
    }
}

/// Fallback name for elements the schema does not describe
pub fn positional_name(tag: &str, position: usize) -> String {
    format!("{tag}_{position:02}")
}
