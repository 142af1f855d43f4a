//! Node types for transaction set bodies
#![allow(clippy::must_use_candidate)] // Builder/constructor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use serde::{Deserialize, Serialize};

/// A node in a transaction set tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node name (segment tag, loop name or canonical field name)
    pub name: String,

    /// Node type
    pub node_type: NodeType,

    /// Element or component value; structural nodes carry none
    pub value: Option<String>,

    /// Child nodes in source order
    pub children: Vec<Node>,
}

/// Types of nodes in a transaction set tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Transaction set root (e.g., TS204)
    Message,

    /// Loop of related segments (e.g., `Loop_0300` stop-off detail)
    SegmentGroup,

    /// Individual segment
    Segment,

    /// Data element (simple or composite)
    Element,

    /// Component within a composite element
    Component,
}

impl NodeType {
    /// Whether nodes of this type hold segments rather than values.
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Message | NodeType::SegmentGroup)
    }
}

impl Node {
    /// Create a new node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            value: None,
            children: Vec::new(),
        }
    }

    /// Create a node with a value
    pub fn with_value(name: impl Into<String>, node_type: NodeType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Builder-style variant of [`Node::add_child`]
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Find a child by name
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find all children by name
    pub fn find_children(&self, name: &str) -> Vec<&Node> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    /// Depth-first search for the first segment with the given tag
    pub fn find_segment(&self, tag: &str) -> Option<&Node> {
        for child in &self.children {
            if child.node_type == NodeType::Segment && child.name == tag {
                return Some(child);
            }
            if child.node_type.is_container() {
                if let Some(found) = child.find_segment(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Value of this node, if any
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of segments in this subtree, loops excluded
    pub fn segment_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child.node_type {
                NodeType::Segment => 1,
                NodeType::SegmentGroup | NodeType::Message => child.segment_count(),
                NodeType::Element | NodeType::Component => 0,
            })
            .sum()
    }
}
