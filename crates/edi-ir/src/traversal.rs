//! Cursor and field-path helpers for navigating transaction trees

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::Result;
use crate::node::Node;

/// One step of a [`FieldPath`]: a child name plus an optional occurrence index
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathStep {
    name: String,
    index: Option<usize>,
}

/// A parsed, validated path into a transaction tree.
///
/// Paths are `/`-separated child names relative to the transaction root,
/// with an optional `[n]` occurrence index per step, e.g.
/// `B2/ShipmentIdentificationNumber_04` or `Loop_0300[1]/S5/StopSequenceNumber_01`.
/// Empty steps are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self> {
        let mut steps = Vec::new();

        for segment in path.split('/') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            if let Some(open_bracket) = segment.find('[') {
                let name = &segment[..open_bracket];
                let close_bracket = segment
                    .find(']')
                    .ok_or_else(|| Error::invalid_path(path, format!("unclosed bracket in '{segment}'")))?;
                if close_bracket < open_bracket || close_bracket + 1 != segment.len() {
                    return Err(Error::invalid_path(
                        path,
                        format!("malformed index in '{segment}'"),
                    ));
                }
                if name.is_empty() {
                    return Err(Error::invalid_path(path, "index without a name"));
                }
                let index: usize = segment[open_bracket + 1..close_bracket]
                    .parse()
                    .map_err(|_| Error::invalid_path(path, format!("invalid index in '{segment}'")))?;
                steps.push(PathStep {
                    name: name.to_string(),
                    index: Some(index),
                });
            } else {
                steps.push(PathStep {
                    name: segment.to_string(),
                    index: None,
                });
            }
        }

        if steps.is_empty() {
            return Err(Error::invalid_path(path, "path has no steps"));
        }

        Ok(Self {
            raw: path.to_string(),
            steps,
        })
    }

    /// Path to an element directly under a segment, e.g. `B2/ShipmentIdentificationNumber_04`
    #[must_use]
    pub fn segment_element(segment: &str, element: &str) -> Self {
        Self {
            raw: format!("{segment}/{element}"),
            steps: vec![
                PathStep {
                    name: segment.to_string(),
                    index: None,
                },
                PathStep {
                    name: element.to_string(),
                    index: None,
                },
            ],
        }
    }

    /// The path as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of steps in the path
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A cursor for navigating a transaction tree
pub struct Cursor<'a> {
    /// Current node
    node: &'a Node,

    /// Path to current node (for error reporting)
    path: Vec<String>,
}

/// Visitor over a transaction tree, driven by [`walk`]
pub trait Traversal {
    /// Visit a node
    fn visit(&mut self, node: &Node, path: &[String]);

    /// Called when entering a node with children
    fn enter(&mut self, _node: &Node, _path: &[String]) {}

    /// Called when leaving a node with children
    fn leave(&mut self, _node: &Node, _path: &[String]) {}

    /// Returns true if traversal should continue
    fn should_continue(&self) -> bool {
        true
    }
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the given node
    #[must_use]
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            path: vec![node.name.clone()],
        }
    }

    /// Get the current node
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Get the current path
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Navigate to a child node by name
    pub fn child(&self, name: &str) -> Result<Cursor<'a>> {
        let child = self
            .node
            .find_child(name)
            .ok_or_else(|| Error::node_not_found(format!("{}/{}", self.path.join("/"), name)))?;
        Ok(self.descend(child, name.to_string()))
    }

    /// Get all children matching a name
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<Cursor<'a>> {
        self.node
            .find_children(name)
            .into_iter()
            .enumerate()
            .map(|(idx, child)| self.descend(child, format!("{name}[{idx}]")))
            .collect()
    }

    /// Navigate along a parsed path
    pub fn navigate(&self, path: &FieldPath) -> Result<Cursor<'a>> {
        let mut current_node = self.node;
        let mut current_path = self.path.clone();

        for step in &path.steps {
            let index = step.index.unwrap_or(0);
            current_node = current_node
                .children
                .iter()
                .filter(|c| c.name == step.name)
                .nth(index)
                .ok_or_else(|| {
                    Error::node_not_found(format!("{}/{}[{}]", current_path.join("/"), step.name, index))
                })?;
            match step.index {
                Some(index) => current_path.push(format!("{}[{index}]", step.name)),
                None => current_path.push(step.name.clone()),
            }
        }

        Ok(Cursor {
            node: current_node,
            path: current_path,
        })
    }

    /// Navigate along a path and return the value found there
    pub fn value_at(&self, path: &FieldPath) -> Result<&'a str> {
        let target = self.navigate(path)?;
        target
            .node
            .text()
            .ok_or_else(|| Error::missing_value(target.path.join("/")))
    }

    fn descend(&self, child: &'a Node, step: String) -> Cursor<'a> {
        let mut new_path = self.path.clone();
        new_path.push(step);
        Cursor {
            node: child,
            path: new_path,
        }
    }
}

/// Walk the tree depth-first using a visitor
pub fn walk<T: Traversal + ?Sized>(node: &Node, visitor: &mut T) {
    walk_recursive(node, visitor, &mut vec![]);
}

fn walk_recursive<T: Traversal + ?Sized>(node: &Node, visitor: &mut T, path: &mut Vec<String>) {
    if !visitor.should_continue() {
        return;
    }

    visitor.visit(node, path);

    if !node.children.is_empty() {
        visitor.enter(node, path);
        path.push(node.name.clone());

        for child in &node.children {
            walk_recursive(child, visitor, path);
        }

        path.pop();
        visitor.leave(node, path);
    }
}
