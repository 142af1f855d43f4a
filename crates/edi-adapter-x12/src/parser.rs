//! X12 interchange reader
//!
//! Reads a complete X12 interchange into an [`Interchange`]: envelope
//! segments become typed items and each ST..SE transaction set becomes a
//! schema-named node tree with its loops grouped.

use crate::syntax::{Separators, SyntaxBuffer};
use crate::{Error, Result};
use edi_ir::{
    EdiItem, GroupHeader, GroupTrailer, Interchange, InterchangeHeader, InterchangeTrailer, Node,
    NodeType, Position, SourceInfo, TransactionSet, UsageIndicator,
};
use edi_schema::{LoopDefinition, SchemaRegistry, TransactionSchema};
use tracing::{debug, warn};

/// A parsed X12 segment
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment tag (2-3 characters)
    pub tag: String,
    /// Data elements (simple or composite)
    pub elements: Vec<Element>,
    /// Position of the tag in the source
    pub position: Position,
}

/// A data element (simple or composite)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Simple element (single value)
    Simple(String),
    /// Composite element (multiple components)
    Composite(Vec<String>),
}

impl Element {
    /// Value of a simple element; composites yield their first component
    pub fn as_str(&self) -> &str {
        match self {
            Element::Simple(value) => value,
            Element::Composite(components) => components.first().map_or("", String::as_str),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Element::Simple(value) => value.is_empty(),
            Element::Composite(components) => components.iter().all(String::is_empty),
        }
    }
}

impl Segment {
    /// Element at a 1-based position, empty when absent
    pub fn element(&self, position: usize) -> &str {
        position
            .checked_sub(1)
            .and_then(|idx| self.elements.get(idx))
            .map_or("", Element::as_str)
    }

    /// Convert this segment to a schema-named node; empty elements are omitted
    pub fn to_node(&self, schema: &TransactionSchema) -> Node {
        let mut node = Node::new(&self.tag, NodeType::Segment);

        for (i, element) in self.elements.iter().enumerate() {
            if element.is_empty() {
                continue;
            }
            let name = schema.element_name(&self.tag, i + 1);
            let elem_node = match element {
                Element::Simple(value) => Node::with_value(name, NodeType::Element, value),
                Element::Composite(components) => {
                    let mut n = Node::new(name, NodeType::Element);
                    for (j, comp) in components.iter().enumerate() {
                        if comp.is_empty() {
                            continue;
                        }
                        n.add_child(Node::with_value(
                            schema.component_name(&self.tag, i + 1, j + 1),
                            NodeType::Component,
                            comp,
                        ));
                    }
                    n
                }
            };
            node.add_child(elem_node);
        }

        node
    }
}

/// Parser for individual segments
pub struct SegmentParser<'a> {
    buffer: SyntaxBuffer<'a>,
}

impl<'a> SegmentParser<'a> {
    /// Create a segment parser, discovering separators from the leading ISA
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let start = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(data.len());
        let separators = Separators::from_isa(&data[start..]).ok_or_else(|| {
            Error::parse(1, 1, "input does not start with a well-formed ISA segment")
        })?;

        let mut buffer = SyntaxBuffer::with_separators(data, separators);
        buffer.pos = start;
        Ok(Self { buffer })
    }

    /// Separators in effect
    pub fn separators(&self) -> Separators {
        self.buffer.separators
    }

    /// Parse the next segment
    pub fn next_segment(&mut self) -> Option<Result<Segment>> {
        self.buffer.skip_whitespace();

        if self.buffer.is_empty() {
            return None;
        }

        let (line, column) = self.buffer.line_column();
        let position = Position::new(line, column, self.buffer.position(), 0);
        let start = self.buffer.position();

        let Some(tag) = self.buffer.read_tag() else {
            return Some(Err(Error::parse(
                line,
                column,
                "Expected segment tag (2-3 uppercase characters)",
            )));
        };

        let mut elements = Vec::new();

        match self.buffer.next_byte() {
            Some(b) if b == self.buffer.separators.segment => {}
            Some(b) if b == self.buffer.separators.element => {
                // ISA16 is itself the component separator, so ISA is read flat.
                let component_aware = tag != "ISA";
                let mut components = Vec::new();
                loop {
                    let (value, delimiter) = self.buffer.read_until(component_aware);
                    let value = String::from_utf8_lossy(&value).into_owned();
                    match delimiter {
                        Some(d) if d == self.buffer.separators.component => components.push(value),
                        _ => {
                            if components.is_empty() {
                                elements.push(Element::Simple(value));
                            } else {
                                components.push(value);
                                elements.push(Element::Composite(std::mem::take(&mut components)));
                            }
                            match delimiter {
                                Some(d) if d == self.buffer.separators.element => {}
                                _ => break,
                            }
                        }
                    }
                }
            }
            _ => {
                return Some(Err(Error::parse(
                    line,
                    column,
                    format!("Segment {tag} is not terminated"),
                )));
            }
        }

        let position = Position {
            length: self.buffer.position() - start,
            ..position
        };

        Some(Ok(Segment {
            tag,
            elements,
            position,
        }))
    }
}

/// Transaction set being collected between ST and SE
struct OpenTransaction {
    identifier: String,
    control_number: String,
    position: Position,
    segments: Vec<Segment>,
}

/// X12 interchange reader
pub struct X12Parser {
    registry: SchemaRegistry,
}

impl X12Parser {
    /// Create a reader using the built-in schemas
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::with_builtins())
    }

    /// Create a reader with a custom schema registry
    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Schema registry used for naming
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Parse a complete interchange
    pub fn parse(&self, data: &[u8], source_name: impl Into<String>) -> Result<Interchange> {
        let mut parser = SegmentParser::new(data)?;
        let mut interchange = Interchange::new();
        let mut open: Option<OpenTransaction> = None;

        while let Some(result) = parser.next_segment() {
            let segment = result?;

            if let Some(transaction) = open.as_mut() {
                match segment.tag.as_str() {
                    "SE" => {
                        transaction.segments.push(segment);
                        if let Some(transaction) = open.take() {
                            interchange.push(EdiItem::Transaction(self.finish(transaction)));
                        }
                    }
                    "ISA" | "GS" | "GE" | "IEA" | "ST" => {
                        return Err(Error::parse(
                            segment.position.line,
                            segment.position.column,
                            format!(
                                "{} before SE closed transaction set {}",
                                segment.tag, transaction.control_number
                            ),
                        ));
                    }
                    _ => transaction.segments.push(segment),
                }
                continue;
            }

            match segment.tag.as_str() {
                "ISA" => interchange.push(EdiItem::InterchangeHeader(Self::interchange_header(
                    &segment,
                    parser.separators(),
                ))),
                "GS" => interchange.push(EdiItem::GroupHeader(Self::group_header(&segment))),
                "GE" => interchange.push(EdiItem::GroupTrailer(GroupTrailer {
                    transaction_count: segment.element(1).to_string(),
                    control_number: segment.element(2).to_string(),
                })),
                "IEA" => interchange.push(EdiItem::InterchangeTrailer(InterchangeTrailer {
                    group_count: segment.element(1).to_string(),
                    control_number: segment.element(2).to_string(),
                })),
                "ST" => {
                    open = Some(OpenTransaction {
                        identifier: segment.element(1).trim().to_string(),
                        control_number: segment.element(2).trim().to_string(),
                        position: segment.position,
                        segments: vec![segment],
                    });
                }
                other => {
                    return Err(Error::parse(
                        segment.position.line,
                        segment.position.column,
                        format!("Segment {other} outside of a transaction set"),
                    ));
                }
            }
        }

        if let Some(transaction) = open {
            return Err(Error::parse(
                transaction.position.line,
                transaction.position.column,
                format!(
                    "Transaction set {} is missing its SE trailer",
                    transaction.control_number
                ),
            ));
        }

        debug!(
            items = interchange.len(),
            transactions = interchange.transactions().count(),
            "parsed X12 interchange"
        );

        Ok(interchange.with_source(SourceInfo::new(
            source_name,
            Position::new(1, 1, 0, data.len()),
        )))
    }

    fn finish(&self, transaction: OpenTransaction) -> TransactionSet {
        let schema = self.registry.resolve(&transaction.identifier);

        if let Some(se) = transaction.segments.last() {
            if se.element(2).trim() != transaction.control_number {
                warn!(
                    st_control = %transaction.control_number,
                    se_control = %se.element(2).trim(),
                    "SE control number does not match ST"
                );
            }
        }

        let body = group_loops(&schema, &transaction.segments);
        TransactionSet::new(transaction.identifier, transaction.control_number, body)
            .at(transaction.position)
    }

    fn interchange_header(segment: &Segment, separators: Separators) -> InterchangeHeader {
        InterchangeHeader {
            authorization_qualifier: segment.element(1).to_string(),
            authorization_information: segment.element(2).to_string(),
            security_qualifier: segment.element(3).to_string(),
            security_information: segment.element(4).to_string(),
            sender_qualifier: segment.element(5).to_string(),
            sender_id: segment.element(6).to_string(),
            receiver_qualifier: segment.element(7).to_string(),
            receiver_id: segment.element(8).to_string(),
            date: segment.element(9).to_string(),
            time: segment.element(10).to_string(),
            repetition_separator: segment.element(11).to_string(),
            control_version: segment.element(12).to_string(),
            control_number: segment.element(13).to_string(),
            acknowledgment_requested: segment.element(14).trim() == "1",
            usage: UsageIndicator::from_code(segment.element(15)),
            component_separator: char::from(separators.component),
        }
    }

    fn group_header(segment: &Segment) -> GroupHeader {
        GroupHeader {
            functional_id: segment.element(1).to_string(),
            application_sender: segment.element(2).to_string(),
            application_receiver: segment.element(3).to_string(),
            date: segment.element(4).to_string(),
            time: segment.element(5).to_string(),
            control_number: segment.element(6).to_string(),
            responsible_agency: segment.element(7).to_string(),
            version: segment.element(8).to_string(),
        }
    }
}

impl Default for X12Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the transaction body, grouping loop members under their trigger
fn group_loops(schema: &TransactionSchema, segments: &[Segment]) -> Node {
    let mut root = Node::new(format!("TS{}", schema.transaction_set), NodeType::Message);
    let mut current: Option<(Node, &LoopDefinition)> = None;

    for segment in segments {
        let node = segment.to_node(schema);

        if let Some((group, definition)) = current.as_mut() {
            if definition.accepts(&segment.tag) {
                group.add_child(node);
                continue;
            }
        }

        if let Some((group, _)) = current.take() {
            root.add_child(group);
        }

        match schema.loop_for_trigger(&segment.tag) {
            Some(definition) => {
                let mut group = Node::new(&definition.name, NodeType::SegmentGroup);
                group.add_child(node);
                current = Some((group, definition));
            }
            None => {
                root.add_child(node);
            }
        }
    }

    if let Some((group, _)) = current.take() {
        root.add_child(group);
    }

    root
}
