//! XML shipment encoding
//!
//! A transaction body is written as nested XML elements named after the
//! schema's canonical field names:
//!
//! ```text
//! <TS204><ST>...</ST><B2><ShipmentIdentificationNumber_04>SHP100</ShipmentIdentificationNumber_04></B2>...</TS204>
//! ```
//!
//! Output is compact and deterministic. [`decode_transaction`] restores the
//! node tree, inferring node types from nesting depth.

use crate::{Error, Result};
use edi_ir::{Node, NodeType, Traversal, TransactionKind, TransactionSet, walk};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

/// Encoder for transaction bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder {
    declaration: bool,
}

impl XmlEncoder {
    /// Create an encoder that writes an XML declaration
    pub fn new() -> Self {
        Self { declaration: true }
    }

    /// Omit the `<?xml ...?>` declaration
    #[must_use]
    pub fn without_declaration(mut self) -> Self {
        self.declaration = false;
        self
    }

    /// Encode a 204 load tender; other transaction kinds are rejected
    pub fn encode_load_tender(&self, transaction: &TransactionSet) -> Result<String> {
        if transaction.kind() != TransactionKind::MotorCarrierLoadTender {
            return Err(Error::Serialize(format!(
                "transaction set {} ({}) is not a load tender",
                transaction.control_number, transaction.identifier
            )));
        }
        self.encode_transaction(transaction)
    }

    /// Encode any transaction set body
    pub fn encode_transaction(&self, transaction: &TransactionSet) -> Result<String> {
        let xml = self.encode_node(&transaction.body)?;
        debug!(
            transaction = %transaction.control_number,
            bytes = xml.len(),
            "encoded transaction set as XML"
        );
        Ok(xml)
    }

    /// Encode a node tree
    pub fn encode_node(&self, node: &Node) -> Result<String> {
        let mut writer = XmlWriter {
            writer: Writer::new(Vec::new()),
            error: None,
        };

        if self.declaration {
            writer.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
        }
        walk(node, &mut writer);

        if let Some(error) = writer.error {
            return Err(error);
        }

        String::from_utf8(writer.writer.into_inner()).map_err(|e| Error::Serialize(e.to_string()))
    }
}

struct XmlWriter {
    writer: Writer<Vec<u8>>,
    error: Option<Error>,
}

impl XmlWriter {
    fn write(&mut self, event: Event<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_event(event) {
            self.error = Some(Error::Serialize(e.to_string()));
        }
    }
}

impl Traversal for XmlWriter {
    fn visit(&mut self, node: &Node, _path: &[String]) {
        if !node.children.is_empty() {
            return;
        }
        match &node.value {
            Some(value) if value.chars().any(|c| !is_xml_char(c)) => {
                if self.error.is_none() {
                    self.error = Some(Error::Serialize(format!(
                        "{} holds a character XML 1.0 cannot represent",
                        node.name
                    )));
                }
            }
            Some(value) => {
                self.write(Event::Start(BytesStart::new(node.name.as_str())));
                self.write(Event::Text(BytesText::new(value)));
                self.write(Event::End(BytesEnd::new(node.name.as_str())));
            }
            None => self.write(Event::Empty(BytesStart::new(node.name.as_str()))),
        }
    }

    fn enter(&mut self, node: &Node, _path: &[String]) {
        self.write(Event::Start(BytesStart::new(node.name.as_str())));
    }

    fn leave(&mut self, node: &Node, _path: &[String]) {
        self.write(Event::End(BytesEnd::new(node.name.as_str())));
    }

    fn should_continue(&self) -> bool {
        self.error.is_none()
    }
}

/// Characters allowed in XML 1.0 text
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Node type of a child given its parent's type
fn child_type(parent: NodeType, name: &str) -> NodeType {
    match parent {
        NodeType::Message | NodeType::SegmentGroup if name.starts_with("Loop_") => {
            NodeType::SegmentGroup
        }
        NodeType::Message | NodeType::SegmentGroup => NodeType::Segment,
        NodeType::Segment => NodeType::Element,
        NodeType::Element | NodeType::Component => NodeType::Component,
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Decode an encoded transaction body back into a transaction set
pub fn decode_transaction(xml: &str) -> Result<TransactionSet> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Decode(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(start) | Event::Empty(start) if root.is_some() => {
                return Err(Error::Decode(format!(
                    "unexpected element {} after the document root",
                    element_name(&start)?
                )));
            }
            Event::Start(start) => {
                let name = element_name(&start)?;
                let node_type = stack
                    .last()
                    .map_or(NodeType::Message, |parent| child_type(parent.node_type, &name));
                stack.push(Node::new(name, node_type));
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                match stack.last_mut() {
                    Some(parent) => {
                        let node_type = child_type(parent.node_type, &name);
                        parent.add_child(Node::new(name, node_type));
                    }
                    None => root = Some(Node::new(name, NodeType::Message)),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| Error::Decode(e.to_string()))?;
                append_text(stack.last_mut(), &text);
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_text(stack.last_mut(), &text);
            }
            Event::End(_) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| Error::Decode("unbalanced closing tag".to_string()))?;
                if !node.children.is_empty() {
                    node.value = None;
                }
                match stack.last_mut() {
                    Some(parent) => {
                        parent.add_child(node);
                    }
                    None => root = Some(node),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Decode(format!(
            "document ended inside element {}",
            stack.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join("/")
        )));
    }

    let body = root.ok_or_else(|| Error::Decode("document has no root element".to_string()))?;
    let identifier = body
        .name
        .strip_prefix("TS")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Decode(format!("root element {} is not a transaction set", body.name)))?
        .to_string();

    let control_number = body
        .find_child("ST")
        .and_then(|st| {
            st.find_child("TransactionSetControlNumber_02")
                .or_else(|| st.find_child("ST_02"))
        })
        .and_then(Node::text)
        .unwrap_or_default()
        .to_string();

    Ok(TransactionSet::new(identifier, control_number, body))
}

fn append_text(node: Option<&mut Node>, text: &str) {
    let Some(node) = node else {
        return;
    };
    if node.node_type.is_container() && text.trim().is_empty() {
        return;
    }
    match node.value.as_mut() {
        Some(value) => value.push_str(text),
        None => node.value = Some(text.to_string()),
    }
}
