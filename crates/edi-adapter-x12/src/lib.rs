//! # edi-adapter-x12
//!
//! X12 interchange reader and XML shipment encoding.
//!
//! The reader discovers delimiters from the ISA header, groups ST..SE
//! transaction sets and names their elements from the schema registry.
//! The XML encoder writes a transaction body using those canonical names
//! and the decoder restores the same node tree.

pub mod parser;
pub mod syntax;
pub mod xml;

pub use parser::X12Parser;
pub use syntax::Separators;
pub use xml::{XmlEncoder, decode_transaction};

use thiserror::Error;

/// Errors that can occur when reading X12 or encoding shipments
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at line {line}, col {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a parse error with source position
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
