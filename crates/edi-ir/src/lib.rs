#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-ir
//!
//! Typed interchange model and segment trees for X12 documents.
//!
//! An [`Interchange`] is the ordered sequence of typed items produced by
//! reading one inbound message: envelope headers and trailers plus the
//! transaction sets between them. Transaction bodies are kept as generic
//! [`Node`] trees whose names come from the schema, so routing code can
//! address fields by path without knowing every transaction layout.

/// Interchange envelopes, transaction sets and partner identity.
pub mod interchange;
/// Source positions attached to parsed items.
pub mod metadata;
/// Core tree node model used for transaction bodies.
pub mod node;
/// Cursor and path helpers for navigating node trees.
pub mod traversal;

pub use interchange::{
    EdiItem, GroupHeader, GroupTrailer, Interchange, InterchangeHeader, InterchangeTrailer,
    PartnerIdentity, TransactionKind, TransactionSet, UsageIndicator,
};
pub use metadata::{Position, SourceInfo};
pub use node::{Node, NodeType};
pub use traversal::{Cursor, FieldPath, Traversal, walk};

use thiserror::Error;

/// Errors that can occur when working with the IR
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Node at path '{path}' carries no value")]
    MissingValue { path: String },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a missing-value error for a structural node reached by path.
    pub fn missing_value(path: impl Into<String>) -> Self {
        Self::MissingValue { path: path.into() }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
