//! # edi-schema
//!
//! X12 transaction layouts: segment, element and loop definitions.
//!
//! The reader uses these layouts to give parsed elements their canonical
//! field names (`ShipmentIdentificationNumber_04`) and to group loops.
//! Built-in layouts cover the 004010 load tender; partner overlays can be
//! loaded from YAML or JSON and merged on top.

pub mod builtin;
pub mod loader;
pub mod model;
pub mod registry;

pub use loader::SchemaLoader;
pub use model::{ElementDefinition, LoopDefinition, SegmentDefinition, TransactionSchema};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
