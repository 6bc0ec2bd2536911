// src/error.rs

//! Error types for Graft
//!
//! A single crate-wide error enum keeps the import pipeline composable:
//! storage, parsing, ordering, and transaction failures all flow through
//! the same `Result` alias.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("XML error: {0}")]
    XmlError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("cannot convert {part}.{attribute} value {value:?} to {target}")]
    ConversionError {
        part: String,
        attribute: String,
        value: String,
        target: &'static str,
    },

    #[error("missing content reference: {0}")]
    MissingReference(String),

    #[error("dependency cycle among import units: {0}")]
    DependencyCycle(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Import error: {0}")]
    ImportError(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::XmlError(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlError(e.to_string())
    }
}
