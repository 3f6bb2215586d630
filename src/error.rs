//! Error types for wordbook operations.

use thiserror::Error;

/// Errors that can occur while transforming a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pattern in {key}: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("Missing required property: {0}")]
    MissingProperty(String),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Unknown transformer: {0}")]
    UnknownTransformer(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
