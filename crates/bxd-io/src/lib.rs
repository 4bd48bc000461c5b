//! BXDJ/BXDA serialization and export orchestration
//!
//! This crate turns a built `NodeTree` into persisted files:
//! - xml: stack-discipline writer and a small conforming reader for the
//!   skeleton document's element/attribute encoding
//! - bxdj: the skeleton document itself (nodes, joints, drivers)
//! - bxda: the binary mesh container, one file per rigid node
//! - export: the orchestrator sequencing one full export run

pub mod bxda;
pub mod bxdj;
pub mod export;
pub mod xml;

pub use bxda::*;
pub use bxdj::*;
pub use export::*;
pub use xml::{Element, XmlWriter};

use bxd_core::{GraphError, TokenError};
use thiserror::Error;

/// Structural misuse of the serializers or a malformed/unsupported document
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    #[error("document already finalized")]
    DocumentFinalized,

    #[error("no element is open")]
    NoOpenElement,

    #[error("attributes must precede child elements")]
    AttributeAfterChildren,

    #[error("end of element with no matching open element")]
    UnbalancedClose,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unsupported major version: {0}")]
    UnsupportedVersion(String),
}

/// Any failure aborting an export run
///
/// All three classes are unrecoverable at the point of detection: the
/// current export stops at the first error and attempts no further writes.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TokenError> for ExportError {
    fn from(err: TokenError) -> Self {
        ExportError::Format(FormatError::Token(err))
    }
}

/// Major component of a semantic-version string
///
/// Readers tolerate unknown minor/patch revisions but reject a different
/// major version.
pub fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}
