//! # RDF Documents
//!
//! Reads corpus documents into triples. The serialization is chosen from the
//! file extension.

pub mod nquads;

use std::fs;
use std::path::Path;

use crate::model::Term;
use crate::{Error, Result};

/// One statement read from a document. Predicates in data are always IRIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// Serializations the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    NQuads,
    NTriples,
}

impl DocumentFormat {
    /// Format for a configured extension such as `.nq`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "nq" | "nquads" => Some(DocumentFormat::NQuads),
            "nt" | "ntriples" => Some(DocumentFormat::NTriples),
            _ => None,
        }
    }
}

/// Read and parse one document.
pub fn read_document(path: &Path, format: DocumentFormat) -> Result<Vec<Triple>> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    nquads::parse_str(&content, format, path)
}
