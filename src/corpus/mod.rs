//! # Corpus
//!
//! A corpus is a directory of partitions ("pods"). Each partition is a tree of
//! nested directories and documents. Documents are recognized by extension;
//! anything named `.meta` is never visited.

pub mod accumulator;
pub mod index;
pub mod scan;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::rdf::DocumentFormat;
use crate::{Error, Result};

pub use accumulator::{CorpusTotals, PatternMetrics, ScanAccumulator};
pub use index::PredicateIndex;
pub use scan::{summarize_corpus, Scanner};

/// File or directory name excluded from traversal regardless of extension.
pub const SENTINEL: &str = ".meta";

/// One top-level directory of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Canonical path string, used as the partition identifier.
    pub id: String,
    pub path: PathBuf,
}

/// One recognized file within a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Canonical path string, used as the document identifier.
    pub id: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
}

/// Extension allow-list with the format each extension selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    extensions: Vec<(String, DocumentFormat)>,
}

impl DocumentFilter {
    /// Fails when an extension has no known document format.
    pub fn from_extensions(extensions: &[String]) -> Result<Self> {
        let extensions = extensions
            .iter()
            .map(|ext| {
                DocumentFormat::from_extension(ext)
                    .map(|format| (ext.clone(), format))
                    .ok_or_else(|| Error::Config(format!("No document format for extension '{ext}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        if extensions.is_empty() {
            return Err(Error::Config("At least one document extension is required".into()));
        }
        Ok(Self { extensions })
    }

    /// Format for a file name, by suffix. The first matching extension wins.
    pub fn format_for(&self, file_name: &str) -> Option<DocumentFormat> {
        self.extensions
            .iter()
            .find(|(ext, _)| file_name.ends_with(ext.as_str()))
            .map(|(_, format)| *format)
    }
}

fn path_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Top-level directories of `root`, sorted by path.
///
/// Top-level files are skipped and do not count as partitions.
pub fn partitions(root: &Path) -> Result<Vec<Partition>> {
    let io_err = |source| Error::Io { path: root.to_path_buf(), source };
    let mut found = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.file_name().is_some_and(|name| name == SENTINEL) {
            continue;
        }
        if path.is_dir() {
            found.push(Partition { id: path_id(&path), path });
        } else {
            debug!(path = %path.display(), "Skipping non-partition entry");
        }
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

/// Every recognized document below a partition, in file-name order.
pub fn documents(partition: &Partition, filter: &DocumentFilter) -> Result<Vec<Document>> {
    let walker = WalkDir::new(&partition.path)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != SENTINEL);

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| Error::Io {
            path: err.path().unwrap_or(&partition.path).to_path_buf(),
            source: io::Error::other(err),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let format = entry
            .file_name()
            .to_str()
            .filter(|_| entry.file_type().is_file())
            .and_then(|name| filter.format_for(name));
        match format {
            Some(format) => found.push(Document {
                id: path_id(entry.path()),
                path: entry.into_path(),
                format,
            }),
            None => debug!(path = %entry.path().display(), "Skipping unrecognized path"),
        }
    }
    Ok(found)
}
