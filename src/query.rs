//! Query directory loading.
//!
//! Each query file holds one or more statements separated by a blank line.
//! Statement `i` of file `name.ext` gets the id `name-i`.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::sparql::{self, Algebra};
use crate::{Error, Result};

/// Separator between statements in one query file.
pub const QUERY_DELIMITER: &str = "\n\n";

/// One statement read from a query file, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText {
    pub id: String,
    pub file: PathBuf,
    pub index: usize,
    pub text: String,
}

/// A parsed statement.
#[derive(Debug, Clone)]
pub struct LoadedQuery {
    pub id: String,
    pub algebra: Algebra,
}

/// `name-i` where `name` is the file name up to its first `.`.
pub fn query_id(file_name: &str, index: usize) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    format!("{stem}-{index}")
}

/// Split file content into `(index, statement)` pairs.
///
/// Whitespace-only chunks are dropped but still consume their index.
pub fn split_statements(content: &str) -> Vec<(usize, String)> {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split(QUERY_DELIMITER)
        .enumerate()
        .filter(|(_, chunk)| !chunk.trim().is_empty())
        .map(|(i, chunk)| (i, chunk.to_owned()))
        .collect()
}

/// Query files directly inside `dir`, sorted by name.
///
/// A file is skipped when its name contains any exclusion keyword or does not
/// end with an allowed extension.
pub fn query_files(dir: &Path, extensions: &[String], exclusions: &[String]) -> Result<Vec<PathBuf>> {
    let io_err = |source| Error::Io { path: dir.to_path_buf(), source };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if exclusions.iter().any(|kw| name.contains(kw.as_str())) {
            info!("Skipping {name}");
            continue;
        }
        if !path.is_file() || !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            debug!(path = %path.display(), "Not a query file");
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Read every statement from the query directory, without parsing.
///
/// A later file producing an id already seen replaces the earlier statement.
pub fn read_queries(dir: &Path, extensions: &[String], exclusions: &[String]) -> Result<Vec<QueryText>> {
    let mut queries: Vec<QueryText> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for file in query_files(dir, extensions, exclusions)? {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_owned();
        info!("Loading {name}");
        let content = fs::read_to_string(&file).map_err(|source| Error::Io {
            path: file.clone(),
            source,
        })?;
        for (index, text) in split_statements(&content) {
            let query = QueryText {
                id: query_id(&name, index),
                file: file.clone(),
                index,
                text,
            };
            match by_id.get(&query.id) {
                Some(&slot) => {
                    warn!(id = %query.id, file = %file.display(), "Duplicate query id, replacing earlier statement");
                    queries[slot] = query;
                }
                None => {
                    by_id.insert(query.id.clone(), queries.len());
                    queries.push(query);
                }
            }
        }
    }

    info!("Loaded {} queries from {}", queries.len(), dir.display());
    Ok(queries)
}

/// Parse one statement, tagging failures with its id.
pub fn parse_query(query: &QueryText) -> Result<LoadedQuery> {
    let algebra = sparql::parse(&query.text).map_err(|source| Error::InvalidQuery {
        id: query.id.clone(),
        file: query.file.clone(),
        source: Box::new(source),
    })?;
    Ok(LoadedQuery { id: query.id.clone(), algebra })
}

/// Read and parse every statement. The first unparsable statement fails the load.
pub fn load_queries(dir: &Path, extensions: &[String], exclusions: &[String]) -> Result<Vec<LoadedQuery>> {
    read_queries(dir, extensions, exclusions)?
        .iter()
        .map(parse_query)
        .collect()
}
