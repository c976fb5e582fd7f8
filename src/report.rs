//! Report finalization and rendering.
//!
//! Once a scan completes, sets collapse to cardinalities and the report is
//! immutable.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{CorpusTotals, ScanAccumulator};
use crate::pattern::PatternRegistry;
use crate::{Error, Result};

/// Output serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Tsv,
    Json,
}

/// Column order of the tab-separated output.
pub const COLUMNS: [&str; 9] = [
    "pattern",
    "containing_queries",
    "total_queries",
    "matching_pods",
    "total_pods",
    "matching_documents",
    "total_documents",
    "matching_triples",
    "total_triples",
];

/// One finalized row. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRow {
    pub pattern: String,
    pub containing_queries: u64,
    pub total_queries: u64,
    pub matching_pods: u64,
    pub total_pods: u64,
    pub matching_documents: u64,
    pub total_documents: u64,
    pub matching_triples: u64,
    pub total_triples: u64,
}

impl PatternRow {
    fn cells(&self) -> [String; 9] {
        [
            self.pattern.clone(),
            self.containing_queries.to_string(),
            self.total_queries.to_string(),
            self.matching_pods.to_string(),
            self.total_pods.to_string(),
            self.matching_documents.to_string(),
            self.total_documents.to_string(),
            self.matching_triples.to_string(),
            self.total_triples.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub total_queries: u64,
    pub totals: CorpusTotals,
    /// One row per registered pattern, in registration order.
    pub rows: Vec<PatternRow>,
}

impl Report {
    /// Collapse scan metrics into rows.
    pub fn finalize(registry: &PatternRegistry, scan: ScanAccumulator) -> Self {
        let total_queries = registry.total_queries() as u64;
        let totals = scan.totals;
        let mut metrics = scan.metrics.into_iter();
        let rows = registry
            .entries()
            .iter()
            .map(|entry| {
                let m = metrics.next().unwrap_or_default();
                PatternRow {
                    pattern: entry.rendered.clone(),
                    containing_queries: entry.containing_queries.len() as u64,
                    total_queries,
                    matching_pods: m.matching_pods.len() as u64,
                    total_pods: totals.pods,
                    matching_documents: m.matching_documents.len() as u64,
                    total_documents: totals.documents,
                    matching_triples: m.matching_triples,
                    total_triples: totals.triples,
                }
            })
            .collect();
        Report { total_queries, totals, rows }
    }

    /// Header row plus one tab-separated line per pattern.
    pub fn to_tsv_string(&self) -> String {
        let mut tsv = COLUMNS.join("\t");
        tsv.push('\n');
        for row in &self.rows {
            tsv.push_str(&row.cells().join("\t"));
            tsv.push('\n');
        }
        tsv
    }

    pub fn write_tsv(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.to_tsv_string().as_bytes())?;
        out.flush()
    }

    /// JSON array of row objects.
    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, &self.rows)?;
        writeln!(out).map_err(serde_json::Error::io)?;
        Ok(())
    }

    /// Write the report to a file, replacing it if present.
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> Result<()> {
        let io_err = |source| Error::Io { path: path.to_path_buf(), source };
        let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
        match format {
            ReportFormat::Tsv => self.write_tsv(&mut out).map_err(io_err)?,
            ReportFormat::Json => self.write_json(&mut out)?,
        }
        out.flush().map_err(io_err)?;
        info!(path = %path.display(), rows = self.rows.len(), "Report written");
        Ok(())
    }
}
