//! Scan accumulators.
//!
//! Metrics only grow during a scan. Merging two accumulators unions the sets
//! and sums the counters, so partitions may be scanned in any order or on
//! separate threads.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::pattern::PatternId;

/// Corpus-wide denominators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusTotals {
    pub pods: u64,
    pub documents: u64,
    pub triples: u64,
}

impl CorpusTotals {
    pub fn merge(&mut self, other: CorpusTotals) {
        self.pods += other.pods;
        self.documents += other.documents;
        self.triples += other.triples;
    }
}

/// Per-pattern metrics while scanning.
#[derive(Debug, Clone, Default)]
pub struct PatternMetrics {
    pub matching_triples: u64,
    pub matching_documents: HashSet<String>,
    pub matching_pods: HashSet<String>,
}

impl PatternMetrics {
    pub fn record(&mut self, document: &str, pod: &str) {
        self.matching_triples += 1;
        if !self.matching_documents.contains(document) {
            self.matching_documents.insert(document.to_owned());
        }
        if !self.matching_pods.contains(pod) {
            self.matching_pods.insert(pod.to_owned());
        }
    }

    pub fn merge(&mut self, other: PatternMetrics) {
        self.matching_triples += other.matching_triples;
        self.matching_documents.extend(other.matching_documents);
        self.matching_pods.extend(other.matching_pods);
    }
}

/// Metrics for every registered pattern plus corpus totals.
#[derive(Debug, Clone, Default)]
pub struct ScanAccumulator {
    pub metrics: Vec<PatternMetrics>,
    pub totals: CorpusTotals,
}

impl ScanAccumulator {
    /// An empty accumulator sized for `patterns` registry entries.
    pub fn new(patterns: usize) -> Self {
        Self {
            metrics: vec![PatternMetrics::default(); patterns],
            totals: CorpusTotals::default(),
        }
    }

    pub fn record_match(&mut self, id: PatternId, document: &str, pod: &str) {
        self.metrics[id.0].record(document, pod);
    }

    pub fn get(&self, id: PatternId) -> Option<&PatternMetrics> {
        self.metrics.get(id.0)
    }

    pub fn merge(&mut self, other: ScanAccumulator) {
        if self.metrics.len() < other.metrics.len() {
            self.metrics.resize_with(other.metrics.len(), PatternMetrics::default);
        }
        for (mine, theirs) in self.metrics.iter_mut().zip(other.metrics) {
            mine.merge(theirs);
        }
        self.totals.merge(other.totals);
    }
}
