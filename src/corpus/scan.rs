//! Corpus scan — every triple of every document against the registry.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::pattern::{MatchMode, PatternId, PatternRegistry};
use crate::rdf::{self, Triple};
use crate::{Error, Result};
use super::{documents, partitions, CorpusTotals, Document, DocumentFilter, Partition, PredicateIndex, ScanAccumulator};

/// Matches corpus triples against a fully built registry.
pub struct Scanner<'a> {
    registry: &'a PatternRegistry,
    filter: &'a DocumentFilter,
    mode: MatchMode,
    index: Option<PredicateIndex>,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a PatternRegistry, filter: &'a DocumentFilter, mode: MatchMode) -> Self {
        Self { registry, filter, mode, index: None }
    }

    /// Only test patterns whose predicate could match, bucketed by IRI.
    pub fn with_predicate_index(mut self) -> Self {
        self.index = Some(PredicateIndex::build(self.registry));
        self
    }

    /// Scan the whole corpus. With `jobs > 1`, partitions are spread over
    /// worker threads; the result is the same as a sequential scan.
    pub fn scan(&self, root: &Path, jobs: NonZeroUsize) -> Result<ScanAccumulator> {
        let partitions = partitions(root)?;
        info!(
            root = %root.display(),
            partitions = partitions.len(),
            patterns = self.registry.len(),
            mode = self.mode.as_str(),
            "Scanning corpus"
        );

        let workers = jobs.get().min(partitions.len());
        let acc = if workers > 1 {
            self.scan_parallel(partitions, workers)?
        } else {
            let mut acc = ScanAccumulator::new(self.registry.len());
            for partition in &partitions {
                acc.merge(self.scan_partition(partition)?);
            }
            acc
        };

        info!(
            pods = acc.totals.pods,
            documents = acc.totals.documents,
            triples = acc.totals.triples,
            "Corpus scanned"
        );
        Ok(acc)
    }

    fn scan_parallel(&self, partitions: Vec<Partition>, workers: usize) -> Result<ScanAccumulator> {
        let queue = Mutex::new(VecDeque::from(partitions));
        let failed = AtomicBool::new(false);
        let (queue, failed) = (&queue, &failed);

        let results: Vec<Result<ScanAccumulator>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(move || {
                        let mut acc = ScanAccumulator::new(self.registry.len());
                        while !failed.load(Ordering::Relaxed) {
                            let Some(partition) = queue.lock().pop_front() else {
                                break;
                            };
                            match self.scan_partition(&partition) {
                                Ok(part) => acc.merge(part),
                                Err(err) => {
                                    failed.store(true, Ordering::Relaxed);
                                    return Err(err);
                                }
                            }
                        }
                        Ok(acc)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut total = ScanAccumulator::new(self.registry.len());
        for result in results {
            total.merge(result?);
        }
        Ok(total)
    }

    /// Scan one partition into a fresh accumulator.
    pub fn scan_partition(&self, partition: &Partition) -> Result<ScanAccumulator> {
        let mut acc = ScanAccumulator::new(self.registry.len());
        acc.totals.pods = 1;
        let docs = documents(partition, self.filter)?;
        debug!(partition = %partition.id, documents = docs.len(), "Scanning partition");
        for doc in &docs {
            self.scan_document(&mut acc, doc, &partition.id)?;
        }
        Ok(acc)
    }

    fn scan_document(&self, acc: &mut ScanAccumulator, doc: &Document, pod: &str) -> Result<()> {
        let triples = rdf::read_document(&doc.path, doc.format)?;
        acc.totals.documents += 1;
        acc.totals.triples += triples.len() as u64;
        for triple in &triples {
            match &self.index {
                Some(index) => {
                    for id in index.candidates(&triple.predicate) {
                        self.test(acc, id, triple, &doc.id, pod);
                    }
                }
                None => {
                    for (id, _) in self.registry.iter() {
                        self.test(acc, id, triple, &doc.id, pod);
                    }
                }
            }
        }
        Ok(())
    }

    fn test(&self, acc: &mut ScanAccumulator, id: PatternId, triple: &Triple, doc: &str, pod: &str) {
        let Some(entry) = self.registry.get(id) else {
            return;
        };
        if self.mode.matches(&entry.pattern, &triple.subject, &triple.predicate, &triple.object) {
            acc.record_match(id, doc, pod);
        }
    }
}

/// Corpus totals without any patterns.
pub fn summarize_corpus(root: &Path, filter: &DocumentFilter) -> Result<CorpusTotals> {
    if !root.is_dir() {
        return Err(Error::Config(format!("Corpus root {} is not a directory", root.display())));
    }
    let registry = PatternRegistry::new();
    let acc = Scanner::new(&registry, filter, MatchMode::default()).scan(root, NonZeroUsize::MIN)?;
    Ok(acc.totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::model::{PathExpression, PatternTerm, Term, TriplePattern};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "pod1/card.nq",
            "<http://a> <http://x/p> \"v\" .\n<http://a> <http://x/q> <http://b> .\n",
        );
        write(dir.path(), "pod2/posts/one.nq", "<http://b> <http://x/p> \"w\" .\n");
        write(dir.path(), "pod2/posts/.meta", "not rdf at all");
        dir
    }

    fn registry() -> PatternRegistry {
        let mut registry = PatternRegistry::new();
        registry.register(
            "q-0",
            TriplePattern::new(PatternTerm::Variable, PathExpression::direct("http://x/p"), PatternTerm::Variable),
        );
        registry.register(
            "q-0",
            TriplePattern::new(
                PatternTerm::Variable,
                PathExpression::direct("http://x/p"),
                PatternTerm::Constant(Term::literal("v")),
            ),
        );
        registry.register(
            "q-1",
            TriplePattern::new(PatternTerm::Variable, PathExpression::negated(["http://x/p"]), PatternTerm::Variable),
        );
        registry
    }

    fn nq() -> DocumentFilter {
        DocumentFilter::from_extensions(&[".nq".to_string()]).unwrap()
    }

    fn counts(acc: &ScanAccumulator) -> Vec<(u64, usize, usize)> {
        acc.metrics
            .iter()
            .map(|m| (m.matching_triples, m.matching_documents.len(), m.matching_pods.len()))
            .collect()
    }

    #[test]
    fn test_brute_force_scan() {
        let dir = corpus();
        let registry = registry();
        let filter = nq();
        let acc = Scanner::new(&registry, &filter, MatchMode::Approximate)
            .scan(dir.path(), NonZeroUsize::MIN)
            .unwrap();
        assert_eq!(acc.totals, CorpusTotals { pods: 2, documents: 2, triples: 3 });
        assert_eq!(counts(&acc), [(2, 2, 2), (1, 1, 1), (1, 1, 1)]);
    }

    #[test]
    fn test_index_and_parallel_agree_with_brute_force() {
        let dir = corpus();
        let registry = registry();
        let filter = nq();
        let jobs = NonZeroUsize::new(4).unwrap();
        let plain = Scanner::new(&registry, &filter, MatchMode::Approximate)
            .scan(dir.path(), NonZeroUsize::MIN)
            .unwrap();
        let indexed = Scanner::new(&registry, &filter, MatchMode::Approximate)
            .with_predicate_index()
            .scan(dir.path(), jobs)
            .unwrap();
        assert_eq!(counts(&plain), counts(&indexed));
        assert_eq!(plain.totals, indexed.totals);
    }

    #[test]
    fn test_malformed_document_fails_scan() {
        let dir = corpus();
        write(dir.path(), "pod3/bad.nq", "<http://a> <http://x/p>\n");
        let registry = registry();
        let filter = nq();
        let jobs = NonZeroUsize::new(2).unwrap();
        let result = Scanner::new(&registry, &filter, MatchMode::Approximate).scan(dir.path(), jobs);
        assert!(matches!(result, Err(Error::Document { line: 1, .. })));
    }

    #[test]
    fn test_summarize_corpus() {
        let dir = corpus();
        let totals = summarize_corpus(dir.path(), &nq()).unwrap();
        assert_eq!(totals, CorpusTotals { pods: 2, documents: 2, triples: 3 });
        assert!(summarize_corpus(&dir.path().join("missing"), &nq()).is_err());
    }
}
