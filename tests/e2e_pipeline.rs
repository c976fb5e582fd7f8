//! End-to-end tests for the full selectivity pipeline.
//!
//! Each test lays out a query directory and a pod corpus in a temp dir and
//! runs: load queries -> extract -> normalize -> register -> scan -> report.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use pretty_assertions::assert_eq;
use sparql_selectivity::{analyze, Error, MatchMode, PatternRow, RecapConfig, Report, ReportFormat};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

struct Fixture {
    _dir: TempDir,
    config: RecapConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pods = dir.path().join("pods");
        let queries = dir.path().join("queries");
        fs::create_dir_all(&pods).unwrap();
        fs::create_dir_all(&queries).unwrap();
        Self { config: RecapConfig::new(pods, queries), _dir: dir }
    }

    fn query(&self, name: &str, content: &str) -> &Self {
        write(&self.config.queries, name, content);
        self
    }

    fn doc(&self, rel: &str, content: &str) -> &Self {
        write(&self.config.pods, rel, content);
        self
    }

    fn run(&self) -> Report {
        analyze(&self.config).unwrap()
    }
}

fn row<'a>(report: &'a Report, pattern: &str) -> &'a PatternRow {
    report
        .rows
        .iter()
        .find(|r| r.pattern == pattern)
        .unwrap_or_else(|| panic!("no row for {pattern}; rows: {:?}", report.rows))
}

// ============================================================================
// 1. Query ids: one per statement, file stem plus index
// ============================================================================

#[test]
fn test_two_statements_yield_two_ids() {
    let fx = Fixture::new();
    fx.query(
        "q.sparql",
        "SELECT * WHERE { ?s <http://x/a> ?o }\n\nSELECT * WHERE { ?s <http://x/b> ?o }",
    )
    .doc("pod/doc.nq", "<http://s> <http://x/a> <http://o> .\n");

    let texts = sparql_selectivity::query::read_queries(
        &fx.config.queries,
        &fx.config.query_extensions,
        &fx.config.exclusions,
    )
    .unwrap();
    let ids: Vec<&str> = texts.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, ["q-0", "q-1"]);

    let report = fx.run();
    assert_eq!(report.total_queries, 2);
    assert_eq!(report.rows.len(), 2);
}

// ============================================================================
// 2. Single triple, single document, single pod
// ============================================================================

#[test]
fn test_single_triple_corpus() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT ?x WHERE { ?x <http://x/p> \"v\" }")
        .doc("pod/doc.nq", "<http://a> <http://x/p> \"v\" .\n");

    let report = fx.run();
    let r = row(&report, "?s <http://x/p> \"v\"");
    assert_eq!((r.matching_triples, r.matching_documents, r.matching_pods), (1, 1, 1));
    assert_eq!((r.total_triples, r.total_documents, r.total_pods), (1, 1, 1));
    assert_eq!((r.containing_queries, r.total_queries), (1, 1));
}

// ============================================================================
// 3. Path approximations
// ============================================================================

#[test]
fn test_alternative_matches_second_operand() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p1>|<http://x/p2> ?o }")
        .doc("pod/doc.nq", "<http://a> <http://x/p2> <http://b> .\n");

    let report = fx.run();
    assert_eq!(row(&report, "?s <http://x/p1>|<http://x/p2> ?o").matching_triples, 1);
}

#[test]
fn test_negated_matches_other_predicate() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s !<http://x/p1> ?o }")
        .doc("pod/doc.nq", "<http://a> <http://x/p2> <http://b> .\n<http://a> <http://x/p1> <http://b> .\n");

    let report = fx.run();
    let r = row(&report, "?s !<http://x/p1> ?o");
    assert_eq!(r.matching_triples, 1);
    assert_eq!(r.total_triples, 2);
}

#[test]
fn test_strict_mode_honours_sequence_order() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p1>/<http://x/p2> ?o }")
        .doc("pod/doc.nq", "<http://a> <http://x/p1> <http://b> .\n");

    let approximate = fx.run();
    assert_eq!(row(&approximate, "?s <http://x/p1>/<http://x/p2> ?o").matching_triples, 1);

    let strict = analyze(&fx.config.clone().with_match_mode(MatchMode::Strict)).unwrap();
    assert_eq!(row(&strict, "?s <http://x/p1>/<http://x/p2> ?o").matching_triples, 0);
}

// ============================================================================
// 4. Deduplication across queries and blank nodes
// ============================================================================

#[test]
fn test_same_shape_across_queries_is_one_row() {
    let fx = Fixture::new();
    fx.query(
        "a.sparql",
        "PREFIX x: <http://x/>\nSELECT * { ?person x:knows _:friend }",
    )
    .query("b.rq", "SELECT * { [] <http://x/knows> ?who . ?who <http://x/name> ?n }")
    .doc("pod/doc.nq", "<http://a> <http://x/knows> <http://b> .\n");

    let report = fx.run();
    assert_eq!(report.rows.len(), 2);
    let knows = row(&report, "?s <http://x/knows> ?o");
    assert_eq!(knows.containing_queries, 2);
    assert_eq!(knows.total_queries, 2);
    assert_eq!(row(&report, "?s <http://x/name> ?o").containing_queries, 1);
}

#[test]
fn test_patternless_query_counts_toward_total() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }\n\nDESCRIBE <http://a>")
        .doc("pod/doc.nq", "<http://a> <http://x/p> <http://b> .\n");

    let report = fx.run();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].total_queries, 2);
}

#[test]
fn test_variable_predicate_is_reported_without_matches() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s ?p ?o . ?s <http://x/q> ?z }")
        .query("r.sparql", "SELECT * { ?a ?b ?c }")
        .doc("pod/doc.nq", "<http://a> <http://x/q> <http://b> .\n");

    let report = fx.run();
    let patterns: Vec<&str> = report.rows.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, ["?s ?p ?o", "?s <http://x/q> ?o"]);

    let any = row(&report, "?s ?p ?o");
    assert_eq!(any.containing_queries, 2);
    assert_eq!(any.matching_triples, 0);
    assert_eq!(any.matching_documents, 0);
    assert_eq!(row(&report, "?s <http://x/q> ?o").matching_triples, 1);
}

#[test]
fn test_relative_query_iris_resolve_against_base() {
    let fx = Fixture::new();
    fx.query("q.sparql", "BASE <http://ex.org/a/b> SELECT * { ?s <c> ?o . ?s </root> ?o }")
        .doc(
            "pod/doc.nq",
            "<http://s> <http://ex.org/a/c> <http://o> .\n<http://s> <http://ex.org/root> <http://o> .\n",
        );

    let report = fx.run();
    assert_eq!(row(&report, "?s <http://ex.org/a/c> ?o").matching_triples, 1);
    assert_eq!(row(&report, "?s <http://ex.org/root> ?o").matching_triples, 1);
}

// ============================================================================
// 5. Corpus traversal
// ============================================================================

#[test]
fn test_nested_documents_and_sentinel() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }")
        .doc("pod1/profile/card.nq", "<http://a> <http://x/p> <http://b> .\n")
        .doc("pod1/posts/2024/01/post.nq", "<http://c> <http://x/p> <http://d> .\n<http://c> <http://x/q> \"t\" .\n")
        .doc("pod1/posts/.meta", "garbage that would not parse")
        .doc("pod2/.meta/hidden.nq", "<http://e> <http://x/p> <http://f> .\n")
        .doc("pod2/readme.txt", "not rdf")
        .doc("stray.nq", "<http://g> <http://x/p> <http://h> .\n");

    let report = fx.run();
    assert_eq!(report.totals.pods, 2);
    assert_eq!(report.totals.documents, 2);
    assert_eq!(report.totals.triples, 3);
    let r = row(&report, "?s <http://x/p> ?o");
    assert_eq!((r.matching_triples, r.matching_documents, r.matching_pods), (2, 2, 1));
}

#[test]
fn test_parallel_and_brute_force_agree() {
    let fx = Fixture::new();
    fx.query(
        "q.sparql",
        "SELECT * { ?s <http://x/p> ?o ; <http://x/q>+ ?z . ?z ^<http://x/r> <http://k> }\n\n\
         SELECT * { <http://a> !(<http://x/p>|<http://x/q>) ?o }",
    );
    for pod in 0..5 {
        for doc in 0..3 {
            fx.doc(
                &format!("pod{pod}/d{doc}.nq"),
                &format!(
                    "<http://a> <http://x/p> <http://n{doc}> .\n\
                     <http://n{doc}> <http://x/q> <http://k> .\n\
                     <http://k> <http://x/r> <http://p{pod}> .\n"
                ),
            );
        }
    }

    let baseline = analyze(&fx.config.clone().with_predicate_index(false)).unwrap();
    let parallel = analyze(
        &fx.config
            .clone()
            .with_predicate_index(true)
            .with_jobs(NonZeroUsize::new(3).unwrap()),
    )
    .unwrap();
    assert_eq!(baseline, parallel);
    assert_eq!(baseline.totals.pods, 5);
    assert_eq!(baseline.totals.triples, 45);
}

// ============================================================================
// 6. Failures
// ============================================================================

#[test]
fn test_malformed_document_aborts_run() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }")
        .doc("pod/good.nq", "<http://a> <http://x/p> <http://b> .\n")
        .doc("pod/bad.nq", "<http://a> <http://x/p> <http://b> .\n<http://a> oops .\n");

    match analyze(&fx.config) {
        Err(Error::Document { path, line, .. }) => {
            assert!(path.ends_with("bad.nq"));
            assert_eq!(line, 2);
        }
        other => panic!("Expected document error, got {other:?}"),
    }
}

#[test]
fn test_relative_iri_in_document_aborts_run() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }")
        .doc("pod/doc.nq", "<a> <p> <o> .\n");

    match analyze(&fx.config) {
        Err(Error::Document { path, line, .. }) => {
            assert!(path.ends_with("doc.nq"));
            assert_eq!(line, 1);
        }
        other => panic!("Expected document error, got {other:?}"),
    }
}

#[test]
fn test_bad_query_fails_before_scan() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }\n\nSELECT * { ?s <http://x/p> ")
        .doc("pod/bad.nq", "not a statement\n");

    match analyze(&fx.config) {
        Err(Error::InvalidQuery { id, file, .. }) => {
            assert_eq!(id, "q-1");
            assert!(file.ends_with("q.sparql"));
        }
        other => panic!("Expected invalid query, got {other:?}"),
    }
}

#[test]
fn test_excluded_query_files_are_skipped() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }")
        .query("complex-1.sparql", "this is not sparql")
        .query("notes.md", "neither is this")
        .doc("pod/doc.nq", "<http://a> <http://x/p> <http://b> .\n");

    let report = fx.run();
    assert_eq!(report.total_queries, 1);
}

#[test]
fn test_unknown_extension_is_config_error() {
    let fx = Fixture::new();
    let config = fx.config.clone().with_extensions(vec![".ttl".into()]);
    assert!(matches!(analyze(&config), Err(Error::Config(_))));
}

// ============================================================================
// 7. Output
// ============================================================================

#[test]
fn test_tsv_report_file() {
    let fx = Fixture::new();
    fx.query(
        "q.sparql",
        "PREFIX x: <http://x/>\nSELECT * { ?s x:p \"v\"@EN ; a x:Thing . ?s x:q* ?o }",
    )
    .doc(
        "pod/doc.nq",
        "<http://a> <http://x/p> \"v\"@en .\n\
         <http://a> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://x/Thing> .\n\
         <http://a> <http://x/q> <http://b> <http://graph> .\n",
    );

    let report = fx.run();
    let out = fx.config.pods.parent().unwrap().join("patterns.tsv");
    report.write_to(&out, ReportFormat::Tsv).unwrap();

    let expected = "\
pattern\tcontaining_queries\ttotal_queries\tmatching_pods\ttotal_pods\tmatching_documents\ttotal_documents\tmatching_triples\ttotal_triples
?s <http://x/p> \"v\"@en\t1\t1\t1\t1\t1\t1\t1\t3
?s <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://x/Thing>\t1\t1\t1\t1\t1\t1\t1\t3
?s <http://x/q>* ?o\t1\t1\t1\t1\t1\t1\t1\t3
";
    assert_eq!(fs::read_to_string(&out).unwrap(), expected);
}

#[test]
fn test_json_report_file() {
    let fx = Fixture::new();
    fx.query("q.sparql", "SELECT * { ?s <http://x/p> ?o }")
        .doc("pod/doc.nq", "<http://a> <http://x/p> <http://b> .\n");

    let report = fx.run();
    let out = fx.config.pods.parent().unwrap().join("patterns.json");
    report.write_to(&out, ReportFormat::Json).unwrap();

    let rows: Vec<PatternRow> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(rows, report.rows);
}
