//! Pattern extraction — walks a query's algebra tree for triple-shaped entries.

use std::collections::VecDeque;

use tracing::warn;

use crate::model::{PathExpression, PatternPredicate, Term};
use crate::sparql::{Algebra, TRIPLES_FIELD};

/// A triple as written in the query, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTriple {
    pub subject: Term,
    pub predicate: PatternPredicate,
    pub object: Term,
}

/// Collect every well-formed `[subject, predicate, object]` entry found under
/// a `triples` field anywhere in the tree.
///
/// Entries that are not exactly three terms, or whose predicate is not an IRI,
/// path or variable, are skipped with a warning. Duplicates are kept.
pub fn extract_triples(query_id: &str, algebra: &Algebra) -> Vec<RawTriple> {
    let mut found = Vec::new();
    let mut queue: VecDeque<&Algebra> = VecDeque::from([algebra]);

    while let Some(item) = queue.pop_front() {
        match item {
            Algebra::Node { fields, .. } => {
                for (key, value) in fields {
                    match value {
                        Algebra::List(entries) if key == TRIPLES_FIELD => {
                            for entry in entries {
                                match raw_triple(entry) {
                                    Ok(triple) => found.push(triple),
                                    Err(reason) => {
                                        warn!(query = query_id, entry = %entry, "Skipping pattern entry: {reason}");
                                    }
                                }
                            }
                        }
                        other => queue.push_back(other),
                    }
                }
            }
            Algebra::List(items) => queue.extend(items),
            Algebra::Term(_) | Algebra::Path(_) | Algebra::Atom(_) => {}
        }
    }

    found
}

fn raw_triple(entry: &Algebra) -> Result<RawTriple, String> {
    let Algebra::List(parts) = entry else {
        return Err("not a list".into());
    };
    let [subject, predicate, object] = parts.as_slice() else {
        return Err(format!("expected 3 terms, found {}", parts.len()));
    };
    let (Algebra::Term(subject), Algebra::Term(object)) = (subject, object) else {
        return Err("subject and object must be terms".into());
    };
    let predicate = match predicate {
        Algebra::Term(Term::Iri(iri)) => PathExpression::Direct(iri.clone()).into(),
        Algebra::Path(path) => path.clone().into(),
        Algebra::Term(Term::Variable(_)) => PatternPredicate::Variable,
        other => return Err(format!("unsupported predicate {other}")),
    };
    Ok(RawTriple {
        subject: subject.clone(),
        predicate,
        object: object.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql;

    fn term(t: Term) -> Algebra {
        Algebra::Term(t)
    }

    #[test]
    fn test_extracts_nested_patterns() {
        let algebra = sparql::parse(
            "SELECT * WHERE {
                ?s <http://x/p> ?o .
                OPTIONAL { ?s <http://x/q> \"v\" }
                FILTER EXISTS { ?o <http://x/r> ?z }
            }",
        )
        .unwrap();
        let triples = extract_triples("q-0", &algebra);
        assert_eq!(triples.len(), 3);
        let predicates: Vec<String> = triples.iter().map(|t| t.predicate.to_string()).collect();
        assert!(predicates.contains(&"<http://x/p>".to_string()));
        assert!(predicates.contains(&"<http://x/q>".to_string()));
        assert!(predicates.contains(&"<http://x/r>".to_string()));
    }

    #[test]
    fn test_duplicates_within_query_preserved() {
        let algebra = sparql::parse(
            "SELECT * { { ?a <http://x/p> ?b } UNION { ?c <http://x/p> ?d } }",
        )
        .unwrap();
        assert_eq!(extract_triples("q-0", &algebra).len(), 2);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let algebra = Algebra::bgp(vec![
            Algebra::List(vec![term(Term::variable("s")), term(Term::iri("http://x/p"))]),
            Algebra::List(vec![
                term(Term::variable("s")),
                term(Term::iri("http://x/p")),
                term(Term::variable("o")),
            ]),
            Algebra::List(vec![
                term(Term::variable("s")),
                term(Term::literal("p")),
                term(Term::variable("o")),
            ]),
        ]);
        let triples = extract_triples("q-0", &algebra);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].predicate, PatternPredicate::Path(PathExpression::direct("http://x/p")));
    }

    #[test]
    fn test_variable_predicate_is_kept() {
        let algebra = sparql::parse("SELECT * { ?s ?p ?o . ?s <http://x/q> ?z }").unwrap();
        let triples = extract_triples("q-0", &algebra);
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].predicate, PatternPredicate::Variable);
        assert_eq!(triples[1].predicate.to_string(), "<http://x/q>");
    }

    #[test]
    fn test_query_without_patterns() {
        let algebra = sparql::parse("DESCRIBE <http://x/a>").unwrap();
        assert!(extract_triples("q-0", &algebra).is_empty());
    }
}
