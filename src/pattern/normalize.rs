//! Pattern normalization — raw terms to constant / variable slots.

use crate::model::{PatternTerm, Term, TriplePattern};
use super::extract::RawTriple;

/// Blank nodes and variables become [`PatternTerm::Variable`]; IRIs and
/// literals stay constants. The predicate is carried through unchanged.
pub fn normalize(raw: RawTriple) -> TriplePattern {
    TriplePattern {
        subject: normalize_term(raw.subject),
        predicate: raw.predicate,
        object: normalize_term(raw.object),
    }
}

pub fn normalize_term(term: Term) -> PatternTerm {
    if term.is_placeholder() {
        PatternTerm::Variable
    } else {
        PatternTerm::Constant(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathExpression;

    fn raw(subject: Term, object: Term) -> RawTriple {
        RawTriple {
            subject,
            predicate: PathExpression::direct("http://x/p").into(),
            object,
        }
    }

    #[test]
    fn test_blank_nodes_and_variables_collapse() {
        let a = normalize(raw(Term::blank("b0"), Term::variable("x")));
        let b = normalize(raw(Term::variable("who"), Term::blank("other")));
        assert_eq!(a, b);
        assert!(a.subject.is_variable());
        assert!(a.object.is_variable());
    }

    #[test]
    fn test_constants_kept() {
        let pattern = normalize(raw(Term::iri("http://a"), Term::literal("v")));
        assert_eq!(pattern.subject, PatternTerm::Constant(Term::iri("http://a")));
        assert_eq!(pattern.object, PatternTerm::Constant(Term::literal("v")));
    }
}
