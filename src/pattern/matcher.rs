//! Path matcher — does one data triple satisfy one normalized pattern?
//!
//! Matching is single-hop: a triple is tested on its own, never joined with
//! other triples. Two modes exist:
//!
//! - [`MatchMode::Approximate`] answers "is this predicate mentioned by the
//!   path". Sequence order, inverse direction and repetition are ignored, and
//!   a negated set matches any predicate that differs from at least one of
//!   its members. Selectivity figures are defined against this mode.
//! - [`MatchMode::Strict`] asks whether the triple could be one hop of a path
//!   match, honouring direction and negation.

use serde::{Deserialize, Serialize};

use crate::model::{PathExpression, PatternPredicate, Term, TriplePattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Approximate,
    Strict,
}

impl MatchMode {
    pub fn matches(self, pattern: &TriplePattern, subject: &Term, predicate: &str, object: &Term) -> bool {
        match self {
            MatchMode::Approximate => matches(pattern, subject, predicate, object),
            MatchMode::Strict => matches_strict(pattern, subject, predicate, object),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Approximate => "approximate",
            MatchMode::Strict => "strict",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approximate" => Ok(MatchMode::Approximate),
            "strict" => Ok(MatchMode::Strict),
            other => Err(format!("Unknown match mode '{other}'")),
        }
    }
}

// ============================================================================
// Approximate
// ============================================================================

/// Approximate match: subject, predicate and object checks must all hold.
/// A variable predicate never matches.
pub fn matches(pattern: &TriplePattern, subject: &Term, predicate: &str, object: &Term) -> bool {
    let Some(path) = pattern.predicate.as_path() else {
        return false;
    };
    pattern.subject.matches(subject) && pattern.object.matches(object) && predicate_matches(path, predicate)
}

/// Predicate check of the approximate mode.
pub fn predicate_matches(path: &PathExpression, predicate: &str) -> bool {
    match path {
        PathExpression::Direct(iri) => iri == predicate,
        PathExpression::Alternative(_) | PathExpression::Sequence(_) | PathExpression::Inverse(_) => {
            path.operand_iris().iter().any(|iri| *iri == predicate)
        }
        // At least one excluded IRI differs, not all of them.
        PathExpression::Negated(excluded) => excluded.iter().any(|iri| iri != predicate),
        PathExpression::Repeated(child, _) => child.as_direct() == Some(predicate),
    }
}

// ============================================================================
// Strict
// ============================================================================

/// Directions in which a single triple can traverse a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Witness {
    forward: bool,
    backward: bool,
}

impl Witness {
    const NONE: Witness = Witness { forward: false, backward: false };

    fn forward(hit: bool) -> Self {
        Witness { forward: hit, backward: false }
    }

    fn flipped(self) -> Self {
        Witness { forward: self.backward, backward: self.forward }
    }

    fn union(self, other: Witness) -> Self {
        Witness {
            forward: self.forward || other.forward,
            backward: self.backward || other.backward,
        }
    }
}

fn witness(path: &PathExpression, predicate: &str) -> Witness {
    match path {
        PathExpression::Direct(iri) => Witness::forward(iri == predicate),
        PathExpression::Inverse(child) => witness(child, predicate).flipped(),
        PathExpression::Alternative(children) => children
            .iter()
            .fold(Witness::NONE, |acc, child| acc.union(witness(child, predicate))),
        PathExpression::Sequence(children) => {
            let mut acc = Witness::NONE;
            for (i, child) in children.iter().enumerate() {
                let rest_nullable = children
                    .iter()
                    .enumerate()
                    .all(|(j, other)| j == i || other.is_nullable());
                if rest_nullable {
                    acc = acc.union(witness(child, predicate));
                }
            }
            acc
        }
        PathExpression::Negated(excluded) => Witness::forward(excluded.iter().all(|iri| iri != predicate)),
        PathExpression::Repeated(child, _) => witness(child, predicate),
    }
}

/// Strict single-hop match.
///
/// An inverse orientation compares the pattern subject with the triple object
/// and the pattern object with the triple subject.
pub fn matches_strict(pattern: &TriplePattern, subject: &Term, predicate: &str, object: &Term) -> bool {
    let w = match &pattern.predicate {
        PatternPredicate::Path(path) => witness(path, predicate),
        PatternPredicate::Variable => Witness::NONE,
    };
    (w.forward && pattern.subject.matches(subject) && pattern.object.matches(object))
        || (w.backward && pattern.subject.matches(object) && pattern.object.matches(subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathModifier, PatternTerm};

    const P1: &str = "http://x/p1";
    const P2: &str = "http://x/p2";

    fn d(iri: &str) -> PathExpression {
        PathExpression::direct(iri)
    }

    fn var_pattern(path: PathExpression) -> TriplePattern {
        TriplePattern::new(PatternTerm::Variable, path, PatternTerm::Variable)
    }

    fn a() -> Term {
        Term::iri("http://a")
    }

    fn b() -> Term {
        Term::iri("http://b")
    }

    #[test]
    fn test_direct_and_constants() {
        let pattern = TriplePattern::new(
            PatternTerm::Variable,
            d("http://x/p"),
            PatternTerm::Constant(Term::literal("v")),
        );
        assert!(matches(&pattern, &a(), "http://x/p", &Term::literal("v")));
        assert!(!matches(&pattern, &a(), "http://x/p", &Term::literal("w")));
        assert!(!matches(&pattern, &a(), "http://x/q", &Term::literal("v")));
    }

    #[test]
    fn test_alternative_any_operand() {
        let pattern = var_pattern(PathExpression::alternative(vec![d(P1), d(P2)]));
        assert!(matches(&pattern, &a(), P2, &b()));
        assert!(!matches(&pattern, &a(), "http://x/p3", &b()));
    }

    #[test]
    fn test_sequence_and_inverse_ignore_order_and_direction() {
        let seq = var_pattern(PathExpression::sequence(vec![d(P1), d(P2)]));
        assert!(matches(&seq, &a(), P1, &b()));
        assert!(matches(&seq, &a(), P2, &b()));

        let inv = TriplePattern::new(
            PatternTerm::Constant(a()),
            PathExpression::inverse(d(P1)),
            PatternTerm::Variable,
        );
        // Subject is still checked against the triple subject.
        assert!(matches(&inv, &a(), P1, &b()));
        assert!(!matches(&inv, &b(), P1, &a()));
    }

    #[test]
    fn test_composite_operands_contribute_nothing() {
        let nested = var_pattern(PathExpression::alternative(vec![
            PathExpression::sequence(vec![d(P1), d(P2)]),
            d("http://x/p3"),
        ]));
        assert!(!matches(&nested, &a(), P1, &b()));
        assert!(matches(&nested, &a(), "http://x/p3", &b()));
    }

    #[test]
    fn test_negated_differs_from_at_least_one() {
        let single = var_pattern(PathExpression::negated([P1]));
        assert!(matches(&single, &a(), P2, &b()));
        assert!(!matches(&single, &a(), P1, &b()));

        let pair = var_pattern(PathExpression::negated([P1, P2]));
        assert!(matches(&pair, &a(), P1, &b()));
        assert!(matches(&pair, &a(), P2, &b()));
    }

    #[test]
    fn test_repeated_ignores_modifier() {
        for modifier in [PathModifier::ZeroOrMore, PathModifier::OneOrMore, PathModifier::ZeroOrOne] {
            let pattern = var_pattern(PathExpression::repeated(d(P1), modifier));
            assert!(matches(&pattern, &a(), P1, &b()));
            assert!(!matches(&pattern, &a(), P2, &b()));
        }
    }

    #[test]
    fn test_strict_inverse_flips_orientation() {
        let inv = TriplePattern::new(
            PatternTerm::Constant(a()),
            PathExpression::inverse(d(P1)),
            PatternTerm::Variable,
        );
        assert!(matches_strict(&inv, &b(), P1, &a()));
        assert!(!matches_strict(&inv, &a(), P1, &b()));
    }

    #[test]
    fn test_strict_sequence_needs_nullable_rest() {
        let seq = var_pattern(PathExpression::sequence(vec![d(P1), d(P2)]));
        assert!(!matches_strict(&seq, &a(), P1, &b()));

        let optional_tail = var_pattern(PathExpression::sequence(vec![
            d(P1),
            PathExpression::repeated(d(P2), PathModifier::ZeroOrOne),
        ]));
        assert!(matches_strict(&optional_tail, &a(), P1, &b()));
        assert!(matches_strict(&optional_tail, &a(), P2, &b()));
    }

    #[test]
    fn test_strict_negated_differs_from_all() {
        let pair = var_pattern(PathExpression::negated([P1, P2]));
        assert!(!matches_strict(&pair, &a(), P1, &b()));
        assert!(matches_strict(&pair, &a(), "http://x/p3", &b()));
    }

    #[test]
    fn test_variable_predicate_never_matches() {
        let pattern = TriplePattern::new(PatternTerm::Variable, PatternPredicate::Variable, PatternTerm::Variable);
        for mode in [MatchMode::Approximate, MatchMode::Strict] {
            assert!(!mode.matches(&pattern, &a(), P1, &b()));
        }
    }

    #[test]
    fn test_mode_dispatch_and_parse() {
        let pair = var_pattern(PathExpression::negated([P1, P2]));
        assert!(MatchMode::Approximate.matches(&pair, &a(), P1, &b()));
        assert!(!MatchMode::Strict.matches(&pair, &a(), P1, &b()));
        assert_eq!("STRICT".parse::<MatchMode>(), Ok(MatchMode::Strict));
        assert!("fuzzy".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::default(), MatchMode::Approximate);
    }
}
