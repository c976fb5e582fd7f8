//! Query algebra — a nested structure of named nodes with named fields.
//!
//! The parser does not commit to a typed AST per query form; it produces a
//! generic tree whose shape varies with the query. Consumers walk it by field
//! name. The one convention every consumer relies on: each basic graph pattern
//! is a node with a `triples` field holding a list of `[subject, predicate,
//! object]` lists.

use std::fmt;

use crate::model::{PathExpression, Term};

/// Field name under which basic graph patterns store their triples.
pub const TRIPLES_FIELD: &str = "triples";

/// A node of the query algebra.
#[derive(Debug, Clone, PartialEq)]
pub enum Algebra {
    /// Named node with ordered named fields: `BGP`, `LeftJoin`, `Filter`, ...
    Node { name: String, fields: Vec<(String, Algebra)> },
    List(Vec<Algebra>),
    Term(Term),
    Path(PathExpression),
    /// Operator symbols, function names, flags.
    Atom(String),
}

impl Algebra {
    pub fn node(name: impl Into<String>) -> Self {
        Algebra::Node { name: name.into(), fields: Vec::new() }
    }

    /// Builder: append a field to a `Node`. No-op on other variants.
    pub fn with(mut self, key: impl Into<String>, value: Algebra) -> Self {
        if let Algebra::Node { fields, .. } = &mut self {
            fields.push((key.into(), value));
        }
        self
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Algebra::Atom(text.into())
    }

    /// A basic graph pattern holding the given `[s, p, o]` lists.
    pub fn bgp(triples: Vec<Algebra>) -> Self {
        Algebra::node("BGP").with(TRIPLES_FIELD, Algebra::List(triples))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Algebra::Node { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Algebra> {
        match self {
            Algebra::Node { fields, .. } => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algebra::Node { name, fields } => {
                write!(f, "{name}(")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{key}={value}")?;
                }
                write!(f, ")")
            }
            Algebra::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Algebra::Term(term) => write!(f, "{term}"),
            Algebra::Path(path) => write!(f, "{path}"),
            Algebra::Atom(text) => f.write_str(text),
        }
    }
}
