//! Property path expressions in predicate position.
//!
//! | Variant | Surface syntax |
//! |---------|----------------|
//! | `Direct` | `<iri>` |
//! | `Inverse` | `~path` |
//! | `Sequence` | `a/b/c` |
//! | `Alternative` | `a\|b\|c` |
//! | `Negated` | `!<iri>` or `!(<a>\|<b>)` |
//! | `Repeated` | `path*`, `path+`, `path?` |
//!
//! Equality and hashing are structural, so two paths written the same way in
//! different queries are the same key.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::term::write_iri;

/// Repetition modifier of a `Repeated` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathModifier {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
}

impl PathModifier {
    pub fn symbol(self) -> char {
        match self {
            PathModifier::ZeroOrMore => '*',
            PathModifier::OneOrMore => '+',
            PathModifier::ZeroOrOne => '?',
        }
    }

    /// Whether the modified path may be traversed zero times.
    pub fn allows_zero(self) -> bool {
        !matches!(self, PathModifier::OneOrMore)
    }
}

/// A predicate-position path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathExpression {
    Direct(String),
    Inverse(Box<PathExpression>),
    Sequence(Vec<PathExpression>),
    Alternative(Vec<PathExpression>),
    Negated(SmallVec<[String; 2]>),
    Repeated(Box<PathExpression>, PathModifier),
}

impl PathExpression {
    pub fn direct(iri: impl Into<String>) -> Self {
        PathExpression::Direct(iri.into())
    }

    pub fn inverse(path: PathExpression) -> Self {
        PathExpression::Inverse(Box::new(path))
    }

    pub fn repeated(path: PathExpression, modifier: PathModifier) -> Self {
        PathExpression::Repeated(Box::new(path), modifier)
    }

    pub fn negated<I, S>(iris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathExpression::Negated(iris.into_iter().map(Into::into).collect())
    }

    /// Build a sequence, splicing nested sequences into one operand list.
    /// A single operand is returned as-is.
    pub fn sequence(parts: Vec<PathExpression>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                PathExpression::Sequence(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(PathExpression::Sequence(Vec::new()))
        } else {
            PathExpression::Sequence(flat)
        }
    }

    /// Build an alternative, splicing nested alternatives into one operand list.
    /// A single operand is returned as-is.
    pub fn alternative(parts: Vec<PathExpression>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                PathExpression::Alternative(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(PathExpression::Alternative(Vec::new()))
        } else {
            PathExpression::Alternative(flat)
        }
    }

    pub fn as_direct(&self) -> Option<&str> {
        match self {
            PathExpression::Direct(iri) => Some(iri),
            _ => None,
        }
    }

    /// IRIs written as immediate operands of this expression.
    ///
    /// Composite operands (a nested sequence inside an alternative, say)
    /// contribute nothing; only bare IRIs one level down are returned.
    pub fn operand_iris(&self) -> SmallVec<[&str; 4]> {
        match self {
            PathExpression::Direct(iri) => SmallVec::from_elem(iri.as_str(), 1),
            PathExpression::Inverse(child) | PathExpression::Repeated(child, _) => {
                child.as_direct().into_iter().collect()
            }
            PathExpression::Sequence(children) | PathExpression::Alternative(children) => {
                children.iter().filter_map(PathExpression::as_direct).collect()
            }
            PathExpression::Negated(excluded) => excluded.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the path can be satisfied by a zero-length traversal.
    pub fn is_nullable(&self) -> bool {
        match self {
            PathExpression::Direct(_) | PathExpression::Negated(_) => false,
            PathExpression::Inverse(child) => child.is_nullable(),
            PathExpression::Sequence(children) => children.iter().all(PathExpression::is_nullable),
            PathExpression::Alternative(children) => children.iter().any(PathExpression::is_nullable),
            PathExpression::Repeated(child, modifier) => {
                modifier.allows_zero() || child.is_nullable()
            }
        }
    }

    /// Binding strength for rendering: higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            PathExpression::Alternative(children) if children.len() > 1 => 0,
            PathExpression::Sequence(children) if children.len() > 1 => 1,
            PathExpression::Inverse(_) => 2,
            PathExpression::Repeated(..) => 3,
            _ => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathExpression::Direct(iri) => write_iri(f, iri),
            PathExpression::Inverse(child) => {
                f.write_str("~")?;
                child.fmt_operand(f, 3)
            }
            PathExpression::Sequence(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 { f.write_str("/")?; }
                    child.fmt_operand(f, 2)?;
                }
                Ok(())
            }
            PathExpression::Alternative(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 { f.write_str("|")?; }
                    child.fmt_operand(f, 1)?;
                }
                Ok(())
            }
            PathExpression::Negated(excluded) => {
                f.write_str("!")?;
                if excluded.len() == 1 {
                    return write_iri(f, &excluded[0]);
                }
                f.write_str("(")?;
                for (i, iri) in excluded.iter().enumerate() {
                    if i > 0 { f.write_str("|")?; }
                    write_iri(f, iri)?;
                }
                f.write_str(")")
            }
            PathExpression::Repeated(child, modifier) => {
                child.fmt_operand(f, 4)?;
                write!(f, "{}", modifier.symbol())
            }
        }
    }
}
