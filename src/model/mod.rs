//! # Pattern Model
//!
//! Terms, property path expressions and normalized triple patterns.
//! These types cross every boundary: parser ↔ extractor ↔ registry ↔ scanner.
//!
//! This module is pure data — no I/O, no state.

pub mod term;
pub mod path;
pub mod pattern;

pub use term::{Term, Literal, RDF_TYPE, XSD_STRING, XSD_INTEGER, XSD_DECIMAL, XSD_DOUBLE, XSD_BOOLEAN};
pub use path::{PathExpression, PathModifier};
pub use pattern::{PatternPredicate, PatternTerm, TriplePattern};
