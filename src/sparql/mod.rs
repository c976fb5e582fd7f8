//! # SPARQL Query Language
//!
//! SPARQL 1.1 query parser producing the generic [`Algebra`] tree.
//! Pure functions — no I/O, no state.

pub mod algebra;
pub mod lexer;
pub mod parser;

use crate::Result;
pub use algebra::{Algebra, TRIPLES_FIELD};

/// Parse a SPARQL query string into its algebra tree.
pub fn parse(query: &str) -> Result<Algebra> {
    let tokens = lexer::tokenize(query)?;
    parser::parse_query(&tokens)
}
