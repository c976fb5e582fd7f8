//! N-Quads / N-Triples documents via `oxttl`.
//!
//! The graph label of a quad is dropped: a document is treated as a single
//! graph.

use std::path::Path;

use hashbrown::HashSet;
use oxrdf::{NamedNode, NamedOrBlankNode};
use oxttl::{NQuadsParser, NTriplesParser, TurtleSyntaxError};

use crate::model::{Literal, Term};
use crate::{Error, Result};
use super::{DocumentFormat, Triple};

/// Parse a whole document. Duplicate statements are kept once, in first-seen order.
pub fn parse_str(input: &str, format: DocumentFormat, source: &Path) -> Result<Vec<Triple>> {
    let mut collector = Collector::default();
    match format {
        DocumentFormat::NQuads => {
            for quad in NQuadsParser::new().for_slice(input.as_bytes()) {
                let quad = quad.map_err(|e| syntax_error(source, e))?;
                collector.push(quad.subject, quad.predicate, quad.object);
            }
        }
        DocumentFormat::NTriples => {
            for triple in NTriplesParser::new().for_slice(input.as_bytes()) {
                let triple = triple.map_err(|e| syntax_error(source, e))?;
                collector.push(triple.subject, triple.predicate, triple.object);
            }
        }
    }
    Ok(collector.triples)
}

#[derive(Default)]
struct Collector {
    seen: HashSet<Triple>,
    triples: Vec<Triple>,
}

impl Collector {
    fn push(&mut self, subject: NamedOrBlankNode, predicate: NamedNode, object: oxrdf::Term) {
        let triple = Triple {
            subject: match subject {
                NamedOrBlankNode::NamedNode(node) => Term::Iri(node.into_string()),
                NamedOrBlankNode::BlankNode(node) => Term::BlankNode(node.into_string()),
            },
            predicate: predicate.into_string(),
            object: convert_term(object),
        };
        if self.seen.insert(triple.clone()) {
            self.triples.push(triple);
        }
    }
}

fn convert_term(term: oxrdf::Term) -> Term {
    match term {
        oxrdf::Term::NamedNode(node) => Term::Iri(node.into_string()),
        oxrdf::Term::BlankNode(node) => Term::BlankNode(node.into_string()),
        oxrdf::Term::Literal(literal) => Term::Literal(convert_literal(&literal)),
    }
}

fn convert_literal(literal: &oxrdf::Literal) -> Literal {
    match literal.language() {
        Some(language) => Literal::lang_tagged(literal.value(), language),
        None => Literal::typed(literal.value(), literal.datatype().as_str()),
    }
}

fn syntax_error(source: &Path, error: TurtleSyntaxError) -> Error {
    Error::Document {
        path: source.to_path_buf(),
        line: usize::try_from(error.location().start.line).map_or(usize::MAX, |line| line + 1),
        message: error.message().to_string(),
    }
}
