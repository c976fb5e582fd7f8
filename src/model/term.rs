//! RDF terms as they come out of the query parser and the document parser.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `xsd:string`, the datatype of every simple literal in RDF 1.1.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A raw term: what a query or a document actually wrote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Term {
    Iri(String),
    Literal(Literal),
    BlankNode(String),
    Variable(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(lexical))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Blank nodes and variables both act as "anything" in a pattern.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Term::BlankNode(_) | Term::Variable(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write_iri(f, iri),
            Term::Literal(lit) => write!(f, "{lit}"),
            Term::BlankNode(label) => write!(f, "_:{label}"),
            Term::Variable(name) => write!(f, "?{name}"),
        }
    }
}

/// An RDF literal.
///
/// Simple literals are stored with the `xsd:string` datatype so that `"v"`
/// and `"v"^^xsd:string` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: String,
    pub language: Option<String>,
}

impl Literal {
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: XSD_STRING.to_string(),
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Language tags are case-insensitive; they are kept lowercased.
    pub fn lang_tagged(lexical: impl Into<String>, language: &str) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")?;
        match &self.language {
            Some(lang) => write!(f, "@{lang}"),
            None if self.datatype == XSD_STRING => Ok(()),
            None => {
                f.write_str("^^")?;
                write_iri(f, &self.datatype)
            }
        }
    }
}

pub(crate) fn write_iri(f: &mut fmt::Formatter<'_>, iri: &str) -> fmt::Result {
    write!(f, "<{iri}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_literal_equals_xsd_string() {
        assert_eq!(Literal::simple("v"), Literal::typed("v", XSD_STRING));
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::simple("v").to_string(), "\"v\"");
        assert_eq!(Literal::lang_tagged("hi", "EN").to_string(), "\"hi\"@en");
        assert_eq!(
            Literal::typed("1", XSD_INTEGER).to_string(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        assert_eq!(Literal::simple("a\tb\"").to_string(), "\"a\\tb\\\"\"");
    }

    #[test]
    fn test_placeholder() {
        assert!(Term::blank("b0").is_placeholder());
        assert!(Term::variable("x").is_placeholder());
        assert!(!Term::iri("http://x").is_placeholder());
        assert!(!Term::literal("v").is_placeholder());
    }
}
