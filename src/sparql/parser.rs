//! SPARQL recursive descent parser.
//!
//! Parses token streams into the generic [`Algebra`] tree. Supports:
//! - Prologue: BASE, PREFIX
//! - SELECT / CONSTRUCT / DESCRIBE / ASK, FROM [NAMED]
//! - Group graph patterns: triples blocks, OPTIONAL, UNION, MINUS, GRAPH,
//!   SERVICE, FILTER, BIND, VALUES, sub-SELECT
//! - Property paths with SPARQL 1.1 precedence
//! - GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET
//! - Full expression parsing with precedence

use std::collections::HashMap;

use oxiri::Iri;

use crate::model::{
    Literal, PathExpression, PathModifier, Term,
    RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER,
};
use crate::{Error, Result};
use super::algebra::Algebra;
use super::lexer::{Token, TokenKind};

const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

/// Parser state — wraps a token slice with cursor, prologue and blank-node counter.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    base: Option<Iri<String>>,
    prefixes: HashMap<String, String>,
    next_blank: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            base: None,
            prefixes: HashMap::new(),
            next_blank: 0,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_nth_kind(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text)))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: String) -> Error {
        Error::SyntaxError {
            position: self.peek().span.start,
            message: msg,
        }
    }

    fn fresh_blank(&mut self) -> Term {
        let label = format!("b{}", self.next_blank);
        self.next_blank += 1;
        Term::BlankNode(label)
    }

    /// RFC 3986 reference resolution against the BASE. Without a BASE the
    /// IRI is kept as written.
    fn resolve_iri(&self, iri: &str) -> Result<String> {
        match &self.base {
            Some(base) => base
                .resolve(iri)
                .map(Iri::into_inner)
                .map_err(|e| self.error(format!("Invalid IRI <{iri}>: {e}"))),
            None => Ok(iri.to_string()),
        }
    }

    fn expand_prefixed(&self, text: &str) -> Result<String> {
        let (prefix, local) = text.split_once(':').unwrap_or((text, ""));
        match self.prefixes.get(prefix) {
            Some(namespace) => Ok(format!("{namespace}{local}")),
            None => Err(self.error(format!("Undeclared prefix '{prefix}:'"))),
        }
    }

    /// Consume an IRI or prefixed name, returning the full IRI.
    fn take_iri(&mut self) -> Result<Option<String>> {
        match self.peek_kind() {
            TokenKind::Iri => {
                let raw = self.advance().text.clone();
                self.resolve_iri(&raw).map(Some)
            }
            TokenKind::PrefixedName => {
                let iri = self.expand_prefixed(&self.peek().text)?;
                self.advance();
                Ok(Some(iri))
            }
            _ => Ok(None),
        }
    }
}

/// Parse a complete SPARQL query from tokens.
pub fn parse_query(tokens: &[Token]) -> Result<Algebra> {
    let mut p = Parser::new(tokens);
    parse_prologue(&mut p)?;

    let mut query = match p.peek_kind() {
        TokenKind::Select => parse_select_query(&mut p)?,
        TokenKind::Construct => parse_construct_query(&mut p)?,
        TokenKind::Describe => parse_describe_query(&mut p)?,
        TokenKind::Ask => parse_ask_query(&mut p)?,
        kind => return Err(p.error(format!("Unexpected token {:?} at start of query", kind))),
    };

    if p.at(TokenKind::Values) {
        p.advance();
        query = query.with("values", parse_data_block(&mut p)?);
    }

    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!("Unexpected token after query: {:?} '{}'", p.peek_kind(), p.peek().text)));
    }

    Ok(query)
}

// ============================================================================
// Prologue and query forms
// ============================================================================

fn parse_prologue(p: &mut Parser) -> Result<()> {
    loop {
        if p.eat(TokenKind::Base) {
            let raw = p.expect(TokenKind::Iri)?.text.clone();
            let base = match &p.base {
                Some(current) => current.resolve(&raw),
                None => Iri::parse(raw.clone()),
            };
            let base = base.map_err(|e| p.error(format!("Invalid BASE <{raw}>: {e}")))?;
            p.base = Some(base);
        } else if p.eat(TokenKind::Prefix) {
            let name = p.expect(TokenKind::PrefixedName)?.text.clone();
            let Some(prefix) = name.strip_suffix(':') else {
                return Err(p.error(format!("Expected prefix declaration, got '{name}'")));
            };
            let prefix = prefix.to_string();
            let raw = p.expect(TokenKind::Iri)?.text.clone();
            let namespace = p.resolve_iri(&raw)?;
            p.prefixes.insert(prefix, namespace);
        } else {
            return Ok(());
        }
    }
}

fn parse_select_query(p: &mut Parser) -> Result<Algebra> {
    let projection = parse_select_clause(p)?;
    let dataset = parse_dataset_clauses(p)?;
    p.eat(TokenKind::Where);
    let pattern = parse_group_graph_pattern(p)?;
    let modifiers = parse_solution_modifiers(p)?;
    Ok(projection
        .with("datasetClause", dataset)
        .with("where", pattern)
        .with("modifiers", modifiers))
}

fn parse_select_clause(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::Select)?;
    let mut node = Algebra::node("SelectQuery");
    if p.eat(TokenKind::Distinct) {
        node = node.with("distinct", Algebra::atom("true"));
    } else if p.eat(TokenKind::Reduced) {
        node = node.with("reduced", Algebra::atom("true"));
    }

    if p.eat(TokenKind::Star) {
        return Ok(node.with("projection", Algebra::atom("*")));
    }

    let mut items = Vec::new();
    loop {
        match p.peek_kind() {
            TokenKind::Variable => {
                let name = p.advance().text.clone();
                items.push(Algebra::Term(Term::Variable(name)));
            }
            TokenKind::LParen => {
                p.advance();
                let expr = parse_expr(p)?;
                p.expect(TokenKind::As)?;
                let name = p.expect(TokenKind::Variable)?.text.clone();
                p.expect(TokenKind::RParen)?;
                items.push(Algebra::node("Extend")
                    .with("expr", expr)
                    .with("var", Algebra::Term(Term::Variable(name))));
            }
            _ => break,
        }
    }
    if items.is_empty() {
        return Err(p.error("Expected projection variables or '*' after SELECT".into()));
    }
    Ok(node.with("projection", Algebra::List(items)))
}

fn parse_construct_query(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::Construct)?;

    // Short form: CONSTRUCT WHERE { triples }
    if p.at(TokenKind::Where) {
        p.advance();
        p.expect(TokenKind::LBrace)?;
        let triples = parse_triples_template(p)?;
        p.expect(TokenKind::RBrace)?;
        let modifiers = parse_solution_modifiers(p)?;
        let pattern = Algebra::node("Group").with("parts", Algebra::List(vec![Algebra::bgp(triples.clone())]));
        return Ok(Algebra::node("ConstructQuery")
            .with("template", Algebra::List(triples))
            .with("where", pattern)
            .with("modifiers", modifiers));
    }

    p.expect(TokenKind::LBrace)?;
    let template = parse_triples_template(p)?;
    p.expect(TokenKind::RBrace)?;
    let dataset = parse_dataset_clauses(p)?;
    p.eat(TokenKind::Where);
    let pattern = parse_group_graph_pattern(p)?;
    let modifiers = parse_solution_modifiers(p)?;
    Ok(Algebra::node("ConstructQuery")
        .with("template", Algebra::List(template))
        .with("datasetClause", dataset)
        .with("where", pattern)
        .with("modifiers", modifiers))
}

fn parse_describe_query(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::Describe)?;
    let targets = if p.eat(TokenKind::Star) {
        Algebra::atom("*")
    } else {
        let mut items = Vec::new();
        loop {
            if p.at(TokenKind::Variable) {
                let name = p.advance().text.clone();
                items.push(Algebra::Term(Term::Variable(name)));
            } else if let Some(iri) = p.take_iri()? {
                items.push(Algebra::Term(Term::Iri(iri)));
            } else {
                break;
            }
        }
        if items.is_empty() {
            return Err(p.error("Expected variables, IRIs or '*' after DESCRIBE".into()));
        }
        Algebra::List(items)
    };
    let dataset = parse_dataset_clauses(p)?;
    let mut node = Algebra::node("DescribeQuery")
        .with("targets", targets)
        .with("datasetClause", dataset);
    if p.eat(TokenKind::Where) || p.at(TokenKind::LBrace) {
        node = node.with("where", parse_group_graph_pattern(p)?);
    }
    Ok(node.with("modifiers", parse_solution_modifiers(p)?))
}

fn parse_ask_query(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::Ask)?;
    let dataset = parse_dataset_clauses(p)?;
    p.eat(TokenKind::Where);
    let pattern = parse_group_graph_pattern(p)?;
    let modifiers = parse_solution_modifiers(p)?;
    Ok(Algebra::node("AskQuery")
        .with("datasetClause", dataset)
        .with("where", pattern)
        .with("modifiers", modifiers))
}

fn parse_dataset_clauses(p: &mut Parser) -> Result<Algebra> {
    let mut clauses = Vec::new();
    while p.eat(TokenKind::From) {
        let named = p.eat(TokenKind::Named);
        let Some(iri) = p.take_iri()? else {
            return Err(p.error("Expected IRI after FROM".into()));
        };
        clauses.push(Algebra::node(if named { "FromNamed" } else { "From" })
            .with("graph", Algebra::Term(Term::Iri(iri))));
    }
    Ok(Algebra::List(clauses))
}

// ============================================================================
// Solution modifiers
// ============================================================================

fn parse_solution_modifiers(p: &mut Parser) -> Result<Algebra> {
    let mut modifiers = Algebra::node("Modifiers");

    if p.at(TokenKind::Group) {
        p.advance();
        p.expect(TokenKind::By)?;
        let mut conditions = Vec::new();
        while let Some(condition) = parse_group_condition(p)? {
            conditions.push(condition);
        }
        if conditions.is_empty() {
            return Err(p.error("Expected GROUP BY condition".into()));
        }
        modifiers = modifiers.with("groupBy", Algebra::List(conditions));
    }

    if p.eat(TokenKind::Having) {
        let mut constraints = vec![parse_constraint(p)?];
        while starts_constraint(p) {
            constraints.push(parse_constraint(p)?);
        }
        modifiers = modifiers.with("having", Algebra::List(constraints));
    }

    if p.at(TokenKind::Order) {
        p.advance();
        p.expect(TokenKind::By)?;
        let mut conditions = Vec::new();
        loop {
            if p.at(TokenKind::Asc) || p.at(TokenKind::Desc) {
                let direction = if p.advance().kind == TokenKind::Asc { "ASC" } else { "DESC" };
                p.expect(TokenKind::LParen)?;
                let expr = parse_expr(p)?;
                p.expect(TokenKind::RParen)?;
                conditions.push(Algebra::node("OrderCondition")
                    .with("order", Algebra::atom(direction))
                    .with("expr", expr));
            } else if p.at(TokenKind::Variable) {
                let name = p.advance().text.clone();
                conditions.push(Algebra::Term(Term::Variable(name)));
            } else if starts_constraint(p) {
                conditions.push(parse_constraint(p)?);
            } else {
                break;
            }
        }
        if conditions.is_empty() {
            return Err(p.error("Expected ORDER BY condition".into()));
        }
        modifiers = modifiers.with("orderBy", Algebra::List(conditions));
    }

    // LIMIT and OFFSET in either order
    for _ in 0..2 {
        if p.eat(TokenKind::Limit) {
            let value = p.expect(TokenKind::Integer)?.text.clone();
            modifiers = modifiers.with("limit", Algebra::atom(value));
        } else if p.eat(TokenKind::Offset) {
            let value = p.expect(TokenKind::Integer)?.text.clone();
            modifiers = modifiers.with("offset", Algebra::atom(value));
        }
    }

    Ok(modifiers)
}

fn parse_group_condition(p: &mut Parser) -> Result<Option<Algebra>> {
    match p.peek_kind() {
        TokenKind::Variable => {
            let name = p.advance().text.clone();
            Ok(Some(Algebra::Term(Term::Variable(name))))
        }
        TokenKind::LParen => {
            p.advance();
            let expr = parse_expr(p)?;
            let condition = if p.eat(TokenKind::As) {
                let name = p.expect(TokenKind::Variable)?.text.clone();
                Algebra::node("Extend")
                    .with("expr", expr)
                    .with("var", Algebra::Term(Term::Variable(name)))
            } else {
                expr
            };
            p.expect(TokenKind::RParen)?;
            Ok(Some(condition))
        }
        _ if starts_constraint(p) => Ok(Some(parse_constraint(p)?)),
        _ => Ok(None),
    }
}

/// FILTER / HAVING / ORDER BY constraint: bracketted expression or call.
fn starts_constraint(p: &Parser) -> bool {
    match p.peek_kind() {
        TokenKind::LParen | TokenKind::Not | TokenKind::Exists => true,
        TokenKind::Identifier | TokenKind::Iri | TokenKind::PrefixedName => {
            p.peek_nth_kind(1) == TokenKind::LParen
        }
        _ => false,
    }
}

fn parse_constraint(p: &mut Parser) -> Result<Algebra> {
    if p.at(TokenKind::LParen) {
        p.advance();
        let expr = parse_expr(p)?;
        p.expect(TokenKind::RParen)?;
        Ok(expr)
    } else {
        parse_primary_expr(p)
    }
}

// ============================================================================
// Graph patterns
// ============================================================================

fn parse_group_graph_pattern(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::LBrace)?;

    if p.at(TokenKind::Select) {
        let sub = parse_sub_select(p)?;
        p.expect(TokenKind::RBrace)?;
        return Ok(sub);
    }

    let mut parts = Vec::new();
    let mut triples = Vec::new();

    loop {
        match p.peek_kind() {
            TokenKind::RBrace => {
                p.advance();
                break;
            }
            TokenKind::Dot => { p.advance(); }
            TokenKind::Optional => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                let inner = parse_group_graph_pattern(p)?;
                parts.push(Algebra::node("LeftJoin").with("p", inner));
            }
            TokenKind::Minus => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                let inner = parse_group_graph_pattern(p)?;
                parts.push(Algebra::node("Minus").with("p", inner));
            }
            TokenKind::Graph => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                let graph = parse_var_or_iri(p)?;
                let inner = parse_group_graph_pattern(p)?;
                parts.push(Algebra::node("Graph")
                    .with("term", Algebra::Term(graph))
                    .with("p", inner));
            }
            TokenKind::Service => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                let silent = p.eat(TokenKind::Silent);
                let endpoint = parse_var_or_iri(p)?;
                let inner = parse_group_graph_pattern(p)?;
                parts.push(Algebra::node("Service")
                    .with("silent", Algebra::atom(if silent { "true" } else { "false" }))
                    .with("term", Algebra::Term(endpoint))
                    .with("p", inner));
            }
            TokenKind::Filter => {
                p.advance();
                let expr = parse_constraint(p)?;
                // Filters scope over the whole group; keep the current BGP open.
                parts.push(Algebra::node("Filter").with("expr", expr));
            }
            TokenKind::Bind => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                p.expect(TokenKind::LParen)?;
                let expr = parse_expr(p)?;
                p.expect(TokenKind::As)?;
                let name = p.expect(TokenKind::Variable)?.text.clone();
                p.expect(TokenKind::RParen)?;
                parts.push(Algebra::node("Extend")
                    .with("expr", expr)
                    .with("var", Algebra::Term(Term::Variable(name))));
            }
            TokenKind::Values => {
                p.advance();
                flush_bgp(&mut parts, &mut triples);
                parts.push(parse_data_block(p)?);
            }
            TokenKind::LBrace => {
                flush_bgp(&mut parts, &mut triples);
                let first = parse_group_graph_pattern(p)?;
                if p.at(TokenKind::Union) {
                    let mut alternatives = vec![first];
                    while p.eat(TokenKind::Union) {
                        alternatives.push(parse_group_graph_pattern(p)?);
                    }
                    parts.push(Algebra::node("Union").with("alternatives", Algebra::List(alternatives)));
                } else {
                    parts.push(first);
                }
            }
            _ if starts_term(p) => {
                parse_triples_same_subject(p, &mut triples)?;
                if !p.eat(TokenKind::Dot) && !p.at(TokenKind::RBrace) && starts_term(p) {
                    return Err(p.error("Expected '.' between triple patterns".into()));
                }
            }
            kind => {
                return Err(p.error(format!("Unexpected token in group pattern: {:?} '{}'", kind, p.peek().text)));
            }
        }
    }

    flush_bgp(&mut parts, &mut triples);
    Ok(Algebra::node("Group").with("parts", Algebra::List(parts)))
}

fn flush_bgp(parts: &mut Vec<Algebra>, triples: &mut Vec<Algebra>) {
    if !triples.is_empty() {
        parts.push(Algebra::bgp(std::mem::take(triples)));
    }
}

fn parse_sub_select(p: &mut Parser) -> Result<Algebra> {
    let projection = parse_select_clause(p)?;
    p.eat(TokenKind::Where);
    let pattern = parse_group_graph_pattern(p)?;
    let modifiers = parse_solution_modifiers(p)?;
    let mut node = projection
        .with("where", pattern)
        .with("modifiers", modifiers);
    if p.eat(TokenKind::Values) {
        node = node.with("values", parse_data_block(p)?);
    }
    Ok(node)
}

/// VALUES data block, after the VALUES keyword.
fn parse_data_block(p: &mut Parser) -> Result<Algebra> {
    let mut vars = Vec::new();
    let mut rows = Vec::new();

    if p.at(TokenKind::Variable) {
        let name = p.advance().text.clone();
        vars.push(Algebra::Term(Term::Variable(name)));
        p.expect(TokenKind::LBrace)?;
        while !p.at(TokenKind::RBrace) {
            rows.push(Algebra::List(vec![parse_data_value(p)?]));
        }
        p.expect(TokenKind::RBrace)?;
    } else {
        p.expect(TokenKind::LParen)?;
        while p.at(TokenKind::Variable) {
            let name = p.advance().text.clone();
            vars.push(Algebra::Term(Term::Variable(name)));
        }
        p.expect(TokenKind::RParen)?;
        p.expect(TokenKind::LBrace)?;
        while p.eat(TokenKind::LParen) {
            let mut row = Vec::with_capacity(vars.len());
            while !p.at(TokenKind::RParen) {
                row.push(parse_data_value(p)?);
            }
            p.expect(TokenKind::RParen)?;
            if row.len() != vars.len() {
                return Err(p.error(format!(
                    "VALUES row has {} values for {} variables",
                    row.len(),
                    vars.len()
                )));
            }
            rows.push(Algebra::List(row));
        }
        p.expect(TokenKind::RBrace)?;
    }

    Ok(Algebra::node("Values")
        .with("vars", Algebra::List(vars))
        .with("rows", Algebra::List(rows)))
}

fn parse_data_value(p: &mut Parser) -> Result<Algebra> {
    if p.eat(TokenKind::Undef) {
        return Ok(Algebra::atom("UNDEF"));
    }
    match parse_term(p)? {
        Some(Term::Variable(_)) | Some(Term::BlankNode(_)) | None => {
            Err(p.error("Expected IRI, literal or UNDEF in VALUES".into()))
        }
        Some(term) => Ok(Algebra::Term(term)),
    }
}

fn parse_var_or_iri(p: &mut Parser) -> Result<Term> {
    if p.at(TokenKind::Variable) {
        let name = p.advance().text.clone();
        return Ok(Term::Variable(name));
    }
    match p.take_iri()? {
        Some(iri) => Ok(Term::Iri(iri)),
        None => Err(p.error("Expected variable or IRI".into())),
    }
}

// ============================================================================
// Triples
// ============================================================================

/// Triples inside a CONSTRUCT template (no paths, same term grammar).
fn parse_triples_template(p: &mut Parser) -> Result<Vec<Algebra>> {
    let mut triples = Vec::new();
    while starts_term(p) {
        parse_triples_same_subject(p, &mut triples)?;
        if !p.eat(TokenKind::Dot) {
            break;
        }
    }
    Ok(triples)
}

fn starts_term(p: &Parser) -> bool {
    matches!(
        p.peek_kind(),
        TokenKind::Variable | TokenKind::Iri | TokenKind::PrefixedName
            | TokenKind::BlankNode | TokenKind::StringLiteral
            | TokenKind::Integer | TokenKind::Decimal | TokenKind::Double
            | TokenKind::True | TokenKind::False
            | TokenKind::LBracket | TokenKind::LParen
            | TokenKind::Dash | TokenKind::Plus
    )
}

fn push_triple(triples: &mut Vec<Algebra>, subject: Term, predicate: Algebra, object: Term) {
    triples.push(Algebra::List(vec![
        Algebra::Term(subject),
        predicate,
        Algebra::Term(object),
    ]));
}

fn parse_triples_same_subject(p: &mut Parser, triples: &mut Vec<Algebra>) -> Result<()> {
    match p.peek_kind() {
        // [ :p :o ] as subject, optionally followed by more properties
        TokenKind::LBracket if p.peek_nth_kind(1) != TokenKind::RBracket => {
            let subject = parse_blank_node_property_list(p, triples)?;
            if starts_verb(p) {
                parse_property_list(p, subject, triples)?;
            }
            Ok(())
        }
        TokenKind::LParen => {
            let subject = parse_collection(p, triples)?;
            if starts_verb(p) {
                parse_property_list(p, subject, triples)?;
            }
            Ok(())
        }
        _ => {
            let Some(subject) = parse_term(p)? else {
                return Err(p.error("Expected subject term".into()));
            };
            if !starts_verb(p) {
                return Err(p.error(format!("Expected predicate, got {:?} '{}'", p.peek_kind(), p.peek().text)));
            }
            parse_property_list(p, subject, triples)
        }
    }
}

fn starts_verb(p: &Parser) -> bool {
    matches!(
        p.peek_kind(),
        TokenKind::Variable | TokenKind::Iri | TokenKind::PrefixedName
            | TokenKind::A | TokenKind::Caret | TokenKind::Bang | TokenKind::LParen
    )
}

/// `verb objectList ( ';' ( verb objectList )? )*`
fn parse_property_list(p: &mut Parser, subject: Term, triples: &mut Vec<Algebra>) -> Result<()> {
    loop {
        let predicate = parse_verb(p)?;
        loop {
            let object = parse_object(p, triples)?;
            push_triple(triples, subject.clone(), predicate.clone(), object);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        if !p.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        while p.eat(TokenKind::Semicolon) {}
        if !starts_verb(p) {
            return Ok(());
        }
    }
}

/// Predicate slot: a variable term, a plain IRI term, or a path.
fn parse_verb(p: &mut Parser) -> Result<Algebra> {
    if p.at(TokenKind::Variable) {
        let name = p.advance().text.clone();
        return Ok(Algebra::Term(Term::Variable(name)));
    }
    let path = parse_path(p)?;
    Ok(match path {
        PathExpression::Direct(iri) => Algebra::Term(Term::Iri(iri)),
        other => Algebra::Path(other),
    })
}

fn parse_object(p: &mut Parser, triples: &mut Vec<Algebra>) -> Result<Term> {
    match p.peek_kind() {
        TokenKind::LBracket if p.peek_nth_kind(1) != TokenKind::RBracket => {
            parse_blank_node_property_list(p, triples)
        }
        TokenKind::LParen => parse_collection(p, triples),
        _ => match parse_term(p)? {
            Some(term) => Ok(term),
            None => Err(p.error(format!("Expected object, got {:?} '{}'", p.peek_kind(), p.peek().text))),
        },
    }
}

fn parse_blank_node_property_list(p: &mut Parser, triples: &mut Vec<Algebra>) -> Result<Term> {
    p.expect(TokenKind::LBracket)?;
    let node = p.fresh_blank();
    parse_property_list(p, node.clone(), triples)?;
    p.expect(TokenKind::RBracket)?;
    Ok(node)
}

/// RDF collection `( a b c )` expanded into an rdf:first / rdf:rest chain.
fn parse_collection(p: &mut Parser, triples: &mut Vec<Algebra>) -> Result<Term> {
    p.expect(TokenKind::LParen)?;
    let mut items = Vec::new();
    while !p.at(TokenKind::RParen) {
        items.push(parse_object(p, triples)?);
    }
    p.expect(TokenKind::RParen)?;

    let mut head = Term::Iri(RDF_NIL.to_string());
    let cells: Vec<Term> = items.iter().map(|_| p.fresh_blank()).collect();
    for (item, cell) in items.into_iter().zip(cells.iter()).rev() {
        push_triple(triples, cell.clone(), Algebra::Term(Term::Iri(RDF_FIRST.to_string())), item);
        push_triple(triples, cell.clone(), Algebra::Term(Term::Iri(RDF_REST.to_string())), head);
        head = cell.clone();
    }
    Ok(head)
}

/// Variable, IRI, blank node, anonymous `[]` or literal. `None` if the
/// current token cannot start a term.
fn parse_term(p: &mut Parser) -> Result<Option<Term>> {
    let term = match p.peek_kind() {
        TokenKind::Variable => Term::Variable(p.advance().text.clone()),
        TokenKind::BlankNode => Term::BlankNode(p.advance().text.clone()),
        TokenKind::Iri | TokenKind::PrefixedName => match p.take_iri()? {
            Some(iri) => Term::Iri(iri),
            None => return Ok(None),
        },
        TokenKind::LBracket if p.peek_nth_kind(1) == TokenKind::RBracket => {
            p.advance();
            p.advance();
            p.fresh_blank()
        }
        TokenKind::StringLiteral => {
            let lexical = p.advance().text.clone();
            if p.at(TokenKind::LangTag) {
                let tag = p.advance().text.clone();
                Term::Literal(Literal::lang_tagged(lexical, &tag))
            } else if p.eat(TokenKind::DoubleCaret) {
                let Some(datatype) = p.take_iri()? else {
                    return Err(p.error("Expected datatype IRI after '^^'".into()));
                };
                Term::Literal(Literal::typed(lexical, datatype))
            } else {
                Term::Literal(Literal::simple(lexical))
            }
        }
        TokenKind::Integer | TokenKind::Decimal | TokenKind::Double => numeric_literal(p, ""),
        TokenKind::Dash | TokenKind::Plus
            if matches!(p.peek_nth_kind(1), TokenKind::Integer | TokenKind::Decimal | TokenKind::Double) =>
        {
            let sign = if p.advance().kind == TokenKind::Dash { "-" } else { "+" };
            numeric_literal(p, sign)
        }
        TokenKind::True | TokenKind::False => {
            let value = if p.advance().kind == TokenKind::True { "true" } else { "false" };
            Term::Literal(Literal::typed(value, XSD_BOOLEAN))
        }
        _ => return Ok(None),
    };
    Ok(Some(term))
}

fn numeric_literal(p: &mut Parser, sign: &str) -> Term {
    let tok = p.advance();
    let datatype = match tok.kind {
        TokenKind::Integer => XSD_INTEGER,
        TokenKind::Decimal => XSD_DECIMAL,
        _ => XSD_DOUBLE,
    };
    Term::Literal(Literal::typed(format!("{sign}{}", tok.text), datatype))
}

// ============================================================================
// Property paths
// ============================================================================
//
// Path     ::= PathSeq ( '|' PathSeq )*
// PathSeq  ::= PathEltOrInverse ( '/' PathEltOrInverse )*
// PathEltOrInverse ::= PathElt | '^' PathElt
// PathElt  ::= PathPrimary ( '*' | '+' | '?' )?
// PathPrimary ::= iri | 'a' | '!' NegatedSet | '(' Path ')'

fn parse_path(p: &mut Parser) -> Result<PathExpression> {
    let mut alternatives = vec![parse_path_sequence(p)?];
    while p.eat(TokenKind::Pipe) {
        alternatives.push(parse_path_sequence(p)?);
    }
    Ok(PathExpression::alternative(alternatives))
}

fn parse_path_sequence(p: &mut Parser) -> Result<PathExpression> {
    let mut steps = vec![parse_path_elt_or_inverse(p)?];
    while p.eat(TokenKind::Slash) {
        steps.push(parse_path_elt_or_inverse(p)?);
    }
    Ok(PathExpression::sequence(steps))
}

fn parse_path_elt_or_inverse(p: &mut Parser) -> Result<PathExpression> {
    if p.eat(TokenKind::Caret) {
        Ok(PathExpression::inverse(parse_path_elt(p)?))
    } else {
        parse_path_elt(p)
    }
}

fn parse_path_elt(p: &mut Parser) -> Result<PathExpression> {
    let primary = parse_path_primary(p)?;
    let modifier = match p.peek_kind() {
        TokenKind::Star => PathModifier::ZeroOrMore,
        TokenKind::Plus => PathModifier::OneOrMore,
        TokenKind::Question => PathModifier::ZeroOrOne,
        _ => return Ok(primary),
    };
    p.advance();
    Ok(PathExpression::repeated(primary, modifier))
}

fn parse_path_primary(p: &mut Parser) -> Result<PathExpression> {
    if p.eat(TokenKind::A) {
        return Ok(PathExpression::direct(RDF_TYPE));
    }
    if p.eat(TokenKind::Bang) {
        return parse_negated_property_set(p);
    }
    if p.eat(TokenKind::LParen) {
        let inner = parse_path(p)?;
        p.expect(TokenKind::RParen)?;
        return Ok(inner);
    }
    match p.take_iri()? {
        Some(iri) => Ok(PathExpression::Direct(iri)),
        None => Err(p.error(format!(
            "Expected property path (IRI, 'a', or path expression), got {:?} '{}'",
            p.peek_kind(),
            p.peek().text
        ))),
    }
}

/// After `!`: a single member or a parenthesized `|`-separated set.
fn parse_negated_property_set(p: &mut Parser) -> Result<PathExpression> {
    let mut excluded = Vec::new();
    if p.eat(TokenKind::LParen) {
        if !p.at(TokenKind::RParen) {
            excluded.push(parse_path_one_in_property_set(p)?);
            while p.eat(TokenKind::Pipe) {
                excluded.push(parse_path_one_in_property_set(p)?);
            }
        }
        p.expect(TokenKind::RParen)?;
    } else {
        excluded.push(parse_path_one_in_property_set(p)?);
    }
    Ok(PathExpression::negated(excluded))
}

/// A member of a negated set. Direction (`^`) is not kept.
fn parse_path_one_in_property_set(p: &mut Parser) -> Result<String> {
    p.eat(TokenKind::Caret);
    if p.eat(TokenKind::A) {
        return Ok(RDF_TYPE.to_string());
    }
    match p.take_iri()? {
        Some(iri) => Ok(iri),
        None => Err(p.error("Expected IRI or 'a' in negated property set".into())),
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn parse_expr(p: &mut Parser) -> Result<Algebra> {
    parse_or_expr(p)
}

fn binary(op: &str, left: Algebra, right: Algebra) -> Algebra {
    Algebra::node("Binary")
        .with("op", Algebra::atom(op))
        .with("left", left)
        .with("right", right)
}

fn parse_or_expr(p: &mut Parser) -> Result<Algebra> {
    let mut left = parse_and_expr(p)?;
    while p.eat(TokenKind::OrOr) {
        let right = parse_and_expr(p)?;
        left = binary("||", left, right);
    }
    Ok(left)
}

fn parse_and_expr(p: &mut Parser) -> Result<Algebra> {
    let mut left = parse_relational_expr(p)?;
    while p.eat(TokenKind::AndAnd) {
        let right = parse_relational_expr(p)?;
        left = binary("&&", left, right);
    }
    Ok(left)
}

fn parse_relational_expr(p: &mut Parser) -> Result<Algebra> {
    let left = parse_additive_expr(p)?;
    let op = match p.peek_kind() {
        TokenKind::Eq => "=",
        TokenKind::Neq => "!=",
        TokenKind::Lt => "<",
        TokenKind::Lte => "<=",
        TokenKind::Gt => ">",
        TokenKind::Gte => ">=",
        TokenKind::In => {
            p.advance();
            let list = parse_expr_list(p)?;
            return Ok(Algebra::node("In").with("expr", left).with("list", list));
        }
        TokenKind::Not if p.peek_nth_kind(1) == TokenKind::In => {
            p.advance();
            p.advance();
            let list = parse_expr_list(p)?;
            return Ok(Algebra::node("NotIn").with("expr", left).with("list", list));
        }
        _ => return Ok(left),
    };
    p.advance();
    let right = parse_additive_expr(p)?;
    Ok(binary(op, left, right))
}

fn parse_additive_expr(p: &mut Parser) -> Result<Algebra> {
    let mut left = parse_multiplicative_expr(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Plus => "+",
            TokenKind::Dash => "-",
            _ => return Ok(left),
        };
        p.advance();
        let right = parse_multiplicative_expr(p)?;
        left = binary(op, left, right);
    }
}

fn parse_multiplicative_expr(p: &mut Parser) -> Result<Algebra> {
    let mut left = parse_unary_expr(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            _ => return Ok(left),
        };
        p.advance();
        let right = parse_unary_expr(p)?;
        left = binary(op, left, right);
    }
}

fn parse_unary_expr(p: &mut Parser) -> Result<Algebra> {
    let op = match p.peek_kind() {
        TokenKind::Bang => "!",
        TokenKind::Dash => "-",
        TokenKind::Plus => "+",
        _ => return parse_primary_expr(p),
    };
    p.advance();
    let expr = parse_unary_expr(p)?;
    Ok(Algebra::node("Unary").with("op", Algebra::atom(op)).with("expr", expr))
}

fn parse_primary_expr(p: &mut Parser) -> Result<Algebra> {
    match p.peek_kind() {
        TokenKind::LParen => {
            p.advance();
            let expr = parse_expr(p)?;
            p.expect(TokenKind::RParen)?;
            Ok(expr)
        }

        TokenKind::Exists => {
            p.advance();
            let pattern = parse_group_graph_pattern(p)?;
            Ok(Algebra::node("Exists").with("graph", pattern))
        }
        TokenKind::Not if p.peek_nth_kind(1) == TokenKind::Exists => {
            p.advance();
            p.advance();
            let pattern = parse_group_graph_pattern(p)?;
            Ok(Algebra::node("NotExists").with("graph", pattern))
        }

        // Built-in call, aggregate or bare word
        TokenKind::Identifier => {
            let name = p.advance().text.to_uppercase();
            if !p.at(TokenKind::LParen) {
                return Err(p.error(format!("Expected '(' after function name {name}")));
            }
            parse_call(p, Algebra::atom(name))
        }

        // IRI, possibly an extension function call
        TokenKind::Iri | TokenKind::PrefixedName => {
            let iri = p.take_iri()?.unwrap_or_default();
            if p.at(TokenKind::LParen) {
                parse_call(p, Algebra::Term(Term::Iri(iri)))
            } else {
                Ok(Algebra::Term(Term::Iri(iri)))
            }
        }

        _ => match parse_term(p)? {
            Some(term) => Ok(Algebra::Term(term)),
            None => Err(p.error(format!("Unexpected token in expression: {:?} '{}'", p.peek_kind(), p.peek().text))),
        },
    }
}

/// `( [DISTINCT] ( '*' | args ) [; SEPARATOR = "..."] )` after a function name.
fn parse_call(p: &mut Parser, name: Algebra) -> Result<Algebra> {
    p.expect(TokenKind::LParen)?;
    let mut node = Algebra::node("Function").with("name", name);
    if p.eat(TokenKind::Distinct) {
        node = node.with("distinct", Algebra::atom("true"));
    }

    let mut args = Vec::new();
    if p.eat(TokenKind::Star) {
        args.push(Algebra::atom("*"));
    } else if !p.at(TokenKind::RParen) {
        args.push(parse_expr(p)?);
        while p.eat(TokenKind::Comma) {
            args.push(parse_expr(p)?);
        }
    }

    if p.eat(TokenKind::Semicolon) {
        let key = p.expect(TokenKind::Identifier)?.text.to_uppercase();
        if key != "SEPARATOR" {
            return Err(p.error(format!("Expected SEPARATOR, got {key}")));
        }
        p.expect(TokenKind::Eq)?;
        let separator = p.expect(TokenKind::StringLiteral)?.text.clone();
        node = node.with("separator", Algebra::atom(separator));
    }

    p.expect(TokenKind::RParen)?;
    Ok(node.with("args", Algebra::List(args)))
}

/// `( expr, ... )` or the empty list `()`.
fn parse_expr_list(p: &mut Parser) -> Result<Algebra> {
    p.expect(TokenKind::LParen)?;
    let mut items = Vec::new();
    if !p.at(TokenKind::RParen) {
        items.push(parse_expr(p)?);
        while p.eat(TokenKind::Comma) {
            items.push(parse_expr(p)?);
        }
    }
    p.expect(TokenKind::RParen)?;
    Ok(Algebra::List(items))
}

// ============================================================================
// Tests
// ============================================================================
