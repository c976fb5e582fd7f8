//! SPARQL lexer — tokenizes a query string.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Decoded payload: IRI content, variable name, unescaped string, etc.
    pub text: String,
}

/// Source span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Base, Prefix, Select, Construct, Describe, Ask,
    Distinct, Reduced, From, Named, Where,
    Optional, Union, Minus, Graph, Service, Silent,
    Filter, Bind, As, Values, Undef,
    Group, By, Having, Order, Asc, Desc, Limit, Offset,
    Not, In, Exists, True, False,
    /// The `a` shorthand for `rdf:type` (case-sensitive).
    A,

    // Terms
    Iri,            // <http://...>
    PrefixedName,   // prefix:local (text holds both, split on the first ':')
    Variable,       // ?name / $name
    BlankNode,      // _:label
    StringLiteral,
    LangTag,        // @en
    Integer, Decimal, Double,

    /// Bare word: function names such as `STR`, `REGEX`, `COUNT`.
    Identifier,

    // Punctuation
    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Dot, Comma, Semicolon,
    Pipe, Slash, Caret, DoubleCaret, Bang, Star, Plus, Dash, Question,

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,
    AndAnd, OrOr,

    Eof,
}

/// Tokenize a SPARQL query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            // Line comments
            '#' => {
                while chars.peek().map_or(false, |&(_, c)| c != '\n') {
                    chars.next();
                }
            }

            // IRI reference, or a comparison operator
            '<' if looks_like_iri(&input[pos..]) => {
                chars.next(); // consume '<'
                let mut iri = String::new();
                loop {
                    match chars.next() {
                        Some((end, '>')) => {
                            tokens.push(Token {
                                kind: TokenKind::Iri,
                                span: Span { start: pos, end: end + 1 },
                                text: iri,
                            });
                            break;
                        }
                        Some((at, '\\')) => iri.push(unicode_escape(&mut chars, at)?),
                        Some((_, c)) => iri.push(c),
                        None => return Err(Error::SyntaxError {
                            position: pos,
                            message: "Unterminated IRI".into(),
                        }),
                    }
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Lte, pos, "<="));
                } else {
                    tokens.push(punct(TokenKind::Lt, pos, "<"));
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Gte, pos, ">="));
                } else {
                    tokens.push(punct(TokenKind::Gt, pos, ">"));
                }
            }

            // String literals, short and long form
            '"' | '\'' => {
                let quote = ch;
                let long = input[pos..].starts_with(if quote == '"' { "\"\"\"" } else { "'''" });
                let delimiter_len = if long { 3 } else { 1 };
                for _ in 0..delimiter_len {
                    chars.next();
                }
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((at, '\\')) => s.push(string_escape(&mut chars, at)?),
                        Some((at, c)) if c == quote => {
                            if !long {
                                tokens.push(Token {
                                    kind: TokenKind::StringLiteral,
                                    span: Span { start: pos, end: at + 1 },
                                    text: s,
                                });
                                break;
                            }
                            let rest = &input[at..];
                            let closing = if quote == '"' { "\"\"\"" } else { "'''" };
                            // A long string may end with up to two extra quotes
                            // that belong to the content.
                            if rest.starts_with(closing) && !rest[1..].starts_with(closing) {
                                chars.next();
                                chars.next();
                                tokens.push(Token {
                                    kind: TokenKind::StringLiteral,
                                    span: Span { start: pos, end: at + 3 },
                                    text: s,
                                });
                                break;
                            }
                            s.push(c);
                        }
                        Some((_, '\n')) if !long => return Err(Error::SyntaxError {
                            position: pos,
                            message: "Line break in short string literal".into(),
                        }),
                        Some((_, c)) => s.push(c),
                        None => return Err(Error::SyntaxError {
                            position: pos,
                            message: "Unterminated string literal".into(),
                        }),
                    }
                }
            }

            // Numbers
            c if c.is_ascii_digit() => {
                tokens.push(lex_number(input, pos, &mut chars));
            }
            '.' if matches!(chars.clone().nth(1), Some((_, d)) if d.is_ascii_digit()) => {
                tokens.push(lex_number(input, pos, &mut chars));
            }

            // Variables: ?name / $name; a bare '?' is the path modifier
            '?' | '$' if matches!(chars.clone().nth(1), Some((_, c)) if is_name_char(c)) => {
                chars.next();
                let name = take_while(&mut chars, is_name_char);
                tokens.push(Token {
                    kind: TokenKind::Variable,
                    span: Span { start: pos, end: pos + name.len() + 1 },
                    text: name,
                });
            }

            // Blank node label
            '_' if matches!(chars.clone().nth(1), Some((_, ':'))) => {
                chars.next();
                chars.next();
                let label = take_local_name(&mut chars);
                if label.is_empty() {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: "Empty blank node label".into(),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::BlankNode,
                    span: Span { start: pos, end: pos + label.len() + 2 },
                    text: label,
                });
            }

            // Language tag
            '@' => {
                chars.next();
                let tag = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '-');
                if tag.is_empty() {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: "Empty language tag".into(),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::LangTag,
                    span: Span { start: pos, end: pos + tag.len() + 1 },
                    text: tag,
                });
            }

            // Keywords, bare words and prefixed names
            c if c.is_alphabetic() || c == ':' || c == '_' => {
                let prefix = take_while(&mut chars, |c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.');
                if matches!(chars.peek(), Some(&(_, ':'))) {
                    chars.next();
                    let local = take_local_name(&mut chars);
                    let text = format!("{prefix}:{local}");
                    tokens.push(Token {
                        kind: TokenKind::PrefixedName,
                        span: Span { start: pos, end: pos + text.len() },
                        text,
                    });
                } else if prefix.is_empty() {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: format!("Unexpected character: '{c}'"),
                    });
                } else {
                    // A trailing '.' terminates the triple, not the word.
                    let word = prefix.trim_end_matches('.');
                    if word.len() != prefix.len() {
                        let dot_at = pos + word.len();
                        tokens.push(word_token(word, pos));
                        for i in 0..(prefix.len() - word.len()) {
                            tokens.push(punct(TokenKind::Dot, dot_at + i, "."));
                        }
                    } else {
                        tokens.push(word_token(word, pos));
                    }
                }
            }

            // Punctuation
            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            '[' => { chars.next(); tokens.push(punct(TokenKind::LBracket, pos, "[")); }
            ']' => { chars.next(); tokens.push(punct(TokenKind::RBracket, pos, "]")); }
            '{' => { chars.next(); tokens.push(punct(TokenKind::LBrace, pos, "{")); }
            '}' => { chars.next(); tokens.push(punct(TokenKind::RBrace, pos, "}")); }
            '.' => { chars.next(); tokens.push(punct(TokenKind::Dot, pos, ".")); }
            ',' => { chars.next(); tokens.push(punct(TokenKind::Comma, pos, ",")); }
            ';' => { chars.next(); tokens.push(punct(TokenKind::Semicolon, pos, ";")); }
            '/' => { chars.next(); tokens.push(punct(TokenKind::Slash, pos, "/")); }
            '*' => { chars.next(); tokens.push(punct(TokenKind::Star, pos, "*")); }
            '+' => { chars.next(); tokens.push(punct(TokenKind::Plus, pos, "+")); }
            '-' => { chars.next(); tokens.push(punct(TokenKind::Dash, pos, "-")); }
            '?' => { chars.next(); tokens.push(punct(TokenKind::Question, pos, "?")); }
            '=' => { chars.next(); tokens.push(punct(TokenKind::Eq, pos, "=")); }
            '^' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '^'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::DoubleCaret, pos, "^^"));
                } else {
                    tokens.push(punct(TokenKind::Caret, pos, "^"));
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Neq, pos, "!="));
                } else {
                    tokens.push(punct(TokenKind::Bang, pos, "!"));
                }
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '|'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::OrOr, pos, "||"));
                } else {
                    tokens.push(punct(TokenKind::Pipe, pos, "|"));
                }
            }
            '&' if matches!(chars.clone().nth(1), Some((_, '&'))) => {
                chars.next();
                chars.next();
                tokens.push(punct(TokenKind::AndAnd, pos, "&&"));
            }

            other => {
                return Err(Error::SyntaxError {
                    position: pos,
                    message: format!("Unexpected character: '{other}'"),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
    }
}

fn word_token(word: &str, pos: usize) -> Token {
    Token {
        kind: keyword_or_ident(word),
        span: Span { start: pos, end: pos + word.len() },
        text: word.to_string(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn take_while(chars: &mut Chars<'_>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// Local part of a prefixed name or blank node label. May contain '.',
/// but never ends with one.
fn take_local_name(chars: &mut Chars<'_>) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '%') {
            out.push(c);
            chars.next();
        } else if c == '.' && matches!(chars.clone().nth(1), Some((_, n)) if n.is_alphanumeric() || n == '_' || n == '-') {
            out.push(c);
            chars.next();
        } else if c == '\\' && matches!(chars.clone().nth(1), Some((_, n)) if !n.is_whitespace()) {
            // Reserved-character escape: `\.` `\/` etc. keep the character.
            chars.next();
            if let Some((_, escaped)) = chars.next() {
                out.push(escaped);
            }
        } else {
            break;
        }
    }
    out
}

fn looks_like_iri(rest: &str) -> bool {
    for c in rest.chars().skip(1) {
        match c {
            '>' => return true,
            '<' | '"' | '{' | '}' | '|' | '^' | '`' => return false,
            c if c.is_whitespace() => return false,
            _ => {}
        }
    }
    false
}

fn lex_number(input: &str, start: usize, chars: &mut Chars<'_>) -> Token {
    let mut end = start;
    let mut kind = TokenKind::Integer;
    while let Some(&(at, c)) = chars.peek() {
        if c.is_ascii_digit() {
            end = at + 1;
            chars.next();
        } else if c == '.' && kind == TokenKind::Integer
            && matches!(chars.clone().nth(1), Some((_, d)) if d.is_ascii_digit())
        {
            kind = TokenKind::Decimal;
            end = at + 1;
            chars.next();
        } else if (c == 'e' || c == 'E') && kind != TokenKind::Double {
            let mut ahead = chars.clone();
            ahead.next();
            let signed = matches!(ahead.peek(), Some(&(_, '+' | '-')));
            if signed {
                ahead.next();
            }
            if !matches!(ahead.peek(), Some(&(_, d)) if d.is_ascii_digit()) {
                break;
            }
            kind = TokenKind::Double;
            chars.next();
            end = at + 1;
            if signed {
                chars.next();
                end += 1;
            }
        } else {
            break;
        }
    }
    Token {
        kind,
        span: Span { start, end },
        text: input[start..end].to_string(),
    }
}

fn string_escape(chars: &mut Chars<'_>, at: usize) -> Result<char> {
    match chars.next() {
        Some((_, 't')) => Ok('\t'),
        Some((_, 'b')) => Ok('\u{8}'),
        Some((_, 'n')) => Ok('\n'),
        Some((_, 'r')) => Ok('\r'),
        Some((_, 'f')) => Ok('\u{c}'),
        Some((_, '"')) => Ok('"'),
        Some((_, '\'')) => Ok('\''),
        Some((_, '\\')) => Ok('\\'),
        Some((_, 'u')) => hex_escape(chars, at, 4),
        Some((_, 'U')) => hex_escape(chars, at, 8),
        _ => Err(Error::SyntaxError {
            position: at,
            message: "Invalid escape sequence".into(),
        }),
    }
}

fn unicode_escape(chars: &mut Chars<'_>, at: usize) -> Result<char> {
    match chars.next() {
        Some((_, 'u')) => hex_escape(chars, at, 4),
        Some((_, 'U')) => hex_escape(chars, at, 8),
        _ => Err(Error::SyntaxError {
            position: at,
            message: "Invalid escape sequence in IRI".into(),
        }),
    }
}

fn hex_escape(chars: &mut Chars<'_>, at: usize, digits: usize) -> Result<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars.next().and_then(|(_, c)| c.to_digit(16));
        match digit {
            Some(d) => code = code * 16 + d,
            None => return Err(Error::SyntaxError {
                position: at,
                message: "Invalid unicode escape".into(),
            }),
        }
    }
    char::from_u32(code).ok_or_else(|| Error::SyntaxError {
        position: at,
        message: format!("Invalid code point U+{code:X}"),
    })
}

fn keyword_or_ident(s: &str) -> TokenKind {
    if s == "a" {
        return TokenKind::A;
    }
    match s.to_uppercase().as_str() {
        "BASE" => TokenKind::Base,
        "PREFIX" => TokenKind::Prefix,
        "SELECT" => TokenKind::Select,
        "CONSTRUCT" => TokenKind::Construct,
        "DESCRIBE" => TokenKind::Describe,
        "ASK" => TokenKind::Ask,
        "DISTINCT" => TokenKind::Distinct,
        "REDUCED" => TokenKind::Reduced,
        "FROM" => TokenKind::From,
        "NAMED" => TokenKind::Named,
        "WHERE" => TokenKind::Where,
        "OPTIONAL" => TokenKind::Optional,
        "UNION" => TokenKind::Union,
        "MINUS" => TokenKind::Minus,
        "GRAPH" => TokenKind::Graph,
        "SERVICE" => TokenKind::Service,
        "SILENT" => TokenKind::Silent,
        "FILTER" => TokenKind::Filter,
        "BIND" => TokenKind::Bind,
        "AS" => TokenKind::As,
        "VALUES" => TokenKind::Values,
        "UNDEF" => TokenKind::Undef,
        "GROUP" => TokenKind::Group,
        "BY" => TokenKind::By,
        "HAVING" => TokenKind::Having,
        "ORDER" => TokenKind::Order,
        "ASC" => TokenKind::Asc,
        "DESC" => TokenKind::Desc,
        "LIMIT" => TokenKind::Limit,
        "OFFSET" => TokenKind::Offset,
        "NOT" => TokenKind::Not,
        "IN" => TokenKind::In,
        "EXISTS" => TokenKind::Exists,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        _ => TokenKind::Identifier,
    }
}
