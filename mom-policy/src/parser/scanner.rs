//! Policy text scanner.
//!
//! Converts source text into a flat token sequence. Rules are tried in a fixed
//! order and the first one that matches at the current position wins:
//! whitespace, comments, numbers (float, integer, integer-with-exponent, hex,
//! octal), caller-supplied operators, brackets, symbols, strings.

use super::errors::ParseError;
use super::utils::unescape;
use crate::ast::{Delimiter, NumberKind, SourcePos, Token, TokenKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"^\s+").unwrap();
    static ref COMMENT: Regex = Regex::new(r"^#[^\n]*").unwrap();
    static ref FLOAT: Regex =
        Regex::new(r"^-?(0|[1-9][0-9]*)*\.[0-9]+([Ee][+-]?[0-9]+)?").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^-?(0|[1-9][0-9]*)").unwrap();
    static ref INTEGER_WITH_EXPONENT: Regex =
        Regex::new(r"^-?(0|[1-9][0-9]*)[Ee][+-]?[0-9]+").unwrap();
    static ref HEX: Regex = Regex::new(r"^0[Xx][0-9A-Fa-f]+").unwrap();
    static ref OCTAL: Regex = Regex::new(r"^0[0-9]+").unwrap();
    static ref SYMBOL: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*").unwrap();
    static ref DOUBLE_QUOTED: Regex = Regex::new(r#"^"([^"\\]|\\.)*""#).unwrap();
    static ref SINGLE_QUOTED: Regex = Regex::new(r"^'([^'\\]|\\.)*'").unwrap();
}

/// A numeric literal converted to its runtime representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericLiteral {
    Integer(i64),
    Float(f64),
}

/// Convert the text of a numeric token according to its subtype.
pub fn numeric_value(kind: NumberKind, text: &str) -> Result<NumericLiteral, String> {
    match kind {
        NumberKind::Float => text
            .parse::<f64>()
            .map(NumericLiteral::Float)
            .map_err(|e| e.to_string()),
        NumberKind::Integer => text
            .parse::<i64>()
            .map(NumericLiteral::Integer)
            .map_err(|e| e.to_string()),
        NumberKind::Hex => i64::from_str_radix(&text[2..], 16)
            .map(NumericLiteral::Integer)
            .map_err(|e| e.to_string()),
        NumberKind::Octal => i64::from_str_radix(&text[1..], 8)
            .map(NumericLiteral::Integer)
            .map_err(|e| e.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    operators: Option<Regex>,
}

impl Scanner {
    /// Build a scanner that recognizes the given operator lexemes as whole
    /// tokens. Longer operators are preferred, so `<=` never scans as `<` `=`.
    pub fn new<S: AsRef<str>>(operators: &[S]) -> Self {
        let mut ops: Vec<&str> = operators
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .collect();
        ops.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        ops.dedup();
        let operators = if ops.is_empty() {
            None
        } else {
            let alternation = ops
                .iter()
                .map(|op| regex::escape(op))
                .collect::<Vec<_>>()
                .join("|");
            // Escaped literals always form a valid pattern.
            Regex::new(&format!("^(?:{})", alternation)).ok()
        };
        Scanner { operators }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ParseError> {
        let mut cursor = Cursor::new(input);
        let mut tokens = Vec::new();

        while !cursor.at_end() {
            let rest = cursor.rest();
            let pos = cursor.pos();

            if let Some(m) = WHITESPACE.find(rest).or_else(|| COMMENT.find(rest)) {
                cursor.advance(m.end());
                continue;
            }

            if let Some((kind, len)) = match_number(rest) {
                let text = &rest[..len];
                numeric_value(kind, text).map_err(|message| ParseError::InvalidNumber {
                    text: text.to_string(),
                    message,
                    pos,
                })?;
                tokens.push(Token::new(TokenKind::Number(kind), text, pos));
                cursor.advance(len);
                continue;
            }

            if let Some(m) = self.operators.as_ref().and_then(|re| re.find(rest)) {
                tokens.push(Token::new(TokenKind::Operator, m.as_str(), pos));
                cursor.advance(m.end());
                continue;
            }

            let first = rest.chars().next().unwrap_or_default();
            if let Some(kind) = bracket_kind(first) {
                tokens.push(Token::new(kind, first.to_string(), pos));
                cursor.advance(first.len_utf8());
                continue;
            }

            if let Some(m) = SYMBOL.find(rest) {
                tokens.push(Token::new(TokenKind::Symbol, m.as_str(), pos));
                cursor.advance(m.end());
                continue;
            }

            if first == '"' || first == '\'' {
                let re: &Regex = if first == '"' {
                    &DOUBLE_QUOTED
                } else {
                    &SINGLE_QUOTED
                };
                let m = re
                    .find(rest)
                    .ok_or(ParseError::UnterminatedString { pos })?;
                let body = &m.as_str()[1..m.end() - 1];
                tokens.push(Token::new(TokenKind::String, unescape(body, pos)?, pos));
                cursor.advance(m.end());
                continue;
            }

            let found: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
            return Err(ParseError::UnexpectedCharacter { found, pos });
        }

        Ok(tokens)
    }
}

fn bracket_kind(c: char) -> Option<TokenKind> {
    match c {
        '(' => Some(TokenKind::Open(Delimiter::Paren)),
        ')' => Some(TokenKind::Close(Delimiter::Paren)),
        '[' => Some(TokenKind::Open(Delimiter::Bracket)),
        ']' => Some(TokenKind::Close(Delimiter::Bracket)),
        '{' => Some(TokenKind::Open(Delimiter::Curly)),
        '}' => Some(TokenKind::Close(Delimiter::Curly)),
        _ => None,
    }
}

// Numeric subtypes in priority order. Returns the subtype and matched length.
fn match_number(rest: &str) -> Option<(NumberKind, usize)> {
    if let Some(m) = FLOAT.find(rest) {
        return Some((NumberKind::Float, m.end()));
    }
    if let Some(caps) = INTEGER.captures(rest) {
        let whole = caps.get(0)?;
        let body = caps.get(1).map(|g| g.as_str()).unwrap_or_default();
        let next = rest[whole.end()..].chars().next();
        let continues = match next {
            Some(c) if c.is_ascii_digit() || c == 'e' || c == 'E' => true,
            Some('x') | Some('X') => body == "0",
            _ => false,
        };
        if !continues {
            return Some((NumberKind::Integer, whole.end()));
        }
    }
    if let Some(m) = INTEGER_WITH_EXPONENT.find(rest) {
        // Exponent notation always yields a float value.
        return Some((NumberKind::Float, m.end()));
    }
    if let Some(m) = HEX.find(rest) {
        return Some((NumberKind::Hex, m.end()));
    }
    if let Some(m) = OCTAL.find(rest) {
        return Some((NumberKind::Octal, m.end()));
    }
    None
}

struct Cursor<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor {
            input,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.offset >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }

    fn advance(&mut self, len: usize) {
        for c in self.input[self.offset..self.offset + len].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += len;
    }
}
