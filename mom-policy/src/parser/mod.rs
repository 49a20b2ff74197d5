//! Policy parser.
//!
//! Grammar:
//!
//! ```text
//! value_list   ::= value*
//! value        ::= number | string | symbol | operator
//!                | list | bracket_list | curly_list
//! list         ::= "(" value_list ")"
//! bracket_list ::= "[" value_list "]"
//! curly_list   ::= "{" value_list "}"
//! ```
//!
//! Parsing never evaluates anything; it only builds expression trees.

pub mod errors;
pub mod scanner;
pub(crate) mod utils;

pub use errors::ParseError;
pub use scanner::{numeric_value, NumericLiteral, Scanner};

use crate::ast::{Delimiter, Expression, SourcePos, Token, TokenKind};
use crate::runtime::stdlib::operator_symbols;

/// Deepest bracket nesting accepted in policy text.
pub const MAX_NESTING: usize = 100;

/// Parse a complete program using the evaluator's operator set.
pub fn parse(input: &str) -> Result<Vec<Expression>, ParseError> {
    parse_with_operators(input, &operator_symbols())
}

/// Parse a complete program, recognizing `operators` as operator tokens.
pub fn parse_with_operators<S: AsRef<str>>(
    input: &str,
    operators: &[S],
) -> Result<Vec<Expression>, ParseError> {
    let tokens = Scanner::new(operators).tokenize(input)?;
    parse_tokens(tokens)
}

/// Parse `input` and return its first top-level expression, if any.
pub fn parse_expression(input: &str) -> Result<Option<Expression>, ParseError> {
    Ok(parse(input)?.into_iter().next())
}

/// Build the top-level value list from a token sequence.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Vec<Expression>, ParseError> {
    let mut parser = TokenParser {
        tokens: tokens.into_iter().peekable(),
        depth: 0,
    };
    let mut program = Vec::new();
    while let Some(token) = parser.tokens.next() {
        program.push(parser.value(token)?);
    }
    Ok(program)
}

struct TokenParser {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token>>,
    depth: usize,
}

impl TokenParser {
    fn value(&mut self, token: Token) -> Result<Expression, ParseError> {
        match token.kind {
            TokenKind::Open(delimiter) => {
                if self.depth >= MAX_NESTING {
                    return Err(ParseError::TooDeep {
                        limit: MAX_NESTING,
                        pos: token.pos,
                    });
                }
                self.depth += 1;
                let items = self.items(delimiter, token.pos);
                self.depth -= 1;
                Ok(Expression::List {
                    delimiter,
                    items: items?,
                    pos: token.pos,
                })
            }
            TokenKind::Close(_) => Err(ParseError::UnmatchedClose {
                found: token.text,
                pos: token.pos,
            }),
            _ => Ok(Expression::Token(token)),
        }
    }

    /// Values up to the close bracket matching `delimiter`.
    fn items(
        &mut self,
        delimiter: Delimiter,
        open_pos: SourcePos,
    ) -> Result<Vec<Expression>, ParseError> {
        let mut items = Vec::new();
        loop {
            let next = self.tokens.next().ok_or(ParseError::UnclosedOpen {
                open: delimiter.open_char(),
                pos: open_pos,
            })?;
            match next.kind {
                TokenKind::Close(close) if close == delimiter => return Ok(items),
                TokenKind::Close(_) => {
                    return Err(ParseError::MismatchedClose {
                        expected: delimiter.close_char(),
                        found: next.text,
                        pos: next.pos,
                    })
                }
                _ => items.push(self.value(next)?),
            }
        }
    }
}
