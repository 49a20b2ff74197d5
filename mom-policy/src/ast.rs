use serde::{Deserialize, Serialize};
use std::fmt;

// --- Source positions ---

/// 1-based line/column of the first character of a token.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        SourcePos { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// --- Tokens ---

/// Numeric literal subtype. Decides how the literal text converts to a value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberKind {
    Integer,
    Float,
    Hex,
    Octal,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Delimiter {
    Paren,
    Bracket,
    Curly,
}

impl Delimiter {
    pub fn open_char(self) -> char {
        match self {
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
            Delimiter::Curly => '{',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
            Delimiter::Curly => '}',
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Symbol,
    /// Already unescaped; `text` holds the content without quotes.
    String,
    Number(NumberKind),
    Operator,
    Open(Delimiter),
    Close(Delimiter),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: SourcePos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: SourcePos) -> Self {
        Token {
            kind,
            text: text.into(),
            pos,
        }
    }

    pub fn symbol(text: &str) -> Self {
        Token::new(TokenKind::Symbol, text, SourcePos::default())
    }

    pub fn is_symbol(&self) -> bool {
        self.kind == TokenKind::Symbol
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "{:?}", self.text),
            _ => write!(f, "{}", self.text),
        }
    }
}

// --- Expressions ---

/// An s-expression: either a single token or a bracketed sequence.
///
/// `()` and `[]` sequences are interchangeable. A `{}` sequence is a block:
/// its elements are evaluated in order and the last value is the result.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expression {
    Token(Token),
    List {
        delimiter: Delimiter,
        items: Vec<Expression>,
        pos: SourcePos,
    },
}

impl Expression {
    pub fn pos(&self) -> SourcePos {
        match self {
            Expression::Token(t) => t.pos,
            Expression::List { pos, .. } => *pos,
        }
    }

    /// The symbol name when this expression is a bare symbol token.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expression::Token(t) if t.is_symbol() => Some(&t.text),
            _ => None,
        }
    }

    /// The elements of a bracketed sequence, whatever its delimiter.
    pub fn as_list(&self) -> Option<&[Expression]> {
        match self {
            Expression::List { items, .. } => Some(items),
            Expression::Token(_) => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Token(t) => write!(f, "{}", t),
            Expression::List {
                delimiter, items, ..
            } => {
                write!(f, "{}", delimiter.open_char())?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "{}", delimiter.close_char())
            }
        }
    }
}
