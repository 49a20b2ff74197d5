use crate::ast::SourcePos;
use thiserror::Error;

/// Errors raised while turning policy text into expression trees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{pos}: unrecognized input starting at {found:?}")]
    UnexpectedCharacter { found: String, pos: SourcePos },

    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: SourcePos },

    #[error("{pos}: invalid escape sequence {sequence:?}")]
    InvalidEscapeSequence { sequence: String, pos: SourcePos },

    #[error("{pos}: invalid numeric literal {text:?}: {message}")]
    InvalidNumber {
        text: String,
        message: String,
        pos: SourcePos,
    },

    #[error("{pos}: unexpected {found:?}, expected {expected:?}")]
    MismatchedClose {
        expected: char,
        found: String,
        pos: SourcePos,
    },

    #[error("{pos}: unexpected {found:?} with no matching opening bracket")]
    UnmatchedClose { found: String, pos: SourcePos },

    #[error("{pos}: {open:?} is never closed")]
    UnclosedOpen { open: char, pos: SourcePos },

    #[error("{pos}: brackets nested deeper than {limit}")]
    TooDeep { limit: usize, pos: SourcePos },
}

impl ParseError {
    pub fn pos(&self) -> SourcePos {
        match self {
            ParseError::UnexpectedCharacter { pos, .. }
            | ParseError::UnterminatedString { pos }
            | ParseError::InvalidEscapeSequence { pos, .. }
            | ParseError::InvalidNumber { pos, .. }
            | ParseError::MismatchedClose { pos, .. }
            | ParseError::UnmatchedClose { pos, .. }
            | ParseError::UnclosedOpen { pos, .. }
            | ParseError::TooDeep { pos, .. } => *pos,
        }
    }
}
