use super::ParseError;
use crate::ast::SourcePos;

// Resolve backslash escapes inside a string literal body (quotes already stripped).
pub(crate) fn unescape(s: &str, pos: SourcePos) -> Result<String, ParseError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    return Err(ParseError::InvalidEscapeSequence {
                        sequence: format!("\\{}", other),
                        pos,
                    });
                }
                None => {
                    return Err(ParseError::InvalidEscapeSequence {
                        sequence: "\\".to_string(),
                        pos,
                    });
                }
            }
        } else {
            result.push(c);
        }
    }
    Ok(result)
}
