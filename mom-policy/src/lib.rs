// MOM policy language
// Scanner, parser and evaluator for memory overcommitment policies

pub mod ast;
pub mod input_handling;
pub mod parser;
pub mod policy;
pub mod runtime;

pub use ast::{Expression, SourcePos, Token, TokenKind};
pub use parser::{parse, parse_expression, ParseError};
pub use policy::{eval_str, Policy, PolicyError};
pub use runtime::{Evaluator, HostObject, RuntimeError, RuntimeResult, Value};
