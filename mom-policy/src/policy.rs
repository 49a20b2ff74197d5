//! Parsed policy programs.

use crate::ast::Expression;
use crate::parser::{self, ParseError};
use crate::runtime::{Evaluator, RuntimeError, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("policy syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("policy evaluation error: {0}")]
    Evaluation(#[from] RuntimeError),
}

/// A policy program together with the text it was parsed from.
///
/// A `Policy` is immutable once built; replacing the active policy means
/// building a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    source: String,
    code: Vec<Expression>,
}

impl Policy {
    pub fn parse(source: &str) -> Result<Self, PolicyError> {
        let code = parser::parse(source)?;
        Ok(Policy {
            source: source.to_string(),
            code,
        })
    }

    /// The inert program: evaluates to no results.
    pub fn empty() -> Self {
        Policy {
            source: String::new(),
            code: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.code
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Evaluates the program in a fresh evaluator with `globals` bound in
    /// the global scope.
    pub fn evaluate(&self, globals: &[(&str, Value)]) -> Result<Vec<Value>, PolicyError> {
        let mut evaluator = Evaluator::new();
        for (name, value) in globals {
            evaluator.define_global(name, value.clone());
        }
        self.evaluate_with(&mut evaluator)
    }

    /// Evaluates the program in an existing evaluator, keeping functions and
    /// variables it defines.
    pub fn evaluate_with(&self, evaluator: &mut Evaluator) -> Result<Vec<Value>, PolicyError> {
        Ok(evaluator.eval_program(&self.code)?)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parses and evaluates `source` in `evaluator`.
pub fn eval_str(evaluator: &mut Evaluator, source: &str) -> Result<Vec<Value>, PolicyError> {
    Policy::parse(source)?.evaluate_with(evaluator)
}
