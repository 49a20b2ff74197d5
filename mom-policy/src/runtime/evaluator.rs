//! Tree-walking evaluator for policy programs.
//!
//! Call nodes dispatch on their head token. The head names a built-in
//! (operators go through the operator map first), then a user function
//! defined with `def`, then a method of a host object (`Obj.Method`).
//!
//! User functions are dynamically scoped: a function body sees the caller's
//! scope stack plus one new scope holding the parameters.

use crate::ast::{Delimiter, Expression, SourcePos, Token, TokenKind};
use crate::parser::{numeric_value, NumericLiteral};
use crate::runtime::environment::VariableStack;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::param_binding::bind_arguments;
use crate::runtime::stdlib::{self, BoundArgs};
use crate::runtime::values::{UserFunction, Value};
use std::collections::HashMap;

/// Nesting limit for user function calls.
pub const MAX_CALL_DEPTH: usize = 64;

/// Nesting limit for expression evaluation, counting every `eval`
/// including those inside user function bodies.
pub const MAX_EVAL_DEPTH: usize = 256;

#[derive(Debug, Clone)]
pub struct Evaluator {
    stack: VariableStack,
    funcs: HashMap<String, UserFunction>,
    depth: usize,
    eval_depth: usize,
}

impl Evaluator {
    /// Creates an evaluator with one global scope holding the predefined
    /// constants.
    pub fn new() -> Self {
        let mut stack = VariableStack::new();
        stdlib::load_globals(&mut stack);
        Evaluator {
            stack,
            funcs: HashMap::new(),
            depth: 0,
            eval_depth: 0,
        }
    }

    pub fn stack(&self) -> &VariableStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut VariableStack {
        &mut self.stack
    }

    /// Binds `name` in the global scope, replacing any previous binding.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.stack.declare_global(name, value);
    }

    pub fn functions(&self) -> &HashMap<String, UserFunction> {
        &self.funcs
    }

    pub fn define_function(&mut self, function: UserFunction) {
        self.funcs.insert(function.name.clone(), function);
    }

    /// Runs `f` inside a fresh innermost scope. The scope is popped whether
    /// `f` succeeds or not.
    pub fn with_scope<T, F>(&mut self, f: F) -> RuntimeResult<T>
    where
        F: FnOnce(&mut Self) -> RuntimeResult<T>,
    {
        self.stack.enter_scope();
        let result = f(self);
        self.stack.leave_scope();
        result
    }

    /// Evaluates each top-level expression in order and collects the results.
    pub fn eval_program(&mut self, program: &[Expression]) -> RuntimeResult<Vec<Value>> {
        program.iter().map(|expr| self.eval(expr)).collect()
    }

    pub fn eval(&mut self, expr: &Expression) -> RuntimeResult<Value> {
        if self.eval_depth >= MAX_EVAL_DEPTH {
            return Err(RuntimeError::EvaluationTooDeep(MAX_EVAL_DEPTH));
        }
        self.eval_depth += 1;
        let result = self.eval_nested(expr);
        self.eval_depth -= 1;
        result
    }

    fn eval_nested(&mut self, expr: &Expression) -> RuntimeResult<Value> {
        match expr {
            Expression::Token(token) => self.eval_token(token),
            Expression::List {
                delimiter: Delimiter::Curly,
                items,
                ..
            } => self.eval_block(items),
            Expression::List { items, pos, .. } => self.eval_call(items, *pos),
        }
    }

    fn eval_token(&mut self, token: &Token) -> RuntimeResult<Value> {
        match &token.kind {
            TokenKind::Number(kind) => match numeric_value(*kind, &token.text) {
                Ok(NumericLiteral::Integer(i)) => Ok(Value::Integer(i)),
                Ok(NumericLiteral::Float(f)) => Ok(Value::Float(f)),
                Err(message) => Err(RuntimeError::malformed(
                    format!("invalid number {}: {}", token.text, message),
                    token.pos,
                )),
            },
            TokenKind::String => Ok(Value::String(token.text.clone())),
            TokenKind::Symbol => self.eval_symbol(&token.text),
            TokenKind::Operator | TokenKind::Open(_) | TokenKind::Close(_) => Err(
                RuntimeError::malformed(format!("unexpected token {}", token.text), token.pos),
            ),
        }
    }

    /// Resolves a symbol through the scope stack. An unbound dotted symbol
    /// `Obj.attr` reads attribute `attr` of the host object bound to `Obj`;
    /// `Obj.a.b` starts from the longest bound prefix and reads one
    /// attribute per remaining segment.
    pub fn eval_symbol(&self, name: &str) -> RuntimeResult<Value> {
        if let Some(value) = self.stack.lookup(name) {
            return Ok(value.clone());
        }
        let undefined = || RuntimeError::UndefinedSymbol(name.to_string());
        let (mut value, path) = name
            .rmatch_indices('.')
            .find_map(|(dot, _)| {
                self.stack
                    .lookup(&name[..dot])
                    .map(|value| (value.clone(), &name[dot + 1..]))
            })
            .ok_or_else(undefined)?;
        for attribute in path.split('.') {
            value = match value {
                Value::Object(object) => object.attribute(attribute).ok_or_else(undefined)?,
                _ => return Err(undefined()),
            };
        }
        Ok(value)
    }

    fn eval_block(&mut self, items: &[Expression]) -> RuntimeResult<Value> {
        let mut last = Value::Nil;
        for item in items {
            last = self.eval(item)?;
        }
        Ok(last)
    }

    fn eval_call(&mut self, items: &[Expression], pos: SourcePos) -> RuntimeResult<Value> {
        let (head, args) = items
            .split_first()
            .ok_or_else(|| RuntimeError::malformed("empty expression cannot be called", pos))?;
        let name = match head {
            Expression::Token(t) if t.kind == TokenKind::Symbol => t.text.as_str(),
            Expression::Token(t) if t.kind == TokenKind::Operator => stdlib::operator_name(&t.text)
                .ok_or_else(|| RuntimeError::UnknownFunction(t.text.clone()))?,
            other => {
                return Err(RuntimeError::malformed(
                    format!("expected a symbol or operator as call head, got {}", other),
                    other.pos(),
                ))
            }
        };
        self.call_function(name, args, pos)
    }

    fn call_function(
        &mut self,
        name: &str,
        args: &[Expression],
        pos: SourcePos,
    ) -> RuntimeResult<Value> {
        if let Some(builtin) = stdlib::builtin(name) {
            let bound = bind_arguments(builtin.name, &builtin.signature, args, |e| self.eval(e))?;
            return (builtin.func)(self, BoundArgs::new(builtin.name, bound, pos));
        }
        if let Some(function) = self.funcs.get(name).cloned() {
            return self.call_user(&function, args);
        }
        if let Some((object_name, method)) = name.rsplit_once('.') {
            if let Ok(Value::Object(object)) = self.eval_symbol(object_name) {
                let values = args
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                return object.call_method(method, values);
            }
        }
        Err(RuntimeError::UnknownFunction(name.to_string()))
    }

    fn call_user(&mut self, function: &UserFunction, args: &[Expression]) -> RuntimeResult<Value> {
        if function.params.len() != args.len() {
            return Err(RuntimeError::arity(
                &function.name,
                function.params.len(),
                args.len(),
            ));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH));
        }
        let values = args
            .iter()
            .map(|e| self.eval(e))
            .collect::<RuntimeResult<Vec<_>>>()?;

        self.depth += 1;
        let result = self.with_scope(|ev| {
            for (param, value) in function.params.iter().zip(values) {
                ev.stack.declare(param, value);
            }
            ev.eval(&function.body)
        });
        self.depth -= 1;
        result
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
