// Variable scopes for the policy evaluator

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::values::Value;
use std::collections::HashMap;

/// Stack of variable scopes. The innermost scope is searched first.
///
/// Scopes are pushed on function entry and by `let`, and popped on exit.
/// `Evaluator::with_scope` keeps every push paired with a pop, error paths
/// included.
#[derive(Debug, Clone)]
pub struct VariableStack {
    // Outermost scope first; the last element is the innermost scope.
    scopes: Vec<HashMap<String, Value>>,
}

impl VariableStack {
    /// Creates a stack holding one empty global scope.
    pub fn new() -> Self {
        VariableStack {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops the innermost scope. The global scope is never popped.
    pub fn leave_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Looks up a symbol by searching the scopes from innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedSymbol(name.to_string()))
    }

    /// Updates the nearest enclosing binding of `name`.
    pub fn set(&mut self, name: &str, value: Value) -> RuntimeResult<Value> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value.clone();
                return Ok(value);
            }
        }
        Err(RuntimeError::UndefinedSymbol(name.to_string()))
    }

    /// Binds `name` in the innermost scope, shadowing any outer binding.
    pub fn declare(&mut self, name: &str, value: Value) -> Value {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value.clone());
        }
        value
    }

    /// Binds `name` in the global scope regardless of the current depth.
    pub fn declare_global(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.first_mut() {
            scope.insert(name.to_string(), value);
        }
    }
}

impl Default for VariableStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_updates_nearest_binding() {
        let mut stack = VariableStack::new();
        stack.declare("a", Value::Integer(1));
        stack.enter_scope();
        stack.set("a", Value::Integer(2)).unwrap();
        stack.leave_scope();
        assert_eq!(stack.get("a").unwrap(), Value::Integer(2));
    }

    #[test]
    fn declare_shadows_until_scope_exit() {
        let mut stack = VariableStack::new();
        stack.declare("a", Value::Integer(1));
        stack.enter_scope();
        stack.declare("a", Value::Integer(5));
        assert_eq!(stack.get("a").unwrap(), Value::Integer(5));
        stack.leave_scope();
        assert_eq!(stack.get("a").unwrap(), Value::Integer(1));
    }

    #[test]
    fn undefined_names_fail() {
        let mut stack = VariableStack::new();
        assert_eq!(
            stack.get("nope"),
            Err(RuntimeError::UndefinedSymbol("nope".to_string()))
        );
        assert!(stack.set("nope", Value::Nil).is_err());
    }

    #[test]
    fn global_scope_survives_extra_pops() {
        let mut stack = VariableStack::new();
        stack.declare("g", Value::Integer(1));
        stack.leave_scope();
        assert_eq!(stack.depth(), 1);
        assert!(stack.lookup("g").is_some());
    }
}
