use crate::ast::Expression;
use crate::runtime::{RuntimeError, RuntimeResult, Value};

/// How a built-in receives one of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// Evaluate the argument expression and pass the value.
    Evaluate,
    /// Pass the unevaluated expression; the built-in decides if and when to
    /// evaluate it.
    Code,
    /// Require a bare symbol token and pass its name.
    Symbol,
}

/// Parameter treatment of a built-in: fixed leading parameters plus an
/// optional mode applied to any number of trailing arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [ArgMode],
    pub rest: Option<ArgMode>,
}

impl Signature {
    pub const fn fixed(params: &'static [ArgMode]) -> Self {
        Signature { params, rest: None }
    }

    pub const fn variadic(params: &'static [ArgMode], rest: ArgMode) -> Self {
        Signature {
            params,
            rest: Some(rest),
        }
    }

    fn expected(&self) -> String {
        match self.rest {
            None => self.params.len().to_string(),
            Some(_) => format!("at least {}", self.params.len()),
        }
    }

    fn accepts(&self, count: usize) -> bool {
        match self.rest {
            None => count == self.params.len(),
            Some(_) => count >= self.params.len(),
        }
    }

    fn mode_at(&self, index: usize) -> ArgMode {
        self.params
            .get(index)
            .copied()
            .or(self.rest)
            .unwrap_or(ArgMode::Evaluate)
    }
}

/// An argument after binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Code(Expression),
    Symbol(String),
}

impl Arg {
    pub fn into_value(self) -> Value {
        match self {
            Arg::Value(v) => v,
            Arg::Symbol(s) => Value::String(s),
            Arg::Code(_) => Value::Nil,
        }
    }
}

/// Bind call arguments according to `signature`.
///
/// Arguments are handled left to right; `eval_cb` is invoked for every
/// argument in `Evaluate` position and is responsible for evaluating a single
/// expression.
pub fn bind_arguments<F>(
    function: &str,
    signature: &Signature,
    args: &[Expression],
    mut eval_cb: F,
) -> RuntimeResult<Vec<Arg>>
where
    F: FnMut(&Expression) -> RuntimeResult<Value>,
{
    if !signature.accepts(args.len()) {
        return Err(RuntimeError::arity(function, signature.expected(), args.len()));
    }
    let mut out = Vec::with_capacity(args.len());
    for (i, expr) in args.iter().enumerate() {
        let arg = match signature.mode_at(i) {
            ArgMode::Evaluate => Arg::Value(eval_cb(expr)?),
            ArgMode::Code => Arg::Code(expr.clone()),
            ArgMode::Symbol => match expr.as_symbol() {
                Some(name) => Arg::Symbol(name.to_string()),
                None => {
                    return Err(RuntimeError::malformed(
                        format!(
                            "argument {} of \"{}\" must be a symbol, got {}",
                            i + 1,
                            function,
                            expr
                        ),
                        expr.pos(),
                    ))
                }
            },
        };
        out.push(arg);
    }
    Ok(out)
}
