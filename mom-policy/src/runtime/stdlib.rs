//! Standard library for the policy language
//!
//! Built-ins are looked up by name before user functions, so a policy cannot
//! redefine them. Operator tokens are first translated through the operator
//! map (`+` -> `add`).

use crate::ast::{Expression, SourcePos};
use crate::runtime::environment::VariableStack;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::param_binding::{Arg, ArgMode, Signature};
use crate::runtime::values::{UserFunction, Value};
use lazy_static::lazy_static;
use std::cmp::Ordering;
use std::collections::HashMap;

use ArgMode::{Code, Evaluate, Symbol};

pub type BuiltinFn = fn(&mut Evaluator, BoundArgs) -> RuntimeResult<Value>;

pub struct Builtin {
    pub name: &'static str,
    pub signature: Signature,
    pub func: BuiltinFn,
}

/// Longest string (in bytes) or list a single operation may produce.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

const UNARY: Signature = Signature::fixed(&[Evaluate]);
const BINARY: Signature = Signature::fixed(&[Evaluate, Evaluate]);

lazy_static! {
    static ref OPERATOR_MAP: Vec<(&'static str, &'static str)> = vec![
        ("+", "add"),
        ("-", "sub"),
        ("*", "mul"),
        ("/", "div"),
        ("<", "lt"),
        (">", "gt"),
        ("<=", "lte"),
        (">=", "gte"),
        ("<<", "shl"),
        (">>", "shr"),
        ("==", "eq"),
        ("!=", "neq"),
    ];
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let table = [
            Builtin { name: "def", signature: Signature::fixed(&[Symbol, Code, Code]), func: def },
            Builtin { name: "set", signature: Signature::fixed(&[Symbol, Evaluate]), func: set },
            Builtin { name: "defvar", signature: Signature::fixed(&[Symbol, Evaluate]), func: defvar },
            Builtin { name: "let", signature: Signature::fixed(&[Code, Code]), func: let_ },
            Builtin { name: "if", signature: Signature::fixed(&[Evaluate, Code, Code]), func: if_ },
            Builtin { name: "and", signature: Signature::variadic(&[], Code), func: and },
            Builtin { name: "or", signature: Signature::variadic(&[], Code), func: or },
            Builtin { name: "with", signature: Signature::fixed(&[Evaluate, Symbol, Code]), func: with },
            Builtin { name: "not", signature: UNARY, func: not },
            Builtin { name: "abs", signature: UNARY, func: abs },
            Builtin { name: "len", signature: UNARY, func: len },
            Builtin { name: "min", signature: Signature::variadic(&[Evaluate], Evaluate), func: min },
            Builtin { name: "max", signature: Signature::variadic(&[Evaluate], Evaluate), func: max },
            Builtin { name: "add", signature: BINARY, func: add },
            Builtin { name: "sub", signature: BINARY, func: sub },
            Builtin { name: "mul", signature: BINARY, func: mul },
            Builtin { name: "div", signature: BINARY, func: div },
            Builtin { name: "lt", signature: BINARY, func: lt },
            Builtin { name: "gt", signature: BINARY, func: gt },
            Builtin { name: "lte", signature: BINARY, func: lte },
            Builtin { name: "gte", signature: BINARY, func: gte },
            Builtin { name: "eq", signature: BINARY, func: eq },
            Builtin { name: "neq", signature: BINARY, func: neq },
            Builtin { name: "shl", signature: BINARY, func: shl },
            Builtin { name: "shr", signature: BINARY, func: shr },
        ];
        table.into_iter().map(|b| (b.name, b)).collect()
    };
}

/// Operator lexemes recognized by the scanner.
pub fn operator_symbols() -> Vec<&'static str> {
    OPERATOR_MAP.iter().map(|(symbol, _)| *symbol).collect()
}

/// Built-in name an operator lexeme maps to.
pub fn operator_name(symbol: &str) -> Option<&'static str> {
    OPERATOR_MAP
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, name)| *name)
}

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Binds the predefined constants into the global scope.
pub fn load_globals(stack: &mut VariableStack) {
    stack.declare_global("True", Value::Boolean(true));
    stack.declare_global("False", Value::Boolean(false));
    stack.declare_global("None", Value::Nil);
}

/// Arguments of one built-in call after binding.
pub struct BoundArgs {
    function: &'static str,
    pos: SourcePos,
    args: std::vec::IntoIter<Arg>,
}

impl BoundArgs {
    pub fn new(function: &'static str, args: Vec<Arg>, pos: SourcePos) -> Self {
        BoundArgs {
            function,
            pos,
            args: args.into_iter(),
        }
    }

    fn next(&mut self) -> RuntimeResult<Arg> {
        self.args.next().ok_or_else(|| {
            RuntimeError::malformed(format!("missing argument to {}", self.function), self.pos)
        })
    }

    fn value(&mut self) -> RuntimeResult<Value> {
        Ok(self.next()?.into_value())
    }

    fn code(&mut self) -> RuntimeResult<Expression> {
        match self.next()? {
            Arg::Code(expr) => Ok(expr),
            _ => Err(RuntimeError::malformed(
                format!("{} expects code here", self.function),
                self.pos,
            )),
        }
    }

    fn symbol(&mut self) -> RuntimeResult<String> {
        match self.next()? {
            Arg::Symbol(name) => Ok(name),
            _ => Err(RuntimeError::malformed(
                format!("{} expects a symbol here", self.function),
                self.pos,
            )),
        }
    }

    fn rest(self) -> impl Iterator<Item = Arg> {
        self.args
    }
}

// Special forms

fn def(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let name = args.symbol()?;
    let params_expr = args.code()?;
    let body = args.code()?;
    let items = params_expr.as_list().ok_or_else(|| {
        RuntimeError::malformed(
            format!("parameters of {} must be a list of symbols", name),
            params_expr.pos(),
        )
    })?;
    let params = items
        .iter()
        .map(|p| {
            p.as_symbol().map(str::to_string).ok_or_else(|| {
                RuntimeError::malformed(format!("parameter {} is not a symbol", p), p.pos())
            })
        })
        .collect::<RuntimeResult<Vec<_>>>()?;
    ev.define_function(UserFunction {
        name: name.clone(),
        params,
        body,
    });
    Ok(Value::String(name))
}

fn set(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let name = args.symbol()?;
    let value = args.value()?;
    ev.stack_mut().set(&name, value)
}

fn defvar(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let name = args.symbol()?;
    let value = args.value()?;
    Ok(ev.stack_mut().declare(&name, value))
}

fn let_(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let bindings = args.code()?;
    let body = args.code()?;
    let pairs = bindings.as_list().ok_or_else(|| {
        RuntimeError::malformed("let expects a list of (name value) pairs", bindings.pos())
    })?;
    ev.with_scope(|ev| {
        for pair in pairs {
            let (name, expr) = match pair.as_list() {
                Some([name, expr]) => match name.as_symbol() {
                    Some(name) => (name, expr),
                    None => {
                        return Err(RuntimeError::malformed(
                            format!("let binding name {} is not a symbol", name),
                            name.pos(),
                        ))
                    }
                },
                _ => {
                    return Err(RuntimeError::malformed(
                        format!("let binding {} is not a (name value) pair", pair),
                        pair.pos(),
                    ))
                }
            };
            let value = ev.eval(expr)?;
            ev.stack_mut().declare(name, value);
        }
        ev.eval(&body)
    })
}

fn if_(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let cond = args.value()?;
    let then = args.code()?;
    let otherwise = args.code()?;
    if cond.is_truthy() {
        ev.eval(&then)
    } else {
        ev.eval(&otherwise)
    }
}

fn and(ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    let mut last = Value::Boolean(true);
    for arg in args.rest() {
        if let Arg::Code(expr) = arg {
            last = ev.eval(&expr)?;
            if !last.is_truthy() {
                break;
            }
        }
    }
    Ok(last)
}

fn or(ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    let mut last = Value::Boolean(false);
    for arg in args.rest() {
        if let Arg::Code(expr) = arg {
            last = ev.eval(&expr)?;
            if last.is_truthy() {
                break;
            }
        }
    }
    Ok(last)
}

fn with(ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let items = match args.value()? {
        Value::List(items) => items,
        other => return Err(RuntimeError::type_error("list", other.type_name(), "with")),
    };
    let name = args.symbol()?;
    let body = args.code()?;
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        results.push(ev.with_scope(|ev| {
            ev.stack_mut().declare(&name, item);
            ev.eval(&body)
        })?);
    }
    Ok(Value::List(results))
}

// Plain functions

fn not(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    Ok(Value::Boolean(!args.value()?.is_truthy()))
}

fn abs(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    match Num::of(&args.value()?, "abs")? {
        Num::Int(i) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| RuntimeError::ArithmeticOverflow("abs".to_string())),
        Num::Float(f) => Ok(Value::Float(f.abs())),
    }
}

fn len(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let n = match args.value()? {
        Value::String(s) => s.chars().count(),
        Value::List(l) => l.len(),
        other => return Err(RuntimeError::type_error("string or list", other.type_name(), "len")),
    };
    Ok(Value::Integer(n as i64))
}

fn min(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    extreme(args, "min", Ordering::Less)
}

fn max(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    extreme(args, "max", Ordering::Greater)
}

/// `min`/`max` over the arguments, or over the items of a single list
/// argument. The first of several equal candidates wins.
fn extreme(args: BoundArgs, op: &str, wanted: Ordering) -> RuntimeResult<Value> {
    let mut values: Vec<Value> = args.rest().map(Arg::into_value).collect();
    if values.len() == 1 {
        if let Value::List(items) = &values[0] {
            values = items.clone();
        }
    }
    let mut iter = values.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| RuntimeError::arity(op, "at least 1", 0))?;
    for candidate in iter {
        if compare(&candidate, &best, op)? == Some(wanted) {
            best = candidate;
        }
    }
    Ok(best)
}

// Arithmetic

/// Numeric operand; booleans count as integers.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Option<Num> {
        match value {
            Value::Integer(i) => Some(Num::Int(*i)),
            Value::Boolean(b) => Some(Num::Int(*b as i64)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn of(value: &Value, op: &str) -> RuntimeResult<Num> {
        Num::from_value(value).ok_or_else(|| RuntimeError::type_error("number", value.type_name(), op))
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn operand_error(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::type_error(
        "compatible operands",
        &format!("{} and {}", a.type_name(), b.type_name()),
        op,
    )
}

fn overflow(op: &str) -> RuntimeError {
    RuntimeError::ArithmeticOverflow(op.to_string())
}

/// Applies an integer op when both operands are integers, else a float op.
fn numeric(
    op: &str,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RuntimeResult<Value> {
    match (Num::from_value(a), Num::from_value(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => {
            int_op(x, y).map(Value::Integer).ok_or_else(|| overflow(op))
        }
        (Some(x), Some(y)) => Ok(Value::Float(float_op(x.as_f64(), y.as_f64()))),
        _ => Err(operand_error(op, a, b)),
    }
}

fn checked_len(op: &str, len: Option<usize>) -> RuntimeResult<usize> {
    match len {
        Some(n) if n <= MAX_SEQUENCE_LEN => Ok(n),
        other => Err(RuntimeError::limit(op, other, MAX_SEQUENCE_LEN)),
    }
}

fn repeat(op: &str, seq: &Value, times: &Value) -> RuntimeResult<Value> {
    let n = match Num::from_value(times) {
        Some(Num::Int(n)) => usize::try_from(n.max(0)).unwrap_or(usize::MAX),
        _ => return Err(operand_error(op, seq, times)),
    };
    match seq {
        Value::String(s) => {
            checked_len(op, s.len().checked_mul(n))?;
            Ok(Value::String(s.repeat(n)))
        }
        Value::List(l) => {
            let mut out = Vec::with_capacity(checked_len(op, l.len().checked_mul(n))?);
            for _ in 0..n {
                out.extend(l.iter().cloned());
            }
            Ok(Value::List(out))
        }
        _ => Err(operand_error(op, seq, times)),
    }
}

fn add(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    match (&a, &b) {
        (Value::String(x), Value::String(y)) => {
            checked_len("+", x.len().checked_add(y.len()))?;
            Ok(Value::String(format!("{}{}", x, y)))
        }
        (Value::List(x), Value::List(y)) => {
            checked_len("+", x.len().checked_add(y.len()))?;
            Ok(Value::List(x.iter().chain(y.iter()).cloned().collect()))
        }
        _ => numeric("+", &a, &b, i64::checked_add, |x, y| x + y),
    }
}

fn sub(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    numeric("-", &a, &b, i64::checked_sub, |x, y| x - y)
}

fn mul(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    match (&a, &b) {
        (Value::String(_) | Value::List(_), _) => repeat("*", &a, &b),
        (_, Value::String(_) | Value::List(_)) => repeat("*", &b, &a),
        _ => numeric("*", &a, &b, i64::checked_mul, |x, y| x * y),
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn div(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    match (Num::from_value(&a), Num::from_value(&b)) {
        (Some(_), Some(y)) if y.as_f64() == 0.0 => Err(RuntimeError::DivisionByZero("/".to_string())),
        _ => numeric("/", &a, &b, floor_div, |x, y| x / y),
    }
}

fn shift_operands(op: &str, a: &Value, b: &Value) -> RuntimeResult<(i64, u32)> {
    match (Num::from_value(a), Num::from_value(b)) {
        (Some(Num::Int(x)), Some(Num::Int(n))) if n >= 0 => {
            Ok((x, u32::try_from(n).unwrap_or(u32::MAX)))
        }
        (Some(Num::Int(_)), Some(Num::Int(_))) => Err(RuntimeError::type_error(
            "non-negative shift count",
            "negative integer",
            op,
        )),
        _ => Err(RuntimeError::type_error(
            "integers",
            &format!("{} and {}", a.type_name(), b.type_name()),
            op,
        )),
    }
}

fn shl(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    let (x, n) = shift_operands("<<", &a, &b)?;
    if x == 0 {
        return Ok(Value::Integer(0));
    }
    if n >= 63 {
        return Err(overflow("<<"));
    }
    let shifted = x << n;
    if shifted >> n != x {
        return Err(overflow("<<"));
    }
    Ok(Value::Integer(shifted))
}

fn shr(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    let (x, n) = shift_operands(">>", &a, &b)?;
    Ok(Value::Integer(x >> n.min(63)))
}

// Comparison

/// Orders two values. `None` means unordered (a NaN was involved).
fn compare(a: &Value, b: &Value, op: &str) -> RuntimeResult<Option<Ordering>> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Some(x.cmp(y))),
        _ => match (Num::from_value(a), Num::from_value(b)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => Ok(Some(x.cmp(&y))),
            (Some(x), Some(y)) => Ok(x.as_f64().partial_cmp(&y.as_f64())),
            _ => Err(operand_error(op, a, b)),
        },
    }
}

fn ordered(mut args: BoundArgs, op: &str, test: fn(Ordering) -> bool) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    Ok(Value::Boolean(compare(&a, &b, op)?.map_or(false, test)))
}

fn lt(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    ordered(args, "<", Ordering::is_lt)
}

fn gt(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    ordered(args, ">", Ordering::is_gt)
}

fn lte(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    ordered(args, "<=", Ordering::is_le)
}

fn gte(_ev: &mut Evaluator, args: BoundArgs) -> RuntimeResult<Value> {
    ordered(args, ">=", Ordering::is_ge)
}

fn eq(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    Ok(Value::Boolean(a.loose_eq(&b)))
}

fn neq(_ev: &mut Evaluator, mut args: BoundArgs) -> RuntimeResult<Value> {
    let (a, b) = (args.value()?, args.value()?);
    Ok(Value::Boolean(!a.loose_eq(&b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn eval_one(src: &str) -> RuntimeResult<Value> {
        let program = parse(src).expect("parse");
        let mut results = Evaluator::new().eval_program(&program)?;
        Ok(results.pop().unwrap_or(Value::Nil))
    }

    #[test]
    fn every_operator_maps_to_a_builtin() {
        for symbol in operator_symbols() {
            let name = operator_name(symbol).unwrap();
            assert!(builtin(name).is_some(), "{} -> {}", symbol, name);
        }
    }

    #[test]
    fn integer_division_floors() {
        assert_eq!(eval_one("(/ 11 2)").unwrap(), Value::Integer(5));
        assert_eq!(eval_one("(/ -7 2)").unwrap(), Value::Integer(-4));
        assert_eq!(eval_one("(/ 7 -2)").unwrap(), Value::Integer(-4));
        assert_eq!(eval_one("(/ 11.0 2)").unwrap(), Value::Float(5.5));
        assert_eq!(
            eval_one("(/ 1 0)"),
            Err(RuntimeError::DivisionByZero("/".to_string()))
        );
        assert!(eval_one("(/ 1.5 0.0)").is_err());
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            eval_one("(+ 9223372036854775807 1)"),
            Err(RuntimeError::ArithmeticOverflow("+".to_string()))
        );
        assert!(eval_one("(<< 1 64)").is_err());
        assert_eq!(eval_one("(<< 1 62)").unwrap(), Value::Integer(1 << 62));
        assert_eq!(eval_one("(>> -8 100)").unwrap(), Value::Integer(-1));
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(eval_one(r#"(+ "a" "b")"#).unwrap(), Value::from("ab"));
        assert_eq!(eval_one(r#"(* 2 "ab")"#).unwrap(), Value::from("abab"));
        assert_eq!(eval_one(r#"(* "ab" 0)"#).unwrap(), Value::from(""));
        assert!(matches!(
            eval_one(r#"(+ "a" 1)"#),
            Err(RuntimeError::TypeError { .. })
        ));
        assert!(matches!(
            eval_one(r#"(* "a" 1.5)"#),
            Err(RuntimeError::TypeError { .. })
        ));
    }

    #[test]
    fn repetition_is_bounded() {
        assert!(matches!(
            eval_one(r#"(* "ab" 9223372036854775807)"#),
            Err(RuntimeError::LimitExceeded { .. })
        ));
        assert!(matches!(
            eval_one(r#"(* "x" 10000000000)"#),
            Err(RuntimeError::LimitExceeded { .. })
        ));
        assert_eq!(
            eval_one(r#"(len (* "x" 1048576))"#).unwrap(),
            Value::Integer(1 << 20)
        );
        assert!(eval_one(r#"(* "x" 1048577)"#).is_err());
    }

    #[test]
    fn doubling_stops_at_the_length_limit() {
        let err = eval_one(
            r#"
            (def grow (s n) (if n (grow (+ s s) (- n 1)) s))
            (grow "ab" 40)
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::LimitExceeded { ref operation, .. } if operation == "+"));
    }

    #[test]
    fn booleans_are_small_integers() {
        assert_eq!(eval_one("(+ True 1)").unwrap(), Value::Integer(2));
        assert_eq!(eval_one("(== False 0)").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn and_or_return_the_deciding_value() {
        assert_eq!(eval_one("(and 1 2 3)").unwrap(), Value::Integer(3));
        assert_eq!(eval_one("(and 1 0 undefined)").unwrap(), Value::Integer(0));
        assert_eq!(eval_one(r#"(or 0 "" "x" undefined)"#).unwrap(), Value::from("x"));
        assert_eq!(eval_one("(or)").unwrap(), Value::Boolean(false));
        assert_eq!(eval_one("(and)").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn min_max_abs_len() {
        assert_eq!(eval_one("(min 3 1.5 2)").unwrap(), Value::Float(1.5));
        assert_eq!(eval_one("(max 3 7 2)").unwrap(), Value::Integer(7));
        assert_eq!(eval_one(r#"(max "a" "b")"#).unwrap(), Value::from("b"));
        assert_eq!(eval_one("(abs -4)").unwrap(), Value::Integer(4));
        assert_eq!(eval_one(r#"(len "hello")"#).unwrap(), Value::Integer(5));
        assert!(eval_one("(len 5)").is_err());
    }

    #[test]
    fn with_maps_over_lists() {
        assert!(matches!(
            eval_one("(with 5 x x)"),
            Err(RuntimeError::TypeError { .. })
        ));
        let program = parse("(def double (x) (* x 2))").unwrap();
        let mut ev = Evaluator::new();
        ev.eval_program(&program).unwrap();
        ev.define_global("xs", Value::from(vec![1i64, 2, 3]));
        let call = parse("(with xs x (double x))").unwrap();
        assert_eq!(
            ev.eval_program(&call).unwrap(),
            vec![Value::from(vec![2i64, 4, 6])]
        );
        assert!(ev.stack().lookup("x").is_none());
    }

    #[test]
    fn comparisons_mix_numeric_types() {
        assert_eq!(eval_one("(< 1 1.5)").unwrap(), Value::Boolean(true));
        assert_eq!(eval_one("(>= 2 2.0)").unwrap(), Value::Boolean(true));
        assert_eq!(eval_one(r#"(< "abc" "abd")"#).unwrap(), Value::Boolean(true));
        assert!(eval_one(r#"(< "a" 1)"#).is_err());
    }

    #[test]
    fn def_requires_symbol_parameters() {
        assert!(matches!(
            eval_one("(def f (1) 1)"),
            Err(RuntimeError::MalformedExpression { .. })
        ));
        assert!(matches!(
            eval_one("(def f x 1)"),
            Err(RuntimeError::MalformedExpression { .. })
        ));
    }
}
