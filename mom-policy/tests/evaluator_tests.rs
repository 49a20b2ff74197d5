use mom_policy::{eval_str, Evaluator, RuntimeError, Value};
use pretty_assertions::assert_eq;

fn verify(policy: &str, expected: Vec<Value>) {
    let mut evaluator = Evaluator::new();
    let results = eval_str(&mut evaluator, policy).expect("policy should evaluate");
    assert_eq!(results, expected);
}

fn int(i: i64) -> Value {
    Value::Integer(i)
}

fn float(f: f64) -> Value {
    Value::Float(f)
}

fn string(s: &str) -> Value {
    Value::from(s)
}

fn boolean(b: bool) -> Value {
    Value::Boolean(b)
}

#[test]
fn comments_are_ignored() {
    let policy = r#"
        # This is a full-line comment
        12 # A partial-line comment with (+ 23 43) keywords
        (+ 3 # An expression with embedded comments
        2)
    "#;
    verify(policy, vec![int(12), int(5)]);
}

#[test]
fn whitespace_and_newlines_separate_tokens() {
    verify("\n(+ 1 \n2)  (- 10 2)\n", vec![int(3), int(8)]);
}

#[test]
fn string_operators() {
    let policy = r#"
        "foo" 'bar'
        (+ "Hello " "World!")
        (+ (* 3 "Hey ") "!")
    "#;
    verify(
        policy,
        vec![
            string("foo"),
            string("bar"),
            string("Hello World!"),
            string("Hey Hey Hey !"),
        ],
    );
}

#[test]
fn basic_math() {
    let policy = r#"
        10
        00                  # octal
        .3
        (* 0 1)
        (+ 1 2)
        (/ 11 2)            # integer division
        (/ 11 2.0)
        (* 3 6)
        (- 1 9)
        (* (- 8 6) 9)
        (>> (<< 1 4) 2)
        (+ 0xFF 0x1)
        (* 011 02)
        (+ 0xa 10)
        (+ 10.0e3 100e-2)
    "#;
    verify(
        policy,
        vec![
            int(10),
            int(0),
            float(0.3),
            int(0),
            int(3),
            int(5),
            float(5.5),
            int(18),
            int(-8),
            int(18),
            int(4),
            int(256),
            int(18),
            int(20),
            float(10001.0),
        ],
    );
}

#[test]
fn comparisons() {
    let policy = r#"
        (< 5 4)
        (> 1 0)
        (<= 10 10)
        (>= 2 (/ 10 2))
        (== (+ 1 2) (/ 9 3))
        (!= "foo" "foo")
        (== 0x0 0)
    "#;
    verify(
        policy,
        vec![
            boolean(false),
            boolean(true),
            boolean(true),
            boolean(false),
            boolean(true),
            boolean(false),
            boolean(true),
        ],
    );
}

#[test]
fn variables() {
    let policy = r#"
        (defvar foo "bar")
        (defvar a 5)
        (defvar b 6)
        (+ a b)
        (set a 8)
        (+ a b)
        (* foo 2)
        (defvar e3 7)
        (+ 1 e3)        # e3 is a symbol, not an exponent
    "#;
    verify(
        policy,
        vec![
            string("bar"),
            int(5),
            int(6),
            int(11),
            int(8),
            int(14),
            string("barbar"),
            int(7),
            int(8),
        ],
    );
}

#[test]
fn functions() {
    let policy = r#"
        (def foo () 10)
        (def bar (a)
            (* 2 a))
        (/ (foo) (bar 5))
        (def baz (b)
            (- 2 (bar b)))
        (baz 12)
        (def foo (a) {
            (def bar (b) (+ b 1))
            (bar a)
        })
        (foo 9)
    "#;
    verify(
        policy,
        vec![
            string("foo"),
            string("bar"),
            int(1),
            string("baz"),
            int(-22),
            string("foo"),
            int(10),
        ],
    );
}

#[test]
fn let_bindings_are_local() {
    let policy = r#"
        (def foo (a) (+ 2 a))
        (defvar a 2)
        (let ((a 1) (b 2)) (foo a))
        a
    "#;
    verify(policy, vec![string("foo"), int(2), int(3), int(2)]);
}

#[test]
fn let_bindings_are_sequential() {
    verify("(let ((a 2) (b (* a 10))) (+ a b))", vec![int(22)]);
}

#[test]
fn conditionals() {
    let policy = r#"
        (defvar a 1)
        (defvar b 0)
        (def f (cond)
            (if cond
                "yes"
                "no"))
        (if a 4 3)
        (if b 1 0)
        (f (> 2 1))
    "#;
    verify(
        policy,
        vec![int(1), int(0), string("f"), int(4), int(0), string("yes")],
    );
}

#[test]
fn untaken_branch_is_not_evaluated() {
    let policy = r#"
        (defvar hits 0)
        (if 1 (set hits (+ hits 1)) (set hits 100))
        (if 0 (undefined-function) hits)
    "#;
    verify(policy, vec![int(0), int(1), int(1)]);
}

#[test]
fn scoping_is_dynamic() {
    let policy = r#"
        (defvar a 10)
        (def foo (b) (set a b))         # set reaches the global a
        (foo 2)
        a
        (def foo (b) (defvar a b))      # defvar shadows locally
        (foo 4)
        a
        (set a 5)
        (let ((a 4)) a)
        a
        (if (== a 5) (defvar a 4) 0)    # if has no scope of its own
        a
    "#;
    verify(
        policy,
        vec![
            int(10),
            string("foo"),
            int(2),
            int(2),
            string("foo"),
            int(4),
            int(2),
            int(5),
            int(4),
            int(5),
            int(4),
            int(4),
        ],
    );
}

#[test]
fn functions_see_the_callers_scope() {
    let policy = r#"
        (def peek () x)
        (let ((x 7)) (peek))
    "#;
    verify(policy, vec![string("peek"), int(7)]);

    let mut evaluator = Evaluator::new();
    assert_eq!(
        eval_str(&mut evaluator, "(def peek () x) (peek)").unwrap_err().to_string(),
        "policy evaluation error: undefined symbol x"
    );
}

#[test]
fn multi_statement_blocks() {
    let policy = r#"
        { 10 4 }
        (def f (a b) {
            (defvar c (+ a b))
            (set c (+ 1 c))
            c
        })
        (f 4 5)

        (defvar q 11)
        (let ((q 2) (r 3)) {
            q r
            (- r q)
        })

        (if (== q 11) {
            "q maintains proper scope"
            (set q 12)
        } {
            "oops, q has the wrong value"
        })
        (- q 10)
    "#;
    verify(
        policy,
        vec![int(4), string("f"), int(10), int(11), int(1), int(12), int(2)],
    );
}

#[test]
fn predefined_constants() {
    verify(
        "True False None (if None 1 2)",
        vec![boolean(true), boolean(false), Value::Nil, int(2)],
    );
}

#[test]
fn builtins_cannot_be_shadowed() {
    verify("(def if (a b c) 99) (if 1 2 3)", vec![string("if"), int(2)]);
}

#[test]
fn evaluation_errors() {
    let mut evaluator = Evaluator::new();
    let cases: Vec<(&str, fn(&RuntimeError) -> bool)> = vec![
        ("(set undefined 1)", |e| {
            matches!(e, RuntimeError::UndefinedSymbol(_))
        }),
        ("(if 1 2)", |e| matches!(e, RuntimeError::ArityMismatch { .. })),
        ("(defvar 1 2)", |e| {
            matches!(e, RuntimeError::MalformedExpression { .. })
        }),
        ("(+ \"a\" 1)", |e| matches!(e, RuntimeError::TypeError { .. })),
        ("(/ 5 0)", |e| matches!(e, RuntimeError::DivisionByZero(_))),
        ("(nope 1 2)", |e| matches!(e, RuntimeError::UnknownFunction(_))),
    ];
    for (policy, check) in cases {
        match eval_str(&mut evaluator, policy) {
            Err(mom_policy::PolicyError::Evaluation(e)) => {
                assert!(check(&e), "{}: unexpected error {:?}", policy, e)
            }
            other => panic!("{}: expected an evaluation error, got {:?}", policy, other),
        }
    }
}
