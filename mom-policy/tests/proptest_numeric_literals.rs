use mom_policy::{eval_str, parse, Evaluator, Value};
use proptest::prelude::*;

fn eval_single(src: &str) -> Value {
    let mut evaluator = Evaluator::new();
    let mut results = eval_str(&mut evaluator, src).expect("literal should evaluate");
    assert_eq!(results.len(), 1, "{} produced {:?}", src, results);
    results.remove(0)
}

proptest! {
    #[test]
    fn decimal_integers_round_trip(n in any::<i64>()) {
        prop_assert_eq!(eval_single(&n.to_string()), Value::Integer(n));
    }

    #[test]
    fn hex_literals(n in 0i64..=i64::MAX) {
        prop_assert_eq!(eval_single(&format!("0x{:x}", n)), Value::Integer(n));
        prop_assert_eq!(eval_single(&format!("0X{:X}", n)), Value::Integer(n));
    }

    #[test]
    fn octal_literals(n in 1i64..=0o7777_7777) {
        prop_assert_eq!(eval_single(&format!("0{:o}", n)), Value::Integer(n));
    }

    #[test]
    fn floats_with_fraction(int_part in 0u32..100_000, frac in 0u32..1000) {
        let text = format!("{}.{:03}", int_part, frac);
        let expected: f64 = text.parse().unwrap();
        prop_assert_eq!(eval_single(&text), Value::Float(expected));
    }

    #[test]
    fn integer_exponents_are_floats(mantissa in 1i64..1000, exp in 0i32..10) {
        let text = format!("{}e{}", mantissa, exp);
        prop_assert_eq!(eval_single(&text), Value::Float(mantissa as f64 * 10f64.powi(exp)));
    }

    #[test]
    fn symbols_never_scan_as_numbers(name in "[a-df-wyzA-DF-WYZ_][a-z0-9_]{0,8}") {
        let program = parse(&name).unwrap();
        prop_assert_eq!(program.len(), 1);
        prop_assert_eq!(program[0].as_symbol(), Some(name.as_str()));
    }

    #[test]
    fn integer_division_matches_floor(a in -10_000i64..10_000, b in prop::sample::select(vec![-7i64, -3, -1, 1, 2, 5, 13])) {
        let expected = (a as f64 / b as f64).floor() as i64;
        prop_assert_eq!(eval_single(&format!("(/ {} {})", a, b)), Value::Integer(expected));
    }
}
