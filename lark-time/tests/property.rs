use lark_time::{
    builtins,
    compiler::lexer::TokenKind,
    runtime::Globals,
    runtime_value::{Instant, RuntimeValue, Span, ValueProtocol},
};
use proptest::prelude::*;

fn instant() -> impl Strategy<Value = Instant> {
    any::<i64>().prop_map(Instant::from_unix_nanos)
}

fn span() -> impl Strategy<Value = Span> {
    any::<i64>().prop_map(Span::from_nanos)
}

proptest! {
    #[test]
    fn adding_then_subtracting_seconds_is_exact(
        t in -(1i64 << 62)..(1i64 << 62),
        seconds in 0i64..4_000_000_000,
    ) {
        let mut globals = Globals::new();
        builtins::TimeModule::new().register(&mut globals);
        globals.insert("t".to_owned(), Instant::from_unix_nanos(t).into());

        let value = globals
            .eval(&format!("t + timedelta(seconds={seconds}) - t"))
            .expect("should evaluate");

        prop_assert_eq!(value, RuntimeValue::Span(Span::from_nanos(seconds * 1_000_000_000)));
    }

    #[test]
    fn span_addition_is_commutative_and_invertible(a in span(), b in span()) {
        prop_assert_eq!(a + b, b + a);
        prop_assert_eq!((a + b) - b, a);
        prop_assert_eq!(a + -a, Span::ZERO);
        prop_assert_eq!(a + Span::ZERO, a);
    }

    #[test]
    fn span_addition_is_associative(a in span(), b in span(), c in span()) {
        prop_assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn instant_comparison_is_transitive(a in instant(), b in instant(), c in instant()) {
        let mut sorted = [a, b, c];
        sorted.sort();
        let [t1, t2, t3] = sorted;

        prop_assert!(t1.compare_same_type(TokenKind::Le, &t2));
        prop_assert!(t2.compare_same_type(TokenKind::Le, &t3));
        prop_assert!(t1.compare_same_type(TokenKind::Le, &t3));
        if t1.compare_same_type(TokenKind::Lt, &t2) && t2.compare_same_type(TokenKind::Lt, &t3) {
            prop_assert!(t1.compare_same_type(TokenKind::Lt, &t3));
        }
        prop_assert_eq!(
            t1.compare_same_type(TokenKind::EqEq, &t3),
            t1.compare_same_type(TokenKind::Ge, &t3)
        );
    }

    #[test]
    fn equal_instants_hash_equally(nanos in any::<i64>(), offset in 0i64..1_000_000) {
        let direct = Instant::from_unix_nanos(nanos);
        let shifted = Instant::from_unix_nanos(nanos.saturating_sub(offset))
            .checked_add(Span::from_nanos(nanos - nanos.saturating_sub(offset)))
            .expect("should be in range");

        prop_assert_eq!(direct, shifted);
        prop_assert_eq!(direct.hash(), shifted.hash());
    }

    #[test]
    fn equal_spans_hash_equally(nanos in any::<i64>(), offset in any::<i64>()) {
        let direct = Span::from_nanos(nanos);
        let combined = Span::from_nanos(nanos.wrapping_sub(offset)) + Span::from_nanos(offset);

        prop_assert_eq!(direct, combined);
        prop_assert_eq!(direct.hash(), combined.hash());
    }
}
