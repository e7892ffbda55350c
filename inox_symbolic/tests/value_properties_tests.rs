//! Integration tests: algebraic properties of `Value::test`, join and intersection

mod common;
use common::*;

use inox_symbolic::symbolic::{Object, RecTestCallState};
use inox_symbolic::*;
use pretty_assertions::assert_eq;

// ==================== Test Protocol ====================

#[test]
fn test_every_value_accepts_itself() {
    for value in sample_values() {
        assert!(accepts(&value, &value), "{} should accept itself", value);
    }
}

#[test]
fn test_any_is_top() {
    for value in sample_values() {
        assert!(accepts(&Value::Any, &value), "any should accept {}", value);
        if !value.is_any() {
            assert!(!accepts(&value, &Value::Any), "{} should not accept any", value);
        }
    }
}

#[test]
fn test_readonly_containers_never_mix() {
    let pairs = [
        (
            Value::list(vec![Value::int(1)]),
            Value::readonly_list(vec![Value::int(1)]),
        ),
        (
            Value::object(Properties::exact().with("a", Value::int(1))),
            Value::readonly_object(Properties::exact().with("a", Value::int(1))),
        ),
        (
            Value::any_object(),
            Value::Object(std::rc::Rc::new(Object::any_readonly())),
        ),
    ];
    for (mutable, readonly) in &pairs {
        assert!(!accepts(mutable, readonly), "{} vs {}", mutable, readonly);
        assert!(!accepts(readonly, mutable), "{} vs {}", readonly, mutable);
    }
}

#[test]
fn test_readonly_conversion_keeps_shape() {
    let value = Value::list(vec![Value::object(Properties::exact().with("a", Value::int(1)))]);
    let readonly = value.to_readonly().unwrap();
    assert_eq!(readonly.to_string(), "readonly [{a: 1}]");
    assert!(!readonly.is_mutable());
}

#[test]
fn test_exactness_decides_extra_properties() {
    let candidate = Value::object(
        Properties::exact()
            .with("a", Value::any_int())
            .with("b", Value::any_int()),
    );
    let inexact = Pattern::object(Properties::inexact().with("a", int_pattern()));
    let exact = Pattern::object(Properties::exact().with("a", int_pattern()));
    assert!(matches(&inexact, &candidate));
    assert!(!matches(&exact, &candidate));
}

#[test]
fn test_self_containing_list_raises_depth_error() {
    let list = self_containing_list();
    let err = list.test(&list, &mut RecTestCallState::new()).unwrap_err();
    assert!(err.is_depth_error());
    assert!(matches!(
        err,
        SymbolicError::MaxRecursionDepthExceeded { depth: 64, .. }
    ));
}

#[test]
fn test_configured_depth_ceiling() {
    let config = SymbolicConfig::from_toml_str("max_test_depth = 5").unwrap();
    let list = self_containing_list();
    let mut state = RecTestCallState::with_config(&config).with_origin("assignment of x");
    let err = list.test(&list, &mut state).unwrap_err();
    assert!(matches!(
        err,
        SymbolicError::MaxRecursionDepthExceeded { depth: 5, .. }
    ));
    assert_eq!(state.depth(), 0);
}

#[test]
fn test_depth_error_is_reported_as_diagnostic() {
    DiagnosticsCollector::enable();
    DiagnosticsCollector::clear();
    let list = self_containing_list();
    let mut state = RecTestCallState::new().with_origin("argument 1 of f");
    assert!(list.test(&list, &mut state).is_err());
    let diagnostics = DiagnosticsCollector::take();
    DiagnosticsCollector::disable();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].reason, DiagnosticReason::MaxRecursionDepth(64));
    assert_eq!(diagnostics[0].context.as_deref(), Some("argument 1 of f"));
}

// ==================== Join ====================

#[test]
fn test_join_of_equal_values_is_the_value() {
    let joined = join_values(&[Value::any_int(), Value::any_int()]).unwrap();
    assert_eq!(joined.to_string(), "int");
    assert!(joined.multivalue_cases().is_none());
}

#[test]
fn test_join_of_distinct_values_keeps_order() {
    let joined = join_values(&[Value::any_int(), Value::any_str()]).unwrap();
    let cases = joined.multivalue_cases().unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].to_string(), "int");
    assert_eq!(cases[1].to_string(), "string");
}

#[test]
fn test_join_flattens_and_absorbs() {
    let int_or_bool = Value::multivalue(vec![Value::any_int(), Value::any_bool()]).unwrap();
    let int_or_int = Value::multivalue(vec![Value::any_int(), Value::any_int()]).unwrap();
    let joined = join_values(&[int_or_bool, int_or_int]).unwrap();
    assert_eq!(joined.to_string(), "(int | bool)");
}

#[test]
fn test_join_absorbs_constants_into_abstractions() {
    let joined = join_values(&[Value::int(1), Value::any_int(), Value::str("a")]).unwrap();
    assert_eq!(joined.to_string(), "(int | \"a\")");
    assert!(join_values(&[Value::Nil, Value::Any]).unwrap().is_any());
    assert!(join_values(&[]).unwrap().is_never());
}

#[test]
fn test_join_accepts_every_input() {
    let inputs: Vec<Value> = sample_values().into_iter().filter(|v| !v.is_any()).collect();
    let joined = join_values(&inputs).unwrap();
    for value in &inputs {
        assert!(accepts(&joined, value), "{} should accept {}", joined, value);
    }
}

#[test]
fn test_narrow_out_nil() {
    let maybe_list = join_values(&[Value::Nil, Value::list_of(Value::any_int())]).unwrap();
    let narrowed = narrow_out(&Value::Nil, &maybe_list).unwrap();
    assert_eq!(narrowed.to_string(), "[]int");
}

// ==================== Intersection ====================

#[test]
fn test_intersection_of_inexact_objects_requires_both() {
    let a = Value::object(Properties::inexact().with("a", Value::any_int()));
    let b = Value::object(Properties::inexact().with("b", Value::any_int()));
    let both = get_intersection(0, &[a, b]).unwrap();
    assert_eq!(both.to_string(), "{a: int, b: int, ...}");

    let only_a = Value::object(Properties::exact().with("a", Value::int(1)));
    assert!(!accepts(&both, &only_a));
}

#[test]
fn test_intersection_of_incompatible_exact_objects_is_never() {
    let a = Value::object(Properties::exact().with("a", Value::any_int()));
    let b = Value::object(Properties::exact().with("a", Value::any_bool()));
    assert!(get_intersection(0, &[a, b]).unwrap().is_never());
}

#[test]
fn test_intersection_narrows_multivalues() {
    let maybe_int = Value::multivalue(vec![Value::Nil, Value::any_int()]).unwrap();
    let result = get_intersection(0, &[Value::any_int(), maybe_int.clone()]).unwrap();
    assert_eq!(result.to_string(), "int");
    let result = get_intersection(0, &[maybe_int, Value::any_int()]).unwrap();
    assert_eq!(result.to_string(), "int");
}

#[test]
fn test_intersection_of_exact_and_inexact_objects_is_inexact() {
    let a = Value::object(Properties::exact().with("a", Value::any_int()));
    let b = Value::object(Properties::inexact().with("b", Value::any_str()));
    let both = get_intersection(0, &[a, b]).unwrap();
    assert_eq!(both.to_string(), "{a: int, b: string, ...}");
}

#[test]
fn test_intersection_depth_ceiling() {
    let err = get_intersection(100, &[Value::any_int()]).unwrap_err();
    assert!(matches!(err, SymbolicError::MaxIntersectionDepthExceeded { depth: 100 }));
    assert!(err.is_depth_error());
}

// ==================== Widening ====================

#[test]
fn test_widening_reaches_a_fixpoint() {
    for value in sample_values() {
        let mut current = value.clone();
        let mut steps = 0;
        while let Some(widened) = current.widen().unwrap() {
            assert!(
                accepts(&widened, &current),
                "{} should accept {}",
                widened,
                current
            );
            current = widened;
            steps += 1;
            assert!(steps < 10, "{} keeps widening", value);
        }
    }
}
