//! Shared helpers for integration tests
// Each test target uses a different subset of these helpers.
#![allow(dead_code)]

use std::rc::Rc;

use inox_symbolic::symbolic::{
    Dictionary, Elements, Function, GoFunction, HostFunction, KeyList, List, Record, RunTimeValue, Signature,
};
use inox_symbolic::*;

/// `expected.test(actual)` with a fresh state.
pub fn accepts(expected: &Value, actual: &Value) -> bool {
    expected
        .test(actual, &mut RecTestCallState::new())
        .unwrap_or_else(|err| panic!("{} vs {}: {}", expected, actual, err))
}

/// `pattern.test_value(value)` with a fresh state.
pub fn matches(pattern: &Pattern, value: &Value) -> bool {
    pattern
        .test_value(value, &mut RecTestCallState::new())
        .unwrap_or_else(|err| panic!("{} vs {}: {}", pattern, value, err))
}

pub fn int_pattern() -> Pattern {
    Pattern::type_of(Value::any_int())
}

pub fn str_pattern() -> Pattern {
    Pattern::type_of(Value::any_str())
}

/// A list whose only element is the list itself.
pub fn self_containing_list() -> Value {
    let list = Rc::new(List::uninitialized());
    let value = Value::List(list.clone());
    list.initialize(Elements::Known(vec![value.clone()]))
        .expect("fresh list");
    value
}

/// One value of every family, constants and abstractions alike.
pub fn sample_values() -> Vec<Value> {
    vec![
        Value::Any,
        Value::Never,
        Value::Nil,
        Value::any_bool(),
        Value::bool(true),
        Value::any_int(),
        Value::int(-7),
        Value::any_float(),
        Value::float(0.5),
        Value::any_rune(),
        Value::rune('z'),
        Value::any_str(),
        Value::str("inox"),
        Value::list(vec![Value::int(1), Value::str("a")]),
        Value::list_of(Value::any_int()),
        Value::readonly_list(vec![Value::Nil]),
        Value::any_list(),
        Value::tuple(vec![Value::bool(false)]),
        Value::tuple_of(Value::any_str()),
        Value::array(vec![Value::int(2)]),
        Value::object(Properties::exact().with("a", Value::int(1))),
        Value::object(
            Properties::inexact()
                .with("a", Value::any_int())
                .with_optional("b", Value::any_str()),
        ),
        Value::readonly_object(Properties::exact().with("x", Value::Nil)),
        Value::any_object(),
        Value::record(Properties::exact().with("r", Value::int(3))),
        Value::any_record(),
        Value::Dictionary(Rc::new(Dictionary::new(vec![(Value::str("k"), Value::int(1))]))),
        Value::KeyList(Rc::new(KeyList::new(vec!["a".into(), "b".into()]))),
        Value::Function(Rc::new(Function::new(Signature::new(
            vec![Value::any_int()],
            Value::any_str(),
        )))),
        Value::GoFunction(GoFunction::wrap(HostFunction::new("len", vec![Value::any_list()], vec![Value::any_int()]))),
        Value::pattern(int_pattern()),
        Value::pattern(Pattern::object(Properties::inexact().with("a", str_pattern()))),
        Value::multivalue(vec![Value::Nil, Value::any_int()]).expect("two cases"),
        Value::RunTime(RunTimeValue::new(Value::any_int()).expect("not concretizable")),
        Value::Record(Rc::new(Record::value_only(Value::any_int()))),
    ]
}
