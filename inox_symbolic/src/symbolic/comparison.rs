//! Structural compatibility between symbolic values.
//!
//! `expected.test(candidate, state)` answers "can every value described by
//! `candidate` occur where `expected` is required?". A `false` result is a
//! plain mismatch; errors only come from the depth ceiling.

use crate::error::{SymbolicError, TestResult};

use super::state::{Mismatch, RecTestCallState};
use super::value::Value;

impl Value {
    /// Whether `other` is a possible occurrence of `self`.
    ///
    /// # Examples
    /// ```text
    /// int.test(1)            = true
    /// 1.test(int)            = false
    /// any.test(v)            = true
    /// v.test(any)            = false  (v != any)
    /// []int.test([1, 2])     = true
    /// [int, int].test([]int) = false
    /// ```
    pub fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let mut state = state.start_call()?;
        let state = &mut *state;

        match self {
            Value::Any => Ok(true),
            Value::Never => Ok(matches!(other, Value::Never)),
            Value::Nil => Ok(matches!(other, Value::Nil)),
            Value::Bool(expected) => Ok(match other {
                Value::Bool(actual) => expected.is_none() || expected == actual,
                _ => false,
            }),
            Value::Int(expected) => Ok(match other {
                Value::Int(actual) => expected.accepts(actual),
                _ => false,
            }),
            Value::Float(expected) => Ok(match other {
                Value::Float(actual) => expected.accepts(actual),
                _ => false,
            }),
            Value::Rune(expected) => Ok(match other {
                Value::Rune(actual) => expected.is_none() || expected == actual,
                _ => false,
            }),
            Value::Str(expected) => match other {
                Value::Str(actual) => expected.accepts(actual, state),
                _ => Ok(false),
            },
            Value::List(list) => list.test(other, state),
            Value::Array(array) => array.test(other, state),
            Value::Tuple(tuple) => tuple.test(other, state),
            Value::Object(obj) => obj.test(other, state),
            Value::Record(record) => record.test(other, state),
            Value::Dictionary(dict) => dict.test(other, state),
            Value::KeyList(keys) => Ok(keys.test(other)),
            Value::InoxFunction(function) => function.test(other, state),
            Value::GoFunction(function) => Ok(function.test(other)),
            Value::Function(function) => function.test(other, state),
            Value::Pattern(pattern) => match other {
                Value::Pattern(other_pattern) => pattern.test_pattern(other_pattern, state),
                _ => Ok(false),
            },
            Value::Multivalue(mv) => mv.test(other, state),
            Value::RunTime(rv) => rv.test(other),
            Value::View(view) => view.test(other, state),
        }
    }

    /// Describes why `other` cannot occur where `self` is expected, or
    /// `None` if it can.
    pub fn explain_mismatch(&self, other: &Value) -> Result<Option<Mismatch>, SymbolicError> {
        let mut state = RecTestCallState::new();
        if self.test(other, &mut state)? {
            return Ok(None);
        }
        Ok(Some(
            state
                .take_mismatch()
                .unwrap_or_else(|| Mismatch::at_root(self, other)),
        ))
    }
}
