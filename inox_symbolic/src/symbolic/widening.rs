//! Single-step widening.
//!
//! Widening trades precision for coverage: each step returns a strictly
//! more general value, and repeating it ends at the widest value of the
//! family or at `any`. Callers drive the loop and re-test after each step.

use std::rc::Rc;

use crate::diagnostics::emit_widened_to_any;
use crate::error::SymbolicError;

use super::function::{Function, GoFunction, InoxFunction};
use super::multivalue::join_values_in;
use super::object::{Object, Record, RecordShape};
use super::sequence::{Array, Dictionary, Elements, KeyList, List, Tuple};
use super::state::RecTestCallState;
use super::value::{Float, Int, Str, Value};

impl Value {
    /// One widening step, `None` if `self` cannot be widened.
    ///
    /// # Examples
    /// ```text
    /// 1                 -> int
    /// [1, "a"]          -> [](1 | "a")
    /// [](1 | "a")       -> [](int | string)
    /// {a: 1} (exact)    -> {a: int}
    /// {a: int} (exact)  -> {a: int, ...}
    /// {a: int, ...}     -> {...}
    /// int               -> None
    /// ```
    pub fn widen(&self) -> Result<Option<Value>, SymbolicError> {
        self.widen_in(&mut RecTestCallState::new())
    }

    pub(crate) fn widen_in(&self, state: &mut RecTestCallState) -> Result<Option<Value>, SymbolicError> {
        let mut state = state.start_call()?;
        let state = &mut *state;

        Ok(match self {
            Value::Any | Value::Never | Value::Nil => None,
            Value::Bool(Some(_)) => Some(Value::any_bool()),
            Value::Int(int) if !int.is_any() => Some(Value::Int(Int::ANY)),
            Value::Float(float) if !float.is_any() => Some(Value::Float(Float::ANY)),
            Value::Rune(Some(_)) => Some(Value::any_rune()),
            Value::Str(s) if !s.is_any() => Some(Value::Str(Rc::new(Str::any()))),
            Value::List(list) => match list.elements() {
                Some(elements) => widen_elements(elements, state)?.map(|widened| {
                    Value::List(Rc::new(if list.is_readonly() {
                        List::new_readonly(widened)
                    } else {
                        List::new(widened)
                    }))
                }),
                None => None,
            },
            Value::Array(array) => {
                widen_elements(array.elements(), state)?.map(|widened| Value::Array(Rc::new(Array::new(widened))))
            }
            Value::Tuple(tuple) => match tuple.elements() {
                Some(elements) => {
                    widen_elements(elements, state)?.map(|widened| Value::Tuple(Rc::new(Tuple::new(widened))))
                }
                None => None,
            },
            Value::Object(obj) => {
                let Some(props) = obj.props() else {
                    return Ok(None);
                };
                let mut any_widened = false;
                let widened = props.try_map(|_, value| {
                    Ok::<_, SymbolicError>(match value.widen_in(state)? {
                        Some(widened) => {
                            any_widened = true;
                            widened
                        }
                        None => value.clone(),
                    })
                })?;
                let next = if any_widened {
                    Some(widened)
                } else if props.is_exact() {
                    let mut inexact = props.clone();
                    inexact.set_exact(false);
                    Some(inexact)
                } else {
                    None
                };
                Some(Value::Object(Rc::new(match (next, obj.is_readonly()) {
                    (Some(next), false) => Object::new(next),
                    (Some(next), true) => Object::new_readonly(next),
                    (None, false) => Object::any(),
                    (None, true) => Object::any_readonly(),
                })))
            }
            Value::Record(record) => match record.shape() {
                RecordShape::Any => None,
                RecordShape::ValueOnly(value) => Some(match value.widen_in(state)? {
                    Some(widened) => Value::Record(Rc::new(Record::value_only(widened))),
                    None => Value::any_record(),
                }),
                RecordShape::Props(props) => {
                    let mut any_widened = false;
                    let widened = props.try_map(|_, value| {
                        Ok::<_, SymbolicError>(match value.widen_in(state)? {
                            Some(widened) => {
                                any_widened = true;
                                widened
                            }
                            None => value.clone(),
                        })
                    })?;
                    Some(if any_widened {
                        Value::record(widened)
                    } else {
                        Value::any_record()
                    })
                }
            },
            Value::Dictionary(dict) if dict.entries().is_some() => {
                Some(Value::Dictionary(Rc::new(Dictionary::any())))
            }
            Value::KeyList(keys) if keys.keys().is_some() => Some(Value::KeyList(Rc::new(KeyList::any()))),
            Value::InoxFunction(function) if !function.is_any() => {
                Some(Value::InoxFunction(Rc::new(InoxFunction::any())))
            }
            Value::GoFunction(GoFunction::Wrapped(_)) => Some(Value::GoFunction(GoFunction::Unconstrained)),
            Value::Function(function) if function.signature().is_some() => {
                Some(Value::Function(Rc::new(Function::any())))
            }
            Value::Pattern(pattern) => pattern.widen_in(state)?.map(Value::Pattern),
            Value::Multivalue(_) | Value::View(_) => match self.multivalue_cases() {
                Some(cases) => widen_cases(cases, state)?,
                None => None,
            },
            _ => None,
        })
    }
}

/// A fixed-length sequence becomes unbounded; an unbounded one widens its
/// general element.
fn widen_elements(elements: &Elements, state: &mut RecTestCallState) -> Result<Option<Elements>, SymbolicError> {
    Ok(match elements {
        Elements::Known(values) => {
            let element = join_values_in(values, state)?;
            Some(Elements::General(if element.is_never() {
                Value::Any
            } else {
                element
            }))
        }
        Elements::General(element) => element.widen_in(state)?.map(Elements::General),
    })
}

fn widen_cases(cases: &[Value], state: &mut RecTestCallState) -> Result<Option<Value>, SymbolicError> {
    let mut any_widened = false;
    let mut widened = Vec::with_capacity(cases.len());
    for case in cases {
        match case.widen_in(state)? {
            Some(value) => {
                any_widened = true;
                widened.push(value);
            }
            None => widened.push(case.clone()),
        }
    }
    if !any_widened {
        return Ok(None);
    }
    join_values_in(&widened, state).map(Some)
}

/// Widens `value` one step, or gives up with `any`.
pub fn widen_or_any(value: &Value) -> Result<Value, SymbolicError> {
    if value.is_any() {
        return Ok(Value::Any);
    }
    match value.widen()? {
        Some(widened) => Ok(widened),
        None => {
            emit_widened_to_any(&value.to_string());
            Ok(Value::Any)
        }
    }
}
