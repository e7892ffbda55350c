//! The closed catalogue of symbolic values.
//!
//! # Module structure
//!
//! - [`Value`]: the sum type every algorithm matches on
//! - scalars ([`Int`], [`Float`], [`Str`]) and their constraints
//! - constructors, `widest_of_type`, mutability and readonly conversion
//!
//! Containers live in `sequence` and `object`, callables in `function`,
//! unions in `multivalue`, and capability views in `capability`.
//! Values are immutable once built: every update returns a new value.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{SymbolicError, TestResult};

use super::capability::{CapabilityView, RunTimeValue};
use super::function::{Function, GoFunction, InoxFunction};
use super::multivalue::Multivalue;
use super::object::{Object, Properties, Record};
use super::pattern::{Pattern, TypePattern};
use super::sequence::{Array, Dictionary, Elements, KeyList, List, Tuple};
use super::state::RecTestCallState;

/// A symbolic value: a compile-time approximation of the run-time values an
/// expression may produce.
#[derive(Clone)]
pub enum Value {
    Any,
    Never,
    Nil,
    /// `None` stands for any boolean.
    Bool(Option<bool>),
    Int(Int),
    Float(Float),
    /// `None` stands for any rune.
    Rune(Option<char>),
    Str(Rc<Str>),
    List(Rc<List>),
    Array(Rc<Array>),
    Tuple(Rc<Tuple>),
    Object(Rc<Object>),
    Record(Rc<Record>),
    Dictionary(Rc<Dictionary>),
    KeyList(Rc<KeyList>),
    InoxFunction(Rc<InoxFunction>),
    GoFunction(GoFunction),
    Function(Rc<Function>),
    Pattern(Pattern),
    Multivalue(Rc<Multivalue>),
    RunTime(Rc<RunTimeValue>),
    /// A multivalue or run-time value seen through one capability.
    View(Rc<CapabilityView>),
}

/// Inclusive range of integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value <= self.end
    }

    pub fn contains_range(&self, other: &IntRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Inclusive range of floats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub start: f64,
    pub end: f64,
}

impl FloatRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.start <= value && value <= self.end
    }

    pub fn contains_range(&self, other: &FloatRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Inclusive range of string lengths, counted in runes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min <= len && len <= self.max
    }

    pub fn contains_range(&self, other: &LengthRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

/// Symbolic integer: any integer, a known one, or any integer of a range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Int {
    known: Option<i64>,
    range: Option<IntRange>,
}

impl Int {
    pub const ANY: Int = Int {
        known: None,
        range: None,
    };

    pub fn known(value: i64) -> Self {
        Self {
            known: Some(value),
            range: None,
        }
    }

    /// Any integer matching an int-range pattern.
    pub fn in_range(range: IntRange) -> Self {
        Self {
            known: None,
            range: Some(range),
        }
    }

    pub fn value(&self) -> Option<i64> {
        self.known
    }

    pub fn range(&self) -> Option<IntRange> {
        self.range
    }

    pub fn is_any(&self) -> bool {
        self.known.is_none() && self.range.is_none()
    }

    pub(crate) fn accepts(&self, other: &Int) -> bool {
        match (self.known, self.range) {
            (Some(value), _) => other.known == Some(value),
            (None, Some(range)) => match (other.known, other.range) {
                (Some(value), _) => range.contains(value),
                (None, Some(other_range)) => range.contains_range(&other_range),
                (None, None) => false,
            },
            (None, None) => true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Float {
    known: Option<f64>,
    range: Option<FloatRange>,
}

impl Float {
    pub const ANY: Float = Float {
        known: None,
        range: None,
    };

    pub fn known(value: f64) -> Self {
        Self {
            known: Some(value),
            range: None,
        }
    }

    pub fn in_range(range: FloatRange) -> Self {
        Self {
            known: None,
            range: Some(range),
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.known
    }

    pub fn range(&self) -> Option<FloatRange> {
        self.range
    }

    pub fn is_any(&self) -> bool {
        self.known.is_none() && self.range.is_none()
    }

    pub(crate) fn accepts(&self, other: &Float) -> bool {
        match (self.known, self.range) {
            // total_cmp keeps NaN reflexive
            (Some(value), _) => other.known.is_some_and(|o| o.total_cmp(&value).is_eq()),
            (None, Some(range)) => match (other.known, other.range) {
                (Some(value), _) => range.contains(value),
                (None, Some(other_range)) => range.contains_range(&other_range),
                (None, None) => false,
            },
            (None, None) => true,
        }
    }
}

/// Symbolic string. At most one of the constraints is set.
#[derive(Clone, Debug, Default)]
pub struct Str {
    pub(crate) known: Option<String>,
    pub(crate) length: Option<LengthRange>,
    /// A string pattern (`Pattern::String` or `Pattern::ExactString`).
    pub(crate) pattern: Option<Pattern>,
}

impl Str {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn known(value: impl Into<String>) -> Self {
        Self {
            known: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_length_range(range: LengthRange) -> Self {
        Self {
            length: Some(range),
            ..Self::default()
        }
    }

    /// Any string matched by a string pattern.
    pub fn matching(pattern: Pattern) -> Self {
        Self {
            pattern: Some(pattern),
            ..Self::default()
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.known.as_deref()
    }

    pub fn length_range(&self) -> Option<LengthRange> {
        self.length
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn is_any(&self) -> bool {
        self.known.is_none() && self.length.is_none() && self.pattern.is_none()
    }

    pub(crate) fn accepts(&self, other: &Str, state: &mut RecTestCallState) -> TestResult {
        if let Some(value) = &self.known {
            return Ok(other.known.as_deref() == Some(value.as_str()));
        }
        if let Some(range) = self.length {
            return Ok(match (&other.known, other.length, &other.pattern) {
                (Some(value), _, _) => range.contains(value.chars().count()),
                (None, Some(other_range), _) => range.contains_range(&other_range),
                (None, None, Some(pattern)) => pattern
                    .checked_length_range()
                    .is_some_and(|other_range| range.contains_range(&other_range)),
                (None, None, None) => false,
            });
        }
        if let Some(pattern) = &self.pattern {
            if let Some(value) = &other.known {
                return pattern.matches_str(value);
            }
            if let Some(other_pattern) = &other.pattern {
                return pattern.test_pattern(other_pattern, state);
            }
            if let Some(other_range) = other.length {
                return Ok(pattern
                    .checked_length_range()
                    .is_some_and(|range| range.contains_range(&other_range)));
            }
            return Ok(false);
        }
        Ok(true)
    }
}

impl Value {
    pub fn any_bool() -> Value {
        Value::Bool(None)
    }

    pub fn bool(value: bool) -> Value {
        Value::Bool(Some(value))
    }

    pub fn any_int() -> Value {
        Value::Int(Int::ANY)
    }

    pub fn int(value: i64) -> Value {
        Value::Int(Int::known(value))
    }

    pub fn any_float() -> Value {
        Value::Float(Float::ANY)
    }

    pub fn float(value: f64) -> Value {
        Value::Float(Float::known(value))
    }

    pub fn any_rune() -> Value {
        Value::Rune(None)
    }

    pub fn rune(value: char) -> Value {
        Value::Rune(Some(value))
    }

    pub fn any_str() -> Value {
        Value::Str(Rc::new(Str::any()))
    }

    pub fn str(value: impl Into<String>) -> Value {
        Value::Str(Rc::new(Str::known(value)))
    }

    /// List of known elements.
    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(List::new(Elements::Known(elements))))
    }

    /// List of unknown length whose elements all match `element`.
    pub fn list_of(element: Value) -> Value {
        Value::List(Rc::new(List::new(Elements::General(element))))
    }

    pub fn readonly_list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(List::new_readonly(Elements::Known(elements))))
    }

    pub fn any_list() -> Value {
        Value::list_of(Value::Any)
    }

    pub fn tuple(elements: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(Tuple::new(Elements::Known(elements))))
    }

    pub fn tuple_of(element: Value) -> Value {
        Value::Tuple(Rc::new(Tuple::new(Elements::General(element))))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(Array::new(Elements::Known(elements))))
    }

    pub fn object(properties: Properties<Value>) -> Value {
        Value::Object(Rc::new(Object::new(properties)))
    }

    pub fn readonly_object(properties: Properties<Value>) -> Value {
        Value::Object(Rc::new(Object::new_readonly(properties)))
    }

    pub fn any_object() -> Value {
        Value::Object(Rc::new(Object::any()))
    }

    pub fn record(properties: Properties<Value>) -> Value {
        Value::Record(Rc::new(Record::new(properties)))
    }

    pub fn any_record() -> Value {
        Value::Record(Rc::new(Record::any()))
    }

    pub fn pattern(pattern: Pattern) -> Value {
        Value::Pattern(pattern)
    }

    /// Builds a multivalue from at least two cases, without merging them.
    pub fn multivalue(cases: Vec<Value>) -> Result<Value, SymbolicError> {
        Ok(Value::Multivalue(Rc::new(Multivalue::new(cases)?)))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Value::Any)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Value::Never)
    }

    /// The cases of a multivalue, looking through a capability view.
    pub fn multivalue_cases(&self) -> Option<&[Value]> {
        match self {
            Value::Multivalue(mv) => Some(mv.cases()),
            Value::View(view) => view.multivalue_cases(),
            _ => None,
        }
    }

    /// The run-time value behind `self`, looking through a capability view.
    pub fn original_run_time_value(&self) -> Option<&Rc<RunTimeValue>> {
        match self {
            Value::RunTime(rv) => Some(rv),
            Value::View(view) => view.run_time_origin(),
            _ => None,
        }
    }

    /// The top element of the variant family of `self`.
    pub fn widest_of_type(&self) -> Value {
        match self {
            Value::Any => Value::Any,
            Value::Never => Value::Never,
            Value::Nil => Value::Nil,
            Value::Bool(_) => Value::any_bool(),
            Value::Int(_) => Value::any_int(),
            Value::Float(_) => Value::any_float(),
            Value::Rune(_) => Value::any_rune(),
            Value::Str(_) => Value::any_str(),
            Value::List(list) => {
                let elements = Elements::General(Value::Any);
                if list.is_readonly() {
                    Value::List(Rc::new(List::new_readonly(elements)))
                } else {
                    Value::List(Rc::new(List::new(elements)))
                }
            }
            Value::Array(_) => Value::Array(Rc::new(Array::new(Elements::General(Value::Any)))),
            Value::Tuple(_) => Value::tuple_of(Value::Any),
            Value::Object(obj) => {
                if obj.is_readonly() {
                    Value::Object(Rc::new(Object::any_readonly()))
                } else {
                    Value::any_object()
                }
            }
            Value::Record(_) => Value::any_record(),
            Value::Dictionary(_) => Value::Dictionary(Rc::new(Dictionary::any())),
            Value::KeyList(_) => Value::KeyList(Rc::new(KeyList::any())),
            Value::InoxFunction(_) => Value::InoxFunction(Rc::new(InoxFunction::any())),
            Value::GoFunction(_) => Value::GoFunction(GoFunction::Unconstrained),
            Value::Function(_) => Value::Function(Rc::new(Function::any())),
            Value::Pattern(pattern) => Value::Pattern(pattern.widest_of_type()),
            Value::Multivalue(mv) => widest_of_cases(mv.cases()),
            Value::RunTime(rv) => rv.super_value().widest_of_type(),
            Value::View(view) => match view.multivalue_cases() {
                Some(cases) => widest_of_cases(cases),
                None => view
                    .run_time_origin()
                    .map_or(Value::Any, |rv| rv.super_value().widest_of_type()),
            },
        }
    }

    /// Whether the values this approximates can be mutated in place.
    pub fn is_mutable(&self) -> bool {
        match self {
            Value::List(list) => !list.is_readonly(),
            Value::Object(obj) => !obj.is_readonly(),
            Value::Array(_) | Value::Dictionary(_) => true,
            Value::Multivalue(mv) => mv.cases().iter().any(Value::is_mutable),
            Value::RunTime(rv) => rv.super_value().is_mutable(),
            Value::View(view) => match view.multivalue_cases() {
                Some(cases) => cases.iter().any(Value::is_mutable),
                None => view
                    .run_time_origin()
                    .is_some_and(|rv| rv.super_value().is_mutable()),
            },
            _ => false,
        }
    }

    /// Readonly counterpart of `self`. Immutable values are returned as is.
    pub fn to_readonly(&self) -> Result<Value, SymbolicError> {
        match self {
            Value::List(list) => Ok(Value::List(Rc::new(list.to_readonly()))),
            Value::Object(obj) => Ok(Value::Object(Rc::new(obj.to_readonly()))),
            Value::Multivalue(mv) => {
                let cases = mv
                    .cases()
                    .iter()
                    .map(Value::to_readonly)
                    .collect::<Result<Vec<_>, _>>()?;
                Value::multivalue(cases)
            }
            _ if self.is_mutable() => Err(SymbolicError::NotConvertibleToReadonly(self.to_string())),
            _ => Ok(self.clone()),
        }
    }
}

/// Pattern recorded for a property when no explicit one is declared: any
/// value of the same family.
pub fn static_pattern_of(value: &Value) -> Pattern {
    Pattern::Type(Rc::new(TypePattern::new(value.widest_of_type())))
}

/// Widest values of the same family are equal, so deduplicating by display
/// name is the same as joining them.
fn widest_of_cases(cases: &[Value]) -> Value {
    let mut widest: Vec<Value> = Vec::with_capacity(cases.len());
    let mut names: Vec<String> = Vec::with_capacity(cases.len());
    for case in cases {
        let value = case.widest_of_type();
        if value.is_any() {
            return Value::Any;
        }
        let name = value.to_string();
        if !names.contains(&name) {
            names.push(name);
            widest.push(value);
        }
    }
    match widest.len() {
        0 => Value::Never,
        1 => widest.remove(0),
        _ => Value::Multivalue(Rc::new(Multivalue::from_distinct(widest))),
    }
}
