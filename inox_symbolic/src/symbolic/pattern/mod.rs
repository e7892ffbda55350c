//! Patterns: symbolic values that can also test values for membership.
//!
//! A [`Pattern`] answers two questions:
//! - `test_pattern`: is every value matched by the other pattern matched by this one?
//! - `test_value`: is every value described by a symbolic value matched?
//!
//! and projects itself to the symbolic value of its matches with
//! [`Pattern::symbolic_value`].

pub mod string;

use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::error::{SymbolicError, TestResult};

use super::function::{signature_of, Function, NodeCheck, Signature};
use super::intersection::get_intersection;
use super::multivalue::{join_values_in, narrow_out};
use super::object::{Object, Properties, Record};
use super::sequence::{Elements, List, Tuple};
use super::state::{PathSegment, RecTestCallState};
use super::value::{Float, FloatRange, Int, IntRange, LengthRange, Str, Value};
use super::widening::widen_or_any;

pub use string::{RegexPattern, SequencePattern, StringParser, StringPattern};

#[derive(Clone)]
pub enum Pattern {
    /// Matches every value.
    Any,
    Type(Rc<TypePattern>),
    ExactValue(Rc<ExactValuePattern>),
    ExactString(Rc<ExactStringPattern>),
    String(Rc<StringPattern>),
    IntRange(IntRangePattern),
    FloatRange(FloatRangePattern),
    Object(Rc<ObjectPattern>),
    Record(Rc<RecordPattern>),
    List(Rc<ListPattern>),
    Tuple(Rc<TuplePattern>),
    Union(Rc<UnionPattern>),
    Intersection(Rc<IntersectionPattern>),
    Difference(Rc<DifferencePattern>),
    Optional(Rc<OptionalPattern>),
    Function(Rc<FunctionPattern>),
}

/// Matches the values accepted by a symbolic value.
pub struct TypePattern {
    value: Value,
}

impl TypePattern {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

pub struct ExactValuePattern {
    value: Value,
}

impl ExactValuePattern {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Matches one string. `None` matches any exact-string pattern.
pub struct ExactStringPattern {
    value: Option<String>,
}

impl ExactStringPattern {
    pub fn any() -> Self {
        Self { value: None }
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntRangePattern {
    pub range: Option<IntRange>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatRangePattern {
    pub range: Option<FloatRange>,
}

pub struct ObjectPattern {
    shape: OnceCell<Properties<Pattern>>,
    readonly: bool,
}

impl ObjectPattern {
    pub fn new(properties: Properties<Pattern>) -> Self {
        Self {
            shape: OnceCell::with_value(properties),
            readonly: false,
        }
    }

    pub fn new_readonly(properties: Properties<Pattern>) -> Self {
        Self {
            shape: OnceCell::with_value(properties),
            readonly: true,
        }
    }

    pub fn any() -> Self {
        Self::uninitialized()
    }

    pub fn uninitialized() -> Self {
        Self {
            shape: OnceCell::new(),
            readonly: false,
        }
    }

    pub fn initialize(&self, properties: Properties<Pattern>) -> Result<(), SymbolicError> {
        self.shape
            .set(properties)
            .map_err(|_| SymbolicError::ValueAlreadyInitialized("object pattern"))
    }

    pub fn props(&self) -> Option<&Properties<Pattern>> {
        self.shape.get()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

pub struct RecordPattern {
    shape: Option<Properties<Pattern>>,
}

impl RecordPattern {
    pub fn any() -> Self {
        Self { shape: None }
    }

    pub fn new(properties: Properties<Pattern>) -> Self {
        Self {
            shape: Some(properties),
        }
    }

    pub fn props(&self) -> Option<&Properties<Pattern>> {
        self.shape.as_ref()
    }
}

/// Element patterns of a list or tuple pattern.
#[derive(Clone)]
pub enum ElementPatterns {
    Known(Vec<Pattern>),
    General(Pattern),
}

pub struct ListPattern {
    shape: OnceCell<ElementPatterns>,
    readonly: bool,
}

impl ListPattern {
    pub fn new(elements: ElementPatterns) -> Self {
        Self {
            shape: OnceCell::with_value(elements),
            readonly: false,
        }
    }

    pub fn new_readonly(elements: ElementPatterns) -> Self {
        Self {
            shape: OnceCell::with_value(elements),
            readonly: true,
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            shape: OnceCell::new(),
            readonly: false,
        }
    }

    pub fn initialize(&self, elements: ElementPatterns) -> Result<(), SymbolicError> {
        self.shape
            .set(elements)
            .map_err(|_| SymbolicError::ValueAlreadyInitialized("list pattern"))
    }

    pub fn elements(&self) -> Option<&ElementPatterns> {
        self.shape.get()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

pub struct TuplePattern {
    elements: ElementPatterns,
}

impl TuplePattern {
    pub fn new(elements: ElementPatterns) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &ElementPatterns {
        &self.elements
    }
}

/// `None` cases: the widest union pattern.
pub struct UnionPattern {
    cases: Option<Vec<Pattern>>,
}

impl UnionPattern {
    pub fn new(cases: Vec<Pattern>) -> Self {
        Self { cases: Some(cases) }
    }

    pub fn any() -> Self {
        Self { cases: None }
    }

    pub fn cases(&self) -> Option<&[Pattern]> {
        self.cases.as_deref()
    }
}

pub struct IntersectionPattern {
    cases: Option<Vec<Pattern>>,
}

impl IntersectionPattern {
    pub fn new(cases: Vec<Pattern>) -> Self {
        Self { cases: Some(cases) }
    }

    pub fn any() -> Self {
        Self { cases: None }
    }

    pub fn cases(&self) -> Option<&[Pattern]> {
        self.cases.as_deref()
    }
}

/// Values matched by `base` but not by `removed`.
pub struct DifferencePattern {
    pub base: Pattern,
    pub removed: Pattern,
}

/// Nil or the values matched by `inner`.
pub struct OptionalPattern {
    pub inner: Pattern,
}

#[derive(Default)]
pub struct FunctionPattern {
    signature: Option<Signature>,
    body_check: Option<NodeCheck>,
}

impl FunctionPattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            body_check: None,
        }
    }

    /// Restricts the bodies of matched Inox functions.
    pub fn with_body_check(mut self, check: NodeCheck) -> Self {
        self.body_check = Some(check);
        self
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn body_check(&self) -> Option<&NodeCheck> {
        self.body_check.as_ref()
    }

    fn is_any(&self) -> bool {
        self.signature.is_none() && self.body_check.is_none()
    }
}

impl Pattern {
    pub fn type_of(value: Value) -> Pattern {
        Pattern::Type(Rc::new(TypePattern::new(value)))
    }

    pub fn exact_value(value: Value) -> Pattern {
        Pattern::ExactValue(Rc::new(ExactValuePattern::new(value)))
    }

    pub fn exact_string(value: impl Into<String>) -> Pattern {
        Pattern::ExactString(Rc::new(ExactStringPattern::new(value)))
    }

    pub fn string(pattern: StringPattern) -> Pattern {
        Pattern::String(Rc::new(pattern))
    }

    pub fn int_range(range: IntRange) -> Pattern {
        Pattern::IntRange(IntRangePattern { range: Some(range) })
    }

    pub fn float_range(range: FloatRange) -> Pattern {
        Pattern::FloatRange(FloatRangePattern { range: Some(range) })
    }

    pub fn object(properties: Properties<Pattern>) -> Pattern {
        Pattern::Object(Rc::new(ObjectPattern::new(properties)))
    }

    pub fn record(properties: Properties<Pattern>) -> Pattern {
        Pattern::Record(Rc::new(RecordPattern::new(properties)))
    }

    pub fn list(elements: Vec<Pattern>) -> Pattern {
        Pattern::List(Rc::new(ListPattern::new(ElementPatterns::Known(elements))))
    }

    pub fn list_of(element: Pattern) -> Pattern {
        Pattern::List(Rc::new(ListPattern::new(ElementPatterns::General(element))))
    }

    pub fn tuple(elements: Vec<Pattern>) -> Pattern {
        Pattern::Tuple(Rc::new(TuplePattern::new(ElementPatterns::Known(elements))))
    }

    pub fn tuple_of(element: Pattern) -> Pattern {
        Pattern::Tuple(Rc::new(TuplePattern::new(ElementPatterns::General(element))))
    }

    pub fn union(cases: Vec<Pattern>) -> Pattern {
        Pattern::Union(Rc::new(UnionPattern::new(cases)))
    }

    pub fn intersection(cases: Vec<Pattern>) -> Pattern {
        Pattern::Intersection(Rc::new(IntersectionPattern::new(cases)))
    }

    pub fn difference(base: Pattern, removed: Pattern) -> Pattern {
        Pattern::Difference(Rc::new(DifferencePattern { base, removed }))
    }

    pub fn optional(inner: Pattern) -> Pattern {
        Pattern::Optional(Rc::new(OptionalPattern { inner }))
    }

    pub fn function(pattern: FunctionPattern) -> Pattern {
        Pattern::Function(Rc::new(pattern))
    }

    /// Whether every value matched by `other` is matched by `self`.
    pub fn test_pattern(&self, other: &Pattern, state: &mut RecTestCallState) -> TestResult {
        let mut state = state.start_call()?;
        let state = &mut *state;

        match (self, other) {
            (Pattern::Any, _) => Ok(true),
            (Pattern::Type(p), Pattern::Type(o)) => p.value.test(&o.value, state),
            (Pattern::ExactValue(p), Pattern::ExactValue(o)) => p.value.test(&o.value, state),
            (Pattern::ExactString(p), Pattern::ExactString(o)) => Ok(match &p.value {
                None => true,
                Some(value) => o.value.as_ref() == Some(value),
            }),
            (Pattern::String(p), Pattern::String(o)) => p.test_pattern(o, state),
            (Pattern::String(p), Pattern::ExactString(o)) => match &o.value {
                Some(value) => p.matches(value),
                None => Ok(false),
            },
            (Pattern::IntRange(p), Pattern::IntRange(o)) => Ok(match (p.range, o.range) {
                (None, _) => true,
                (Some(r), Some(other_range)) => r.contains_range(&other_range),
                (Some(_), None) => false,
            }),
            (Pattern::FloatRange(p), Pattern::FloatRange(o)) => Ok(match (p.range, o.range) {
                (None, _) => true,
                (Some(r), Some(other_range)) => r.contains_range(&other_range),
                (Some(_), None) => false,
            }),
            (Pattern::Object(p), Pattern::Object(o)) => {
                if p.readonly != o.readonly {
                    return Ok(false);
                }
                match (p.props(), o.props()) {
                    (None, _) => Ok(true),
                    (Some(props), Some(other_props)) => {
                        test_pattern_properties(props, other_props, state)
                    }
                    (Some(_), None) => Ok(false),
                }
            }
            (Pattern::Record(p), Pattern::Record(o)) => match (p.props(), o.props()) {
                (None, _) => Ok(true),
                (Some(props), Some(other_props)) => test_pattern_properties(props, other_props, state),
                (Some(_), None) => Ok(false),
            },
            (Pattern::List(p), Pattern::List(o)) => {
                if p.readonly != o.readonly {
                    return Ok(false);
                }
                match (p.elements(), o.elements()) {
                    (None, _) => Ok(true),
                    (Some(elements), Some(other_elements)) => {
                        test_element_patterns(elements, other_elements, state)
                    }
                    (Some(_), None) => Ok(false),
                }
            }
            (Pattern::Tuple(p), Pattern::Tuple(o)) => {
                test_element_patterns(&p.elements, &o.elements, state)
            }
            (Pattern::Union(p), Pattern::Union(o)) => match (&p.cases, &o.cases) {
                (None, _) => Ok(true),
                (Some(cases), Some(other_cases)) => {
                    if cases.len() != other_cases.len() {
                        return Ok(false);
                    }
                    for (case, other_case) in cases.iter().zip(other_cases) {
                        if !case.test_pattern(other_case, state)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                (Some(_), None) => Ok(false),
            },
            (Pattern::Union(p), _) => {
                let Some(cases) = &p.cases else {
                    return Ok(true);
                };
                for case in cases {
                    if case.test_pattern(other, state)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (Pattern::Intersection(p), Pattern::Intersection(o)) => match (&p.cases, &o.cases) {
                (None, _) => Ok(true),
                (Some(cases), Some(other_cases)) => {
                    if cases.len() != other_cases.len() {
                        return Ok(false);
                    }
                    for (case, other_case) in cases.iter().zip(other_cases) {
                        if !case.test_pattern(other_case, state)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                (Some(_), None) => Ok(false),
            },
            (Pattern::Difference(p), Pattern::Difference(o)) => Ok(p.base.test_pattern(&o.base, state)?
                && o.removed.test_pattern(&p.removed, state)?),
            (Pattern::Optional(p), Pattern::Optional(o)) => p.inner.test_pattern(&o.inner, state),
            (Pattern::Optional(p), _) => p.inner.test_pattern(other, state),
            (Pattern::Function(p), Pattern::Function(o)) => {
                if let Some(check) = &p.body_check {
                    let same_check = o
                        .body_check
                        .as_ref()
                        .is_some_and(|other_check| Rc::ptr_eq(&check.0, &other_check.0));
                    if !same_check {
                        return Ok(false);
                    }
                }
                match (&p.signature, &o.signature) {
                    (None, _) => Ok(true),
                    (Some(signature), Some(other_signature)) => {
                        signature.accepts(other_signature, state)
                    }
                    (Some(_), None) => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// Whether every value described by `value` is matched.
    pub fn test_value(&self, value: &Value, state: &mut RecTestCallState) -> TestResult {
        let mut state = state.start_call()?;
        let state = &mut *state;

        if let Pattern::Any = self {
            return Ok(true);
        }
        if let Some(cases) = value.multivalue_cases() {
            for case in cases {
                if !self.test_value(case, state)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        if let Some(run_time) = value.original_run_time_value() {
            return self.test_value(run_time.super_value(), state);
        }

        match self {
            Pattern::Any => Ok(true),
            Pattern::Type(p) => p.value.test(value, state),
            Pattern::ExactValue(p) => p.value.test(value, state),
            Pattern::ExactString(p) => Ok(match value {
                Value::Str(s) => match &p.value {
                    None => true,
                    Some(expected) => s.value() == Some(expected.as_str()),
                },
                _ => false,
            }),
            Pattern::String(p) => match value {
                Value::Str(s) => p.test_str(s, state),
                _ => Ok(false),
            },
            Pattern::IntRange(p) => Ok(match value {
                Value::Int(int) => p.range.map_or(true, |r| Int::in_range(r).accepts(int)),
                _ => false,
            }),
            Pattern::FloatRange(p) => Ok(match value {
                Value::Float(float) => p.range.map_or(true, |r| Float::in_range(r).accepts(float)),
                _ => false,
            }),
            Pattern::Object(p) => {
                let Value::Object(obj) = value else {
                    return Ok(false);
                };
                if p.readonly != obj.is_readonly() {
                    return Ok(false);
                }
                let Some(props) = p.props() else {
                    return Ok(true);
                };
                match obj.props() {
                    Some(value_props) => test_value_properties(props, value_props, value, state),
                    None => Ok(false),
                }
            }
            Pattern::Record(p) => {
                let Value::Record(record) = value else {
                    return Ok(false);
                };
                let Some(props) = p.props() else {
                    return Ok(true);
                };
                match record.props() {
                    Some(value_props) => test_value_properties(props, value_props, value, state),
                    None => Ok(false),
                }
            }
            Pattern::List(p) => {
                let Value::List(list) = value else {
                    return Ok(false);
                };
                if p.readonly != list.is_readonly() {
                    return Ok(false);
                }
                match p.elements() {
                    None => Ok(true),
                    Some(elements) => test_element_values(elements, list.elements(), state),
                }
            }
            Pattern::Tuple(p) => {
                let Value::Tuple(tuple) = value else {
                    return Ok(false);
                };
                test_element_values(&p.elements, tuple.elements(), state)
            }
            Pattern::Union(p) => {
                let Some(cases) = &p.cases else {
                    return Ok(true);
                };
                let checkpoint = state.mismatch_checkpoint();
                for case in cases {
                    if case.test_value(value, state)? {
                        state.rollback_mismatch(checkpoint);
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Pattern::Intersection(p) => {
                for case in p.cases.iter().flatten() {
                    if !case.test_value(value, state)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Pattern::Difference(p) => {
                if !p.base.test_value(value, state)? {
                    return Ok(false);
                }
                let checkpoint = state.mismatch_checkpoint();
                let removed = p.removed.test_value(value, state)?;
                state.rollback_mismatch(checkpoint);
                Ok(!removed)
            }
            Pattern::Optional(p) => match value {
                Value::Nil => Ok(true),
                _ => p.inner.test_value(value, state),
            },
            Pattern::Function(p) => {
                if !matches!(
                    value,
                    Value::Function(_) | Value::InoxFunction(_) | Value::GoFunction(_)
                ) {
                    return Ok(false);
                }
                if let Some(check) = &p.body_check {
                    let Value::InoxFunction(function) = value else {
                        return Ok(false);
                    };
                    let Some(node) = function.node() else {
                        return Ok(false);
                    };
                    if !check.accepts(node) {
                        return Ok(false);
                    }
                }
                match &p.signature {
                    None => Ok(true),
                    Some(signature) => match signature_of(value) {
                        Some(other_signature) => signature.accepts(&other_signature, state),
                        None => Ok(false),
                    },
                }
            }
        }
    }

    /// The symbolic value standing for any value matched by the pattern.
    pub fn symbolic_value(&self) -> Result<Value, SymbolicError> {
        self.symbolic_value_in(&mut RecTestCallState::new())
    }

    pub(crate) fn symbolic_value_in(&self, state: &mut RecTestCallState) -> Result<Value, SymbolicError> {
        let mut state = state.start_call()?;
        let state = &mut *state;

        Ok(match self {
            Pattern::Any => Value::Any,
            Pattern::Type(p) => p.value.clone(),
            Pattern::ExactValue(p) => p.value.clone(),
            Pattern::ExactString(p) => match &p.value {
                Some(value) => Value::str(value.clone()),
                None => Value::any_str(),
            },
            Pattern::String(p) => match p.as_ref() {
                StringPattern::LengthChecking(Some(range)) => {
                    Value::Str(Rc::new(Str::with_length_range(*range)))
                }
                _ if p.is_any() => Value::any_str(),
                _ => Value::Str(Rc::new(Str::matching(self.clone()))),
            },
            Pattern::IntRange(p) => match p.range {
                Some(range) => Value::Int(Int::in_range(range)),
                None => Value::any_int(),
            },
            Pattern::FloatRange(p) => match p.range {
                Some(range) => Value::Float(Float::in_range(range)),
                None => Value::any_float(),
            },
            Pattern::Object(p) => {
                let Some(props) = p.props() else {
                    return Ok(if p.readonly {
                        Value::Object(Rc::new(Object::any_readonly()))
                    } else {
                        Value::any_object()
                    });
                };
                let mut values = props.try_map(|_, pattern| pattern.symbolic_value_in(state))?;
                for (name, pattern) in props.iter() {
                    values.set_static(name.clone(), pattern.clone());
                }
                if p.readonly {
                    Value::readonly_object(values)
                } else {
                    Value::object(values)
                }
            }
            Pattern::Record(p) => match p.props() {
                Some(props) => {
                    Value::record(props.try_map(|_, pattern| pattern.symbolic_value_in(state))?)
                }
                None => Value::any_record(),
            },
            Pattern::List(p) => {
                let elements = match p.elements() {
                    Some(elements) => element_values(elements, state)?,
                    None => Elements::any(),
                };
                if p.readonly {
                    Value::List(Rc::new(List::new_readonly(elements)))
                } else {
                    Value::List(Rc::new(List::new(elements)))
                }
            }
            Pattern::Tuple(p) => Value::Tuple(Rc::new(Tuple::new(element_values(&p.elements, state)?))),
            Pattern::Union(p) => match &p.cases {
                Some(cases) => {
                    let values = cases
                        .iter()
                        .map(|case| case.symbolic_value_in(state))
                        .collect::<Result<Vec<_>, _>>()?;
                    join_values_in(&values, state)?
                }
                None => Value::Any,
            },
            Pattern::Intersection(p) => match &p.cases {
                Some(cases) => {
                    let values = cases
                        .iter()
                        .map(|case| case.symbolic_value_in(state))
                        .collect::<Result<Vec<_>, _>>()?;
                    get_intersection(0, &values)?
                }
                None => Value::Any,
            },
            Pattern::Difference(p) => {
                let base = p.base.symbolic_value_in(state)?;
                let removed = p.removed.symbolic_value_in(state)?;
                narrow_out(&removed, &base)?
            }
            Pattern::Optional(p) => {
                let inner = p.inner.symbolic_value_in(state)?;
                join_values_in(&[inner, Value::Nil], state)?
            }
            Pattern::Function(p) => match &p.signature {
                Some(signature) => Value::Function(Rc::new(Function::new(signature.clone()))),
                None => Value::Function(Rc::new(Function::any())),
            },
        })
    }

    /// One widening step, `None` if the pattern cannot be widened.
    pub fn widen(&self) -> Result<Option<Pattern>, SymbolicError> {
        self.widen_in(&mut RecTestCallState::new())
    }

    pub(crate) fn widen_in(&self, state: &mut RecTestCallState) -> Result<Option<Pattern>, SymbolicError> {
        let mut state = state.start_call()?;
        let state = &mut *state;

        Ok(match self {
            Pattern::ExactValue(p) if !p.value.is_any() => {
                Some(Pattern::exact_value(widen_or_any(&p.value)?))
            }
            Pattern::ExactString(p) if p.value.is_some() => {
                Some(Pattern::ExactString(Rc::new(ExactStringPattern::any())))
            }
            Pattern::IntRange(p) if p.range.is_some() => Some(Pattern::IntRange(IntRangePattern::default())),
            Pattern::FloatRange(p) if p.range.is_some() => {
                Some(Pattern::FloatRange(FloatRangePattern::default()))
            }
            Pattern::Object(p) => {
                let Some(props) = p.props() else {
                    return Ok(None);
                };
                let mut any_widened = false;
                let widened = props.try_map(|_, pattern| {
                    Ok::<_, SymbolicError>(match pattern.widen_in(state)? {
                        Some(widened) => {
                            any_widened = true;
                            widened
                        }
                        None => pattern.clone(),
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
                Some(Pattern::Object(Rc::new(match (next, p.readonly) {
                    (Some(next), false) => ObjectPattern::new(next),
                    (Some(next), true) => ObjectPattern::new_readonly(next),
                    (None, false) => ObjectPattern::any(),
                    (None, true) => ObjectPattern {
                        shape: OnceCell::new(),
                        readonly: true,
                    },
                })))
            }
            Pattern::Union(p) if p.cases.is_some() => Some(Pattern::Union(Rc::new(UnionPattern::any()))),
            Pattern::Intersection(p) if p.cases.is_some() => {
                Some(Pattern::Intersection(Rc::new(IntersectionPattern::any())))
            }
            Pattern::Function(p) if !p.is_any() => Some(Pattern::Function(Rc::new(FunctionPattern::any()))),
            _ => None,
        })
    }

    /// Top pattern of the family of `self`.
    pub fn widest_of_type(&self) -> Pattern {
        match self {
            Pattern::Any => Pattern::Any,
            Pattern::Type(_) => Pattern::type_of(Value::Any),
            Pattern::ExactValue(_) => Pattern::exact_value(Value::Any),
            Pattern::ExactString(_) => Pattern::ExactString(Rc::new(ExactStringPattern::any())),
            Pattern::String(p) => Pattern::string(p.widest()),
            Pattern::IntRange(_) => Pattern::IntRange(IntRangePattern::default()),
            Pattern::FloatRange(_) => Pattern::FloatRange(FloatRangePattern::default()),
            Pattern::Object(p) => Pattern::Object(Rc::new(ObjectPattern {
                shape: OnceCell::new(),
                readonly: p.readonly,
            })),
            Pattern::Record(_) => Pattern::Record(Rc::new(RecordPattern::any())),
            Pattern::List(p) => Pattern::List(Rc::new(ListPattern {
                shape: OnceCell::with_value(ElementPatterns::General(Pattern::Any)),
                readonly: p.readonly,
            })),
            Pattern::Tuple(_) => Pattern::tuple_of(Pattern::Any),
            Pattern::Union(_) => Pattern::Union(Rc::new(UnionPattern::any())),
            Pattern::Intersection(_) => Pattern::Intersection(Rc::new(IntersectionPattern::any())),
            Pattern::Difference(_) => Pattern::difference(Pattern::Any, Pattern::exact_value(Value::Never)),
            Pattern::Optional(_) => Pattern::optional(Pattern::Any),
            Pattern::Function(_) => Pattern::Function(Rc::new(FunctionPattern::any())),
        }
    }

    /// Length range guaranteed for every matched string, if known.
    pub fn checked_length_range(&self) -> Option<LengthRange> {
        match self {
            Pattern::String(p) => p.length_range(),
            Pattern::ExactString(p) => p.value().map(|s| {
                let len = s.chars().count();
                LengthRange::new(len, len)
            }),
            _ => None,
        }
    }

    /// Whether the concrete string `s` is matched.
    pub fn matches_str(&self, s: &str) -> TestResult {
        match self {
            Pattern::Any => Ok(true),
            Pattern::ExactString(p) => Ok(p.value().map_or(true, |value| value == s)),
            Pattern::String(p) => p.matches(s),
            Pattern::Type(p) => p.value.test(&Value::str(s), &mut RecTestCallState::new()),
            Pattern::ExactValue(p) => p.value.test(&Value::str(s), &mut RecTestCallState::new()),
            Pattern::Union(p) => {
                for case in p.cases.iter().flatten() {
                    if case.matches_str(s)? {
                        return Ok(true);
                    }
                }
                Ok(p.cases.is_none())
            }
            Pattern::Intersection(p) => {
                for case in p.cases.iter().flatten() {
                    if !case.matches_str(s)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Pattern::Difference(p) => Ok(p.base.matches_str(s)? && !p.removed.matches_str(s)?),
            Pattern::Optional(p) => p.inner.matches_str(s),
            _ => Ok(false),
        }
    }
}

/// Pattern-vs-pattern property check: same exactness, same keys with the
/// same optionality, pointwise inclusion. An inexact pattern accepts a
/// pattern with more keys.
fn test_pattern_properties(
    props: &Properties<Pattern>,
    other: &Properties<Pattern>,
    state: &mut RecTestCallState,
) -> TestResult {
    if props.is_exact() != other.is_exact() {
        return Ok(false);
    }
    for (name, pattern) in props.iter() {
        let Some(other_pattern) = other.get(name) else {
            return Ok(false);
        };
        if props.is_optional(name) != other.is_optional(name) {
            return Ok(false);
        }
        if !pattern.test_pattern(other_pattern, state)? {
            return Ok(false);
        }
    }
    if props.is_exact() && other.names().any(|name| !props.contains(name)) {
        return Ok(false);
    }
    Ok(true)
}

/// Pattern-vs-value property check. An optional property of the pattern
/// may be absent; a required one must be present and required in the value.
fn test_value_properties(
    props: &Properties<Pattern>,
    value_props: &Properties<Value>,
    whole: &Value,
    state: &mut RecTestCallState,
) -> TestResult {
    if props.is_exact() {
        if !value_props.is_exact() {
            return Ok(false);
        }
        if value_props.names().any(|name| !props.contains(name)) {
            return Ok(false);
        }
    }

    for (name, pattern) in props.iter() {
        let Some(value) = value_props.get(name) else {
            if props.is_optional(name) {
                continue;
            }
            return Ok(false);
        };
        if !props.is_optional(name) && value_props.is_optional(name) {
            return Ok(false);
        }
        if !state.test_value_at(PathSegment::Property(name.clone()), pattern, value)? {
            return Ok(false);
        }
    }

    for (name, deps) in props.dependencies() {
        if !value_props.has_required(name) {
            continue;
        }
        if !deps.required_keys.iter().all(|key| value_props.has_required(key)) {
            return Ok(false);
        }
        if let Some(pattern) = &deps.pattern {
            if !pattern.test_value(whole, state)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn test_element_patterns(
    elements: &ElementPatterns,
    other: &ElementPatterns,
    state: &mut RecTestCallState,
) -> TestResult {
    match (elements, other) {
        (ElementPatterns::Known(patterns), ElementPatterns::Known(other_patterns)) => {
            if patterns.len() != other_patterns.len() {
                return Ok(false);
            }
            for (pattern, other_pattern) in patterns.iter().zip(other_patterns) {
                if !pattern.test_pattern(other_pattern, state)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ElementPatterns::General(pattern), ElementPatterns::General(other_pattern)) => {
            pattern.test_pattern(other_pattern, state)
        }
        (ElementPatterns::General(pattern), ElementPatterns::Known(other_patterns)) => {
            for other_pattern in other_patterns {
                if !pattern.test_pattern(other_pattern, state)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ElementPatterns::Known(_), ElementPatterns::General(_)) => Ok(false),
    }
}

/// `elements` is `None` for an uninitialized sequence, which stands for
/// any sequence.
fn test_element_values(
    patterns: &ElementPatterns,
    elements: Option<&Elements>,
    state: &mut RecTestCallState,
) -> TestResult {
    let any = Elements::any();
    match (patterns, elements.unwrap_or(&any)) {
        (ElementPatterns::Known(patterns), Elements::Known(values)) => {
            if patterns.len() != values.len() {
                return Ok(false);
            }
            for (i, (pattern, value)) in patterns.iter().zip(values).enumerate() {
                if !state.test_value_at(PathSegment::Index(i), pattern, value)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ElementPatterns::General(pattern), Elements::Known(values)) => {
            for (i, value) in values.iter().enumerate() {
                if !state.test_value_at(PathSegment::Index(i), pattern, value)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ElementPatterns::General(pattern), Elements::General(value)) => {
            state.test_value_at(PathSegment::Element, pattern, value)
        }
        (ElementPatterns::Known(_), Elements::General(_)) => Ok(false),
    }
}

fn element_values(patterns: &ElementPatterns, state: &mut RecTestCallState) -> Result<Elements, SymbolicError> {
    Ok(match patterns {
        ElementPatterns::Known(patterns) => Elements::Known(
            patterns
                .iter()
                .map(|p| p.symbolic_value_in(state))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ElementPatterns::General(pattern) => Elements::General(pattern.symbolic_value_in(state)?),
    })
}
