//! Capability interfaces and the views exposing them on unions.
//!
//! Concrete variants implement the traits directly. A multivalue or a
//! run-time value only exposes a capability through a [`CapabilityView`],
//! obtained with [`Value::cast`], and only when every underlying value has it.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::diagnostics::emit_cast_rejected;
use crate::error::{SymbolicError, TestResult};

use super::concretize::is_concretizable;
use super::multivalue::{join_values, Multivalue};
use super::state::RecTestCallState;
use super::value::{Str, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Indexable,
    Iterable,
    IProps,
    Serializable,
    Watchable,
    StringLike,
    Readable,
}

impl Capability {
    pub const COUNT: usize = 7;

    pub const ALL: [Capability; Capability::COUNT] = [
        Capability::Indexable,
        Capability::Iterable,
        Capability::IProps,
        Capability::Serializable,
        Capability::Watchable,
        Capability::StringLike,
        Capability::Readable,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Whether having `self` means having `other` too.
    pub fn implies(self, other: Capability) -> bool {
        self == other || (self == Capability::Indexable && other == Capability::Iterable)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Indexable => "indexable",
            Capability::Iterable => "iterable",
            Capability::IProps => "iprops",
            Capability::Serializable => "serializable",
            Capability::Watchable => "watchable",
            Capability::StringLike => "string-like",
            Capability::Readable => "readable",
        };
        f.write_str(name)
    }
}

pub trait Iterable {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError>;
    fn iterator_element_value(&self) -> Result<Value, SymbolicError>;
}

pub trait Indexable: Iterable {
    fn element(&self) -> Result<Value, SymbolicError>;

    /// `None` when the index is known to be out of bounds.
    fn element_at(&self, index: usize) -> Result<Option<Value>, SymbolicError>;

    fn known_len(&self) -> Option<usize>;
}

/// Values with named properties.
pub trait IProps {
    /// Names of the properties guaranteed to be present.
    fn property_names(&self) -> Vec<String>;
    fn prop(&self, name: &str) -> Result<Option<Value>, SymbolicError>;
}

pub trait Watchable {
    fn watcher_element(&self) -> Result<Value, SymbolicError>;
}

pub trait StringLike {
    fn string_value(&self) -> Value;
}

impl Iterable for Str {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_int())
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_rune())
    }
}

impl Indexable for Str {
    fn element(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_rune())
    }

    fn element_at(&self, index: usize) -> Result<Option<Value>, SymbolicError> {
        Ok(match self.value() {
            Some(s) => s.chars().nth(index).map(Value::rune),
            None => Some(Value::any_rune()),
        })
    }

    fn known_len(&self) -> Option<usize> {
        self.value().map(|s| s.chars().count())
    }
}

impl StringLike for Str {
    fn string_value(&self) -> Value {
        match self.value() {
            Some(s) => Value::str(s),
            None => Value::any_str(),
        }
    }
}

/// What a capability view stands for.
#[derive(Clone)]
pub enum ViewOrigin {
    Multivalue(Rc<[Value]>),
    RunTime(Rc<RunTimeValue>),
}

/// A multivalue or run-time value seen through one capability. Operations
/// are delegated to the underlying values and their results joined.
pub struct CapabilityView {
    capability: Capability,
    origin: ViewOrigin,
}

impl CapabilityView {
    pub(crate) fn new(capability: Capability, origin: ViewOrigin) -> Self {
        Self { capability, origin }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn origin(&self) -> &ViewOrigin {
        &self.origin
    }

    pub fn multivalue_cases(&self) -> Option<&[Value]> {
        match &self.origin {
            ViewOrigin::Multivalue(cases) => Some(cases),
            ViewOrigin::RunTime(_) => None,
        }
    }

    pub fn run_time_origin(&self) -> Option<&Rc<RunTimeValue>> {
        match &self.origin {
            ViewOrigin::Multivalue(_) => None,
            ViewOrigin::RunTime(rv) => Some(rv),
        }
    }

    /// The values operations are delegated to.
    fn targets(&self) -> &[Value] {
        match &self.origin {
            ViewOrigin::Multivalue(cases) => cases,
            ViewOrigin::RunTime(rv) => std::slice::from_ref(&rv.super_value),
        }
    }

    /// Joins the results of `f` over every target. A target lacking the
    /// capability makes the result unknown.
    fn join_each(
        &self,
        f: impl Fn(&Value) -> Option<Result<Value, SymbolicError>>,
    ) -> Result<Value, SymbolicError> {
        let mut results = Vec::with_capacity(self.targets().len());
        for target in self.targets() {
            match f(target) {
                Some(result) => results.push(result?),
                None => return Ok(Value::Any),
            }
        }
        join_values(&results)
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        match &self.origin {
            ViewOrigin::RunTime(rv) => rv.test(other),
            ViewOrigin::Multivalue(cases) => {
                Multivalue::from_distinct(cases.to_vec()).test(other, state)
            }
        }
    }
}

impl Iterable for CapabilityView {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        self.join_each(|v| v.as_iterable().map(|it| it.iterator_element_key()))
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        self.join_each(|v| v.as_iterable().map(|it| it.iterator_element_value()))
    }
}

impl Indexable for CapabilityView {
    fn element(&self) -> Result<Value, SymbolicError> {
        self.join_each(|v| v.as_indexable().map(|it| it.element()))
    }

    fn element_at(&self, index: usize) -> Result<Option<Value>, SymbolicError> {
        let mut results = Vec::with_capacity(self.targets().len());
        for target in self.targets() {
            let Some(indexable) = target.as_indexable() else {
                return Ok(Some(Value::Any));
            };
            match indexable.element_at(index)? {
                Some(element) => results.push(element),
                None => return Ok(None),
            }
        }
        join_values(&results).map(Some)
    }

    fn known_len(&self) -> Option<usize> {
        let mut lengths = self
            .targets()
            .iter()
            .map(|target| target.as_indexable().and_then(|it| it.known_len()));
        let first = lengths.next()??;
        lengths.all(|len| len == Some(first)).then_some(first)
    }
}

impl IProps for CapabilityView {
    /// Names present in every underlying value.
    fn property_names(&self) -> Vec<String> {
        let mut targets = self.targets().iter().filter_map(Value::as_iprops);
        let Some(first) = targets.next() else {
            return Vec::new();
        };
        let mut names = first.property_names();
        for props in targets {
            let other_names = props.property_names();
            names.retain(|name| other_names.contains(name));
        }
        names
    }

    fn prop(&self, name: &str) -> Result<Option<Value>, SymbolicError> {
        let mut results = Vec::with_capacity(self.targets().len());
        for target in self.targets() {
            let Some(props) = target.as_iprops() else {
                return Ok(None);
            };
            match props.prop(name)? {
                Some(value) => results.push(value),
                None => return Ok(None),
            }
        }
        join_values(&results).map(Some)
    }
}

impl Watchable for CapabilityView {
    fn watcher_element(&self) -> Result<Value, SymbolicError> {
        self.join_each(|v| v.as_watchable().map(|it| it.watcher_element()))
    }
}

impl StringLike for CapabilityView {
    fn string_value(&self) -> Value {
        self.join_each(|v| v.as_string_like().map(|it| Ok(it.string_value())))
            .unwrap_or_else(|_| Value::any_str())
    }
}

/// A value that will only be known at run time, bounded by its super value.
pub struct RunTimeValue {
    super_value: Value,
}

impl RunTimeValue {
    pub fn new(super_value: Value) -> Result<Rc<Self>, SymbolicError> {
        if is_concretizable(&super_value) {
            return Err(SymbolicError::ConcretizableRunTimeValue(super_value.to_string()));
        }
        Ok(Rc::new(Self { super_value }))
    }

    pub fn super_value(&self) -> &Value {
        &self.super_value
    }

    /// A run-time value only accepts itself, possibly seen through a view.
    pub(crate) fn test(&self, other: &Value) -> TestResult {
        Ok(other
            .original_run_time_value()
            .is_some_and(|rv| std::ptr::eq(Rc::as_ptr(rv), self)))
    }

    pub fn cast_view(self: &Rc<Self>, capability: Capability) -> Option<Rc<CapabilityView>> {
        if self.super_value.implements(capability) {
            Some(Rc::new(CapabilityView::new(
                capability,
                ViewOrigin::RunTime(self.clone()),
            )))
        } else {
            emit_cast_rejected(capability, &self.super_value.to_string());
            None
        }
    }
}

impl Value {
    /// Whether the value offers `capability`, directly or once cast.
    pub fn implements(&self, capability: Capability) -> bool {
        match self {
            Value::Multivalue(mv) => mv.cases().iter().all(|case| case.implements(capability)),
            Value::RunTime(rv) => rv.super_value().implements(capability),
            Value::View(view) => {
                view.capability().implies(capability)
                    || view.targets().iter().all(|target| target.implements(capability))
            }
            _ => match capability {
                Capability::Indexable => matches!(
                    self,
                    Value::Str(_) | Value::List(_) | Value::Array(_) | Value::Tuple(_) | Value::KeyList(_)
                ),
                Capability::Iterable => matches!(
                    self,
                    Value::Str(_)
                        | Value::List(_)
                        | Value::Array(_)
                        | Value::Tuple(_)
                        | Value::KeyList(_)
                        | Value::Object(_)
                        | Value::Record(_)
                        | Value::Dictionary(_)
                ),
                Capability::IProps => matches!(self, Value::Object(_) | Value::Record(_)),
                Capability::Serializable => matches!(
                    self,
                    Value::Nil
                        | Value::Bool(_)
                        | Value::Int(_)
                        | Value::Float(_)
                        | Value::Rune(_)
                        | Value::Str(_)
                        | Value::List(_)
                        | Value::Tuple(_)
                        | Value::Object(_)
                        | Value::Record(_)
                        | Value::Dictionary(_)
                        | Value::KeyList(_)
                        | Value::Pattern(_)
                ),
                Capability::Watchable => {
                    matches!(self, Value::List(_) | Value::Object(_) | Value::Dictionary(_))
                }
                Capability::StringLike | Capability::Readable => matches!(self, Value::Str(_)),
            },
        }
    }

    /// The value seen through `capability`. Multivalues and run-time values
    /// become views when every underlying value has the capability; any
    /// other value is returned as is.
    pub fn cast(&self, capability: Capability) -> Value {
        let view = match self {
            Value::Multivalue(mv) => mv.cast_view(capability).cloned(),
            Value::RunTime(rv) => rv.cast_view(capability),
            Value::View(view) if view.capability().implies(capability) => return self.clone(),
            Value::View(view) => match view.origin() {
                ViewOrigin::RunTime(rv) => rv.cast_view(capability),
                ViewOrigin::Multivalue(cases) => {
                    if cases.iter().all(|case| case.implements(capability)) {
                        Some(Rc::new(CapabilityView::new(
                            capability,
                            ViewOrigin::Multivalue(cases.clone()),
                        )))
                    } else {
                        emit_cast_rejected(capability, &self.to_string());
                        None
                    }
                }
            },
            _ => {
                if !self.implements(capability) {
                    emit_cast_rejected(capability, &self.to_string());
                }
                return self.clone();
            }
        };
        view.map_or_else(|| self.clone(), Value::View)
    }

    fn view_with(&self, capability: Capability) -> Option<&Rc<CapabilityView>> {
        match self {
            Value::View(view) if view.capability().implies(capability) => Some(view),
            Value::Multivalue(mv) => mv.cast_view(capability),
            _ => None,
        }
    }

    pub fn as_iterable(&self) -> Option<&dyn Iterable> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            Value::List(list) => Some(list.as_ref()),
            Value::Array(array) => Some(array.as_ref()),
            Value::Tuple(tuple) => Some(tuple.as_ref()),
            Value::KeyList(keys) => Some(keys.as_ref()),
            Value::Object(obj) => Some(obj.as_ref()),
            Value::Record(record) => Some(record.as_ref()),
            Value::Dictionary(dict) => Some(dict.as_ref()),
            Value::RunTime(rv) => rv.super_value().as_iterable(),
            _ => self
                .view_with(Capability::Iterable)
                .map(|view| view.as_ref() as &dyn Iterable),
        }
    }

    pub fn as_indexable(&self) -> Option<&dyn Indexable> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            Value::List(list) => Some(list.as_ref()),
            Value::Array(array) => Some(array.as_ref()),
            Value::Tuple(tuple) => Some(tuple.as_ref()),
            Value::KeyList(keys) => Some(keys.as_ref()),
            Value::RunTime(rv) => rv.super_value().as_indexable(),
            _ => self
                .view_with(Capability::Indexable)
                .map(|view| view.as_ref() as &dyn Indexable),
        }
    }

    pub fn as_iprops(&self) -> Option<&dyn IProps> {
        match self {
            Value::Object(obj) => Some(obj.as_ref()),
            Value::Record(record) => Some(record.as_ref()),
            Value::RunTime(rv) => rv.super_value().as_iprops(),
            _ => self
                .view_with(Capability::IProps)
                .map(|view| view.as_ref() as &dyn IProps),
        }
    }

    pub fn as_watchable(&self) -> Option<&dyn Watchable> {
        match self {
            Value::List(list) => Some(list.as_ref()),
            Value::Object(obj) => Some(obj.as_ref()),
            Value::Dictionary(dict) => Some(dict.as_ref()),
            Value::RunTime(rv) => rv.super_value().as_watchable(),
            _ => self
                .view_with(Capability::Watchable)
                .map(|view| view.as_ref() as &dyn Watchable),
        }
    }

    pub fn as_string_like(&self) -> Option<&dyn StringLike> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            Value::RunTime(rv) => rv.super_value().as_string_like(),
            _ => self
                .view_with(Capability::StringLike)
                .map(|view| view.as_ref() as &dyn StringLike),
        }
    }
}
