//! Ordered containers: List, Array, Tuple, plus KeyList and Dictionary.
//!
//! A sequence is described either by its known elements or by one general
//! element standing for every element of a sequence of unknown length.
//! [`Elements`] makes the two representations mutually exclusive.

use std::collections::BTreeMap;

use once_cell::unsync::OnceCell;

use crate::error::{SymbolicError, TestResult};

use super::capability::{Indexable, Iterable, Watchable};
use super::multivalue::join_values;
use super::state::{PathSegment, RecTestCallState};
use super::value::Value;

#[derive(Clone)]
pub enum Elements {
    /// Fixed-length sequence.
    Known(Vec<Value>),
    /// Sequence of unknown length; every element matches the value.
    General(Value),
}

impl Elements {
    pub fn any() -> Self {
        Elements::General(Value::Any)
    }

    pub fn known_len(&self) -> Option<usize> {
        match self {
            Elements::Known(elements) => Some(elements.len()),
            Elements::General(_) => None,
        }
    }

    /// Value standing for any element.
    pub fn element(&self) -> Result<Value, SymbolicError> {
        match self {
            Elements::Known(elements) => join_values(elements),
            Elements::General(element) => Ok(element.clone()),
        }
    }

    pub fn element_at(&self, index: usize) -> Option<Value> {
        match self {
            Elements::Known(elements) => elements.get(index).cloned(),
            Elements::General(element) => Some(element.clone()),
        }
    }

    /// Checks that every sequence described by `candidate` is described by `self`.
    ///
    /// A fixed-length expectation is never met by a sequence of unknown length.
    pub(crate) fn test(&self, candidate: &Elements, state: &mut RecTestCallState) -> TestResult {
        match (self, candidate) {
            (Elements::General(expected), Elements::General(actual)) => {
                state.test_at(PathSegment::Element, expected, actual)
            }
            (Elements::General(expected), Elements::Known(actual)) => {
                for (i, element) in actual.iter().enumerate() {
                    if !state.test_at(PathSegment::Index(i), expected, element)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Elements::Known(expected), Elements::Known(actual)) => {
                if expected.len() != actual.len() {
                    return Ok(false);
                }
                for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
                    if !state.test_at(PathSegment::Index(i), e, a)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Elements::Known(_), Elements::General(_)) => Ok(false),
        }
    }

    /// Elements after appending `values`: known elements are extended, a
    /// general element absorbs the appended values.
    pub(crate) fn appended(&self, values: &[Value]) -> Result<Elements, SymbolicError> {
        match self {
            Elements::Known(elements) => {
                let mut elements = elements.clone();
                elements.extend(values.iter().cloned());
                Ok(Elements::Known(elements))
            }
            Elements::General(element) => {
                let mut all = Vec::with_capacity(values.len() + 1);
                all.push(element.clone());
                all.extend(values.iter().cloned());
                Ok(Elements::General(join_values(&all)?))
            }
        }
    }
}

fn test_shapes(
    expected: Option<&Elements>,
    actual: Option<&Elements>,
    state: &mut RecTestCallState,
) -> TestResult {
    let fallback = Elements::any();
    expected
        .unwrap_or(&fallback)
        .test(actual.unwrap_or(&fallback), state)
}

/// Mutable list. May be readonly; may be built in two steps to contain itself.
pub struct List {
    shape: OnceCell<Elements>,
    readonly: bool,
}

impl List {
    pub fn new(elements: Elements) -> Self {
        Self {
            shape: OnceCell::with_value(elements),
            readonly: false,
        }
    }

    pub fn new_readonly(elements: Elements) -> Self {
        Self {
            shape: OnceCell::with_value(elements),
            readonly: true,
        }
    }

    /// A list whose elements are set later by [`List::initialize`]. Until
    /// then it stands for any list.
    pub fn uninitialized() -> Self {
        Self {
            shape: OnceCell::new(),
            readonly: false,
        }
    }

    pub fn initialize(&self, elements: Elements) -> Result<(), SymbolicError> {
        self.shape
            .set(elements)
            .map_err(|_| SymbolicError::ValueAlreadyInitialized("list"))
    }

    /// `None` while uninitialized.
    pub fn elements(&self) -> Option<&Elements> {
        self.shape.get()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn to_readonly(&self) -> List {
        List {
            shape: self.shape.clone(),
            readonly: true,
        }
    }

    /// The list after appending `values`.
    pub fn appended(&self, values: &[Value]) -> Result<List, SymbolicError> {
        if self.readonly {
            return Err(SymbolicError::ReadonlyMutation("list".to_string()));
        }
        let elements = self.elements().cloned().unwrap_or_else(Elements::any);
        Ok(List::new(elements.appended(values)?))
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        match other {
            Value::List(other) if other.readonly == self.readonly => {
                test_shapes(self.elements(), other.elements(), state)
            }
            _ => Ok(false),
        }
    }
}

/// Mutable array; never serializable, never readonly.
pub struct Array {
    elements: Elements,
}

impl Array {
    pub fn new(elements: Elements) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        match other {
            Value::Array(other) => self.elements.test(&other.elements, state),
            _ => Ok(false),
        }
    }
}

/// Immutable list.
pub struct Tuple {
    shape: OnceCell<Elements>,
}

impl Tuple {
    pub fn new(elements: Elements) -> Self {
        Self {
            shape: OnceCell::with_value(elements),
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            shape: OnceCell::new(),
        }
    }

    pub fn initialize(&self, elements: Elements) -> Result<(), SymbolicError> {
        self.shape
            .set(elements)
            .map_err(|_| SymbolicError::ValueAlreadyInitialized("tuple"))
    }

    pub fn elements(&self) -> Option<&Elements> {
        self.shape.get()
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        match other {
            Value::Tuple(other) => test_shapes(self.elements(), other.elements(), state),
            _ => Ok(false),
        }
    }
}

/// List of property names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyList {
    /// `None` matches any key list.
    keys: Option<Vec<String>>,
}

impl KeyList {
    pub fn any() -> Self {
        Self { keys: None }
    }

    pub fn new(keys: Vec<String>) -> Self {
        Self { keys: Some(keys) }
    }

    pub fn keys(&self) -> Option<&[String]> {
        self.keys.as_deref()
    }

    pub(crate) fn test(&self, other: &Value) -> bool {
        let Value::KeyList(other) = other else {
            return false;
        };
        match &self.keys {
            None => true,
            Some(keys) => other.keys.as_ref() == Some(keys),
        }
    }
}

/// Dictionary keyed by the serialized representation of its keys.
pub struct Dictionary {
    /// repr -> (key, value); `None` matches any dictionary.
    entries: Option<BTreeMap<String, (Value, Value)>>,
}

impl Dictionary {
    pub fn any() -> Self {
        Self { entries: None }
    }

    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), (key, value)))
            .collect();
        Self {
            entries: Some(entries),
        }
    }

    pub fn entries(&self) -> Option<&BTreeMap<String, (Value, Value)>> {
        self.entries.as_ref()
    }

    pub fn get(&self, key_repr: &str) -> Option<Value> {
        match &self.entries {
            None => Some(Value::Any),
            Some(entries) => entries.get(key_repr).map(|(_, value)| value.clone()),
        }
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let Value::Dictionary(other) = other else {
            return Ok(false);
        };
        let Some(entries) = &self.entries else {
            return Ok(true);
        };
        let Some(other_entries) = &other.entries else {
            return Ok(false);
        };
        if entries.len() != other_entries.len() {
            return Ok(false);
        }
        for (repr, (_, value)) in entries {
            let Some((_, other_value)) = other_entries.get(repr) else {
                return Ok(false);
            };
            if !state.test_at(PathSegment::Property(repr.clone()), value, other_value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn joined_or_any<'a>(values: impl Iterator<Item = &'a Value>) -> Result<Value, SymbolicError> {
    let values: Vec<Value> = values.cloned().collect();
    if values.is_empty() {
        return Ok(Value::Any);
    }
    join_values(&values)
}

macro_rules! impl_sequence_capabilities {
    ($ty:ty) => {
        impl Iterable for $ty {
            fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
                Ok(Value::any_int())
            }

            fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
                self.element()
            }
        }

        impl Indexable for $ty {
            fn element(&self) -> Result<Value, SymbolicError> {
                match self.shape() {
                    Some(elements) => elements.element(),
                    None => Ok(Value::Any),
                }
            }

            fn element_at(&self, index: usize) -> Result<Option<Value>, SymbolicError> {
                Ok(match self.shape() {
                    Some(elements) => elements.element_at(index),
                    None => Some(Value::Any),
                })
            }

            fn known_len(&self) -> Option<usize> {
                self.shape().and_then(Elements::known_len)
            }
        }
    };
}

impl List {
    fn shape(&self) -> Option<&Elements> {
        self.elements()
    }
}

impl Tuple {
    fn shape(&self) -> Option<&Elements> {
        self.elements()
    }
}

impl Array {
    fn shape(&self) -> Option<&Elements> {
        Some(&self.elements)
    }
}

impl_sequence_capabilities!(List);
impl_sequence_capabilities!(Tuple);
impl_sequence_capabilities!(Array);

impl Watchable for List {
    fn watcher_element(&self) -> Result<Value, SymbolicError> {
        Ok(Value::Any)
    }
}

impl Iterable for KeyList {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_int())
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        self.element()
    }
}

impl Indexable for KeyList {
    fn element(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_str())
    }

    fn element_at(&self, index: usize) -> Result<Option<Value>, SymbolicError> {
        Ok(match &self.keys {
            Some(keys) => keys.get(index).map(|key| Value::str(key.clone())),
            None => Some(Value::any_str()),
        })
    }

    fn known_len(&self) -> Option<usize> {
        self.keys.as_ref().map(Vec::len)
    }
}

impl Iterable for Dictionary {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        match &self.entries {
            Some(entries) => joined_or_any(entries.values().map(|(key, _)| key)),
            None => Ok(Value::Any),
        }
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        match &self.entries {
            Some(entries) => joined_or_any(entries.values().map(|(_, value)| value)),
            None => Ok(Value::Any),
        }
    }
}

impl Watchable for Dictionary {
    fn watcher_element(&self) -> Result<Value, SymbolicError> {
        Ok(Value::Any)
    }
}
