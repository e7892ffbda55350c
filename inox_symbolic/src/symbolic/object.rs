//! Objects and records: string-keyed property maps.
//!
//! Both share [`Properties`], which also backs object patterns
//! (`Properties<Pattern>`). An exact map forbids properties it does not
//! list; an inexact one may stand for objects with more properties.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::unsync::OnceCell;

use crate::error::{SymbolicError, TestResult};

use super::capability::{IProps, Iterable, Watchable};
use super::multivalue::join_values;
use super::pattern::Pattern;
use super::state::{PathSegment, RecTestCallState};
use super::value::{static_pattern_of, Value};

/// Constraint that applies when a property is present: other properties
/// must be present as well, and the whole object must match a pattern.
#[derive(Clone, Debug, Default)]
pub struct PropertyDependencies {
    pub required_keys: Vec<String>,
    pub pattern: Option<Pattern>,
}

/// Property map shared by objects, records and object patterns.
#[derive(Clone, Debug)]
pub struct Properties<T> {
    entries: BTreeMap<String, T>,
    optional: BTreeSet<String>,
    dependencies: BTreeMap<String, PropertyDependencies>,
    statics: BTreeMap<String, Pattern>,
    exact: bool,
}

impl<T> Properties<T> {
    /// Empty map that only matches maps with exactly the same keys.
    pub fn exact() -> Self {
        Self {
            entries: BTreeMap::new(),
            optional: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            statics: BTreeMap::new(),
            exact: true,
        }
    }

    /// Empty map that tolerates extra keys.
    pub fn inexact() -> Self {
        Self {
            exact: false,
            ..Self::exact()
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: T) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    pub fn with_optional(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        self.optional.insert(name.clone());
        self.entries.insert(name, value);
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, deps: PropertyDependencies) -> Self {
        self.dependencies.insert(name.into(), deps);
        self
    }

    /// Declares the pattern every future value of `name` must match.
    pub fn with_static(mut self, name: impl Into<String>, pattern: Pattern) -> Self {
        self.statics.insert(name.into(), pattern);
        self
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name)
    }

    pub fn has_optional(&self) -> bool {
        !self.optional.is_empty()
    }

    /// Present and not optional.
    pub fn has_required(&self, name: &str) -> bool {
        self.entries.contains_key(name) && !self.optional.contains(name)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&String, &PropertyDependencies)> {
        self.dependencies.iter()
    }

    pub fn dependencies_of(&self, name: &str) -> Option<&PropertyDependencies> {
        self.dependencies.get(name)
    }

    pub fn static_pattern(&self, name: &str) -> Option<&Pattern> {
        self.statics.get(name)
    }

    pub(crate) fn set_exact(&mut self, exact: bool) {
        self.exact = exact;
    }

    pub(crate) fn insert(&mut self, name: String, value: T) {
        self.entries.insert(name, value);
    }

    pub(crate) fn mark_required(&mut self, name: &str) {
        self.optional.remove(name);
    }

    pub(crate) fn set_static(&mut self, name: String, pattern: Pattern) {
        self.statics.insert(name, pattern);
    }

    pub(crate) fn set_dependencies(&mut self, name: String, deps: PropertyDependencies) {
        self.dependencies.insert(name, deps);
    }

    /// Maps every entry, keeping the optional set, dependencies, static
    /// patterns and exactness.
    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(&str, &T) -> Result<U, E>,
    ) -> Result<Properties<U>, E> {
        let mut entries = BTreeMap::new();
        for (name, value) in &self.entries {
            entries.insert(name.clone(), f(name, value)?);
        }
        Ok(Properties {
            entries,
            optional: self.optional.clone(),
            dependencies: self.dependencies.clone(),
            statics: self.statics.clone(),
            exact: self.exact,
        })
    }
}

/// Whether the dependencies declared by `expected` are guaranteed by `candidate`.
fn test_dependencies<T>(
    expected: &Properties<Value>,
    candidate: &Properties<T>,
    state: &mut RecTestCallState,
) -> TestResult {
    for (name, deps) in expected.dependencies() {
        match candidate.dependencies_of(name) {
            Some(counterpart) => {
                if !deps
                    .required_keys
                    .iter()
                    .all(|key| counterpart.required_keys.contains(key))
                {
                    return Ok(false);
                }
                if let Some(pattern) = &deps.pattern {
                    let Some(other_pattern) = &counterpart.pattern else {
                        return Ok(false);
                    };
                    if !pattern.test_pattern(other_pattern, state)? {
                        return Ok(false);
                    }
                }
            }
            // absent or optional in the candidate: the constraint cannot be proven
            None if !candidate.has_required(name) => return Ok(false),
            None => {}
        }
    }
    Ok(true)
}

/// Structural check shared by objects and records. `candidate_whole` is the
/// value owning `candidate`, tested against dependency patterns.
pub(crate) fn test_properties(
    expected: &Properties<Value>,
    candidate: &Properties<Value>,
    candidate_whole: &Value,
    state: &mut RecTestCallState,
) -> TestResult {
    if expected.exact && !candidate.exact {
        return Ok(false);
    }
    if expected.exact && !expected.has_optional() && expected.len() != candidate.len() {
        return Ok(false);
    }
    if !test_dependencies(expected, candidate, state)? {
        return Ok(false);
    }

    for (name, value) in expected.iter() {
        let is_optional = expected.is_optional(name);
        let Some(other) = candidate.get(name) else {
            if is_optional {
                continue;
            }
            return Ok(false);
        };
        if !is_optional && candidate.is_optional(name) {
            return Ok(false);
        }
        if !state.test_at(PathSegment::Property(name.clone()), value, other)? {
            return Ok(false);
        }

        if !is_optional || !candidate.is_optional(name) {
            if let Some(deps) = expected.dependencies_of(name) {
                if !deps.required_keys.iter().all(|key| candidate.has_required(key)) {
                    return Ok(false);
                }
                if let Some(pattern) = &deps.pattern {
                    if !pattern.test_value(candidate_whole, state)? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    if expected.exact && candidate.names().any(|name| !expected.contains(name)) {
        return Ok(false);
    }
    Ok(true)
}

/// Mutable object. An uninitialized object matches any object until
/// [`Object::initialize`] is called.
pub struct Object {
    props: OnceCell<Properties<Value>>,
    readonly: bool,
}

impl Object {
    pub fn new(properties: Properties<Value>) -> Self {
        Self {
            props: OnceCell::with_value(properties),
            readonly: false,
        }
    }

    pub fn new_readonly(properties: Properties<Value>) -> Self {
        Self {
            props: OnceCell::with_value(properties),
            readonly: true,
        }
    }

    /// Matches any mutable object.
    pub fn any() -> Self {
        Self::uninitialized()
    }

    pub fn any_readonly() -> Self {
        Self {
            props: OnceCell::new(),
            readonly: true,
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            props: OnceCell::new(),
            readonly: false,
        }
    }

    pub fn initialize(&self, properties: Properties<Value>) -> Result<(), SymbolicError> {
        self.props
            .set(properties)
            .map_err(|_| SymbolicError::ValueAlreadyInitialized("object"))
    }

    /// `None` when the object matches any object.
    pub fn props(&self) -> Option<&Properties<Value>> {
        self.props.get()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn is_inexact(&self) -> bool {
        self.props().map_or(true, |props| !props.exact)
    }

    pub fn to_readonly(&self) -> Object {
        Object {
            props: self.props.clone(),
            readonly: true,
        }
    }

    pub fn prop(&self, name: &str) -> Option<Value> {
        match self.props() {
            None => Some(Value::Any),
            Some(props) => props.get(name).cloned(),
        }
    }

    /// The object after setting `name`. An existing property keeps its
    /// static pattern; a new one gets the pattern of its value's family.
    pub fn with_prop(&self, name: &str, value: Value) -> Result<Object, SymbolicError> {
        if self.readonly {
            return Err(SymbolicError::ReadonlyMutation(format!("object (.{})", name)));
        }
        let Some(props) = self.props() else {
            return Ok(Object::any());
        };
        let not_allowed = |pattern: String| SymbolicError::PropertyNotAllowed {
            name: name.to_string(),
            value: value.to_string(),
            pattern,
        };

        let mut props = props.clone();
        match props.get(name) {
            Some(previous) => {
                let allowed = match props.static_pattern(name) {
                    Some(pattern) => pattern.test_value(&value, &mut RecTestCallState::new())?,
                    None => previous.test(&value, &mut RecTestCallState::new())?,
                };
                if !allowed {
                    let expected = match props.static_pattern(name) {
                        Some(pattern) => pattern.to_string(),
                        None => previous.to_string(),
                    };
                    return Err(not_allowed(expected));
                }
            }
            None if props.exact => return Err(not_allowed(Value::object(props).to_string())),
            None => props.set_static(name.to_string(), static_pattern_of(&value)),
        }
        props.insert(name.to_string(), value);
        Ok(Object::new(props))
    }

    /// The object after replacing the value of an existing property. The
    /// property becomes required.
    pub fn with_existing_prop_replaced(
        &self,
        name: &str,
        value: Value,
    ) -> Result<Object, SymbolicError> {
        if self.readonly {
            return Err(SymbolicError::ReadonlyMutation(format!("object (.{})", name)));
        }
        let Some(props) = self.props() else {
            return Ok(Object::any());
        };
        if !props.contains(name) {
            return Err(SymbolicError::NoSuchProperty(name.to_string()));
        }
        let mut props = props.clone();
        props.insert(name.to_string(), value);
        props.mark_required(name);
        Ok(Object::new(props))
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let Value::Object(other_obj) = other else {
            return Ok(false);
        };
        if self.readonly != other_obj.readonly {
            return Ok(false);
        }
        let Some(props) = self.props() else {
            return Ok(true);
        };
        let Some(other_props) = other_obj.props() else {
            return Ok(false);
        };
        test_properties(props, other_props, other, state)
    }
}

impl IProps for Object {
    fn property_names(&self) -> Vec<String> {
        self.props().map_or_else(Vec::new, |props| {
            props
                .names()
                .filter(|name| !props.is_optional(name))
                .cloned()
                .collect()
        })
    }

    fn prop(&self, name: &str) -> Result<Option<Value>, SymbolicError> {
        Ok(Object::prop(self, name))
    }
}

impl Iterable for Object {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_str())
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        Ok(Value::Any)
    }
}

impl Watchable for Object {
    fn watcher_element(&self) -> Result<Value, SymbolicError> {
        Ok(Value::Any)
    }
}

/// What a record is known to contain.
#[derive(Clone, Debug)]
pub enum RecordShape {
    Any,
    /// Any keys; every value matches the given one.
    ValueOnly(Value),
    Props(Properties<Value>),
}

/// Immutable object.
pub struct Record {
    shape: RecordShape,
}

impl Record {
    pub fn new(properties: Properties<Value>) -> Self {
        Self {
            shape: RecordShape::Props(properties),
        }
    }

    pub fn any() -> Self {
        Self {
            shape: RecordShape::Any,
        }
    }

    pub fn value_only(value: Value) -> Self {
        Self {
            shape: RecordShape::ValueOnly(value),
        }
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn props(&self) -> Option<&Properties<Value>> {
        match &self.shape {
            RecordShape::Props(props) => Some(props),
            _ => None,
        }
    }

    pub fn prop(&self, name: &str) -> Option<Value> {
        match &self.shape {
            RecordShape::Any => Some(Value::Any),
            RecordShape::ValueOnly(value) => Some(value.clone()),
            RecordShape::Props(props) => props.get(name).cloned(),
        }
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let Value::Record(other_rec) = other else {
            return Ok(false);
        };
        match (&self.shape, &other_rec.shape) {
            (RecordShape::Any, _) => Ok(true),
            (RecordShape::ValueOnly(value), RecordShape::ValueOnly(other_value)) => {
                state.test_at(PathSegment::Element, value, other_value)
            }
            (RecordShape::ValueOnly(value), RecordShape::Props(props)) => {
                for (name, other_value) in props.iter() {
                    if !state.test_at(PathSegment::Property(name.clone()), value, other_value)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (RecordShape::Props(props), RecordShape::Props(other_props)) => {
                test_properties(props, other_props, other, state)
            }
            _ => Ok(false),
        }
    }
}

impl IProps for Record {
    fn property_names(&self) -> Vec<String> {
        self.props().map_or_else(Vec::new, |props| {
            props
                .names()
                .filter(|name| !props.is_optional(name))
                .cloned()
                .collect()
        })
    }

    fn prop(&self, name: &str) -> Result<Option<Value>, SymbolicError> {
        Ok(Record::prop(self, name))
    }
}

impl Iterable for Record {
    fn iterator_element_key(&self) -> Result<Value, SymbolicError> {
        Ok(Value::any_str())
    }

    fn iterator_element_value(&self) -> Result<Value, SymbolicError> {
        match &self.shape {
            RecordShape::Any => Ok(Value::Any),
            RecordShape::ValueOnly(value) => Ok(value.clone()),
            RecordShape::Props(props) if props.is_empty() => Ok(Value::Any),
            RecordShape::Props(props) => {
                let values: Vec<Value> = props.iter().map(|(_, v)| v.clone()).collect();
                join_values(&values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn test(expected: &Value, actual: &Value) -> bool {
        expected.test(actual, &mut RecTestCallState::new()).unwrap()
    }

    fn exact_a_int() -> Value {
        Value::object(Properties::exact().with("a", Value::any_int()))
    }

    #[test]
    fn test_any_object() {
        let any = Value::any_object();
        assert!(test(&any, &exact_a_int()));
        assert!(test(&any, &Value::object(Properties::inexact())));
        assert!(!test(&exact_a_int(), &any));
    }

    #[test]
    fn test_exact_object_symmetry() {
        let a = exact_a_int();
        let ab = Value::object(
            Properties::exact()
                .with("a", Value::any_int())
                .with("b", Value::any_str()),
        );
        assert!(!test(&a, &ab));
        assert!(!test(&ab, &a));
    }

    #[test]
    fn test_exact_rejects_inexact() {
        let inexact = Value::object(Properties::inexact().with("a", Value::any_int()));
        assert!(!test(&exact_a_int(), &inexact));
        assert!(test(&inexact, &exact_a_int()));
    }

    #[test]
    fn test_inexact_accepts_extra_properties() {
        let inexact = Value::object(Properties::inexact().with("a", Value::any_int()));
        let wider = Value::object(
            Properties::exact()
                .with("a", Value::int(1))
                .with("b", Value::any_str()),
        );
        assert!(test(&inexact, &wider));
    }

    #[test]
    fn test_optional_properties() {
        let optional_b = Value::object(
            Properties::exact()
                .with("a", Value::any_int())
                .with_optional("b", Value::any_str()),
        );
        assert!(test(&optional_b, &exact_a_int()));
        let required_b = Value::object(
            Properties::exact()
                .with("a", Value::any_int())
                .with("b", Value::any_str()),
        );
        assert!(test(&optional_b, &required_b));
        assert!(!test(&required_b, &optional_b));
    }

    #[test]
    fn test_readonly_gate() {
        let props = Properties::exact().with("a", Value::int(1));
        let mutable = Value::object(props.clone());
        let readonly = Value::readonly_object(props);
        assert!(!test(&mutable, &readonly));
        assert!(!test(&readonly, &mutable));
    }

    #[test]
    fn test_dependencies() {
        let deps = PropertyDependencies {
            required_keys: vec!["b".to_string()],
            pattern: None,
        };
        let expected = Value::object(
            Properties::inexact()
                .with("a", Value::any_int())
                .with_dependency("a", deps),
        );
        let with_b = Value::object(
            Properties::exact()
                .with("a", Value::int(1))
                .with("b", Value::Nil),
        );
        let without_b = Value::object(Properties::exact().with("a", Value::int(1)));
        assert!(test(&expected, &with_b));
        assert!(!test(&expected, &without_b));
    }

    #[test]
    fn test_mismatch_location() {
        let expected = Value::object(Properties::exact().with(
            "a",
            Value::object(Properties::exact().with("b", Value::any_int())),
        ));
        let actual = Value::object(Properties::exact().with(
            "a",
            Value::object(Properties::exact().with("b", Value::str("x"))),
        ));
        let mut state = RecTestCallState::new();
        assert!(!expected.test(&actual, &mut state).unwrap());
        let mismatch = state.mismatch().unwrap();
        assert_eq!(mismatch.location, ".a.b");
        assert_eq!(mismatch.expected, "int");
    }

    #[test]
    fn test_with_prop() {
        let obj = Object::new(Properties::inexact().with("a", Value::any_int()));
        let updated = obj.with_prop("a", Value::int(2)).unwrap();
        assert_eq!(updated.prop("a").unwrap().to_string(), "2");

        let err = obj.with_prop("a", Value::str("x")).err().unwrap();
        assert!(matches!(err, SymbolicError::PropertyNotAllowed { .. }));

        let added = updated.with_prop("b", Value::str("x")).unwrap();
        // the static pattern of the new property is its family
        let err = added.with_prop("b", Value::int(1)).err().unwrap();
        assert!(matches!(err, SymbolicError::PropertyNotAllowed { .. }));
        assert!(added.with_prop("b", Value::str("y")).is_ok());
    }

    #[test]
    fn test_with_prop_on_exact_or_readonly() {
        let exact = Object::new(Properties::exact().with("a", Value::any_int()));
        assert!(exact.with_prop("b", Value::Nil).is_err());

        let readonly = exact.to_readonly();
        assert!(matches!(
            readonly.with_prop("a", Value::int(1)),
            Err(SymbolicError::ReadonlyMutation(_))
        ));
    }

    #[test]
    fn test_with_existing_prop_replaced() {
        let obj = Object::new(Properties::exact().with_optional("a", Value::any_int()));
        let replaced = obj.with_existing_prop_replaced("a", Value::str("s")).unwrap();
        let props = replaced.props().unwrap();
        assert!(props.has_required("a"));
        assert!(matches!(
            obj.with_existing_prop_replaced("b", Value::Nil),
            Err(SymbolicError::NoSuchProperty(_))
        ));
    }

    #[test]
    fn test_self_containing_object() {
        let obj = Rc::new(Object::uninitialized());
        let value = Value::Object(obj.clone());
        obj.initialize(Properties::exact().with("self", value.clone()))
            .unwrap();
        assert!(obj.initialize(Properties::exact()).is_err());

        let err = value.test(&value, &mut RecTestCallState::new()).unwrap_err();
        assert!(err.is_depth_error());
    }

    #[test]
    fn test_record_value_only() {
        let ints = Value::Record(Rc::new(Record::value_only(Value::any_int())));
        let rec = Value::record(
            Properties::exact()
                .with("a", Value::int(1))
                .with("b", Value::int(2)),
        );
        let mixed = Value::record(Properties::exact().with("a", Value::str("x")));
        assert!(test(&ints, &rec));
        assert!(!test(&ints, &mixed));
        assert!(!test(&rec, &ints));
        assert!(test(&Value::any_record(), &ints));
    }

    #[test]
    fn test_record_is_not_an_object() {
        let props = Properties::exact().with("a", Value::int(1));
        assert!(!test(&Value::record(props.clone()), &Value::object(props.clone())));
        assert!(!test(&Value::object(props.clone()), &Value::record(props)));
    }
}
