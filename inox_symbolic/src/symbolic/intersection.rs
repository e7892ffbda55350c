//! Intersection of symbolic values.
//!
//! The engine folds the operands pairwise. Each pair is first offered to the
//! registered [`SpecificIntersection`] hooks, then to the built-in rules for
//! objects and for a multivalue accumulator, and finally falls back to
//! subsumption.
//! The fold order is a heuristic (multivalues first) and the subsumption
//! fallback keeps the accumulator, so some non-empty intersections are
//! reported as the more general operand.

use std::rc::Rc;

use crate::config::{SymbolicConfig, DEFAULT_CONFIG};
use crate::diagnostics::{emit_empty_intersection, emit_max_intersection_depth};
use crate::error::SymbolicError;

use super::multivalue::join_values;
use super::object::{Object, Properties};
use super::state::RecTestCallState;
use super::value::{Int, IntRange, Value};

/// Per-type override of the pairwise intersection.
pub trait SpecificIntersection {
    /// Intersection of `acc` and `other`, or `None` to let the engine decide.
    /// Nested intersections go through `engine` at `depth`.
    fn specific_intersection(
        &self,
        engine: &IntersectionEngine<'_>,
        acc: &Value,
        other: &Value,
        depth: usize,
    ) -> Result<Option<Value>, SymbolicError>;
}

pub struct IntersectionEngine<'h> {
    max_depth: usize,
    hooks: Vec<&'h dyn SpecificIntersection>,
}

impl Default for IntersectionEngine<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> IntersectionEngine<'h> {
    pub fn new() -> Self {
        Self::from_config(&DEFAULT_CONFIG)
    }

    pub fn from_config(config: &SymbolicConfig) -> Self {
        Self {
            max_depth: config.max_intersection_depth,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: &'h dyn SpecificIntersection) -> Self {
        self.hooks.push(hook);
        self
    }

    /// A value compatible with every one of `values`, `never` if there is none.
    pub fn compute(&self, depth: usize, values: &[Value]) -> Result<Value, SymbolicError> {
        if depth > self.max_depth {
            emit_max_intersection_depth(depth);
            return Err(SymbolicError::MaxIntersectionDepthExceeded { depth });
        }

        let mut ordered: Vec<&Value> = values.iter().collect();
        // stable: multivalues first, the rest in input order
        ordered.sort_by_key(|value| value.multivalue_cases().is_none());

        let Some((first, rest)) = ordered.split_first() else {
            return Ok(Value::Any);
        };
        let mut acc = (*first).clone();
        for next in rest {
            acc = self.pair(depth, &acc, next)?;
            if acc.is_never() {
                let operands: Vec<String> = values.iter().map(ToString::to_string).collect();
                emit_empty_intersection(&operands);
                return Ok(Value::Never);
            }
        }
        Ok(acc)
    }

    fn pair(&self, depth: usize, acc: &Value, other: &Value) -> Result<Value, SymbolicError> {
        for hook in &self.hooks {
            if let Some(value) = hook.specific_intersection(self, acc, other, depth + 1)? {
                return Ok(value);
            }
        }
        if let Some(value) = self.builtin(depth + 1, acc, other)? {
            return Ok(value);
        }

        let mut state = RecTestCallState::new();
        if acc.test(other, &mut state)? || other.test(acc, &mut state)? {
            Ok(acc.clone())
        } else {
            Ok(Value::Never)
        }
    }

    fn builtin(&self, depth: usize, acc: &Value, other: &Value) -> Result<Option<Value>, SymbolicError> {
        if let Some(cases) = acc.multivalue_cases() {
            return self.intersect_cases(depth, cases, other).map(Some);
        }
        match (acc, other) {
            (Value::Object(a), Value::Object(b)) => self.intersect_objects(depth, a, b).map(Some),
            _ => Ok(None),
        }
    }

    /// Keeps the non-empty intersections of each case of the accumulator
    /// with `other`.
    fn intersect_cases(&self, depth: usize, cases: &[Value], other: &Value) -> Result<Value, SymbolicError> {
        let mut remaining = Vec::with_capacity(cases.len());
        for case in cases {
            let value = self.compute(depth, &[case.clone(), other.clone()])?;
            if !value.is_never() {
                remaining.push(value);
            }
        }
        join_values(&remaining)
    }

    /// Merges the properties of both objects. Inexactness wins, a property
    /// stays optional only if it is optional wherever it appears, and the
    /// narrowest static pattern is kept.
    fn intersect_objects(&self, depth: usize, a: &Rc<Object>, b: &Rc<Object>) -> Result<Value, SymbolicError> {
        if a.is_readonly() != b.is_readonly() {
            return Ok(Value::Never);
        }
        let Some(a_props) = a.props() else {
            return Ok(Value::Object(b.clone()));
        };
        let b_props = match b.props() {
            Some(b_props) if !Rc::ptr_eq(a, b) => b_props,
            _ => return Ok(Value::Object(a.clone())),
        };

        let mut result = if a_props.is_exact() && b_props.is_exact() {
            Properties::exact()
        } else {
            Properties::inexact()
        };

        for (name, a_value) in a_props.iter() {
            let b_value = b_props.get(name);
            let value = match b_value {
                Some(b_value) => {
                    let value = self.compute(depth, &[a_value.clone(), b_value.clone()])?;
                    if value.is_never() {
                        return Ok(Value::Never);
                    }
                    value
                }
                None => a_value.clone(),
            };

            let static_pattern = match (a_props.static_pattern(name), b_props.static_pattern(name)) {
                (Some(a_static), Some(b_static)) => {
                    let mut state = RecTestCallState::new();
                    if a_static.test_pattern(b_static, &mut state)? {
                        Some(b_static)
                    } else if b_static.test_pattern(a_static, &mut state)? {
                        Some(a_static)
                    } else {
                        return Ok(Value::Never);
                    }
                }
                (Some(single), None) | (None, Some(single)) => {
                    if !single.test_value(&value, &mut RecTestCallState::new())? {
                        return Ok(Value::Never);
                    }
                    Some(single)
                }
                (None, None) => None,
            };

            let optional = a_props.is_optional(name) && (b_value.is_none() || b_props.is_optional(name));
            result = if optional {
                result.with_optional(name.clone(), value)
            } else {
                result.with(name.clone(), value)
            };
            if let Some(pattern) = static_pattern {
                result.set_static(name.clone(), pattern.clone());
            }
        }

        for (name, b_value) in b_props.iter() {
            if a_props.contains(name) {
                continue;
            }
            result = if b_props.is_optional(name) {
                result.with_optional(name.clone(), b_value.clone())
            } else {
                result.with(name.clone(), b_value.clone())
            };
            if let Some(pattern) = b_props.static_pattern(name) {
                result.set_static(name.clone(), pattern.clone());
            }
        }

        for (name, deps) in a_props.dependencies().chain(b_props.dependencies()) {
            if result.contains(name) && result.dependencies_of(name).is_none() {
                result.set_dependencies(name.clone(), deps.clone());
            }
        }

        Ok(if a.is_readonly() {
            Value::readonly_object(result)
        } else {
            Value::object(result)
        })
    }
}

/// Opt-in hook narrowing integers to the overlap of their ranges, e.g.
/// `0..10 & 5..20 = 5..10` and `int & 3 = 3`.
#[derive(Debug, Default)]
pub struct IntRangeIntersection;

impl SpecificIntersection for IntRangeIntersection {
    fn specific_intersection(
        &self,
        _engine: &IntersectionEngine<'_>,
        acc: &Value,
        other: &Value,
        _depth: usize,
    ) -> Result<Option<Value>, SymbolicError> {
        let (Value::Int(a), Value::Int(b)) = (acc, other) else {
            return Ok(None);
        };
        if a.accepts(b) {
            return Ok(Some(Value::Int(*b)));
        }
        if b.accepts(a) {
            return Ok(Some(Value::Int(*a)));
        }
        Ok(Some(match (a.range(), b.range()) {
            (Some(ra), Some(rb)) if a.value().is_none() && b.value().is_none() => {
                let start = ra.start.max(rb.start);
                let end = ra.end.min(rb.end);
                if start <= end {
                    Value::Int(Int::in_range(IntRange::new(start, end)))
                } else {
                    Value::Never
                }
            }
            _ => Value::Never,
        }))
    }
}

/// Intersection of `values` with the default ceiling.
///
/// # Examples
/// ```text
/// {a: int, ...} & {b: int, ...} = {a: int, b: int, ...}
/// {a: int} & {a: bool}          = never
/// (int | string) & int          = int
/// int & 3                       = int
/// ```
pub fn get_intersection(depth: usize, values: &[Value]) -> Result<Value, SymbolicError> {
    IntersectionEngine::new().compute(depth, values)
}

pub fn get_intersection_with_config(
    config: &SymbolicConfig,
    depth: usize,
    values: &[Value],
) -> Result<Value, SymbolicError> {
    IntersectionEngine::from_config(config).compute(depth, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticReason, DiagnosticsCollector};

    fn inexact(name: &str, value: Value) -> Value {
        Value::object(Properties::inexact().with(name, value))
    }

    fn exact(name: &str, value: Value) -> Value {
        Value::object(Properties::exact().with(name, value))
    }

    #[test]
    fn test_inexact_objects_merge() {
        let value = get_intersection(0, &[inexact("a", Value::any_int()), inexact("b", Value::any_int())]).unwrap();
        let Value::Object(obj) = &value else {
            panic!("expected an object, got {value}");
        };
        let props = obj.props().unwrap();
        assert!(props.has_required("a"));
        assert!(props.has_required("b"));
        assert!(!props.is_exact());
    }

    #[test]
    fn test_exact_objects_conflict() {
        let value = get_intersection(0, &[exact("a", Value::any_int()), exact("a", Value::any_bool())]).unwrap();
        assert!(value.is_never());
    }

    #[test]
    fn test_exact_and_inexact_objects() {
        let int_or_str = Value::multivalue(vec![Value::any_int(), Value::any_str()]).unwrap();
        let value = get_intersection(0, &[exact("a", Value::any_int()), inexact("a", int_or_str)]).unwrap();
        assert_eq!(value.to_string(), "{a: int, ...}");

        let value = get_intersection(0, &[exact("a", Value::any_int()), inexact("b", Value::any_int())]).unwrap();
        assert_eq!(value.to_string(), "{a: int, b: int, ...}");

        let value = get_intersection(0, &[exact("a", Value::any_int()), exact("b", Value::any_int())]).unwrap();
        assert_eq!(value.to_string(), "{a: int, b: int}");
    }

    #[test]
    fn test_object_with_itself_is_same_instance() {
        let value = inexact("a", Value::any_int());
        let Value::Object(original) = &value else {
            panic!("expected an object");
        };
        let Value::Object(result) = get_intersection(0, &[value.clone(), value.clone()]).unwrap() else {
            panic!("expected an object");
        };
        assert!(Rc::ptr_eq(original, &result));
    }

    #[test]
    fn test_optional_only_where_optional_everywhere() {
        let a = Value::object(Properties::inexact().with_optional("a", Value::any_int()));
        let b = Value::object(Properties::inexact().with("a", Value::any_int()).with_optional("b", Value::Nil));
        let Value::Object(obj) = get_intersection(0, &[a, b]).unwrap() else {
            panic!("expected an object");
        };
        let props = obj.props().unwrap();
        assert!(props.has_required("a"));
        assert!(props.is_optional("b"));
    }

    #[test]
    fn test_static_patterns() {
        use crate::symbolic::pattern::Pattern;

        let int_pattern = Pattern::type_of(Value::any_int());
        let one_pattern = Pattern::type_of(Value::int(1));
        let two_pattern = Pattern::type_of(Value::int(2));
        let with_static = |value: Value, pattern: &Pattern| {
            Value::object(Properties::inexact().with("a", value).with_static("a", pattern.clone()))
        };

        let value = get_intersection(
            0,
            &[with_static(Value::int(1), &int_pattern), with_static(Value::int(1), &one_pattern)],
        )
        .unwrap();
        let Value::Object(obj) = &value else {
            panic!("expected an object, got {value}");
        };
        let chosen = obj.props().unwrap().static_pattern("a").unwrap();
        assert!(chosen.test_value(&Value::int(1), &mut RecTestCallState::new()).unwrap());
        assert!(!chosen.test_value(&Value::int(3), &mut RecTestCallState::new()).unwrap());

        let incomparable = get_intersection(
            0,
            &[with_static(Value::int(1), &one_pattern), with_static(Value::int(1), &two_pattern)],
        )
        .unwrap();
        assert!(incomparable.is_never());

        let rejected = get_intersection(
            0,
            &[inexact("a", Value::any_int()), with_static(Value::int(1), &one_pattern)],
        )
        .unwrap();
        assert!(rejected.is_never());
    }

    #[test]
    fn test_int_ranges_keep_accumulator_by_default() {
        assert_eq!(get_intersection(0, &[Value::any_int(), Value::int(3)]).unwrap().to_string(), "int");
        let a = Value::Int(Int::in_range(IntRange::new(0, 10)));
        let b = Value::Int(Int::in_range(IntRange::new(5, 20)));
        let value = get_intersection(0, &[a, b]).unwrap();
        assert!(matches!(value, Value::Int(i) if i.range() == Some(IntRange::new(0, 10))));
    }

    #[test]
    fn test_int_range_hook() {
        let hook = IntRangeIntersection;
        let engine = IntersectionEngine::new().with_hook(&hook);

        let a = Value::Int(Int::in_range(IntRange::new(0, 10)));
        let b = Value::Int(Int::in_range(IntRange::new(5, 20)));
        let value = engine.compute(0, &[a.clone(), b]).unwrap();
        assert!(matches!(value, Value::Int(i) if i.range() == Some(IntRange::new(5, 10))));

        let c = Value::Int(Int::in_range(IntRange::new(11, 20)));
        assert!(engine.compute(0, &[a, c]).unwrap().is_never());
        assert_eq!(engine.compute(0, &[Value::any_int(), Value::int(3)]).unwrap().to_string(), "3");
        assert!(engine.compute(0, &[Value::int(2), Value::int(3)]).unwrap().is_never());
    }

    #[test]
    fn test_multivalue_operand_is_filtered() {
        let int_or_str = Value::multivalue(vec![Value::any_int(), Value::any_str()]).unwrap();
        for values in [
            [Value::int(2), int_or_str.clone()],
            [int_or_str.clone(), Value::int(2)],
        ] {
            assert_eq!(get_intersection(0, &values).unwrap().to_string(), "int");
        }

        let hook = IntRangeIntersection;
        let engine = IntersectionEngine::new().with_hook(&hook);
        assert_eq!(engine.compute(0, &[Value::int(2), int_or_str]).unwrap().to_string(), "2");
    }

    #[test]
    fn test_two_multivalues_in_both_orders() {
        let nil_or_int = Value::multivalue(vec![Value::Nil, Value::any_int()]).unwrap();
        let int_or_str = Value::multivalue(vec![Value::any_int(), Value::any_str()]).unwrap();
        for values in [
            [nil_or_int.clone(), int_or_str.clone()],
            [int_or_str.clone(), nil_or_int.clone()],
        ] {
            assert_eq!(get_intersection(0, &values).unwrap().to_string(), "int");
        }
    }

    #[test]
    fn test_fallback_keeps_accumulator() {
        let value = get_intersection(0, &[Value::any_str(), Value::str("a")]).unwrap();
        assert_eq!(value.to_string(), "string");
        assert!(get_intersection(0, &[Value::any_str(), Value::Nil]).unwrap().is_never());
        assert!(get_intersection(0, &[]).unwrap().is_any());
    }

    #[test]
    fn test_depth_ceiling() {
        let config = SymbolicConfig {
            max_intersection_depth: 3,
            ..SymbolicConfig::default()
        };
        let mut a = Value::any_int();
        let mut b = Value::any_int();
        for _ in 0..5 {
            a = inexact("x", a);
            b = inexact("x", b);
        }
        let err = get_intersection_with_config(&config, 0, &[a, b]).unwrap_err();
        assert!(matches!(err, SymbolicError::MaxIntersectionDepthExceeded { .. }));
    }

    #[test]
    fn test_empty_intersection_diagnostic() {
        DiagnosticsCollector::enable();
        DiagnosticsCollector::clear();
        let _ = get_intersection(0, &[Value::Nil, Value::any_int()]).unwrap();
        let diagnostics = DiagnosticsCollector::take();
        DiagnosticsCollector::disable();
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].reason, DiagnosticReason::EmptyIntersection));
        assert_eq!(diagnostics[0].context.as_deref(), Some("nil & int"));
    }

    struct NilAbsorbs;

    impl SpecificIntersection for NilAbsorbs {
        fn specific_intersection(
            &self,
            _engine: &IntersectionEngine<'_>,
            acc: &Value,
            other: &Value,
            _depth: usize,
        ) -> Result<Option<Value>, SymbolicError> {
            Ok(matches!((acc, other), (Value::Nil, _) | (_, Value::Nil)).then_some(Value::Nil))
        }
    }

    #[test]
    fn test_specific_intersection_hook() {
        let hook = NilAbsorbs;
        let engine = IntersectionEngine::new().with_hook(&hook);
        assert!(matches!(engine.compute(0, &[Value::Nil, Value::any_int()]).unwrap(), Value::Nil));
    }
}
