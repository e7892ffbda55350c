//! Turning symbolic values with a statically-known constant into host values.
//!
//! The model never builds concrete values itself: the host supplies a
//! [`ConcreteValueFactories`] implementation producing its own value type.

use crate::config::DEFAULT_CONFIG;
use crate::error::SymbolicError;

use super::pattern::Pattern;
use super::sequence::Elements;
use super::value::Value;

/// Constructors of the host's concrete values.
pub trait ConcreteValueFactories {
    type Concrete;

    fn nil(&self) -> Self::Concrete;
    fn bool(&self, value: bool) -> Self::Concrete;
    fn int(&self, value: i64) -> Self::Concrete;
    fn float(&self, value: f64) -> Self::Concrete;
    fn rune(&self, value: char) -> Self::Concrete;
    fn str(&self, value: &str) -> Self::Concrete;
    fn list(&self, elements: Vec<Self::Concrete>, readonly: bool) -> Self::Concrete;
    fn tuple(&self, elements: Vec<Self::Concrete>) -> Self::Concrete;
    fn object(&self, properties: Vec<(String, Self::Concrete)>, readonly: bool) -> Self::Concrete;
    fn record(&self, properties: Vec<(String, Self::Concrete)>) -> Self::Concrete;
    fn dictionary(&self, entries: Vec<(Self::Concrete, Self::Concrete)>) -> Self::Concrete;
    fn key_list(&self, keys: Vec<String>) -> Self::Concrete;
    fn exact_value_pattern(&self, value: Self::Concrete) -> Self::Concrete;
}

/// Whether `value` stands for exactly one concrete value.
pub fn is_concretizable(value: &Value) -> bool {
    is_concretizable_at(value, 0)
}

fn is_concretizable_at(value: &Value, depth: usize) -> bool {
    if depth > DEFAULT_CONFIG.max_concretization_depth {
        return false;
    }
    let next = depth + 1;
    match value {
        Value::Nil => true,
        Value::Bool(b) => b.is_some(),
        Value::Int(int) => int.value().is_some(),
        Value::Float(float) => float.value().is_some(),
        Value::Rune(rune) => rune.is_some(),
        Value::Str(s) => s.value().is_some(),
        Value::List(list) => matches!(
            list.elements(),
            Some(Elements::Known(elements)) if elements.iter().all(|e| is_concretizable_at(e, next))
        ),
        Value::Tuple(tuple) => matches!(
            tuple.elements(),
            Some(Elements::Known(elements)) if elements.iter().all(|e| is_concretizable_at(e, next))
        ),
        Value::Object(obj) => obj.props().is_some_and(|props| {
            props.is_exact()
                && !props.has_optional()
                && props.iter().all(|(_, v)| is_concretizable_at(v, next))
        }),
        Value::Record(record) => record.props().is_some_and(|props| {
            props.is_exact()
                && !props.has_optional()
                && props.iter().all(|(_, v)| is_concretizable_at(v, next))
        }),
        Value::Dictionary(dict) => dict.entries().is_some_and(|entries| {
            entries
                .values()
                .all(|(k, v)| is_concretizable_at(k, next) && is_concretizable_at(v, next))
        }),
        Value::KeyList(keys) => keys.keys().is_some(),
        Value::Pattern(Pattern::ExactValue(p)) => is_concretizable_at(p.value(), next),
        _ => false,
    }
}

/// Builds the concrete counterpart of `value`.
pub fn concretize<F: ConcreteValueFactories>(value: &Value, factories: &F) -> Result<F::Concrete, SymbolicError> {
    concretize_at(value, factories, 0)
}

fn concretize_at<F: ConcreteValueFactories>(
    value: &Value,
    factories: &F,
    depth: usize,
) -> Result<F::Concrete, SymbolicError> {
    let max_depth = DEFAULT_CONFIG.max_concretization_depth;
    if depth > max_depth {
        return Err(SymbolicError::MaxConcretizationDepthExceeded { depth: max_depth });
    }
    let not_concretizable = || SymbolicError::NotConcretizable(value.to_string());
    let next = depth + 1;

    Ok(match value {
        Value::Nil => factories.nil(),
        Value::Bool(Some(b)) => factories.bool(*b),
        Value::Int(int) => factories.int(int.value().ok_or_else(not_concretizable)?),
        Value::Float(float) => factories.float(float.value().ok_or_else(not_concretizable)?),
        Value::Rune(Some(c)) => factories.rune(*c),
        Value::Str(s) => factories.str(s.value().ok_or_else(not_concretizable)?),
        Value::List(list) => {
            let Some(Elements::Known(elements)) = list.elements() else {
                return Err(not_concretizable());
            };
            let elements = elements
                .iter()
                .map(|e| concretize_at(e, factories, next))
                .collect::<Result<Vec<_>, _>>()?;
            factories.list(elements, list.is_readonly())
        }
        Value::Tuple(tuple) => {
            let Some(Elements::Known(elements)) = tuple.elements() else {
                return Err(not_concretizable());
            };
            let elements = elements
                .iter()
                .map(|e| concretize_at(e, factories, next))
                .collect::<Result<Vec<_>, _>>()?;
            factories.tuple(elements)
        }
        Value::Object(obj) => {
            let props = obj
                .props()
                .filter(|props| props.is_exact() && !props.has_optional())
                .ok_or_else(not_concretizable)?;
            let properties = props
                .iter()
                .map(|(name, v)| Ok((name.clone(), concretize_at(v, factories, next)?)))
                .collect::<Result<Vec<_>, SymbolicError>>()?;
            factories.object(properties, obj.is_readonly())
        }
        Value::Record(record) => {
            let props = record
                .props()
                .filter(|props| props.is_exact() && !props.has_optional())
                .ok_or_else(not_concretizable)?;
            let properties = props
                .iter()
                .map(|(name, v)| Ok((name.clone(), concretize_at(v, factories, next)?)))
                .collect::<Result<Vec<_>, SymbolicError>>()?;
            factories.record(properties)
        }
        Value::Dictionary(dict) => {
            let entries = dict.entries().ok_or_else(not_concretizable)?;
            let entries = entries
                .values()
                .map(|(k, v)| {
                    Ok((
                        concretize_at(k, factories, next)?,
                        concretize_at(v, factories, next)?,
                    ))
                })
                .collect::<Result<Vec<_>, SymbolicError>>()?;
            factories.dictionary(entries)
        }
        Value::KeyList(keys) => factories.key_list(keys.keys().ok_or_else(not_concretizable)?.to_vec()),
        Value::Pattern(Pattern::ExactValue(p)) => {
            factories.exact_value_pattern(concretize_at(p.value(), factories, next)?)
        }
        _ => return Err(not_concretizable()),
    })
}

impl Value {
    pub fn is_concretizable(&self) -> bool {
        is_concretizable(self)
    }

    pub fn concretize<F: ConcreteValueFactories>(&self, factories: &F) -> Result<F::Concrete, SymbolicError> {
        concretize(self, factories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::object::Properties;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    enum Concrete {
        Nil,
        Bool(bool),
        Int(i64),
        Float(f64),
        Rune(char),
        Str(String),
        List(Vec<Concrete>, bool),
        Tuple(Vec<Concrete>),
        Object(Vec<(String, Concrete)>, bool),
        Record(Vec<(String, Concrete)>),
        Dict(Vec<(Concrete, Concrete)>),
        Keys(Vec<String>),
        Exact(Box<Concrete>),
    }

    struct Factories;

    impl ConcreteValueFactories for Factories {
        type Concrete = Concrete;

        fn nil(&self) -> Concrete {
            Concrete::Nil
        }
        fn bool(&self, value: bool) -> Concrete {
            Concrete::Bool(value)
        }
        fn int(&self, value: i64) -> Concrete {
            Concrete::Int(value)
        }
        fn float(&self, value: f64) -> Concrete {
            Concrete::Float(value)
        }
        fn rune(&self, value: char) -> Concrete {
            Concrete::Rune(value)
        }
        fn str(&self, value: &str) -> Concrete {
            Concrete::Str(value.to_string())
        }
        fn list(&self, elements: Vec<Concrete>, readonly: bool) -> Concrete {
            Concrete::List(elements, readonly)
        }
        fn tuple(&self, elements: Vec<Concrete>) -> Concrete {
            Concrete::Tuple(elements)
        }
        fn object(&self, properties: Vec<(String, Concrete)>, readonly: bool) -> Concrete {
            Concrete::Object(properties, readonly)
        }
        fn record(&self, properties: Vec<(String, Concrete)>) -> Concrete {
            Concrete::Record(properties)
        }
        fn dictionary(&self, entries: Vec<(Concrete, Concrete)>) -> Concrete {
            Concrete::Dict(entries)
        }
        fn key_list(&self, keys: Vec<String>) -> Concrete {
            Concrete::Keys(keys)
        }
        fn exact_value_pattern(&self, value: Concrete) -> Concrete {
            Concrete::Exact(Box::new(value))
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!(Value::int(3).concretize(&Factories).unwrap(), Concrete::Int(3));
        assert_eq!(Value::str("a").concretize(&Factories).unwrap(), Concrete::Str("a".into()));
        assert_eq!(Value::rune('x').concretize(&Factories).unwrap(), Concrete::Rune('x'));
        assert_eq!(Value::float(1.5).concretize(&Factories).unwrap(), Concrete::Float(1.5));
        assert!(!Value::any_int().is_concretizable());
        assert!(matches!(
            Value::any_int().concretize(&Factories),
            Err(SymbolicError::NotConcretizable(_))
        ));
    }

    #[test]
    fn test_containers() {
        let value = Value::readonly_object(
            Properties::exact()
                .with("a", Value::list(vec![Value::bool(true), Value::Nil]))
                .with("b", Value::tuple(vec![Value::int(1)])),
        );
        assert!(value.is_concretizable());
        assert_eq!(
            value.concretize(&Factories).unwrap(),
            Concrete::Object(
                vec![
                    ("a".into(), Concrete::List(vec![Concrete::Bool(true), Concrete::Nil], false)),
                    ("b".into(), Concrete::Tuple(vec![Concrete::Int(1)])),
                ],
                true
            )
        );
    }

    #[test]
    fn test_not_concretizable_shapes() {
        assert!(!Value::list_of(Value::int(1)).is_concretizable());
        assert!(!Value::object(Properties::inexact().with("a", Value::int(1))).is_concretizable());
        assert!(!Value::object(Properties::exact().with_optional("a", Value::int(1))).is_concretizable());
        assert!(!Value::list(vec![Value::any_str()]).is_concretizable());
        assert!(!Value::any_object().is_concretizable());
    }

    #[test]
    fn test_records_dictionaries_and_keys() {
        use crate::symbolic::sequence::{Dictionary, KeyList};
        use std::rc::Rc;

        let record = Value::record(Properties::exact().with("x", Value::int(1)));
        assert_eq!(
            record.concretize(&Factories).unwrap(),
            Concrete::Record(vec![("x".into(), Concrete::Int(1))])
        );

        let dict = Value::Dictionary(Rc::new(Dictionary::new(vec![(Value::str("k"), Value::int(2))])));
        assert_eq!(
            dict.concretize(&Factories).unwrap(),
            Concrete::Dict(vec![(Concrete::Str("k".into()), Concrete::Int(2))])
        );

        let keys = Value::KeyList(Rc::new(KeyList::new(vec!["a".into()])));
        assert_eq!(keys.concretize(&Factories).unwrap(), Concrete::Keys(vec!["a".into()]));
    }

    #[test]
    fn test_exact_value_pattern() {
        let pattern = Value::pattern(Pattern::exact_value(Value::int(7)));
        assert_eq!(
            pattern.concretize(&Factories).unwrap(),
            Concrete::Exact(Box::new(Concrete::Int(7)))
        );
        assert!(!Value::pattern(Pattern::type_of(Value::int(7))).is_concretizable());
    }

    #[test]
    fn test_list_containing_itself_hits_depth_ceiling() {
        use crate::symbolic::sequence::{Elements, List};
        use std::rc::Rc;

        let list = Rc::new(List::uninitialized());
        let value = Value::List(list.clone());
        list.initialize(Elements::Known(vec![value.clone()])).unwrap();
        assert!(!value.is_concretizable());
        let err = value.concretize(&Factories).unwrap_err();
        assert!(matches!(
            err,
            SymbolicError::MaxConcretizationDepthExceeded { depth } if depth == DEFAULT_CONFIG.max_concretization_depth
        ));
    }
}
