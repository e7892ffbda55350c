//! Short display names of values and patterns.
//!
//! Names are depth-limited: anything nested deeper than the configured
//! print depth is written `...`, which keeps cyclic values printable.
//! `Debug` uses the same writer.

use std::fmt::{self, Write};

use crate::config::DEFAULT_CONFIG;

use super::function::{GoFunction, Signature};
use super::object::{Properties, RecordShape};
use super::pattern::{ElementPatterns, Pattern};
use super::sequence::Elements;
use super::value::Value;

fn max_depth() -> usize {
    DEFAULT_CONFIG.max_print_depth
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
    mut write_item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

fn write_elements(f: &mut fmt::Formatter<'_>, elements: Option<&Elements>, depth: usize) -> fmt::Result {
    match elements {
        Some(Elements::Known(values)) => {
            f.write_char('[')?;
            write_list(f, values, ", ", |f, v| write_value(f, v, depth + 1))?;
            f.write_char(']')
        }
        Some(Elements::General(element)) => {
            f.write_str("[]")?;
            write_value(f, element, depth + 1)
        }
        None => f.write_str("[]any"),
    }
}

fn write_props<T>(
    f: &mut fmt::Formatter<'_>,
    props: &Properties<T>,
    depth: usize,
    mut write_entry: impl FnMut(&mut fmt::Formatter<'_>, &T, usize) -> fmt::Result,
) -> fmt::Result {
    f.write_char('{')?;
    let mut first = true;
    for (name, value) in props.iter() {
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        f.write_str(name)?;
        if props.is_optional(name) {
            f.write_char('?')?;
        }
        f.write_str(": ")?;
        write_entry(f, value, depth + 1)?;
    }
    if !props.is_exact() {
        if !first {
            f.write_str(", ")?;
        }
        f.write_str("...")?;
    }
    f.write_char('}')
}

fn write_signature(f: &mut fmt::Formatter<'_>, signature: &Signature, depth: usize) -> fmt::Result {
    f.write_str("fn(")?;
    let last = signature.parameters.len().saturating_sub(1);
    for (i, param) in signature.parameters.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if signature.variadic && i == last {
            f.write_str("...")?;
        }
        write_value(f, param, depth + 1)?;
    }
    f.write_str(") ")?;
    write_value(f, &signature.result, depth + 1)
}

pub(crate) fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    if depth > max_depth() {
        return f.write_str("...");
    }
    match value {
        Value::Any => f.write_str("any"),
        Value::Never => f.write_str("never"),
        Value::Nil => f.write_str("nil"),
        Value::Bool(None) => f.write_str("bool"),
        Value::Bool(Some(b)) => write!(f, "{}", b),
        Value::Int(int) => match (int.value(), int.range()) {
            (Some(n), _) => write!(f, "{}", n),
            (None, Some(r)) => write!(f, "int({}..{})", r.start, r.end),
            (None, None) => f.write_str("int"),
        },
        Value::Float(float) => match (float.value(), float.range()) {
            (Some(x), _) => write!(f, "{:?}", x),
            (None, Some(r)) => write!(f, "float({:?}..{:?})", r.start, r.end),
            (None, None) => f.write_str("float"),
        },
        Value::Rune(None) => f.write_str("rune"),
        Value::Rune(Some(c)) => write!(f, "{:?}", c),
        Value::Str(s) => {
            if let Some(known) = s.value() {
                write!(f, "{:?}", known)
            } else if let Some(r) = s.length_range() {
                write!(f, "string(len {}..{})", r.min, r.max)
            } else if let Some(pattern) = s.pattern() {
                f.write_str("string(matching ")?;
                write_pattern(f, pattern, depth + 1)?;
                f.write_char(')')
            } else {
                f.write_str("string")
            }
        }
        Value::List(list) => {
            if list.is_readonly() {
                f.write_str("readonly ")?;
            }
            write_elements(f, list.elements(), depth)
        }
        Value::Array(array) => {
            f.write_str("array")?;
            write_elements(f, Some(array.elements()), depth)
        }
        Value::Tuple(tuple) => {
            f.write_char('#')?;
            write_elements(f, tuple.elements(), depth)
        }
        Value::Object(obj) => {
            if obj.is_readonly() {
                f.write_str("readonly ")?;
            }
            match obj.props() {
                Some(props) => write_props(f, props, depth, |f, v, d| write_value(f, v, d)),
                None => f.write_str("object"),
            }
        }
        Value::Record(record) => match record.shape() {
            RecordShape::Any => f.write_str("record"),
            RecordShape::ValueOnly(v) => {
                f.write_str("record(of ")?;
                write_value(f, v, depth + 1)?;
                f.write_char(')')
            }
            RecordShape::Props(props) => {
                f.write_char('#')?;
                write_props(f, props, depth, |f, v, d| write_value(f, v, d))
            }
        },
        Value::Dictionary(dict) => match dict.entries() {
            Some(entries) => {
                f.write_str(":{")?;
                let mut first = true;
                for (key, value) in entries.values() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write_value(f, key, depth + 1)?;
                    f.write_str(": ")?;
                    write_value(f, value, depth + 1)?;
                }
                f.write_char('}')
            }
            None => f.write_str("dictionary"),
        },
        Value::KeyList(keys) => match keys.keys() {
            Some(keys) => write!(f, ".{{{}}}", keys.join(", ")),
            None => f.write_str("keylist"),
        },
        Value::InoxFunction(function) => match function.signature() {
            Some(signature) => write_signature(f, signature, depth),
            None => f.write_str("inox-function"),
        },
        Value::GoFunction(GoFunction::Unconstrained) => f.write_str("go-function"),
        Value::GoFunction(GoFunction::Wrapped(function)) => write!(f, "go-function {}", function.name),
        Value::Function(function) => match function.signature() {
            Some(signature) => write_signature(f, signature, depth),
            None => f.write_str("function"),
        },
        Value::Pattern(pattern) => write_pattern(f, pattern, depth),
        Value::Multivalue(mv) => {
            f.write_char('(')?;
            write_list(f, mv.cases(), " | ", |f, v| write_value(f, v, depth + 1))?;
            f.write_char(')')
        }
        Value::RunTime(rv) => {
            f.write_str("run-time-value(")?;
            write_value(f, rv.super_value(), depth + 1)?;
            f.write_char(')')
        }
        Value::View(view) => match (view.multivalue_cases(), view.run_time_origin()) {
            (Some(cases), _) => {
                f.write_char('(')?;
                write_list(f, cases, " | ", |f, v| write_value(f, v, depth + 1))?;
                f.write_char(')')
            }
            (None, Some(rv)) => {
                f.write_str("run-time-value(")?;
                write_value(f, rv.super_value(), depth + 1)?;
                f.write_char(')')
            }
            (None, None) => f.write_str("any"),
        },
    }
}

fn write_element_patterns(
    f: &mut fmt::Formatter<'_>,
    elements: Option<&ElementPatterns>,
    depth: usize,
) -> fmt::Result {
    match elements {
        Some(ElementPatterns::Known(patterns)) => {
            f.write_char('[')?;
            write_list(f, patterns, ", ", |f, p| write_pattern(f, p, depth + 1))?;
            f.write_char(']')
        }
        Some(ElementPatterns::General(pattern)) => {
            f.write_str("[]")?;
            write_pattern(f, pattern, depth + 1)
        }
        None => f.write_str("[]%any"),
    }
}

pub(crate) fn write_pattern(f: &mut fmt::Formatter<'_>, pattern: &Pattern, depth: usize) -> fmt::Result {
    if depth > max_depth() {
        return f.write_str("...");
    }
    match pattern {
        Pattern::Any => f.write_str("%any"),
        Pattern::Type(p) => {
            f.write_char('%')?;
            write_value(f, p.value(), depth + 1)
        }
        Pattern::ExactValue(p) => {
            f.write_str("%exact(")?;
            write_value(f, p.value(), depth + 1)?;
            f.write_char(')')
        }
        Pattern::ExactString(p) => match p.value() {
            Some(s) => write!(f, "%{:?}", s),
            None => f.write_str("%exact-string"),
        },
        Pattern::String(p) => write!(f, "{}", p),
        Pattern::IntRange(p) => match p.range {
            Some(r) => write!(f, "%int({}..{})", r.start, r.end),
            None => f.write_str("%int-range-pattern"),
        },
        Pattern::FloatRange(p) => match p.range {
            Some(r) => write!(f, "%float({:?}..{:?})", r.start, r.end),
            None => f.write_str("%float-range-pattern"),
        },
        Pattern::Object(p) => {
            if p.is_readonly() {
                f.write_str("readonly ")?;
            }
            match p.props() {
                Some(props) => {
                    f.write_char('%')?;
                    write_props(f, props, depth, |f, p, d| write_pattern(f, p, d))
                }
                None => f.write_str("%object"),
            }
        }
        Pattern::Record(p) => match p.props() {
            Some(props) => {
                f.write_str("%#")?;
                write_props(f, props, depth, |f, p, d| write_pattern(f, p, d))
            }
            None => f.write_str("%record"),
        },
        Pattern::List(p) => {
            if p.is_readonly() {
                f.write_str("readonly ")?;
            }
            f.write_char('%')?;
            write_element_patterns(f, p.elements(), depth)
        }
        Pattern::Tuple(p) => {
            f.write_str("%#")?;
            write_element_patterns(f, Some(p.elements()), depth)
        }
        Pattern::Union(p) => match p.cases() {
            Some(cases) => {
                f.write_str("%(")?;
                write_list(f, cases, " | ", |f, c| write_pattern(f, c, depth + 1))?;
                f.write_char(')')
            }
            None => f.write_str("%union"),
        },
        Pattern::Intersection(p) => match p.cases() {
            Some(cases) => {
                f.write_str("%(")?;
                write_list(f, cases, " & ", |f, c| write_pattern(f, c, depth + 1))?;
                f.write_char(')')
            }
            None => f.write_str("%intersection"),
        },
        Pattern::Difference(p) => {
            f.write_str("%(")?;
            write_pattern(f, &p.base, depth + 1)?;
            f.write_str(" \\ ")?;
            write_pattern(f, &p.removed, depth + 1)?;
            f.write_char(')')
        }
        Pattern::Optional(p) => {
            write_pattern(f, &p.inner, depth + 1)?;
            f.write_char('?')
        }
        Pattern::Function(p) => match p.signature() {
            Some(signature) => {
                f.write_char('%')?;
                write_signature(f, signature, depth)
            }
            None if p.body_check().is_some() => f.write_str("%function(checked)"),
            None => f.write_str("%function"),
        },
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pattern(f, self, 0)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pattern(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::function::{Function, HostFunction};
    use crate::symbolic::object::Record;
    use crate::symbolic::sequence::{Dictionary, KeyList, List};
    use std::rc::Rc;

    #[test]
    fn test_scalar_names() {
        assert_eq!(Value::Any.to_string(), "any");
        assert_eq!(Value::int(-3).to_string(), "-3");
        assert_eq!(Value::float(1.0).to_string(), "1.0");
        assert_eq!(Value::str("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Value::rune('x').to_string(), "'x'");
        assert_eq!(Value::bool(true).to_string(), "true");
    }

    #[test]
    fn test_container_names() {
        let obj = Value::object(
            Properties::exact()
                .with("a", Value::any_int())
                .with_optional("b", Value::any_str()),
        );
        assert_eq!(obj.to_string(), "{a: int, b?: string}");
        assert_eq!(
            Value::object(Properties::inexact()).to_string(),
            "{...}"
        );
        assert_eq!(Value::tuple(vec![Value::any_int()]).to_string(), "#[int]");
        assert_eq!(Value::readonly_list(vec![]).to_string(), "readonly []");
        assert_eq!(
            Value::Record(Rc::new(Record::value_only(Value::any_int()))).to_string(),
            "record(of int)"
        );
        assert_eq!(
            Value::Dictionary(Rc::new(Dictionary::new(vec![(Value::str("k"), Value::int(1))]))).to_string(),
            ":{\"k\": 1}"
        );
        assert_eq!(
            Value::KeyList(Rc::new(KeyList::new(vec!["a".into(), "b".into()]))).to_string(),
            ".{a, b}"
        );
    }

    #[test]
    fn test_function_names() {
        let f = Value::Function(Rc::new(Function::new(
            Signature::new(vec![Value::any_int(), Value::list_of(Value::any_str())], Value::Nil).variadic(),
        )));
        assert_eq!(f.to_string(), "fn(int, ...[]string) nil");
        let host = Value::GoFunction(GoFunction::wrap(HostFunction::new("print", vec![], vec![])));
        assert_eq!(host.to_string(), "go-function print");
    }

    #[test]
    fn test_pattern_names() {
        let p = Pattern::object(
            Properties::inexact().with("a", Pattern::type_of(Value::any_int())),
        );
        assert_eq!(p.to_string(), "%{a: %int, ...}");
        assert_eq!(
            Pattern::optional(Pattern::exact_string("x")).to_string(),
            "%\"x\"?"
        );
        assert_eq!(
            Pattern::union(vec![Pattern::type_of(Value::Nil), Pattern::list_of(Pattern::Any)]).to_string(),
            "%(%nil | %[]%any)"
        );
    }

    #[test]
    fn test_cyclic_list_name_is_bounded() {
        let list = Rc::new(List::uninitialized());
        let value = Value::List(list.clone());
        list.initialize(Elements::Known(vec![value.clone()])).unwrap();
        let name = value.to_string();
        assert!(name.contains("..."));
        assert_eq!(format!("{:?}", value), name);
    }
}
