//! String-construction patterns.
//!
//! Each kind has a widest member (`None` payload) that matches any string
//! pattern of the same kind. Sequence patterns compile their elements into
//! one anchored regex with a named group per element; every captured part
//! is then re-checked against its element so that range and parser
//! constraints apply.

use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::error::{SymbolicError, TestResult};
use crate::symbolic::state::RecTestCallState;
use crate::symbolic::value::{FloatRange, IntRange, LengthRange, Str};

use super::Pattern;

const INT_FRAGMENT: &str = r"[-+]?\d+";
const FLOAT_FRAGMENT: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";
const ANY_FRAGMENT: &str = r"(?s:.*)";

/// Host-provided parser validating strings of one syntax (URL, JSON, ...).
pub trait StringParser: fmt::Debug {
    fn name(&self) -> &str;
    fn validate(&self, s: &str) -> bool;
}

/// A regex pattern; `whole` is anchored so that only full matches count.
#[derive(Clone, Debug)]
pub struct RegexPattern {
    source: String,
    whole: Regex,
}

impl RegexPattern {
    pub fn new(source: &str) -> Result<Self, SymbolicError> {
        let whole = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            whole,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Concatenation of string patterns.
#[derive(Clone, Debug)]
pub struct SequencePattern {
    elements: Vec<Pattern>,
    regex: Regex,
}

impl SequencePattern {
    pub fn elements(&self) -> &[Pattern] {
        &self.elements
    }
}

#[derive(Clone, Debug)]
pub enum StringPattern {
    LengthChecking(Option<LengthRange>),
    Sequence(Option<SequencePattern>),
    /// Decimal representation of an integer in the range.
    IntRange(Option<IntRange>),
    FloatRange(Option<FloatRange>),
    Regex(Option<RegexPattern>),
    Parser(Option<Rc<dyn StringParser>>),
}

impl StringPattern {
    pub fn length(range: LengthRange) -> Self {
        StringPattern::LengthChecking(Some(range))
    }

    pub fn regex(source: &str) -> Result<Self, SymbolicError> {
        Ok(StringPattern::Regex(Some(RegexPattern::new(source)?)))
    }

    pub fn parser(parser: Rc<dyn StringParser>) -> Self {
        StringPattern::Parser(Some(parser))
    }

    /// Fails with `NotAStringPattern` if an element does not describe strings.
    pub fn sequence(elements: Vec<Pattern>) -> Result<Self, SymbolicError> {
        let mut source = String::from("^");
        for (i, element) in elements.iter().enumerate() {
            source.push_str(&format!("(?P<e{}>{})", i, fragment(element)?));
        }
        source.push('$');
        let regex = Regex::new(&source)?;
        Ok(StringPattern::Sequence(Some(SequencePattern { elements, regex })))
    }

    /// Whether this is the widest pattern of its kind.
    pub fn is_any(&self) -> bool {
        match self {
            StringPattern::LengthChecking(r) => r.is_none(),
            StringPattern::Sequence(s) => s.is_none(),
            StringPattern::IntRange(r) => r.is_none(),
            StringPattern::FloatRange(r) => r.is_none(),
            StringPattern::Regex(r) => r.is_none(),
            StringPattern::Parser(p) => p.is_none(),
        }
    }

    pub fn widest(&self) -> StringPattern {
        match self {
            StringPattern::LengthChecking(_) => StringPattern::LengthChecking(None),
            StringPattern::Sequence(_) => StringPattern::Sequence(None),
            StringPattern::IntRange(_) => StringPattern::IntRange(None),
            StringPattern::FloatRange(_) => StringPattern::FloatRange(None),
            StringPattern::Regex(_) => StringPattern::Regex(None),
            StringPattern::Parser(_) => StringPattern::Parser(None),
        }
    }

    pub fn length_range(&self) -> Option<LengthRange> {
        match self {
            StringPattern::LengthChecking(range) => *range,
            _ => None,
        }
    }

    /// Whether the concrete string `s` matches.
    pub fn matches(&self, s: &str) -> TestResult {
        match self {
            StringPattern::LengthChecking(range) => {
                Ok(range.map_or(true, |r| r.contains(s.chars().count())))
            }
            StringPattern::Sequence(None) => Ok(true),
            StringPattern::Sequence(Some(seq)) => {
                let Some(captures) = seq.regex.captures(s) else {
                    return Ok(false);
                };
                for (i, element) in seq.elements.iter().enumerate() {
                    let part = captures.name(&format!("e{}", i)).map_or("", |m| m.as_str());
                    if !element.matches_str(part)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            StringPattern::IntRange(range) => Ok(match s.parse::<i64>() {
                Ok(n) => range.map_or(true, |r| r.contains(n)),
                Err(_) => false,
            }),
            StringPattern::FloatRange(range) => Ok(match s.parse::<f64>() {
                Ok(f) => range.map_or(true, |r| r.contains(f)),
                Err(_) => false,
            }),
            StringPattern::Regex(regex) => Ok(regex.as_ref().map_or(true, |r| r.whole.is_match(s))),
            StringPattern::Parser(parser) => Ok(parser.as_ref().map_or(true, |p| p.validate(s))),
        }
    }

    /// Whether every string matched by `other` is matched by `self`.
    pub(crate) fn test_pattern(&self, other: &StringPattern, state: &mut RecTestCallState) -> TestResult {
        Ok(match (self, other) {
            (StringPattern::LengthChecking(None), StringPattern::LengthChecking(_)) => true,
            (StringPattern::LengthChecking(Some(r)), StringPattern::LengthChecking(Some(o))) => {
                r.contains_range(o)
            }
            (StringPattern::Sequence(None), StringPattern::Sequence(_)) => true,
            (StringPattern::Sequence(Some(seq)), StringPattern::Sequence(Some(other_seq))) => {
                if seq.elements.len() != other_seq.elements.len() {
                    return Ok(false);
                }
                for (element, other_element) in seq.elements.iter().zip(&other_seq.elements) {
                    if !element.test_pattern(other_element, state)? {
                        return Ok(false);
                    }
                }
                true
            }
            (StringPattern::IntRange(None), StringPattern::IntRange(_)) => true,
            (StringPattern::IntRange(Some(r)), StringPattern::IntRange(Some(o))) => r.contains_range(o),
            (StringPattern::FloatRange(None), StringPattern::FloatRange(_)) => true,
            (StringPattern::FloatRange(Some(r)), StringPattern::FloatRange(Some(o))) => {
                r.contains_range(o)
            }
            (StringPattern::Regex(None), StringPattern::Regex(_)) => true,
            (StringPattern::Regex(Some(r)), StringPattern::Regex(Some(o))) => r.source == o.source,
            (StringPattern::Parser(None), StringPattern::Parser(_)) => true,
            (StringPattern::Parser(Some(p)), StringPattern::Parser(Some(o))) => Rc::ptr_eq(p, o),
            _ => false,
        })
    }

    /// Whether every string described by the symbolic string `s` matches.
    pub(crate) fn test_str(&self, s: &Str, state: &mut RecTestCallState) -> TestResult {
        if let Some(value) = s.value() {
            return self.matches(value);
        }
        if let Some(pattern) = s.pattern() {
            return match pattern {
                Pattern::String(other) => self.test_pattern(other, state),
                Pattern::ExactString(exact) => match exact.value() {
                    Some(value) => self.matches(value),
                    None => Ok(self.is_any()),
                },
                _ => Ok(self.is_any()),
            };
        }
        if let Some(range) = s.length_range() {
            return Ok(match self {
                StringPattern::LengthChecking(None) => true,
                StringPattern::LengthChecking(Some(r)) => r.contains_range(&range),
                _ => self.is_any(),
            });
        }
        Ok(self.is_any())
    }
}

/// Unanchored regex fragment matching the strings of `pattern`. Fragments
/// never contain named groups of their own: user regexes are passed through
/// [`strip_group_names`].
fn fragment(pattern: &Pattern) -> Result<String, SymbolicError> {
    Ok(match pattern {
        Pattern::Any => ANY_FRAGMENT.to_string(),
        Pattern::ExactString(exact) => match exact.value() {
            Some(value) => regex::escape(value),
            None => ANY_FRAGMENT.to_string(),
        },
        Pattern::String(string_pattern) => match string_pattern.as_ref() {
            StringPattern::LengthChecking(Some(r)) => format!("(?s:.{{{},{}}})", r.min, r.max),
            StringPattern::IntRange(_) => INT_FRAGMENT.to_string(),
            StringPattern::FloatRange(_) => FLOAT_FRAGMENT.to_string(),
            StringPattern::Regex(Some(r)) => format!("(?:{})", strip_group_names(&r.source)),
            StringPattern::Sequence(Some(seq)) => seq
                .elements
                .iter()
                .map(|e| fragment(e).map(|f| format!("(?:{})", f)))
                .collect::<Result<String, _>>()?,
            StringPattern::LengthChecking(None)
            | StringPattern::Regex(None)
            | StringPattern::Sequence(None)
            | StringPattern::Parser(_) => ANY_FRAGMENT.to_string(),
        },
        Pattern::Union(union) => match union.cases() {
            Some(cases) => {
                let alternatives = cases.iter().map(fragment).collect::<Result<Vec<_>, _>>()?;
                format!("(?:{})", alternatives.join("|"))
            }
            None => return Err(SymbolicError::NotAStringPattern(pattern.to_string())),
        },
        _ => return Err(SymbolicError::NotAStringPattern(pattern.to_string())),
    })
}

/// Rewrites the named groups of a regex source into non-capturing groups so
/// it can be embedded next to the `e{i}` groups of a sequence.
fn strip_group_names(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut class_depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                // a leading ']' is a literal
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            '(' if class_depth == 0 && chars.peek() == Some(&'?') => {
                let rest = chars.clone().skip(1).take(2).collect::<String>();
                let name_start = if rest.starts_with("P<") {
                    Some(2)
                } else if rest.starts_with('<') && !rest.starts_with("<=") && !rest.starts_with("<!") {
                    Some(1)
                } else {
                    None
                };
                match name_start {
                    Some(skip) => {
                        // '?' and the group prefix, then the name up to '>'
                        chars.nth(skip);
                        for n in chars.by_ref() {
                            if n == '>' {
                                break;
                            }
                        }
                        out.push_str("(?:");
                    }
                    None => out.push(c),
                }
            }
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for StringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringPattern::LengthChecking(Some(r)) => write!(f, "%string(len {}..{})", r.min, r.max),
            StringPattern::LengthChecking(None) => f.write_str("%length-checking-string-pattern"),
            StringPattern::Sequence(Some(seq)) => {
                f.write_str("%str(")?;
                for (i, element) in seq.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str(")")
            }
            StringPattern::Sequence(None) => f.write_str("%sequence-string-pattern"),
            StringPattern::IntRange(Some(r)) => write!(f, "%int-range-string({}..{})", r.start, r.end),
            StringPattern::IntRange(None) => f.write_str("%int-range-string-pattern"),
            StringPattern::FloatRange(Some(r)) => {
                write!(f, "%float-range-string({}..{})", r.start, r.end)
            }
            StringPattern::FloatRange(None) => f.write_str("%float-range-string-pattern"),
            StringPattern::Regex(Some(r)) => write!(f, "%`{}`", r.source),
            StringPattern::Regex(None) => f.write_str("%regex-pattern"),
            StringPattern::Parser(Some(p)) => write!(f, "%parser({})", p.name()),
            StringPattern::Parser(None) => f.write_str("%parser-based-pattern"),
        }
    }
}
