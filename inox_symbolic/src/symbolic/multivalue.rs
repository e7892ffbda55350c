//! Multivalues and the operations merging or splitting them.

use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::diagnostics::emit_cast_rejected;
use crate::error::{SymbolicError, TestResult};

use super::capability::{Capability, CapabilityView, ViewOrigin};
use super::state::RecTestCallState;
use super::value::Value;

/// One of several possible values.
pub struct Multivalue {
    cases: Rc<[Value]>,
    /// Capability views, computed on first request.
    casts: [OnceCell<Option<Rc<CapabilityView>>>; Capability::COUNT],
}

impl Multivalue {
    /// Builds a multivalue from at least two cases. Cases are kept as given.
    pub fn new(cases: Vec<Value>) -> Result<Self, SymbolicError> {
        if cases.len() < 2 {
            return Err(SymbolicError::TooFewMultivalueCases(cases.len()));
        }
        Ok(Self::from_distinct(cases))
    }

    /// The caller guarantees at least two cases.
    pub(crate) fn from_distinct(cases: Vec<Value>) -> Self {
        Self {
            cases: cases.into(),
            casts: Default::default(),
        }
    }

    pub fn cases(&self) -> &[Value] {
        &self.cases
    }

    /// The view exposing `capability`, or `None` if a case lacks it.
    pub fn cast_view(&self, capability: Capability) -> Option<&Rc<CapabilityView>> {
        self.casts[capability.index()]
            .get_or_init(|| {
                if self.cases.iter().all(|case| case.implements(capability)) {
                    Some(Rc::new(CapabilityView::new(
                        capability,
                        ViewOrigin::Multivalue(self.cases.clone()),
                    )))
                } else {
                    emit_cast_rejected(capability, &format_cases(&self.cases));
                    None
                }
            })
            .as_ref()
    }

    /// Either some case accepts `other`, or `other` is a multivalue whose
    /// every case is accepted by some case.
    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let checkpoint = state.mismatch_checkpoint();
        let result = self.test_cases(other, state);
        state.rollback_mismatch(checkpoint);
        result
    }

    fn test_cases(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        for case in self.cases.iter() {
            if case.test(other, state)? {
                return Ok(true);
            }
        }
        let Some(other_cases) = other.multivalue_cases() else {
            return Ok(false);
        };
        'other_cases: for other_case in other_cases {
            for case in self.cases.iter() {
                if case.test(other_case, state)? {
                    continue 'other_cases;
                }
            }
            return Ok(false);
        }
        Ok(true)
    }
}

fn format_cases(cases: &[Value]) -> String {
    let names: Vec<String> = cases.iter().map(ToString::to_string).collect();
    format!("({})", names.join(" | "))
}

/// Joins the values an expression may take on different paths.
pub fn join_values(values: &[Value]) -> Result<Value, SymbolicError> {
    join_values_in(values, &mut RecTestCallState::new())
}

pub(crate) fn join_values_in(values: &[Value], state: &mut RecTestCallState) -> Result<Value, SymbolicError> {
    if values.iter().any(Value::is_any) {
        return Ok(Value::Any);
    }

    let mut cases: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        match value.multivalue_cases() {
            Some(nested) => cases.extend(nested.iter().cloned()),
            None => cases.push(value.clone()),
        }
    }

    let checkpoint = state.mismatch_checkpoint();
    let absorbed = absorb_cases(&mut cases, state);
    state.rollback_mismatch(checkpoint);
    absorbed?;

    Ok(match cases.len() {
        0 => Value::Never,
        1 => cases.remove(0),
        _ => Value::Multivalue(Rc::new(Multivalue::from_distinct(cases))),
    })
}

/// Removes every case accepted by another one, earliest cases first, until
/// nothing changes.
fn absorb_cases(cases: &mut Vec<Value>, state: &mut RecTestCallState) -> Result<(), SymbolicError> {
    loop {
        let mut absorbed = None;
        'search: for i in 0..cases.len() {
            for j in 0..cases.len() {
                if i != j && cases[i].test(&cases[j], state)? {
                    absorbed = Some(j);
                    break 'search;
                }
            }
        }
        match absorbed {
            Some(j) => {
                cases.remove(j);
            }
            None => return Ok(()),
        }
    }
}

/// Removes from `target` every case accepted by `excluded`. Values other
/// than multivalues are returned as is.
pub fn narrow_out(excluded: &Value, target: &Value) -> Result<Value, SymbolicError> {
    let Some(cases) = target.multivalue_cases() else {
        return Ok(target.clone());
    };

    let mut state = RecTestCallState::new();
    let mut remaining = Vec::with_capacity(cases.len());
    for case in cases {
        if !excluded.test(case, &mut state)? {
            remaining.push(case.clone());
        }
    }

    Ok(match remaining.len() {
        0 => Value::Never,
        1 => remaining.remove(0),
        n if n == cases.len() => match target {
            Value::View(_) => Value::Multivalue(Rc::new(Multivalue::from_distinct(remaining))),
            _ => target.clone(),
        },
        _ => Value::Multivalue(Rc::new(Multivalue::from_distinct(remaining))),
    })
}
