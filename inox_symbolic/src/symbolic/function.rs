//! Callable values: Inox functions, host functions and abstract function types.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{SymbolicError, TestResult};

use super::state::{PathSegment, RecTestCallState};
use super::value::Value;
use super::widening::widen_or_any;

/// Read-only view of a syntax tree node, as needed by body checks.
pub trait SyntaxNode: fmt::Debug {
    fn kind(&self) -> &str;
    fn children(&self) -> Vec<Rc<dyn SyntaxNode>>;
}

/// Predicate every node of a function body must satisfy.
#[derive(Clone)]
pub struct NodeCheck(pub(crate) Rc<dyn Fn(&dyn SyntaxNode) -> bool>);

impl NodeCheck {
    pub fn new(check: impl Fn(&dyn SyntaxNode) -> bool + 'static) -> Self {
        Self(Rc::new(check))
    }

    /// Whether `root` and all its descendants pass the check.
    pub fn accepts(&self, root: &Rc<dyn SyntaxNode>) -> bool {
        walk_nodes(root, |node| (self.0)(node))
    }
}

impl fmt::Debug for NodeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeCheck(..)")
    }
}

/// Depth-first walk; stops at the first node for which `visit` returns false.
pub fn walk_nodes(root: &Rc<dyn SyntaxNode>, mut visit: impl FnMut(&dyn SyntaxNode) -> bool) -> bool {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if !visit(node.as_ref()) {
            return false;
        }
        let mut children = node.children();
        children.reverse();
        stack.extend(children);
    }
    true
}

/// Parameter and result types of a callable.
#[derive(Clone, Debug)]
pub struct Signature {
    pub parameters: Vec<Value>,
    pub parameter_names: Vec<String>,
    /// The last parameter collects the remaining arguments.
    pub variadic: bool,
    pub result: Value,
}

impl Signature {
    pub fn new(parameters: Vec<Value>, result: Value) -> Self {
        let parameter_names = (0..parameters.len()).map(|i| format!("p{}", i)).collect();
        Self {
            parameters,
            parameter_names,
            variadic: false,
            result,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.parameter_names = names;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Whether a callable with signature `other` can be used where `self`
    /// is expected. Parameters are contravariant, the result covariant.
    pub(crate) fn accepts(&self, other: &Signature, state: &mut RecTestCallState) -> TestResult {
        if self.parameters.len() != other.parameters.len() || self.variadic != other.variadic {
            return Ok(false);
        }
        for (i, (mine, theirs)) in self.parameters.iter().zip(&other.parameters).enumerate() {
            if !state.test_at(PathSegment::Parameter(i), theirs, mine)? {
                return Ok(false);
            }
        }
        state.test_at(PathSegment::Result, &self.result, &other.result)
    }
}

/// A function written in Inox.
#[derive(Clone, Debug, Default)]
pub struct InoxFunction {
    /// Declaring node; `None` matches any Inox function.
    node: Option<Rc<dyn SyntaxNode>>,
    signature: Option<Signature>,
    captured_locals: Option<BTreeMap<String, Value>>,
}

impl InoxFunction {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(node: Rc<dyn SyntaxNode>, signature: Signature) -> Self {
        Self {
            node: Some(node),
            signature: Some(signature),
            captured_locals: None,
        }
    }

    /// A function known only by its signature.
    pub fn with_signature(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            ..Self::default()
        }
    }

    pub fn with_captured_locals(mut self, locals: BTreeMap<String, Value>) -> Self {
        self.captured_locals = Some(locals);
        self
    }

    pub fn node(&self) -> Option<&Rc<dyn SyntaxNode>> {
        self.node.as_ref()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn captured_locals(&self) -> Option<&BTreeMap<String, Value>> {
        self.captured_locals.as_ref()
    }

    pub fn is_any(&self) -> bool {
        self.node.is_none() && self.signature.is_none()
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let Value::InoxFunction(other) = other else {
            return Ok(false);
        };
        if let Some(node) = &self.node {
            return Ok(other
                .node
                .as_ref()
                .is_some_and(|other_node| Rc::ptr_eq(node, other_node)));
        }
        match (&self.signature, &other.signature) {
            (None, _) => Ok(true),
            (Some(signature), Some(other_signature)) => signature.accepts(other_signature, state),
            (Some(_), None) => Ok(false),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostFunctionKind {
    Func,
    Method,
    Closure,
}

/// A host function, described by the signature its adapter extracted.
#[derive(Debug)]
pub struct HostFunction {
    pub name: String,
    pub kind: HostFunctionKind,
    pub parameters: Vec<Value>,
    /// The last `optional_parameter_count` parameters may be omitted.
    pub optional_parameter_count: usize,
    /// Element type of the trailing variadic parameter, if any.
    pub variadic_element: Option<Value>,
    pub results: Vec<Value>,
}

/// Arguments after checking them against a host function's parameters.
#[derive(Clone, Debug)]
pub struct ArgumentCheck {
    /// One value per parameter (and per variadic argument): the widened
    /// argument if accepted, the parameter otherwise.
    pub arguments: Vec<Value>,
    /// Positions of the rejected arguments.
    pub rejected: Vec<usize>,
    /// Too few or too many arguments.
    pub arity_mismatch: bool,
}

impl HostFunction {
    pub fn new(name: impl Into<String>, parameters: Vec<Value>, results: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind: HostFunctionKind::Func,
            parameters,
            optional_parameter_count: 0,
            variadic_element: None,
            results,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic_element.is_some()
    }

    /// The value a call evaluates to: nil, the only result, or a list of results.
    pub fn result_value(&self) -> Value {
        match self.results.as_slice() {
            [] => Value::Nil,
            [single] => single.clone(),
            results => Value::list(results.to_vec()),
        }
    }

    pub fn signature(&self) -> Signature {
        let mut parameters = self.parameters.clone();
        if let Some(element) = &self.variadic_element {
            parameters.push(Value::list_of(element.clone()));
        }
        Signature {
            parameter_names: (0..parameters.len()).map(|i| format!("p{}", i)).collect(),
            variadic: self.is_variadic(),
            parameters,
            result: self.result_value(),
        }
    }

    /// Checks call arguments. An argument is widened until its parameter
    /// accepts it; a rejected argument is replaced by the parameter so the
    /// analysis can go on.
    pub fn check_arguments(&self, args: &[Value]) -> Result<ArgumentCheck, SymbolicError> {
        let required = self.parameters.len() - self.optional_parameter_count.min(self.parameters.len());
        let mut arity_mismatch = args.len() < required;
        if !self.is_variadic() && args.len() > self.parameters.len() {
            arity_mismatch = true;
        }

        let mut arguments = Vec::with_capacity(self.parameters.len().max(args.len()));
        let mut rejected = Vec::new();

        for (i, param) in self.parameters.iter().enumerate() {
            match args.get(i) {
                Some(arg) => match accept_widened(param, arg)? {
                    Some(widened) => arguments.push(widened),
                    None => {
                        rejected.push(i);
                        arguments.push(param.clone());
                    }
                },
                None => arguments.push(param.clone()),
            }
        }

        if let Some(element) = &self.variadic_element {
            for (i, arg) in args.iter().enumerate().skip(self.parameters.len()) {
                match accept_widened(element, arg)? {
                    Some(widened) => arguments.push(widened),
                    None => {
                        rejected.push(i);
                        arguments.push(element.clone());
                    }
                }
            }
        }

        Ok(ArgumentCheck {
            arguments,
            rejected,
            arity_mismatch,
        })
    }
}

fn accept_widened(param: &Value, arg: &Value) -> Result<Option<Value>, SymbolicError> {
    let mut widened = arg.clone();
    while !widened.is_any() && !param.test(&widened, &mut RecTestCallState::new())? {
        widened = widen_or_any(&widened)?;
    }
    if param.test(&widened, &mut RecTestCallState::new())? {
        Ok(Some(widened))
    } else {
        Ok(None)
    }
}

/// Host function value. `Unconstrained` matches any host function.
#[derive(Clone, Debug)]
pub enum GoFunction {
    Unconstrained,
    Wrapped(Rc<HostFunction>),
}

impl GoFunction {
    pub fn wrap(function: HostFunction) -> Self {
        GoFunction::Wrapped(Rc::new(function))
    }

    pub fn host_function(&self) -> Option<&Rc<HostFunction>> {
        match self {
            GoFunction::Unconstrained => None,
            GoFunction::Wrapped(function) => Some(function),
        }
    }

    pub(crate) fn test(&self, other: &Value) -> bool {
        let Value::GoFunction(other) = other else {
            return false;
        };
        match (self, other) {
            (GoFunction::Unconstrained, _) => true,
            (GoFunction::Wrapped(function), GoFunction::Wrapped(other_function)) => {
                Rc::ptr_eq(function, other_function)
            }
            (GoFunction::Wrapped(_), GoFunction::Unconstrained) => false,
        }
    }
}

/// Abstract function type with no callable behind it.
#[derive(Clone, Debug, Default)]
pub struct Function {
    /// `None` matches any function.
    signature: Option<Signature>,
}

impl Function {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub(crate) fn test(&self, other: &Value, state: &mut RecTestCallState) -> TestResult {
        let Some(signature) = &self.signature else {
            return Ok(matches!(
                other,
                Value::Function(_) | Value::InoxFunction(_) | Value::GoFunction(_)
            ));
        };
        match signature_of(other) {
            Some(other_signature) => signature.accepts(&other_signature, state),
            None => Ok(false),
        }
    }
}

/// Signature of any callable value, when known.
pub(crate) fn signature_of(value: &Value) -> Option<Signature> {
    match value {
        Value::Function(function) => function.signature.clone(),
        Value::InoxFunction(function) => function.signature.clone(),
        Value::GoFunction(GoFunction::Wrapped(function)) => Some(function.signature()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug)]
    pub(crate) struct TestNode {
        pub kind: &'static str,
        pub children: Vec<Rc<dyn SyntaxNode>>,
    }

    impl SyntaxNode for TestNode {
        fn kind(&self) -> &str {
            self.kind
        }

        fn children(&self) -> Vec<Rc<dyn SyntaxNode>> {
            self.children.clone()
        }
    }

    pub(crate) fn node(kind: &'static str, children: Vec<Rc<dyn SyntaxNode>>) -> Rc<dyn SyntaxNode> {
        Rc::new(TestNode { kind, children })
    }

    fn test(expected: &Value, actual: &Value) -> bool {
        expected.test(actual, &mut RecTestCallState::new()).unwrap()
    }

    #[test]
    fn test_walk_nodes_visits_every_node() {
        let tree = node("fn", vec![node("return", vec![node("int", vec![])]), node("call", vec![])]);
        let mut kinds = Vec::new();
        assert!(walk_nodes(&tree, |n| {
            kinds.push(n.kind().to_string());
            true
        }));
        assert_eq!(kinds, vec!["fn", "return", "int", "call"]);

        let no_calls = NodeCheck::new(|n| n.kind() != "call");
        assert!(!no_calls.accepts(&tree));
    }

    #[test]
    fn test_inox_function_identity() {
        let decl = node("fn", vec![]);
        let f = Value::InoxFunction(Rc::new(InoxFunction::new(
            decl.clone(),
            Signature::new(vec![], Value::Nil),
        )));
        let same = Value::InoxFunction(Rc::new(InoxFunction::new(
            decl,
            Signature::new(vec![], Value::Nil),
        )));
        let other = Value::InoxFunction(Rc::new(InoxFunction::new(
            node("fn", vec![]),
            Signature::new(vec![], Value::Nil),
        )));
        let any = Value::InoxFunction(Rc::new(InoxFunction::any()));
        assert!(test(&f, &same));
        assert!(!test(&f, &other));
        assert!(test(&any, &f));
        assert!(!test(&f, &any));
    }

    #[test]
    fn test_signature_variance() {
        let takes_int = Signature::new(vec![Value::any_int()], Value::any_int());
        let takes_anything = Signature::new(vec![Value::Any], Value::int(1));
        let takes_one = Signature::new(vec![Value::int(1)], Value::any_int());

        let mut state = RecTestCallState::new();
        assert!(takes_int.accepts(&takes_anything, &mut state).unwrap());
        assert!(!takes_int.accepts(&takes_one, &mut state).unwrap());
        assert_eq!(state.mismatch().unwrap().location, ".parameters[0]");
    }

    #[test]
    fn test_signature_arity_and_variadic() {
        let unary = Signature::new(vec![Value::Any], Value::Nil);
        let binary = Signature::new(vec![Value::Any, Value::Any], Value::Nil);
        let variadic = Signature::new(vec![Value::Any], Value::Nil).variadic();
        let mut state = RecTestCallState::new();
        assert!(!unary.accepts(&binary, &mut state).unwrap());
        assert!(!unary.accepts(&variadic, &mut state).unwrap());
    }

    #[test]
    fn test_go_function_identity() {
        let f = GoFunction::wrap(HostFunction::new("f", vec![], vec![]));
        let g = GoFunction::wrap(HostFunction::new("f", vec![], vec![]));
        assert!(test(&Value::GoFunction(f.clone()), &Value::GoFunction(f.clone())));
        assert!(!test(&Value::GoFunction(f.clone()), &Value::GoFunction(g)));
        assert!(test(&Value::GoFunction(GoFunction::Unconstrained), &Value::GoFunction(f.clone())));
        assert!(!test(&Value::GoFunction(f), &Value::GoFunction(GoFunction::Unconstrained)));
    }

    #[test]
    fn test_host_result_value() {
        let none = HostFunction::new("f", vec![], vec![]);
        assert!(matches!(none.result_value(), Value::Nil));
        let two = HostFunction::new("f", vec![], vec![Value::any_int(), Value::any_str()]);
        assert_eq!(two.result_value().to_string(), "[int, string]");
    }

    #[test]
    fn test_check_arguments_widens_then_rejects() {
        let f = HostFunction::new("f", vec![Value::any_int(), Value::any_str()], vec![]);
        let check = f.check_arguments(&[Value::int(1), Value::bool(true)]).unwrap();
        assert!(check.rejected == vec![1]);
        assert_eq!(check.arguments[0].to_string(), "1");
        assert_eq!(check.arguments[1].to_string(), "string");
        assert!(!check.arity_mismatch);

        let check = f.check_arguments(&[Value::int(1)]).unwrap();
        assert!(check.arity_mismatch);
        assert_eq!(check.arguments.len(), 2);
    }

    #[test]
    fn test_check_arguments_variadic() {
        let mut f = HostFunction::new("f", vec![Value::any_str()], vec![]);
        f.variadic_element = Some(Value::any_int());
        let check = f
            .check_arguments(&[Value::str("a"), Value::int(1), Value::str("b")])
            .unwrap();
        assert_eq!(check.rejected, vec![2]);
        assert_eq!(check.arguments.len(), 3);
        assert!(!check.arity_mismatch);
    }

    #[test]
    fn test_abstract_function_accepts_any_callable() {
        let any = Value::Function(Rc::new(Function::any()));
        assert!(test(&any, &Value::GoFunction(GoFunction::Unconstrained)));
        assert!(!test(&any, &Value::Nil));

        let int_to_int = Value::Function(Rc::new(Function::new(Signature::new(
            vec![Value::any_int()],
            Value::any_int(),
        ))));
        let host = Value::GoFunction(GoFunction::wrap(HostFunction::new(
            "g",
            vec![Value::Any],
            vec![Value::int(2)],
        )));
        assert!(test(&int_to_int, &host));
    }
}
