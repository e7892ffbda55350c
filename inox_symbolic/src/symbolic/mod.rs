//! Symbolic values and patterns of the Inox static checker.
//!
//! # Module Organization
//!
//! - `value.rs`: the `Value` enum, scalars, constructors, readonly conversion
//! - `sequence.rs`: lists, arrays, tuples, dictionaries and key lists
//! - `object.rs`: property maps, objects and records
//! - `function.rs`: Inox functions, host functions, function types
//! - `pattern/`: patterns, including string patterns
//! - `multivalue.rs`: unions of values, join and narrowing
//! - `capability.rs`: capability traits, views and run-time values
//! - `state.rs`: recursion bookkeeping shared by every structural walk
//! - `comparison.rs`: `Value::test`
//! - `widening.rs`: one-step widening
//! - `intersection.rs`: intersection of values
//! - `concretize.rs`: symbolic to host values
//! - `display.rs`: display names

pub mod capability;
mod comparison;
pub mod concretize;
mod display;
pub mod function;
pub mod intersection;
pub mod multivalue;
pub mod object;
pub mod pattern;
pub mod sequence;
pub mod state;
pub mod value;
mod widening;

pub use capability::{
    Capability, CapabilityView, IProps, Indexable, Iterable, RunTimeValue, StringLike, ViewOrigin, Watchable,
};
pub use concretize::{concretize, is_concretizable, ConcreteValueFactories};
pub use function::{
    ArgumentCheck, Function, GoFunction, HostFunction, HostFunctionKind, InoxFunction, NodeCheck, Signature,
    SyntaxNode,
};
pub use intersection::{
    get_intersection, get_intersection_with_config, IntRangeIntersection, IntersectionEngine, SpecificIntersection,
};
pub use multivalue::{join_values, narrow_out, Multivalue};
pub use object::{Object, Properties, PropertyDependencies, Record, RecordShape};
pub use pattern::{ElementPatterns, FunctionPattern, Pattern, StringPattern};
pub use sequence::{Array, Dictionary, Elements, KeyList, List, Tuple};
pub use state::{Mismatch, PathSegment, RecTestCallState};
pub use value::{static_pattern_of, Float, FloatRange, Int, IntRange, LengthRange, Str, Value};
pub use widening::widen_or_any;
