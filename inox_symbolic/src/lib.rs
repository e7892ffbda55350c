// The model reports through `diagnostics`, never through stderr.
#![deny(clippy::print_stderr)]

//! Symbolic value model of the Inox static checker.
//!
//! Every expression of a program is approximated by a [`Value`]: a constant
//! (`1`, `"a"`), a type-level abstraction (`int`, `[]string`), a union of
//! cases, or a run-time value known only by a bound. The model answers the
//! questions the checker asks about them: compatibility ([`Value::test`]),
//! widening, intersection, capability casts and concretization.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod limits;
pub mod symbolic;

pub use config::{ConfigError, SymbolicConfig, DEFAULT_CONFIG};
pub use diagnostics::{DiagnosticReason, DiagnosticsCollector, SymbolicDiagnostic};
pub use error::{SymbolicError, TestResult};
pub use symbolic::{
    get_intersection, join_values, narrow_out, widen_or_any, Capability, Pattern, Properties, RecTestCallState,
    Value,
};
