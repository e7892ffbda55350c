//! Error types of the symbolic model.
//!
//! A failed match is never an error: `test` returns `Ok(false)`. Errors are
//! reserved for depth violations (an unguarded structural cycle), failed
//! constructions, and concretization of values with no known constant.

use thiserror::Error;

/// Result of a structural-compatibility check.
pub type TestResult = Result<bool, SymbolicError>;

/// Errors raised by the symbolic model.
#[derive(Debug, Error)]
pub enum SymbolicError {
    /// A `test`/`test_value` walk went deeper than the configured ceiling.
    #[error("maximum recursion depth ({depth}) exceeded at '{location}'")]
    MaxRecursionDepthExceeded {
        /// Configured ceiling
        depth: usize,
        /// Location path reached when the ceiling tripped
        location: String,
    },

    /// Intersection computation went deeper than the configured ceiling.
    #[error("maximum intersection computation depth ({depth}) exceeded")]
    MaxIntersectionDepthExceeded {
        /// Depth at which the computation gave up
        depth: usize,
    },

    /// Concretization walked deeper than the configured ceiling.
    #[error("maximum concretization depth ({depth}) exceeded")]
    MaxConcretizationDepthExceeded {
        /// Configured ceiling
        depth: usize,
    },

    /// The value has no statically-known constant.
    #[error("value is not concretizable: {0}")]
    NotConcretizable(String),

    /// A late-initialized container was initialized twice.
    #[error("{0} is already initialized")]
    ValueAlreadyInitialized(&'static str),

    /// A multivalue needs at least two cases.
    #[error("a multivalue requires at least 2 cases, got {0}")]
    TooFewMultivalueCases(usize),

    /// Run-time values only wrap values that cannot be concretized.
    #[error("unexpected concretizable value provided to create a run-time value: {0}")]
    ConcretizableRunTimeValue(String),

    #[error("value cannot be converted to readonly: {0}")]
    NotConvertibleToReadonly(String),

    #[error("readonly value cannot be mutated: {0}")]
    ReadonlyMutation(String),

    /// The static pattern of a property rejects the new value.
    #[error("value {value} is not allowed for property '{name}' (expected {pattern})")]
    PropertyNotAllowed {
        name: String,
        value: String,
        pattern: String,
    },

    #[error("property '{0}' does not exist")]
    NoSuchProperty(String),

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Sequence string patterns only accept string patterns as elements.
    #[error("{0} is not a string pattern")]
    NotAStringPattern(String),
}

impl SymbolicError {
    /// Whether this error comes from one of the depth ceilings.
    pub fn is_depth_error(&self) -> bool {
        matches!(
            self,
            SymbolicError::MaxRecursionDepthExceeded { .. }
                | SymbolicError::MaxIntersectionDepthExceeded { .. }
                | SymbolicError::MaxConcretizationDepthExceeded { .. }
        )
    }
}
