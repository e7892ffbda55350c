//! Depth ceilings for the recursive algorithms of the symbolic model.
//!
//! Structural cycles are legal (a list may contain itself), and none of the
//! algorithms memoize, so every recursive walk is bounded by one of these.
//! [`crate::config::SymbolicConfig`] can override them per analysis.

/// Maximum nesting of `test`/`test_value` calls before
/// [`crate::error::SymbolicError::MaxRecursionDepthExceeded`] is raised.
pub const MAX_RECURSIVE_TEST_CALL_DEPTH: usize = 64;

/// Maximum nesting of pairwise intersections.
/// Kept separate from the test ceiling: intersection callers expect to handle failure.
pub const MAX_INTERSECTION_COMPUTATION_DEPTH: usize = 20;

/// Nesting level past which display names are abbreviated to `...`.
pub const MAX_PRETTY_PRINT_DEPTH: usize = 8;

/// Maximum nesting walked when checking or performing concretization.
pub const MAX_CONCRETIZATION_DEPTH: usize = 64;
