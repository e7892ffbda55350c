use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::DiagnosticsCollector;
use crate::limits::{
    MAX_CONCRETIZATION_DEPTH, MAX_INTERSECTION_COMPUTATION_DEPTH, MAX_PRETTY_PRINT_DEPTH,
    MAX_RECURSIVE_TEST_CALL_DEPTH,
};

/// Configuration used when no explicit one is given.
pub static DEFAULT_CONFIG: Lazy<SymbolicConfig> = Lazy::new(SymbolicConfig::default);

/// Tunable limits of an analysis, usually read from a `symbolic.toml`.
///
/// ```toml
/// max_test_depth = 32
/// diagnostics = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolicConfig {
    pub max_test_depth: usize,
    pub max_intersection_depth: usize,
    pub max_print_depth: usize,
    pub max_concretization_depth: usize,
    /// Enables the thread-local diagnostics collector.
    pub diagnostics: bool,
}

impl Default for SymbolicConfig {
    fn default() -> Self {
        Self {
            max_test_depth: MAX_RECURSIVE_TEST_CALL_DEPTH,
            max_intersection_depth: MAX_INTERSECTION_COMPUTATION_DEPTH,
            max_print_depth: MAX_PRETTY_PRINT_DEPTH,
            max_concretization_depth: MAX_CONCRETIZATION_DEPTH,
            diagnostics: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid symbolic config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SymbolicConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    /// Enables or disables the diagnostics collector of the current thread.
    pub fn apply_diagnostics(&self) {
        if self.diagnostics {
            DiagnosticsCollector::enable();
        } else {
            DiagnosticsCollector::disable();
        }
    }
}
