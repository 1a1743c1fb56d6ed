//! Engine configuration.
//!
//! Configuration is plain data: it can be built in code, deserialized from
//! JSON, or left at its defaults. Missing JSON fields fall back to defaults.
//!
//! ```rust
//! use nodematch::config::EngineConfig;
//! let cfg = EngineConfig::from_json(r#"{ "temp_prefix": "t" }"#).unwrap();
//! assert_eq!(cfg.temp_prefix, "t");
//! assert_eq!(cfg.max_macro_depth, 128);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::EngineError;
use crate::err_msg;

/// Maximum tree depth walked by the matcher, compiler, expander and evaluator.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Maximum number of nested re-expansions of macro output.
pub const MAX_MACRO_RECURSION_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on recursion over tree depth.
    pub max_depth: usize,
    /// Bound on re-expanding the output of a macro.
    pub max_macro_depth: usize,
    /// Prefix for temporaries synthesized by the pattern compiler.
    pub temp_prefix: String,
    /// Cache every non-trivial candidate sub-expression, ignoring the read-count heuristic.
    pub always_cache: bool,
    /// Type name used when declaring single-node captures.
    pub node_type: String,
    /// Type name used when declaring list captures.
    pub list_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            max_macro_depth: MAX_MACRO_RECURSION_DEPTH,
            temp_prefix: "tmp_".to_string(),
            always_cache: false,
            node_type: "LNode".to_string(),
            list_type: "LNodeList".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| err_msg!(Config, "invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| err_msg!(Config, "cannot read {}: {}", path.display(), e))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.max_depth == 0 || self.max_macro_depth == 0 {
            return Err(err_msg!(Config, "depth limits must be at least 1"));
        }
        if self.temp_prefix.is_empty() {
            return Err(err_msg!(Config, "temp_prefix must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = EngineConfig::from_json("{ max_depth: ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
