//! Engine session configuration
//!
//! Settings come from code, from environment variables, or both: start from
//! [`EngineConfigBuilder::from_env`] and override individual fields.

use std::path::PathBuf;

use crate::discovery;
use crate::error::{EngineError, Result};

/// Largest output buffer `engOutputBuffer` can address (its size is a C int).
const MAX_OUTPUT_BUFFER: usize = i32::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// MATLAB installation root. When unset, the `matlab` launcher on `PATH`
    /// is consulted.
    pub matlab_root: Option<PathBuf>,

    /// Options appended to the MATLAB launch command (ignored on Windows)
    pub startup_options: String,

    /// Bytes reserved for captured command-window output (0 = disabled)
    pub output_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matlab_root: None,
            startup_options: "-nosplash".to_string(),
            output_buffer_size: 0,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(root) = &self.matlab_root {
            if root.as_os_str().is_empty() {
                return Err("MATLAB root must not be empty".to_string());
            }
        }

        if self.startup_options.contains('\0') {
            return Err("Startup options must not contain NUL bytes".to_string());
        }

        if self.output_buffer_size == 1 {
            return Err("Output buffer size must be 0 (disabled) or at least 2".to_string());
        }

        if self.output_buffer_size > MAX_OUTPUT_BUFFER {
            return Err(format!(
                "Output buffer size must be <= {MAX_OUTPUT_BUFFER} bytes"
            ));
        }

        Ok(())
    }

    /// The configured root, or the install found through `PATH`.
    pub fn resolve_matlab_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.matlab_root {
            return Ok(root.clone());
        }
        discovery::find_matlab_root().ok_or_else(|| {
            EngineError::Startup(
                "Unknown MATLAB location: set MATLABROOT or configure matlab_root".to_string(),
            )
        })
    }
}

/// Environment variable-based configuration builder
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::new();

        if let Some(val) = lookup("MATLABROOT") {
            if !val.is_empty() {
                builder.config.matlab_root = Some(PathBuf::from(val));
            }
        }

        if let Some(val) = lookup("RUNMAT_MATLAB_OPTIONS") {
            builder.config.startup_options = val;
        }

        if let Some(val) = lookup("RUNMAT_MATLAB_BUFFER_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                builder.config.output_buffer_size = size;
            }
        }

        builder
    }

    pub fn matlab_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.matlab_root = Some(root.into());
        self
    }

    pub fn startup_options(mut self, options: impl Into<String>) -> Self {
        self.config.startup_options = options.into();
        self
    }

    pub fn output_buffer_size(mut self, size: usize) -> Self {
        self.config.output_buffer_size = size;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate().map_err(EngineError::Config)?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
