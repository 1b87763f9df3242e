//! Compiler Configuration (accir.toml)
//!
//! ```toml
//! [module]
//! name = "classical_module"
//! function = "main"
//!
//! [run]
//! step_limit = 100000
//! ```
//!
//! Every key is optional; a missing table falls back to its defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "accir.toml";

pub const DEFAULT_MODULE_NAME: &str = "classical_module";
pub const DEFAULT_FUNCTION_NAME: &str = "main";
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Emitted module layout
    #[serde(default)]
    pub module: CompileOptions,

    /// Executor settings
    #[serde(default)]
    pub run: RunOptions,
}

/// The `[module]` table, the only configuration the pipeline reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Module identifier
    #[serde(rename = "name", default = "default_module_name")]
    pub module_name: String,

    /// Name of the single emitted function
    #[serde(rename = "function", default = "default_function_name")]
    pub function_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
            function_name: default_function_name(),
        }
    }
}

impl CompileOptions {
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Maximum number of executed IR instructions
    #[serde(default = "default_step_limit")]
    pub step_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            step_limit: default_step_limit(),
        }
    }
}

fn default_module_name() -> String {
    DEFAULT_MODULE_NAME.to_string()
}

fn default_function_name() -> String {
    DEFAULT_FUNCTION_NAME.to_string()
}

fn default_step_limit() -> usize {
    DEFAULT_STEP_LIMIT
}

impl Config {
    /// Parse a configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Path of the nearest accir.toml in `start_dir` or its parents
    pub fn locate(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Find and load accir.toml by searching up from `start_dir`
    pub fn find_and_load(start_dir: &Path) -> Result<(Self, PathBuf)> {
        let config_path = Self::locate(start_dir).ok_or_else(|| {
            Error::Config(format!(
                "No {} found in {} or any parent directory",
                CONFIG_FILE_NAME,
                start_dir.display()
            ))
        })?;
        let config = Self::from_file(&config_path)?;
        Ok((config, config_path))
    }

    /// Serialize configuration to TOML string
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Check values that the TOML schema alone cannot express
    pub fn validate(&self) -> Result<()> {
        if !crate::program::is_identifier(&self.module.function_name) {
            return Err(Error::Config(format!(
                "module.function '{}' is not a valid identifier",
                self.module.function_name
            )));
        }
        if self.module.module_name.is_empty() {
            return Err(Error::Config("module.name must not be empty".to_string()));
        }
        if self.run.step_limit == 0 {
            return Err(Error::Config("run.step_limit must be positive".to_string()));
        }
        Ok(())
    }
}
