//! Configuration model for Recast
//!
//! Loaded once at startup from `.recast/config.toml` (all sections optional)
//! and passed by reference; nothing here is re-read after construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Recast configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecastConfig {
    #[serde(default)]
    pub parse: ParseConfig,

    #[serde(default)]
    pub lsp: LspSettings,

    #[serde(default)]
    pub capability: CapabilitySettings,
}

impl RecastConfig {
    /// Load from `<root>/.recast/config.toml`, falling back to defaults when
    /// the file is absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(".recast").join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Parsing limits and scan filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Files larger than this are skipped with an explicit error
    #[serde(default = "defaults::max_file_size_mb")]
    pub max_file_size_mb: u32,

    /// Ignore patterns for batch scans (gitignore syntax)
    #[serde(default = "defaults::ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: defaults::max_file_size_mb(),
            ignore_patterns: defaults::ignore_patterns(),
        }
    }
}

impl ParseConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        if self.max_file_size_mb == 0 {
            u64::MAX
        } else {
            self.max_file_size_mb as u64 * 1024 * 1024
        }
    }
}

/// Overrides applied on top of the bundled server table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspSettings {
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "defaults::memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// Per-language command overrides
    #[serde(default)]
    pub commands: std::collections::HashMap<String, String>,
}

impl Default for LspSettings {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout_secs(),
            memory_limit_mb: defaults::memory_limit_mb(),
            commands: Default::default(),
        }
    }
}

/// Capability override location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySettings {
    /// Relative to the repository root
    #[serde(default = "defaults::override_path")]
    pub override_path: PathBuf,
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        Self {
            override_path: defaults::override_path(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn max_file_size_mb() -> u32 {
        5
    }

    pub fn ignore_patterns() -> Vec<String> {
        vec![
            "node_modules".to_string(),
            ".git".to_string(),
            "target".to_string(),
            "dist".to_string(),
            "build".to_string(),
            "__pycache__".to_string(),
            ".venv".to_string(),
            "venv".to_string(),
            "vendor".to_string(),
            ".recast".to_string(),
        ]
    }

    pub fn timeout_secs() -> u64 {
        60
    }

    pub fn memory_limit_mb() -> u64 {
        2048
    }

    pub fn override_path() -> PathBuf {
        PathBuf::from(".recast/capabilities.toml")
    }
}
