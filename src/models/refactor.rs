//! Refactoring request and result models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported refactoring operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactorOp {
    /// Rename a symbol and all references to its definition
    RenameSymbol,
    /// Extract an interface/trait from a concrete type's public methods
    ExtractInterface,
    /// Verify (and report violations of) import allow/deny rules
    EnforceDependency,
    /// Move a file, rewriting references where the backend supports it
    MoveFile,
}

impl RefactorOp {
    /// Operations answerable from the structural parse alone
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::ExtractInterface | Self::EnforceDependency)
    }

    /// Operations that never write files
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::EnforceDependency)
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::RenameSymbol,
            Self::ExtractInterface,
            Self::EnforceDependency,
            Self::MoveFile,
        ]
    }
}

impl fmt::Display for RefactorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RenameSymbol => "rename_symbol",
            Self::ExtractInterface => "extract_interface",
            Self::EnforceDependency => "enforce_dependency",
            Self::MoveFile => "move_file",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RefactorOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rename_symbol" | "rename" => Ok(Self::RenameSymbol),
            "extract_interface" => Ok(Self::ExtractInterface),
            "enforce_dependency" => Ok(Self::EnforceDependency),
            "move_file" | "move" => Ok(Self::MoveFile),
            _ => Err(format!("Unknown operation: {}", s)),
        }
    }
}

/// Which mechanism produced a refactor result.
///
/// Downstream consumers use this to decide how much confidence to place in
/// the change: only `TextFallback` is unverified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Provenance {
    Ast,
    Lsp,
    ExternalTool(String),
    TextFallback,
}

impl Provenance {
    /// True when the change was derived from a structural or semantic
    /// understanding of the code rather than text patterns.
    pub fn is_verified(&self) -> bool {
        !matches!(self, Self::TextFallback)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ast => write!(f, "ast"),
            Self::Lsp => write!(f, "lsp"),
            Self::ExternalTool(name) => write!(f, "external:{}", name),
            Self::TextFallback => write!(f, "text_fallback (unverified)"),
        }
    }
}

/// One requested refactoring operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorRequest {
    pub operation: RefactorOp,
    /// Symbol name or file path, depending on the operation
    pub target: String,
    /// New name or new path, where the operation takes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Operation-specific parameters (line ranges, deny lists, interface name)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_json::Value>,
}

impl RefactorRequest {
    pub fn new(operation: RefactorOp, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            new_value: None,
            params: HashMap::new(),
        }
    }

    pub fn with_new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// String-list parameter, tolerating a single string
    pub fn param_list(&self, key: &str) -> Vec<String> {
        match self.params.get(key) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}

/// One prospective file change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorChange {
    pub file: PathBuf,
    /// Set for moves: the file's destination path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<PathBuf>,
    pub original_content: String,
    pub new_content: String,
    pub description: String,
}

impl RefactorChange {
    pub fn edit(
        file: impl Into<PathBuf>,
        original: impl Into<String>,
        new: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            new_path: None,
            original_content: original.into(),
            new_content: new.into(),
            description: description.into(),
        }
    }

    pub fn moved(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        content: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            file: from.into(),
            new_path: Some(to.into()),
            original_content: content.clone(),
            new_content: content,
            description: description.into(),
        }
    }

    pub fn is_move(&self) -> bool {
        self.new_path.is_some()
    }
}

/// Outcome of one dispatched refactoring operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorResult {
    pub success: bool,
    #[serde(default)]
    pub changes: Vec<RefactorChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub tool_used: Provenance,
    pub dry_run: bool,
}

impl RefactorResult {
    pub fn success(tool_used: Provenance, dry_run: bool, changes: Vec<RefactorChange>) -> Self {
        Self {
            success: true,
            changes,
            errors: Vec::new(),
            tool_used,
            dry_run,
        }
    }

    pub fn failure(tool_used: Provenance, dry_run: bool, error: impl Into<String>) -> Self {
        Self {
            success: false,
            changes: Vec::new(),
            errors: vec![error.into()],
            tool_used,
            dry_run,
        }
    }
}
