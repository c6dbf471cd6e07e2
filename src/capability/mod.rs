//! Capability Registry
//!
//! Answers which refactoring operations are mechanically supported for which
//! language. Built once at startup from a bundled default table, optionally
//! deep-merged with a project override file; afterwards it is a pure lookup
//! structure with no interior mutability, safe for unsynchronized concurrent
//! reads.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::refactor::RefactorOp;
use crate::models::symbol::Language;

/// Support level for one (language, operation) pair.
///
/// `Partial` means the operation works for common cases but has not been
/// verified mechanically; strict checks treat it as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Supported,
    Partial,
    #[default]
    Unsupported,
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supported => "supported",
            Self::Partial => "partial",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Support {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supported" | "true" => Ok(Self::Supported),
            "partial" => Ok(Self::Partial),
            "unsupported" | "false" => Ok(Self::Unsupported),
            _ => Err(format!("Unknown support level: {}", s)),
        }
    }
}

/// Immutable (language, operation) -> support table
pub struct CapabilityRegistry {
    table: HashMap<(Language, RefactorOp), Support>,
}

impl CapabilityRegistry {
    /// Bundled defaults only
    pub fn bundled() -> Self {
        Self { table: defaults() }
    }

    /// Bundled defaults with a project override merged on top.
    ///
    /// Override entries replace default entries per (language, operation)
    /// key; languages absent from the override keep their defaults. A
    /// missing override file is not an error.
    pub fn with_override(override_path: &Path) -> Result<Self, ConfigError> {
        let mut table = defaults();

        if override_path.exists() {
            let text = std::fs::read_to_string(override_path)?;
            let overrides = parse_override(&text).map_err(|message| ConfigError::Parse {
                path: override_path.display().to_string(),
                message,
            })?;
            for (key, support) in overrides {
                table.insert(key, support);
            }
        }

        Ok(Self { table })
    }

    /// Strict check: only `Supported` passes.
    ///
    /// Used before any mutating execution; `Partial` is deliberately treated
    /// as false here.
    pub fn check(&self, operation: RefactorOp, language: Language) -> bool {
        self.support(operation, language) == Support::Supported
    }

    /// Raw support level (Unsupported for pairs absent from the table)
    pub fn support(&self, operation: RefactorOp, language: Language) -> Support {
        self.table
            .get(&(language, operation))
            .copied()
            .unwrap_or(Support::Unsupported)
    }

    /// Operations strictly supported for a language
    pub fn operations_for(&self, language: Language) -> Vec<RefactorOp> {
        let mut ops: Vec<RefactorOp> = RefactorOp::all()
            .iter()
            .copied()
            .filter(|op| self.check(*op, language))
            .collect();
        ops.sort_by_key(|op| op.to_string());
        ops
    }

    /// Languages with at least one supported operation
    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = Language::all()
            .iter()
            .copied()
            .filter(|lang| !self.operations_for(*lang).is_empty())
            .collect();
        langs.sort_by_key(|l| l.lsp_id());
        langs
    }
}

/// Bundled default capability table
fn defaults() -> HashMap<(Language, RefactorOp), Support> {
    use Language::*;
    use RefactorOp::*;
    use Support::*;

    let mut table = HashMap::new();

    // Structural operations work wherever the parse engine has a grammar.
    for lang in [Rust, Python, JavaScript, TypeScript, Go, Java] {
        table.insert((lang, ExtractInterface), Supported);
        table.insert((lang, EnforceDependency), Supported);
    }
    // No interface syntax in plain JavaScript; extraction emits nothing usable.
    table.insert((JavaScript, ExtractInterface), Partial);

    // Rename needs semantic reference tracking; every configured server
    // handles it. Java rename through jdtls is flaky on records, so it
    // stays partial until verified.
    table.insert((Rust, RenameSymbol), Supported);
    table.insert((Python, RenameSymbol), Supported);
    table.insert((JavaScript, RenameSymbol), Supported);
    table.insert((TypeScript, RenameSymbol), Supported);
    table.insert((Go, RenameSymbol), Supported);
    table.insert((Java, RenameSymbol), Partial);

    // File moves with reference rewriting.
    table.insert((Rust, MoveFile), Supported);
    table.insert((Python, MoveFile), Supported);
    table.insert((JavaScript, MoveFile), Supported);
    table.insert((TypeScript, MoveFile), Supported);
    table.insert((Go, MoveFile), Supported);
    table.insert((Java, MoveFile), Partial);

    table
}

/// Parse a TOML override of the form:
///
/// ```toml
/// [go]
/// rename_symbol = "unsupported"
///
/// [java]
/// move_file = "supported"
/// ```
fn parse_override(text: &str) -> Result<Vec<((Language, RefactorOp), Support)>, String> {
    let value: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;

    let mut entries = Vec::new();
    for (lang_key, ops) in value {
        let language = Language::from_str(&lang_key)
            .map_err(|_| format!("unknown language '{}' in override", lang_key))?;
        let toml::Value::Table(ops) = ops else {
            return Err(format!("expected a table for language '{}'", lang_key));
        };
        for (op_key, level) in ops {
            let op = RefactorOp::from_str(&op_key)
                .map_err(|_| format!("unknown operation '{}' in override", op_key))?;
            let level_str = level
                .as_str()
                .ok_or_else(|| format!("expected a string for '{}.{}'", lang_key, op_key))?;
            let support = Support::from_str(level_str)
                .map_err(|_| format!("unknown support level '{}'", level_str))?;
            entries.push(((language, op), support));
        }
    }
    Ok(entries)
}
