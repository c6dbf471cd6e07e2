//! Data models for Recast
//!
//! Contains core type definitions used throughout the application.

pub mod config;
pub mod lsp;
pub mod plan;
pub mod refactor;
pub mod symbol;

// Re-export commonly used types
pub use config::RecastConfig;
pub use lsp::{Position, Range, TextEdit, WorkspaceEdit};
pub use plan::{ChangePlan, ExecutionMode, ExecutionResult, ExecutionStatus, PlanStatus};
pub use refactor::{Provenance, RefactorChange, RefactorOp, RefactorRequest, RefactorResult};
pub use symbol::{ImportInfo, Language, ParseResult, SymbolInfo, SymbolKind, Visibility};
