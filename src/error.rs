//! Error types for Recast

use thiserror::Error;

use crate::models::refactor::RefactorOp;
use crate::models::symbol::Language;

pub type RecastResult<T> = std::result::Result<T, RecastError>;

#[derive(Debug, Error)]
pub enum RecastError {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Lsp(#[from] LspError),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("{0}")]
    Refactor(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stage-level failures of the executor pipeline.
///
/// All of these abort the current invocation; none are retried. They are
/// converted into a structured `ExecutionResult` at the pipeline boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Artifact type mismatch: expected '{expected}', got '{actual}'")]
    ArtifactType { expected: String, actual: String },

    #[error("Artifact schema invalid: {0}")]
    ArtifactSchema(String),

    #[error("Plan '{plan_id}' is not approved (status: {status}). Only approved or locked plans can be executed.")]
    ArtifactNotApproved { plan_id: String, status: String },

    #[error("Unsupported operations for this plan: {}", format_unsupported(.pairs))]
    UnsupportedOperation { pairs: Vec<(RefactorOp, Language)> },

    #[error("Path escapes repository root: {path} (root: {root})")]
    PathEscapesRepo { path: String, root: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),
}

fn format_unsupported(pairs: &[(RefactorOp, Language)]) -> String {
    pairs
        .iter()
        .map(|(op, lang)| format!("{} for {}", op, lang))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from one-shot language server sessions.
///
/// Every variant implies the subprocess has been (or is being) terminated;
/// a session never returns with its server still running.
#[derive(Debug, Error)]
pub enum LspError {
    #[error("Language server not available for {language}: {name} not found. Install: {install_hint}")]
    Unavailable {
        language: Language,
        name: String,
        install_hint: String,
    },

    #[error("Language server {name} timed out after {seconds}s; process terminated")]
    Timeout { name: String, seconds: u64 },

    #[error("Language server {name} exceeded memory limit ({used_mb}MB > {limit_mb}MB); process terminated")]
    MemoryExceeded {
        name: String,
        used_mb: u64,
        limit_mb: u64,
    },

    #[error("Server error [{code}]: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server terminated unexpectedly during {phase}")]
    Terminated { phase: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<crate::infra::lsp::protocol::ResponseError> for LspError {
    fn from(err: crate::infra::lsp::protocol::ResponseError) -> Self {
        LspError::ServerError {
            code: err.code,
            message: err.message,
        }
    }
}

/// External rewrite tool invocation failure.
#[derive(Debug, Error)]
#[error("External tool '{tool}' failed with exit code {exit_code}: {stderr}")]
pub struct ToolError {
    pub tool: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
