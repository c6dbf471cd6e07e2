//! Recast - Deterministic Refactoring Plan Executor
//!
//! Applies approved, machine-generated change plans (renames, interface
//! extraction, dependency enforcement, file moves) to multi-language
//! codebases. Structural questions are answered by a fast tree-sitter parse;
//! whole-program operations go through one-shot, memory-capped language
//! server sessions that are always terminated before control returns.

pub mod app;
pub mod capability;
pub mod cli;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod infra;
pub mod models;

pub use error::{RecastError, RecastResult};
