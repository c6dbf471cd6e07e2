//! LSP Infrastructure for Recast
//!
//! One-shot Language Server Protocol sessions:
//! - JSON-RPC 2.0 protocol types
//! - Async message transport with Content-Length framing
//! - Per-language server configurations with install hints
//! - Resident-memory monitoring with configurable breach actions
//! - A client whose subprocess lifetime is scoped to a single operation

pub mod client;
pub mod memory;
pub mod protocol;
pub mod servers;
pub mod transport;

pub use client::{LspOperation, LspOutcome, OneShotClient, SourceLocation};
pub use memory::MemoryMonitor;
pub use servers::{InstallInstructions, LspServerConfig, MemoryAction, Platform};
