//! Application wiring
//!
//! All components are constructed once here and passed by reference; there
//! is no lazily-initialized global state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capability::CapabilityRegistry;
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, RecastResult};
use crate::executor::Executor;
use crate::executor::audit::AuditSink;
use crate::infra::ast::AstEngine;
use crate::infra::lsp::{LspServerConfig, servers};
use crate::models::config::RecastConfig;
use crate::models::symbol::Language;

pub struct App {
    pub config: RecastConfig,
    pub registry: Arc<CapabilityRegistry>,
    pub engine: Arc<AstEngine>,
    pub servers: HashMap<Language, LspServerConfig>,
    pub root: PathBuf,
}

impl App {
    pub fn init(root: PathBuf) -> RecastResult<Self> {
        let root = root.canonicalize().unwrap_or(root);

        let config = RecastConfig::load(&root)?;
        let registry = Arc::new(CapabilityRegistry::with_override(
            &root.join(&config.capability.override_path),
        )?);
        let engine = Arc::new(
            AstEngine::new(config.parse.max_file_size_bytes()).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "grammar".to_string(),
                    message: e.to_string(),
                }
            })?,
        );
        let servers = servers::defaults(&config.lsp);

        Ok(Self {
            config,
            registry,
            engine,
            servers,
            root,
        })
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::standard(
            Arc::clone(&self.registry),
            Arc::clone(&self.engine),
            self.servers.clone(),
            self.root.clone(),
            self.config.parse.ignore_patterns.clone(),
        )
    }

    pub fn executor(&self, audit: Arc<dyn AuditSink>) -> Executor {
        Executor::new(
            Arc::clone(&self.registry),
            self.dispatcher(),
            audit,
            self.root.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::init(dir.path().to_path_buf()).unwrap();
        assert_eq!(app.config.parse.max_file_size_mb, 5);
        assert!(app.servers.contains_key(&Language::Rust));
    }

    #[test]
    fn test_init_reads_capability_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".recast")).unwrap();
        std::fs::write(
            dir.path().join(".recast/capabilities.toml"),
            "[rust]\nrename_symbol = \"unsupported\"\n",
        )
        .unwrap();

        let app = App::init(dir.path().to_path_buf()).unwrap();
        use crate::models::refactor::RefactorOp;
        assert!(!app.registry.check(RefactorOp::RenameSymbol, Language::Rust));
        assert!(app.registry.check(RefactorOp::MoveFile, Language::Rust));
    }
}
