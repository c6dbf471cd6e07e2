//! Refactor Dispatcher
//!
//! Routes each operation to the cheapest mechanism that can satisfy it:
//! structural (AST) first, then a one-shot language server, then an external
//! rewrite tool, and finally a textual fallback whose results are explicitly
//! marked unverified. Backends implement one trait and are consulted in
//! registration order.

pub mod ast_backend;
pub mod lsp_backend;
pub mod text_backend;
pub mod tool_backend;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::CapabilityRegistry;
use crate::error::{PipelineError, RecastError};
use crate::infra::ast::AstEngine;
use crate::infra::lsp::LspServerConfig;
use crate::models::refactor::{Provenance, RefactorRequest, RefactorResult};
use crate::models::symbol::Language;

pub use ast_backend::AstBackend;
pub use lsp_backend::LspBackend;
pub use text_backend::TextFallbackBackend;
pub use tool_backend::ExternalToolBackend;

/// One mechanism capable of executing refactoring operations
#[async_trait]
pub trait RefactorBackend: Send + Sync {
    /// Provenance tag stamped on results from this backend
    fn provenance(&self) -> Provenance;

    /// Whether this backend can attempt the request right now (includes
    /// availability preconditions such as an installed server binary).
    fn can_handle(&self, request: &RefactorRequest, language: Language) -> bool;

    async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult;
}

/// Ordered backend list behind a strict capability gate
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    backends: Vec<Box<dyn RefactorBackend>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>, backends: Vec<Box<dyn RefactorBackend>>) -> Self {
        Self { registry, backends }
    }

    /// The standard backend order: AST, LSP, external tool, textual fallback.
    pub fn standard(
        registry: Arc<CapabilityRegistry>,
        engine: Arc<AstEngine>,
        servers: std::collections::HashMap<Language, LspServerConfig>,
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Self {
        let backends: Vec<Box<dyn RefactorBackend>> = vec![
            Box::new(AstBackend::new(Arc::clone(&engine))),
            Box::new(LspBackend::new(
                Arc::clone(&engine),
                servers,
                root.clone(),
                ignore_patterns.clone(),
            )),
            Box::new(ExternalToolBackend::new(root.clone())),
            Box::new(TextFallbackBackend::new(engine, root, ignore_patterns)),
        ];
        Self::new(registry, backends)
    }

    /// Execute one operation.
    ///
    /// Fails with `UnsupportedOperationError` before consulting any backend
    /// when the capability table does not strictly support the pair.
    pub async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> Result<RefactorResult, RecastError> {
        if !self.registry.check(request.operation, language) {
            return Err(PipelineError::UnsupportedOperation {
                pairs: vec![(request.operation, language)],
            }
            .into());
        }

        for backend in &self.backends {
            if !backend.can_handle(request, language) {
                continue;
            }
            tracing::debug!(
                "{} {} via {}",
                request.operation,
                request.target,
                backend.provenance()
            );
            let result = backend.execute(request, language, dry_run).await;
            return Ok(result);
        }

        Err(PipelineError::Precondition(format!(
            "no backend available for {} on {}",
            request.operation, language
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::refactor::{RefactorChange, RefactorOp};

    struct StubBackend {
        provenance: Provenance,
        handles: bool,
    }

    #[async_trait]
    impl RefactorBackend for StubBackend {
        fn provenance(&self) -> Provenance {
            self.provenance.clone()
        }

        fn can_handle(&self, _request: &RefactorRequest, _language: Language) -> bool {
            self.handles
        }

        async fn execute(
            &self,
            _request: &RefactorRequest,
            _language: Language,
            dry_run: bool,
        ) -> RefactorResult {
            RefactorResult::success(
                self.provenance.clone(),
                dry_run,
                vec![RefactorChange::edit("a.rs", "x", "y", "stub")],
            )
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        Arc::new(CapabilityRegistry::bundled())
    }

    #[tokio::test]
    async fn test_unsupported_pair_fails_before_backends() {
        let dispatcher = Dispatcher::new(
            registry(),
            vec![Box::new(StubBackend {
                provenance: Provenance::Ast,
                handles: true,
            })],
        );
        // Java rename is partial -> strictly unsupported
        let request = RefactorRequest::new(RefactorOp::RenameSymbol, "Foo").with_new_value("Bar");
        let err = dispatcher
            .execute(&request, Language::Java, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rename_symbol for java"));
    }

    #[tokio::test]
    async fn test_first_willing_backend_wins() {
        let dispatcher = Dispatcher::new(
            registry(),
            vec![
                Box::new(StubBackend {
                    provenance: Provenance::Ast,
                    handles: false,
                }),
                Box::new(StubBackend {
                    provenance: Provenance::Lsp,
                    handles: true,
                }),
                Box::new(StubBackend {
                    provenance: Provenance::TextFallback,
                    handles: true,
                }),
            ],
        );
        let request = RefactorRequest::new(RefactorOp::RenameSymbol, "Foo").with_new_value("Bar");
        let result = dispatcher
            .execute(&request, Language::Rust, true)
            .await
            .unwrap();
        assert_eq!(result.tool_used, Provenance::Lsp);
        assert!(result.dry_run);
    }

    #[tokio::test]
    async fn test_no_backend_available() {
        let dispatcher = Dispatcher::new(registry(), vec![]);
        let request = RefactorRequest::new(RefactorOp::RenameSymbol, "Foo").with_new_value("Bar");
        let err = dispatcher
            .execute(&request, Language::Rust, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no backend available"));
    }
}
