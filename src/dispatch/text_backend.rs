//! Textual fallback backend
//!
//! Last-resort pattern-based rewriting for when no structural or semantic
//! mechanism is available. Matches whole identifiers only, but cannot tell
//! two symbols with the same name apart - every result carries the
//! `TextFallback` provenance so callers know it is unverified.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::RefactorBackend;
use crate::infra::ast::AstEngine;
use crate::models::refactor::{
    Provenance, RefactorChange, RefactorOp, RefactorRequest, RefactorResult,
};
use crate::models::symbol::Language;

pub struct TextFallbackBackend {
    engine: Arc<AstEngine>,
    root: PathBuf,
    ignore_patterns: Vec<String>,
}

impl TextFallbackBackend {
    pub fn new(engine: Arc<AstEngine>, root: PathBuf, ignore_patterns: Vec<String>) -> Self {
        Self {
            engine,
            root,
            ignore_patterns,
        }
    }

    fn rename(&self, request: &RefactorRequest, language: Language, dry_run: bool) -> RefactorResult {
        let Some(new_name) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::TextFallback,
                dry_run,
                "rename_symbol requires a new name",
            );
        };

        // Whole-identifier match; never substrings of unrelated identifiers
        let pattern = match Regex::new(&format!(r"\b{}\b", regex::escape(&request.target))) {
            Ok(pattern) => pattern,
            Err(e) => {
                return RefactorResult::failure(
                    Provenance::TextFallback,
                    dry_run,
                    format!("invalid symbol pattern: {}", e),
                );
            }
        };

        let files = self
            .engine
            .files_of_language(&self.root, language, &self.ignore_patterns);

        let mut changes = Vec::new();
        for file in files {
            let Ok(original) = std::fs::read_to_string(&file) else {
                continue;
            };
            if !pattern.is_match(&original) {
                continue;
            }
            let new_content = pattern
                .replace_all(&original, regex::NoExpand(new_name))
                .into_owned();
            changes.push(RefactorChange::edit(
                file,
                original,
                new_content,
                format!(
                    "textual rename {} -> {} (unverified)",
                    request.target, new_name
                ),
            ));
        }

        if changes.is_empty() {
            return RefactorResult::failure(
                Provenance::TextFallback,
                dry_run,
                format!(
                    "no occurrences of '{}' under {}",
                    request.target,
                    self.root.display()
                ),
            );
        }

        RefactorResult::success(Provenance::TextFallback, dry_run, changes)
    }

    fn move_file(&self, request: &RefactorRequest, dry_run: bool) -> RefactorResult {
        let Some(destination) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::TextFallback,
                dry_run,
                "move_file requires a destination path",
            );
        };
        let source = PathBuf::from(&request.target);
        match std::fs::read_to_string(&source) {
            Ok(content) => {
                let change = RefactorChange::moved(
                    source.clone(),
                    destination,
                    content,
                    format!(
                        "move {} -> {} (references not rewritten)",
                        source.display(),
                        destination
                    ),
                );
                RefactorResult::success(Provenance::TextFallback, dry_run, vec![change])
            }
            Err(e) => RefactorResult::failure(
                Provenance::TextFallback,
                dry_run,
                format!("cannot read {}: {}", source.display(), e),
            ),
        }
    }
}

#[async_trait]
impl RefactorBackend for TextFallbackBackend {
    fn provenance(&self) -> Provenance {
        Provenance::TextFallback
    }

    fn can_handle(&self, request: &RefactorRequest, _language: Language) -> bool {
        matches!(
            request.operation,
            RefactorOp::RenameSymbol | RefactorOp::MoveFile
        )
    }

    async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        match request.operation {
            RefactorOp::RenameSymbol => self.rename(request, language, dry_run),
            RefactorOp::MoveFile => self.move_file(request, dry_run),
            _ => RefactorResult::failure(
                Provenance::TextFallback,
                dry_run,
                format!("no textual fallback for {}", request.operation),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(root: PathBuf) -> TextFallbackBackend {
        TextFallbackBackend::new(
            Arc::new(AstEngine::new(5 * 1024 * 1024).unwrap()),
            root,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_rename_matches_whole_identifiers_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.go"),
            "package main\n\nfunc process() {}\n\nfunc preprocess() {}\n\nfunc run() { process() }\n",
        )
        .unwrap();

        let request =
            RefactorRequest::new(RefactorOp::RenameSymbol, "process").with_new_value("handle");
        let result = backend(dir.path().to_path_buf())
            .execute(&request, Language::Go, true)
            .await;

        assert!(result.success);
        assert_eq!(result.tool_used, Provenance::TextFallback);
        assert!(!result.tool_used.is_verified());

        let new_content = &result.changes[0].new_content;
        assert!(new_content.contains("func handle()"));
        assert!(new_content.contains("{ handle() }"));
        // Substrings of unrelated identifiers stay untouched
        assert!(new_content.contains("func preprocess()"));
    }

    #[tokio::test]
    async fn test_rename_without_occurrences_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();

        let request =
            RefactorRequest::new(RefactorOp::RenameSymbol, "ghost").with_new_value("spirit");
        let result = backend(dir.path().to_path_buf())
            .execute(&request, Language::Go, true)
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_move_produces_single_change() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.go");
        std::fs::write(&source, "package a\n").unwrap();
        let dest = dir.path().join("b.go");

        let request = RefactorRequest::new(RefactorOp::MoveFile, source.to_str().unwrap())
            .with_new_value(dest.to_str().unwrap());
        let result = backend(dir.path().to_path_buf())
            .execute(&request, Language::Go, true)
            .await;

        assert!(result.success);
        assert_eq!(result.changes.len(), 1);
        assert!(result.changes[0].is_move());
    }
}
