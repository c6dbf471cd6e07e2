//! Semantic refactoring backend
//!
//! Routes rename and file-move operations through a one-shot language server
//! session. The server computes edits; nothing is written here - applying is
//! the executor's job, so dry-run and apply share one result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::RefactorBackend;
use crate::infra::ast::AstEngine;
use crate::infra::lsp::{LspOperation, LspOutcome, LspServerConfig, OneShotClient};
use crate::models::lsp::{Position, WorkspaceEdit, apply_text_edits, uri_to_path};
use crate::models::refactor::{
    Provenance, RefactorChange, RefactorOp, RefactorRequest, RefactorResult,
};
use crate::models::symbol::Language;

pub struct LspBackend {
    engine: Arc<AstEngine>,
    servers: HashMap<Language, LspServerConfig>,
    root: PathBuf,
    ignore_patterns: Vec<String>,
}

impl LspBackend {
    pub fn new(
        engine: Arc<AstEngine>,
        servers: HashMap<Language, LspServerConfig>,
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Self {
        Self {
            engine,
            servers,
            root,
            ignore_patterns,
        }
    }

    /// Locate the definition of `symbol`: the file that declares it and the
    /// position of its name token.
    fn find_definition(
        &self,
        symbol: &str,
        language: Language,
        hint: Option<&str>,
    ) -> Option<(PathBuf, Position)> {
        let candidates: Vec<PathBuf> = match hint {
            Some(file) => vec![PathBuf::from(file)],
            None => self
                .engine
                .files_of_language(&self.root, language, &self.ignore_patterns),
        };

        for file in candidates {
            let parsed = self.engine.parse(&file, None);
            let Some(info) = parsed.symbols.iter().find(|s| s.name == symbol) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            if let Some(position) = name_position(&content, info.start_line, info.end_line, symbol)
            {
                return Some((file, position));
            }
        }
        None
    }

    fn edits_to_changes(
        &self,
        edit: &WorkspaceEdit,
        description: &str,
    ) -> Result<Vec<RefactorChange>, String> {
        let mut changes = Vec::new();
        let mut uris: Vec<_> = edit.all_changes().into_iter().collect();
        uris.sort_by(|a, b| a.0.cmp(&b.0));

        for (uri, edits) in uris {
            let Some(path) = uri_to_path(&uri) else {
                return Err(format!("server returned non-file uri: {}", uri));
            };
            let original = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            let new_content = apply_text_edits(&original, &edits);
            if new_content != original {
                changes.push(RefactorChange::edit(
                    path,
                    original,
                    new_content,
                    description.to_string(),
                ));
            }
        }
        Ok(changes)
    }

    async fn rename(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        let Some(new_name) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                "rename_symbol requires a new name",
            );
        };

        let Some((file, position)) =
            self.find_definition(&request.target, language, request.param_str("file"))
        else {
            return RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                format!("definition of '{}' not found under {}", request.target, self.root.display()),
            );
        };

        let Some(config) = self.servers.get(&language).cloned() else {
            return RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                format!("no language server configured for {}", language),
            );
        };
        let client = OneShotClient::new(config, language, self.root.clone());
        let outcome = client
            .run(LspOperation::Rename {
                file,
                position,
                new_name: new_name.to_string(),
            })
            .await;

        match outcome {
            Ok(LspOutcome::Edit(edit)) => {
                if edit.is_empty() {
                    return RefactorResult::failure(
                        Provenance::Lsp,
                        dry_run,
                        format!("server produced no edits renaming '{}'", request.target),
                    );
                }
                let description = format!("rename {} -> {}", request.target, new_name);
                match self.edits_to_changes(&edit, &description) {
                    Ok(changes) => RefactorResult::success(Provenance::Lsp, dry_run, changes),
                    Err(message) => RefactorResult::failure(Provenance::Lsp, dry_run, message),
                }
            }
            Ok(_) => RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                "unexpected response shape for rename",
            ),
            Err(e) => RefactorResult::failure(Provenance::Lsp, dry_run, e.to_string()),
        }
    }

    async fn move_file(&self, request: &RefactorRequest, dry_run: bool, language: Language) -> RefactorResult {
        let Some(destination) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                "move_file requires a destination path",
            );
        };
        let source = PathBuf::from(&request.target);
        let content = match std::fs::read_to_string(&source) {
            Ok(content) => content,
            Err(e) => {
                return RefactorResult::failure(
                    Provenance::Lsp,
                    dry_run,
                    format!("cannot read {}: {}", source.display(), e),
                );
            }
        };

        let Some(config) = self.servers.get(&language).cloned() else {
            return RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                format!("no language server configured for {}", language),
            );
        };
        let client = OneShotClient::new(config, language, self.root.clone());
        let outcome = client
            .run(LspOperation::WillRenameFiles {
                from: source.clone(),
                to: PathBuf::from(destination),
            })
            .await;

        let mut changes = Vec::new();
        match outcome {
            Ok(LspOutcome::Edit(edit)) => {
                let description = format!("update references for move to {}", destination);
                match self.edits_to_changes(&edit, &description) {
                    Ok(reference_changes) => changes.extend(reference_changes),
                    Err(message) => {
                        return RefactorResult::failure(Provenance::Lsp, dry_run, message);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                return RefactorResult::failure(Provenance::Lsp, dry_run, e.to_string());
            }
        }

        changes.push(RefactorChange::moved(
            source.clone(),
            destination,
            content,
            format!("move {} -> {}", source.display(), destination),
        ));
        RefactorResult::success(Provenance::Lsp, dry_run, changes)
    }
}

/// Column of the symbol's name token within its declaration lines.
///
/// Declaration spans start at the item keyword, so the name is searched line
/// by line through the declaration range. Word boundaries keep `Handler`
/// from matching inside `HandlerFactory`.
fn name_position(content: &str, start_line: u32, end_line: u32, name: &str) -> Option<Position> {
    let lines: Vec<&str> = content.lines().collect();
    let from = start_line.saturating_sub(1) as usize;
    let to = (end_line as usize).min(lines.len());

    for (index, line) in lines.iter().enumerate().take(to).skip(from) {
        let mut search_from = 0;
        while let Some(found) = line[search_from..].find(name) {
            let column = search_from + found;
            let before_ok = column == 0
                || !line[..column]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            let after = line[column + name.len()..].chars().next();
            let after_ok = !after.is_some_and(|c| c.is_alphanumeric() || c == '_');
            if before_ok && after_ok {
                return Some(Position::new(index as u32, column as u32));
            }
            search_from = column + name.len();
        }
    }
    None
}

#[async_trait]
impl RefactorBackend for LspBackend {
    fn provenance(&self) -> Provenance {
        Provenance::Lsp
    }

    fn can_handle(&self, request: &RefactorRequest, language: Language) -> bool {
        matches!(
            request.operation,
            RefactorOp::RenameSymbol | RefactorOp::MoveFile
        ) && self
            .servers
            .get(&language)
            .is_some_and(|config| config.is_installed())
    }

    async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        match request.operation {
            RefactorOp::RenameSymbol => self.rename(request, language, dry_run).await,
            RefactorOp::MoveFile => self.move_file(request, dry_run, language).await,
            _ => RefactorResult::failure(
                Provenance::Lsp,
                dry_run,
                format!("{} is not a semantic operation", request.operation),
            ),
        }
    }
}
