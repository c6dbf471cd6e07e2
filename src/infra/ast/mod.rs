//! AST Parsing Engine
//!
//! Tree-sitter based structural parsing. Given a file path (and optionally
//! in-memory content) the engine detects the language, runs the matching
//! grammar, and extracts symbols and imports. No side effects; per-file
//! failures are isolated in the returned `ParseResult` so batch scans never
//! abort.

pub mod extract;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tree_sitter::Parser;

use crate::infra::file_filter::{FileFilter, FileFilterConfig};
use crate::models::symbol::{Language, ParseResult};

/// Multi-language structural parser.
///
/// Parsers are stateful in tree-sitter, so each language grammar sits behind
/// its own mutex; everything else is immutable and the engine is safe to
/// share across a worker pool.
pub struct AstEngine {
    rust: Mutex<Parser>,
    python: Mutex<Parser>,
    javascript: Mutex<Parser>,
    typescript: Mutex<Parser>, // TSX grammar (superset) handles both .ts and .tsx
    go: Mutex<Parser>,
    java: Mutex<Parser>,
    max_file_size_bytes: u64,
}

impl AstEngine {
    pub fn new(max_file_size_bytes: u64) -> Result<Self, tree_sitter::LanguageError> {
        Ok(Self {
            rust: Mutex::new(Self::create_parser(tree_sitter_rust::LANGUAGE.into())?),
            python: Mutex::new(Self::create_parser(tree_sitter_python::LANGUAGE.into())?),
            javascript: Mutex::new(Self::create_parser(
                tree_sitter_javascript::LANGUAGE.into(),
            )?),
            typescript: Mutex::new(Self::create_parser(
                tree_sitter_typescript::LANGUAGE_TSX.into(),
            )?),
            go: Mutex::new(Self::create_parser(tree_sitter_go::LANGUAGE.into())?),
            java: Mutex::new(Self::create_parser(tree_sitter_java::LANGUAGE.into())?),
            max_file_size_bytes,
        })
    }

    fn create_parser(
        language: tree_sitter::Language,
    ) -> Result<Parser, tree_sitter::LanguageError> {
        let mut parser = Parser::new();
        parser.set_language(&language)?;
        Ok(parser)
    }

    fn parser_for(&self, language: Language) -> Option<&Mutex<Parser>> {
        match language {
            Language::Rust => Some(&self.rust),
            Language::Python => Some(&self.python),
            Language::JavaScript => Some(&self.javascript),
            Language::TypeScript => Some(&self.typescript),
            Language::Go => Some(&self.go),
            Language::Java => Some(&self.java),
            Language::Unknown => None,
        }
    }

    /// Languages this engine can parse
    pub fn supported_languages() -> &'static [Language] {
        Language::all()
    }

    /// Parse one file.
    ///
    /// When `content` is provided the filesystem is not touched; otherwise
    /// the file is read from disk. Unknown extensions and oversized files
    /// yield a failed `ParseResult` instead of an error.
    pub fn parse(&self, path: &Path, content: Option<&str>) -> ParseResult {
        let language = Language::from_path(path);
        if language == Language::Unknown {
            return ParseResult::failure(
                language,
                Some(path),
                format!("unsupported language: {}", path.display()),
            );
        }

        let owned;
        let source = match content {
            Some(text) => text,
            None => {
                if let Ok(meta) = std::fs::metadata(path)
                    && meta.len() > self.max_file_size_bytes
                {
                    return ParseResult::failure(
                        language,
                        Some(path),
                        format!(
                            "file too large ({}MB > {}MB limit): {}",
                            meta.len() / 1024 / 1024,
                            self.max_file_size_bytes / 1024 / 1024,
                            path.display()
                        ),
                    );
                }
                match std::fs::read_to_string(path) {
                    Ok(text) => {
                        owned = text;
                        &owned
                    }
                    Err(e) => {
                        return ParseResult::failure(
                            language,
                            Some(path),
                            format!("cannot read {}: {}", path.display(), e),
                        );
                    }
                }
            }
        };

        if source.len() as u64 > self.max_file_size_bytes {
            return ParseResult::failure(
                language,
                Some(path),
                format!(
                    "file too large ({}MB > {}MB limit): {}",
                    source.len() as u64 / 1024 / 1024,
                    self.max_file_size_bytes / 1024 / 1024,
                    path.display()
                ),
            );
        }

        self.parse_source(language, path, source)
    }

    fn parse_source(&self, language: Language, path: &Path, source: &str) -> ParseResult {
        let parser_mutex = match self.parser_for(language) {
            Some(p) => p,
            None => {
                return ParseResult::failure(language, Some(path), "unsupported language");
            }
        };

        let tree = {
            let mut parser = match parser_mutex.lock() {
                Ok(p) => p,
                Err(_) => {
                    return ParseResult::failure(language, Some(path), "parser lock poisoned");
                }
            };
            parser.reset();
            parser.parse(source, None)
        };

        let Some(tree) = tree else {
            return ParseResult::failure(language, Some(path), "parser produced no tree");
        };

        let (symbols, imports) = extract::extract(language, tree.root_node(), source);

        let mut errors = Vec::new();
        let success = if tree.root_node().has_error() {
            errors.push(format!("syntax errors in {}", path.display()));
            false
        } else {
            true
        };

        ParseResult {
            success,
            symbols,
            imports,
            errors,
            language,
            file_path: Some(path.to_path_buf()),
        }
    }

    /// Parse every supported file under `root`, honoring ignore patterns.
    ///
    /// One `ParseResult` per file; a failure in one file never aborts the
    /// rest of the batch.
    pub fn parse_batch(&self, root: &Path, ignore_patterns: &[String]) -> Vec<ParseResult> {
        let filter = FileFilter::new(FileFilterConfig {
            root: root.to_path_buf(),
            respect_gitignore: true,
            ignore_patterns: ignore_patterns.to_vec(),
        });

        let extensions: Vec<&str> = Language::all()
            .iter()
            .flat_map(|l| l.extensions().iter().copied())
            .collect();

        filter
            .discover_files(&extensions)
            .iter()
            .map(|file| self.parse(file, None))
            .collect()
    }

    /// Files a rename might touch: all files of `language` under `root`
    pub fn files_of_language(
        &self,
        root: &Path,
        language: Language,
        ignore_patterns: &[String],
    ) -> Vec<PathBuf> {
        let filter = FileFilter::new(FileFilterConfig {
            root: root.to_path_buf(),
            respect_gitignore: true,
            ignore_patterns: ignore_patterns.to_vec(),
        });
        filter.discover_files(language.extensions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::symbol::{SymbolKind, Visibility};

    fn engine() -> AstEngine {
        AstEngine::new(5 * 1024 * 1024).unwrap()
    }

    #[test]
    fn test_unknown_extension_fails_without_panic() {
        let result = engine().parse(Path::new("notes.txt"), Some("hello"));
        assert!(!result.success);
        assert_eq!(result.language, Language::Unknown);
        assert!(result.errors[0].contains("unsupported language"));
    }

    #[test]
    fn test_oversized_content_skipped() {
        let small = AstEngine::new(16).unwrap();
        let result = small.parse(Path::new("big.rs"), Some("fn main() { /* padding */ }"));
        assert!(!result.success);
        assert!(result.errors[0].contains("too large"));
    }

    #[test]
    fn test_rust_symbols_and_imports() {
        let source = r#"
use std::collections::HashMap;
use crate::models::{Plan, Status};

/// A worker.
pub struct Worker {
    pub id: u64,
}

impl Worker {
    pub fn run(&self, task: &str) -> bool {
        true
    }

    fn internal(&self) {}
}

pub trait Runnable {
    fn start(&self);
}

pub fn helper(count: usize) -> usize {
    count + 1
}

const LIMIT: u32 = 10;
"#;
        let result = engine().parse(Path::new("worker.rs"), Some(source));
        assert!(result.success, "errors: {:?}", result.errors);

        let strukt = result.find_symbol("Worker").unwrap();
        assert_eq!(strukt.kind, SymbolKind::Struct);
        assert_eq!(strukt.visibility, Visibility::Public);
        assert!(strukt.doc.as_deref().unwrap_or("").contains("A worker"));

        let run = result
            .symbols
            .iter()
            .find(|s| s.name == "run")
            .expect("impl method extracted");
        assert_eq!(run.kind, SymbolKind::Method);
        assert_eq!(run.parent_name.as_deref(), Some("Worker"));
        assert_eq!(run.visibility, Visibility::Public);
        assert_eq!(run.return_type.as_deref(), Some("bool"));

        let internal = result.symbols.iter().find(|s| s.name == "internal").unwrap();
        assert_eq!(internal.visibility, Visibility::Private);

        let tr = result.find_symbol("Runnable").unwrap();
        assert_eq!(tr.kind, SymbolKind::Trait);

        let helper = result.find_symbol("helper").unwrap();
        assert_eq!(helper.kind, SymbolKind::Function);
        assert_eq!(helper.parameters.len(), 1);
        assert_eq!(helper.parameters[0].name, "count");

        assert_eq!(result.find_symbol("LIMIT").unwrap().kind, SymbolKind::Constant);

        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].module, "std::collections::HashMap");
        let grouped = &result.imports[1];
        assert_eq!(grouped.module, "crate::models");
        assert_eq!(grouped.names, vec!["Plan".to_string(), "Status".to_string()]);
    }

    #[test]
    fn test_python_symbols_and_imports() {
        let source = r#"
import os
from . import sibling
from typing import List, Optional
from legacy.util import helper as h

class UserService:
    """Manages users."""

    def get_user(self, user_id: int) -> str:
        return "u"

    def _private_helper(self):
        pass

def top_level(arg, *args, **kwargs):
    pass
"#;
        let result = engine().parse(Path::new("service.py"), Some(source));
        assert!(result.success, "errors: {:?}", result.errors);

        let class = result.find_symbol("UserService").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        assert!(class.doc.as_deref().unwrap().contains("Manages users"));

        let method = result.symbols.iter().find(|s| s.name == "get_user").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent_name.as_deref(), Some("UserService"));
        assert_eq!(method.return_type.as_deref(), Some("str"));

        let private = result
            .symbols
            .iter()
            .find(|s| s.name == "_private_helper")
            .unwrap();
        assert_eq!(private.visibility, Visibility::Private);

        let func = result.find_symbol("top_level").unwrap();
        assert!(func.parameters.iter().any(|p| p.variadic));

        assert_eq!(result.imports.len(), 4);
        assert_eq!(result.imports[0].module, "os");
        assert!(result.imports[1].is_relative);
        let typing = &result.imports[2];
        assert_eq!(typing.module, "typing");
        assert_eq!(typing.names, vec!["List".to_string(), "Optional".to_string()]);
        let aliased = &result.imports[3];
        assert_eq!(aliased.module, "legacy.util");
        assert_eq!(aliased.alias.as_deref(), Some("h"));
    }

    #[test]
    fn test_go_symbols_and_imports() {
        let source = r#"
package server

import (
    "fmt"
    legacyutil "legacy/util"
)

type Handler struct {
    Name string
}

type Store interface {
    Get(key string) string
}

func (h *Handler) Serve(port int) error {
    return nil
}

func NewHandler() *Handler {
    return &Handler{}
}

func unexported() {}
"#;
        let result = engine().parse(Path::new("server.go"), Some(source));
        assert!(result.success, "errors: {:?}", result.errors);

        let handler = result.find_symbol("Handler").unwrap();
        assert_eq!(handler.kind, SymbolKind::Struct);
        assert_eq!(handler.visibility, Visibility::Public);

        let iface = result.find_symbol("Store").unwrap();
        assert_eq!(iface.kind, SymbolKind::Interface);

        let serve = result.symbols.iter().find(|s| s.name == "Serve").unwrap();
        assert_eq!(serve.kind, SymbolKind::Method);
        assert_eq!(serve.parent_name.as_deref(), Some("Handler"));

        let unexported = result.find_symbol("unexported").unwrap();
        assert_eq!(unexported.visibility, Visibility::Package);

        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].module, "fmt");
        assert_eq!(result.imports[1].module, "legacy/util");
        assert_eq!(result.imports[1].alias.as_deref(), Some("legacyutil"));
    }

    #[test]
    fn test_typescript_symbols_and_imports() {
        let source = r#"
import { useState } from "react";
import * as fs from "fs";
import "./side-effect";

export interface Config {
    name: string;
}

export class Service {
    private cache: Map<string, string>;

    fetchAll(): string[] {
        return [];
    }
}

export function create(config: Config): Service {
    return new Service();
}

type Alias = string;

export enum Mode {
    Fast,
    Slow,
}
"#;
        let result = engine().parse(Path::new("service.ts"), Some(source));
        assert!(result.success, "errors: {:?}", result.errors);

        let iface = result.find_symbol("Config").unwrap();
        assert_eq!(iface.kind, SymbolKind::Interface);
        assert_eq!(iface.visibility, Visibility::Public);

        let class = result.find_symbol("Service").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);

        let method = result.symbols.iter().find(|s| s.name == "fetchAll").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent_name.as_deref(), Some("Service"));

        let alias = result.find_symbol("Alias").unwrap();
        assert_eq!(alias.kind, SymbolKind::TypeAlias);
        assert_eq!(alias.visibility, Visibility::Internal);

        assert_eq!(result.imports.len(), 3);
        assert_eq!(result.imports[0].module, "react");
        assert_eq!(result.imports[0].names, vec!["useState".to_string()]);
        assert!(result.imports[1].is_wildcard);
        assert_eq!(result.imports[1].alias.as_deref(), Some("fs"));
        assert!(result.imports[2].is_relative);
    }

    #[test]
    fn test_java_symbols_and_imports() {
        let source = r#"
package com.example;

import java.util.List;
import java.util.*;

public class OrderService {
    private List<String> orders;

    public void addOrder(String order) {
    }

    protected int count() {
        return 0;
    }
}

interface Repository {
    void save(String entity);
}
"#;
        let result = engine().parse(Path::new("OrderService.java"), Some(source));
        assert!(result.success, "errors: {:?}", result.errors);

        let class = result.find_symbol("OrderService").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.visibility, Visibility::Public);

        let add = result.symbols.iter().find(|s| s.name == "addOrder").unwrap();
        assert_eq!(add.kind, SymbolKind::Method);
        assert_eq!(add.parent_name.as_deref(), Some("OrderService"));

        let count = result.symbols.iter().find(|s| s.name == "count").unwrap();
        assert_eq!(count.visibility, Visibility::Protected);

        let field = result.symbols.iter().find(|s| s.name == "orders").unwrap();
        assert_eq!(field.kind, SymbolKind::Field);
        assert_eq!(field.visibility, Visibility::Private);

        let repo = result.find_symbol("Repository").unwrap();
        assert_eq!(repo.kind, SymbolKind::Interface);
        assert_eq!(repo.visibility, Visibility::Package);

        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].module, "java.util.List");
        assert!(result.imports[1].is_wildcard);
        assert_eq!(result.imports[1].module, "java.util");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "pub fn alpha() {}\npub fn beta() {}\n";
        let e = engine();
        let first = e.parse(Path::new("det.rs"), Some(source));
        let second = e.parse(Path::new("det.rs"), Some(source));
        assert_eq!(first, second);
    }

    #[test]
    fn test_syntax_error_marks_partial() {
        let source = "fn broken( {\n";
        let result = engine().parse(Path::new("broken.rs"), Some(source));
        assert!(!result.success);
        assert!(result.errors[0].contains("syntax errors"));
    }

    #[test]
    fn test_batch_isolation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.go"), "package a\n\nfunc Ok() {}\n").unwrap();
        std::fs::write(dir.path().join("bad.go"), "package a\n\nfunc Broken( {\n").unwrap();

        let results = engine().parse_batch(dir.path(), &[]);
        assert_eq!(results.len(), 2);
        let good = results
            .iter()
            .find(|r| r.file_path.as_ref().unwrap().ends_with("good.go"))
            .unwrap();
        assert!(good.success);
        let bad = results
            .iter()
            .find(|r| r.file_path.as_ref().unwrap().ends_with("bad.go"))
            .unwrap();
        assert!(!bad.success);
    }
}
