//! Structural refactoring backend
//!
//! Operations answerable from the parse alone: interface extraction and
//! dependency enforcement. Preferred over every other backend because it is
//! fast and carries no process-lifecycle risk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::RefactorBackend;
use crate::infra::ast::AstEngine;
use crate::models::refactor::{
    Provenance, RefactorChange, RefactorOp, RefactorRequest, RefactorResult,
};
use crate::models::symbol::{Language, SymbolInfo, SymbolKind, Visibility};

pub struct AstBackend {
    engine: Arc<AstEngine>,
}

impl AstBackend {
    pub fn new(engine: Arc<AstEngine>) -> Self {
        Self { engine }
    }

    fn extract_interface(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        let file = Path::new(&request.target);
        let parsed = self.engine.parse(file, None);
        if !parsed.success {
            return RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!("cannot extract interface: {}", parsed.errors.join("; ")),
            );
        }

        let type_symbol = match request.param_str("symbol") {
            Some(name) => parsed.symbols.iter().find(|s| s.name == name),
            None => parsed
                .symbols
                .iter()
                .find(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Struct)),
        };
        let Some(type_symbol) = type_symbol else {
            return RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!(
                    "no extractable type found in {} (looked for {})",
                    file.display(),
                    request.param_str("symbol").unwrap_or("any class/struct")
                ),
            );
        };

        let methods: Vec<&SymbolInfo> = SymbolInfo::methods_of(&parsed.symbols, &type_symbol.name)
            .into_iter()
            .filter(|m| m.visibility == Visibility::Public)
            .collect();
        if methods.is_empty() {
            return RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!("{} has no public methods to extract", type_symbol.name),
            );
        }

        let interface_name = request
            .new_value
            .as_deref()
            .or_else(|| request.param_str("interface_name"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}Interface", type_symbol.name));

        let Some(rendered) = render_interface(language, &interface_name, &methods) else {
            return RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!("interface extraction not expressible in {}", language),
            );
        };

        let output = match request.param_str("output") {
            Some(path) => PathBuf::from(path),
            None => default_output_path(file, &interface_name, language),
        };

        let change = RefactorChange::edit(
            output,
            String::new(),
            rendered,
            format!(
                "extract interface {} from {} ({} methods)",
                interface_name,
                type_symbol.name,
                methods.len()
            ),
        );
        RefactorResult::success(Provenance::Ast, dry_run, vec![change])
    }

    fn enforce_dependency(&self, request: &RefactorRequest, dry_run: bool) -> RefactorResult {
        let file = Path::new(&request.target);
        let parsed = self.engine.parse(file, None);
        if !parsed.success {
            return RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!("cannot verify dependencies: {}", parsed.errors.join("; ")),
            );
        }

        let deny = request.param_list("deny");
        let allow = request.param_list("allow");
        let content = std::fs::read_to_string(file).unwrap_or_default();

        let mut violations = Vec::new();
        for import in &parsed.imports {
            if let Some(rule) = deny.iter().find(|rule| module_matches(&import.module, rule)) {
                violations.push(violation_change(
                    file,
                    &content,
                    format!(
                        "forbidden import \"{}\" at line {} (denied by rule \"{}\")",
                        import.module, import.line, rule
                    ),
                ));
                continue;
            }

            if !allow.is_empty()
                && !import.is_relative
                && !allow.iter().any(|rule| module_matches(&import.module, rule))
            {
                violations.push(violation_change(
                    file,
                    &content,
                    format!(
                        "import \"{}\" at line {} is not in the allow list",
                        import.module, import.line
                    ),
                ));
            }
        }

        if violations.is_empty() {
            RefactorResult::success(Provenance::Ast, dry_run, Vec::new())
        } else {
            let summary = format!(
                "{} dependency violation(s) in {}",
                violations.len(),
                file.display()
            );
            RefactorResult {
                success: false,
                changes: violations,
                errors: vec![summary],
                tool_used: Provenance::Ast,
                dry_run,
            }
        }
    }
}

fn violation_change(file: &Path, content: &str, description: String) -> RefactorChange {
    RefactorChange::edit(file, content, content, description)
}

/// Prefix match honoring each ecosystem's path separators
fn module_matches(module: &str, rule: &str) -> bool {
    module == rule
        || module.starts_with(&format!("{}/", rule))
        || module.starts_with(&format!("{}.", rule))
        || module.starts_with(&format!("{}::", rule))
}

fn default_output_path(source: &Path, interface_name: &str, language: Language) -> PathBuf {
    let ext = language.extensions().first().copied().unwrap_or("txt");
    let dir = source.parent().unwrap_or_else(|| Path::new("."));
    let candidate = dir.join(format!("{}.{}", to_snake_case(interface_name), ext));
    if candidate == source {
        // Never shadow the source file the type came from
        return dir.join(format!("{}_interface.{}", to_snake_case(interface_name), ext));
    }
    candidate
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Render an interface declaration from a type's public methods
fn render_interface(
    language: Language,
    name: &str,
    methods: &[&SymbolInfo],
) -> Option<String> {
    match language {
        Language::Go => {
            let mut out = format!("type {} interface {{\n", name);
            for method in methods {
                let params = method
                    .parameters
                    .iter()
                    .map(|p| match &p.type_annotation {
                        Some(ty) => format!("{} {}", p.name, ty),
                        None => p.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = method
                    .return_type
                    .as_deref()
                    .map(|r| format!(" {}", r))
                    .unwrap_or_default();
                out.push_str(&format!("\t{}({}){}\n", method.name, params, ret));
            }
            out.push_str("}\n");
            Some(out)
        }
        Language::Rust => {
            let mut out = format!("pub trait {} {{\n", name);
            for method in methods {
                let params = method
                    .parameters
                    .iter()
                    .filter(|p| {
                        let name = p.name.trim_start_matches('&').trim();
                        name.trim_start_matches("mut ").trim() != "self"
                    })
                    .map(|p| match &p.type_annotation {
                        Some(ty) => format!("{}: {}", p.name, ty),
                        None => p.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = method
                    .return_type
                    .as_deref()
                    .map(|r| format!(" -> {}", r))
                    .unwrap_or_default();
                let sep = if params.is_empty() { "" } else { ", " };
                out.push_str(&format!(
                    "    fn {}(&self{}{}){};\n",
                    method.name, sep, params, ret
                ));
            }
            out.push_str("}\n");
            Some(out)
        }
        Language::Python => {
            let mut out = String::from("from typing import Protocol\n\n\n");
            out.push_str(&format!("class {}(Protocol):\n", name));
            for method in methods {
                let params = method
                    .parameters
                    .iter()
                    .map(|p| match &p.type_annotation {
                        Some(ty) => format!("{}: {}", p.name, ty),
                        None => p.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = method
                    .return_type
                    .as_deref()
                    .map(|r| format!(" -> {}", r))
                    .unwrap_or_default();
                out.push_str(&format!("    def {}({}){}: ...\n", method.name, params, ret));
            }
            Some(out)
        }
        Language::TypeScript => {
            let mut out = format!("export interface {} {{\n", name);
            for method in methods {
                let params = method
                    .parameters
                    .iter()
                    .map(|p| match &p.type_annotation {
                        Some(ty) => format!("{}: {}", p.name, ty),
                        None => format!("{}: unknown", p.name),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = method.return_type.as_deref().unwrap_or("void");
                out.push_str(&format!("  {}({}): {};\n", method.name, params, ret));
            }
            out.push_str("}\n");
            Some(out)
        }
        Language::Java => {
            let mut out = format!("public interface {} {{\n", name);
            for method in methods {
                let params = method
                    .parameters
                    .iter()
                    .map(|p| match &p.type_annotation {
                        Some(ty) => format!("{} {}", ty, p.name),
                        None => format!("Object {}", p.name),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = method.return_type.as_deref().unwrap_or("void");
                out.push_str(&format!("    {} {}({});\n", ret, method.name, params));
            }
            out.push_str("}\n");
            Some(out)
        }
        Language::JavaScript | Language::Unknown => None,
    }
}

#[async_trait]
impl RefactorBackend for AstBackend {
    fn provenance(&self) -> Provenance {
        Provenance::Ast
    }

    fn can_handle(&self, request: &RefactorRequest, language: Language) -> bool {
        request.operation.is_structural() && language != Language::Unknown
    }

    async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        match request.operation {
            RefactorOp::ExtractInterface => self.extract_interface(request, language, dry_run),
            RefactorOp::EnforceDependency => self.enforce_dependency(request, dry_run),
            _ => RefactorResult::failure(
                Provenance::Ast,
                dry_run,
                format!("{} is not a structural operation", request.operation),
            ),
        }
    }
}
