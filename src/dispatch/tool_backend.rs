//! External rewrite-tool backend
//!
//! Invokes a build-integrated rewrite engine (OpenRewrite via Gradle for JVM
//! code) or a structural-transform runner (jscodeshift for JS/TS) when the
//! matching build descriptor and plugin declaration are present. Tools run
//! as subprocesses with explicit argv - user-controlled strings are never
//! passed through a shell. A non-zero exit code is always a failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::RefactorBackend;
use crate::error::ToolError;
use crate::models::refactor::{
    Provenance, RefactorChange, RefactorOp, RefactorRequest, RefactorResult,
};
use crate::models::symbol::Language;

pub struct ExternalToolBackend {
    root: PathBuf,
}

impl ExternalToolBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Gradle build with the OpenRewrite plugin declared
    fn gradle_rewrite_available(&self) -> bool {
        ["build.gradle", "build.gradle.kts"]
            .iter()
            .map(|name| self.root.join(name))
            .any(|path| {
                std::fs::read_to_string(path)
                    .is_ok_and(|text| text.contains("org.openrewrite.rewrite"))
            })
    }

    /// package.json with a jscodeshift dependency
    fn jscodeshift_available(&self) -> bool {
        std::fs::read_to_string(self.root.join("package.json"))
            .is_ok_and(|text| text.contains("jscodeshift"))
    }

    async fn run_tool(
        &self,
        tool: &str,
        command: &str,
        args: &[String],
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        tracing::info!("Invoking {}: {} {:?}", tool, command, args);

        let output = match Command::new(command)
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return RefactorResult::failure(
                    Provenance::ExternalTool(tool.to_string()),
                    dry_run,
                    format!("failed to launch {}: {}", command, e),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let failure = ToolError {
                tool: tool.to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            };
            return RefactorResult::failure(
                Provenance::ExternalTool(tool.to_string()),
                dry_run,
                failure.to_string(),
            );
        }

        let changes = self.changed_files(&stdout, language, tool);
        RefactorResult::success(Provenance::ExternalTool(tool.to_string()), dry_run, changes)
    }

    /// Map the tool's reported changed-file list into changes.
    ///
    /// Both tools print one path per touched file among their output; lines
    /// are matched by extension and resolved against the repo root.
    fn changed_files(&self, stdout: &str, language: Language, tool: &str) -> Vec<RefactorChange> {
        let extensions = language.extensions();
        let mut changes = Vec::new();

        for line in stdout.lines() {
            let candidate = line
                .split_whitespace()
                .find(|token| {
                    Path::new(token)
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|ext| extensions.contains(&ext))
                })
                .map(|token| token.trim_matches(|c| c == ':' || c == ','));

            let Some(candidate) = candidate else { continue };
            let path = self.root.join(candidate);
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            changes.push(RefactorChange::edit(
                path,
                content.clone(),
                content,
                format!("rewritten by {}", tool),
            ));
        }
        changes
    }

    async fn rename_java(&self, request: &RefactorRequest, dry_run: bool) -> RefactorResult {
        let Some(new_name) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::ExternalTool("openrewrite".to_string()),
                dry_run,
                "rename_symbol requires a new name",
            );
        };

        let task = if dry_run { "rewriteDryRun" } else { "rewriteRun" };
        let args = vec![
            task.to_string(),
            "-Drewrite.activeRecipe=org.openrewrite.java.ChangeType".to_string(),
            format!("-DoldFullyQualifiedTypeName={}", request.target),
            format!("-DnewFullyQualifiedTypeName={}", new_name),
            "--console=plain".to_string(),
            "--quiet".to_string(),
        ];
        self.run_tool("openrewrite", "gradle", &args, Language::Java, dry_run)
            .await
    }

    async fn rename_ecma(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        let Some(new_name) = request.new_value.as_deref() else {
            return RefactorResult::failure(
                Provenance::ExternalTool("jscodeshift".to_string()),
                dry_run,
                "rename_symbol requires a new name",
            );
        };

        let transform = request
            .param_str("transform")
            .unwrap_or("codemods/rename-symbol.js");
        let mut args = vec![
            "jscodeshift".to_string(),
            "-t".to_string(),
            transform.to_string(),
            "--parser=tsx".to_string(),
            format!("--symbol={}", request.target),
            format!("--newName={}", new_name),
        ];
        if dry_run {
            args.push("--dry".to_string());
        }
        args.push(".".to_string());

        self.run_tool("jscodeshift", "npx", &args, language, dry_run)
            .await
    }
}

#[async_trait]
impl RefactorBackend for ExternalToolBackend {
    fn provenance(&self) -> Provenance {
        Provenance::ExternalTool("build-tool".to_string())
    }

    fn can_handle(&self, request: &RefactorRequest, language: Language) -> bool {
        if request.operation != RefactorOp::RenameSymbol {
            return false;
        }
        match language {
            Language::Java => self.gradle_rewrite_available(),
            Language::TypeScript | Language::JavaScript => self.jscodeshift_available(),
            _ => false,
        }
    }

    async fn execute(
        &self,
        request: &RefactorRequest,
        language: Language,
        dry_run: bool,
    ) -> RefactorResult {
        match language {
            Language::Java => self.rename_java(request, dry_run).await,
            Language::TypeScript | Language::JavaScript => {
                self.rename_ecma(request, language, dry_run).await
            }
            _ => RefactorResult::failure(
                self.provenance(),
                dry_run,
                format!("no external tool integration for {}", language),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_requires_plugin_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ExternalToolBackend::new(dir.path().to_path_buf());
        let request = RefactorRequest::new(RefactorOp::RenameSymbol, "Foo").with_new_value("Bar");

        // No descriptor at all
        assert!(!backend.can_handle(&request, Language::Java));

        // Descriptor without the plugin
        std::fs::write(dir.path().join("build.gradle"), "plugins { id 'java' }\n").unwrap();
        assert!(!backend.can_handle(&request, Language::Java));

        // Descriptor with the plugin
        std::fs::write(
            dir.path().join("build.gradle"),
            "plugins { id 'java'\nid 'org.openrewrite.rewrite' version '6.0.0' }\n",
        )
        .unwrap();
        assert!(backend.can_handle(&request, Language::Java));
    }

    #[test]
    fn test_jscodeshift_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ExternalToolBackend::new(dir.path().to_path_buf());
        let request = RefactorRequest::new(RefactorOp::RenameSymbol, "foo").with_new_value("bar");

        assert!(!backend.can_handle(&request, Language::TypeScript));

        std::fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies": {"jscodeshift": "^0.15.0"}}"#,
        )
        .unwrap();
        assert!(backend.can_handle(&request, Language::TypeScript));

        // Only rename goes through external tools
        let move_req = RefactorRequest::new(RefactorOp::MoveFile, "a.ts").with_new_value("b.ts");
        assert!(!backend.can_handle(&move_req, Language::TypeScript));
    }

    #[test]
    fn test_changed_files_parses_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.java"), "class A {}\n").unwrap();
        let backend = ExternalToolBackend::new(dir.path().to_path_buf());

        let stdout = "Applying recipe\nChanges have been made to a.java by:\n    some-recipe\n";
        let changes = backend.changed_files(stdout, Language::Java, "openrewrite");
        assert_eq!(changes.len(), 1);
        assert!(changes[0].file.ends_with("a.java"));
        assert!(changes[0].description.contains("openrewrite"));
    }

    #[tokio::test]
    async fn test_missing_launcher_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ExternalToolBackend::new(dir.path().to_path_buf());
        let result = backend
            .run_tool(
                "ghost-tool",
                "recast-no-such-tool",
                &[],
                Language::Java,
                true,
            )
            .await;
        assert!(!result.success);
        assert!(result.errors[0].contains("failed to launch"));
    }
}
