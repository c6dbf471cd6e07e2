//! End-to-end pipeline scenarios
//!
//! Each test builds a throwaway repository, runs the executor on a plan
//! artifact, and asserts on the structured result plus the state of the
//! working tree. Language servers are configured with nonexistent binaries
//! so semantic operations deterministically fall through to the textual
//! fallback.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use recast::capability::CapabilityRegistry;
use recast::dispatch::Dispatcher;
use recast::executor::Executor;
use recast::executor::audit::{AuditSink, MemoryAuditSink};
use recast::infra::ast::AstEngine;
use recast::infra::lsp::{InstallInstructions, LspServerConfig, MemoryAction};
use recast::models::plan::{ExecutionMode, ExecutionStatus};
use recast::models::symbol::Language;

fn offline_servers() -> HashMap<Language, LspServerConfig> {
    Language::all()
        .iter()
        .map(|language| {
            (
                *language,
                LspServerConfig {
                    name: format!("{}-offline", language),
                    command: "recast-test-no-such-server".to_string(),
                    args: Vec::new(),
                    languages: vec![*language],
                    memory_limit_mb: 1024,
                    on_memory_breach: MemoryAction::Kill,
                    timeout_secs: 5,
                    init_timeout_secs: 5,
                    install: InstallInstructions {
                        macos: "not installable".to_string(),
                        linux: "not installable".to_string(),
                        windows: "not installable".to_string(),
                    },
                    initialization_options: None,
                },
            )
        })
        .collect()
}

fn executor_for(root: &Path) -> (Executor, Arc<MemoryAuditSink>) {
    let registry = Arc::new(CapabilityRegistry::bundled());
    let engine = Arc::new(AstEngine::new(5 * 1024 * 1024).unwrap());
    let dispatcher = Dispatcher::standard(
        Arc::clone(&registry),
        engine,
        offline_servers(),
        root.to_path_buf(),
        Vec::new(),
    );
    let audit = Arc::new(MemoryAuditSink::new());
    let executor = Executor::new(
        registry,
        dispatcher,
        Arc::clone(&audit) as Arc<dyn AuditSink>,
        root.to_path_buf(),
    );
    (executor, audit)
}

fn hash_tree(root: &Path) -> u64 {
    let mut entries: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    entries.sort();

    let mut hasher = DefaultHasher::new();
    for path in entries {
        path.hash(&mut hasher);
        std::fs::read(&path).unwrap_or_default().hash(&mut hasher);
    }
    hasher.finish()
}

fn move_plan(source: &str, dest: &str) -> serde_json::Value {
    serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-move-1",
        "status": "approved",
        "operations": [
            {"operation": "move_file", "target": source, "new_value": dest}
        ]
    })
}

#[tokio::test]
async fn draft_plan_is_rejected_before_any_diff() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.go"), "package a\n").unwrap();
    let (executor, audit) = executor_for(dir.path());

    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-draft",
        "status": "draft",
        "operations": [
            {"operation": "move_file", "target": "a.go", "new_value": "b.go"}
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::Apply).await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("draft"));
    assert!(result.diff_ids.is_empty());

    // No diff was generated; the only audit entry is the failure itself
    assert!(audit.diffs().is_empty());
    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ExecutionStatus::Rejected);
    assert!(entries[0].error.as_deref().unwrap().contains("draft"));

    // And the tree is untouched
    assert!(dir.path().join("a.go").exists());
    assert!(!dir.path().join("b.go").exists());
}

#[tokio::test]
async fn wrong_artifact_type_is_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let (executor, _) = executor_for(dir.path());

    let plan = serde_json::json!({
        "artifact_type": "drift_report",
        "plan_id": "plan-x",
        "status": "approved",
        "operations": []
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("refactor_plan"));
    assert!(result.errors[0].contains("drift_report"));
}

#[tokio::test]
async fn malformed_plan_is_rejected_at_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (executor, _) = executor_for(dir.path());

    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-bad",
        "status": "approved",
        "operations": [
            {"operation": "rename_symbol", "target": "OldName"}
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("requires a new value"));
}

#[tokio::test]
async fn unsupported_operations_are_all_enumerated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("A.java"), "class A {}\n").unwrap();
    std::fs::write(dir.path().join("B.java"), "class B {}\n").unwrap();
    let (executor, _) = executor_for(dir.path());

    // Java rename and move are both partial -> strictly unsupported
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-java",
        "status": "approved",
        "language": "java",
        "operations": [
            {"operation": "rename_symbol", "target": "A", "new_value": "A2"},
            {"operation": "move_file", "target": "A.java", "new_value": "C.java"}
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("rename_symbol for java"));
    assert!(result.errors[0].contains("move_file for java"));
}

#[tokio::test]
async fn dry_run_never_touches_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        "package main\n\nfunc process() {}\n\nfunc run() { process() }\n",
    )
    .unwrap();
    let before = hash_tree(dir.path());

    let (executor, audit) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-rename",
        "status": "approved",
        "operations": [
            {"operation": "rename_symbol", "target": "process", "new_value": "handle"}
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;

    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);
    assert!(!result.diff_ids.is_empty());
    assert!(!audit.diffs().is_empty());

    // Byte-identical tree after a dry run
    assert_eq!(before, hash_tree(dir.path()));
}

#[tokio::test]
async fn rename_applies_only_whole_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        "package main\n\nfunc process() {}\n\nfunc preprocess() {}\n\nfunc run() { process() }\n",
    )
    .unwrap();

    let (executor, _) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-rename-2",
        "status": "approved",
        "operations": [
            {"operation": "rename_symbol", "target": "process", "new_value": "handle"}
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::Apply).await;
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);

    let content = std::fs::read_to_string(dir.path().join("main.go")).unwrap();
    assert!(content.contains("func handle()"));
    assert!(content.contains("{ handle() }"));
    assert!(content.contains("func preprocess()"), "substring corrupted");
}

#[tokio::test]
async fn move_scenario_dry_run_then_apply_then_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/a.go"), "package a\n\nfunc A() {}\n").unwrap();

    let (executor, audit) = executor_for(dir.path());

    // Dry-run: one change describing the move, nothing on disk
    let result = executor
        .execute(&move_plan("src/a.go", "src/b.go"), ExecutionMode::DryRun)
        .await;
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);
    assert_eq!(result.diff_ids.len(), 1);
    let (_, diff) = &audit.diffs()[0];
    assert!(diff.contains("rename from"));
    assert!(diff.contains("rename to"));
    assert!(dir.path().join("src/a.go").exists());
    assert!(!dir.path().join("src/b.go").exists());

    // Apply: destination created, source removed
    let result = executor
        .execute(&move_plan("src/a.go", "src/b.go"), ExecutionMode::Apply)
        .await;
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);
    assert!(!dir.path().join("src/a.go").exists());
    let moved = std::fs::read_to_string(dir.path().join("src/b.go")).unwrap();
    assert!(moved.contains("func A()"));

    // Missing source: precondition failure, nothing created
    let result = executor
        .execute(&move_plan("src/missing.go", "src/c.go"), ExecutionMode::DryRun)
        .await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("src/missing.go"));
    assert!(!dir.path().join("src/c.go").exists());
}

#[tokio::test]
async fn move_to_existing_destination_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.go"), "package a\n").unwrap();
    std::fs::write(dir.path().join("b.go"), "package b\n").unwrap();

    let (executor, _) = executor_for(dir.path());
    let result = executor
        .execute(&move_plan("a.go", "b.go"), ExecutionMode::Apply)
        .await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.errors[0].contains("already exists"));
}

#[tokio::test]
async fn path_escaping_repo_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("victim.go"), "package victim\n").unwrap();

    let (executor, _) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-escape",
        "status": "approved",
        "operations": [
            {
                "operation": "enforce_dependency",
                "target": outside.path().join("victim.go").display().to_string(),
                "params": {"deny": ["legacy"]}
            }
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(
        result.errors[0].contains("escapes repository root"),
        "got: {}",
        result.errors[0]
    );
}

#[tokio::test]
async fn enforce_dependency_scenario_reports_forbidden_import() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("handler.go"),
        "package handler\n\nimport (\n\t\"fmt\"\n\t\"legacy/util\"\n)\n\nfunc Run() { fmt.Println(util.X) }\n",
    )
    .unwrap();

    let (executor, _) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-deps",
        "status": "approved",
        "operations": [
            {
                "operation": "enforce_dependency",
                "target": "handler.go",
                "params": {"deny": ["legacy/util"]}
            }
        ]
    });

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    // Violations surface as a failed execution naming the import and line
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.errors[0].contains("dependency violation"));
}

#[tokio::test]
async fn extract_interface_creates_new_file_only_on_apply() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("store.go"),
        "package store\n\ntype DiskStore struct{}\n\nfunc (s *DiskStore) Get(key string) string {\n\treturn \"\"\n}\n",
    )
    .unwrap();

    let (executor, _) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-iface",
        "status": "approved",
        "operations": [
            {
                "operation": "extract_interface",
                "target": "store.go",
                "new_value": "Store"
            }
        ]
    });

    // "Store" would land on store.go, which is the source; the backend
    // sidesteps the collision with a _interface suffix
    let output = dir.path().join("store_interface.go");

    let result = executor.execute(&plan, ExecutionMode::DryRun).await;
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);
    assert!(!output.exists());

    let result = executor.execute(&plan, ExecutionMode::Apply).await;
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.errors);

    let interface_text = std::fs::read_to_string(&output).unwrap();
    assert!(interface_text.contains("type Store interface {"));
    assert!(interface_text.contains("Get(key string) string"));

    // Source untouched
    let source = std::fs::read_to_string(dir.path().join("store.go")).unwrap();
    assert!(source.contains("DiskStore"));
}

#[tokio::test]
async fn repeated_dry_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.py"),
        "def process():\n    pass\n\n\ndef run():\n    process()\n",
    )
    .unwrap();

    let (executor, audit) = executor_for(dir.path());
    let plan = serde_json::json!({
        "artifact_type": "refactor_plan",
        "plan_id": "plan-det",
        "status": "approved",
        "operations": [
            {"operation": "rename_symbol", "target": "process", "new_value": "handle"}
        ]
    });

    let first = executor.execute(&plan, ExecutionMode::DryRun).await;
    let second = executor.execute(&plan, ExecutionMode::DryRun).await;

    assert_eq!(first.status, ExecutionStatus::Success);
    assert_eq!(first.status, second.status);
    assert_eq!(first.diff_ids, second.diff_ids);

    let diffs = audit.diffs();
    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0].1, diffs[1].1, "same plan, same diff text");
}
