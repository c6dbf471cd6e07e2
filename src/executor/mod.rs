//! Executor Pipeline
//!
//! The deterministic gate between an approved change plan and the working
//! tree. Nine stages in strict sequence - load, validate, approval,
//! capability, preconditions, diff, apply, audit, return - each with an
//! explicit failure exit. Structured rejections come back as `Rejected`;
//! anything unexpected is caught at the boundary and returned as `Failed`.
//! The pipeline never propagates a raw error to its caller.

pub mod audit;
pub mod diff;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::capability::CapabilityRegistry;
use crate::dispatch::Dispatcher;
use crate::error::{PipelineError, RecastError};
use crate::models::plan::{
    ChangePlan, ExecutionMode, ExecutionResult, ExecutionStatus, PLAN_ARTIFACT_TYPE,
};
use crate::models::refactor::{RefactorChange, RefactorOp, RefactorRequest, RefactorResult};
use audit::{AuditEntry, AuditSink};

const EXECUTOR_NAME: &str = "refactor-executor";

pub struct Executor {
    registry: Arc<CapabilityRegistry>,
    dispatcher: Dispatcher,
    audit: Arc<dyn AuditSink>,
    repo_root: PathBuf,
}

impl Executor {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        dispatcher: Dispatcher,
        audit: Arc<dyn AuditSink>,
        repo_root: PathBuf,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            audit,
            repo_root,
        }
    }

    /// Run the pipeline on one plan artifact.
    ///
    /// Always returns a structured result and always emits exactly one audit
    /// entry, including on rejection and failure.
    pub async fn execute(
        &self,
        artifact: &serde_json::Value,
        mode: ExecutionMode,
    ) -> ExecutionResult {
        let started = Instant::now();
        let mut log = Vec::new();

        let target = artifact
            .get("plan_id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();

        let result = match self.run_stages(artifact, mode, &mut log).await {
            Ok(diff_ids) => ExecutionResult {
                status: ExecutionStatus::Success,
                diff_ids,
                errors: Vec::new(),
                log: log.clone(),
            },
            Err(RecastError::Pipeline(e)) => {
                log.push(format!("rejected: {}", e));
                ExecutionResult::rejected(e.to_string(), log.clone())
            }
            Err(e) => {
                log.push(format!("failed: {}", e));
                ExecutionResult::failed(e.to_string(), log.clone())
            }
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            executor: EXECUTOR_NAME.to_string(),
            target,
            status: result.status,
            mode,
            diff_ids: result.diff_ids.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            error: result.errors.first().cloned(),
        };
        if let Err(e) = self.audit.record(&entry) {
            tracing::warn!("audit entry not recorded: {}", e);
        }

        result
    }

    async fn run_stages(
        &self,
        artifact: &serde_json::Value,
        mode: ExecutionMode,
        log: &mut Vec<String>,
    ) -> Result<Vec<String>, RecastError> {
        // Stage 1: load - the artifact must be meant for this executor
        let actual_type = artifact
            .get("artifact_type")
            .and_then(|v| v.as_str())
            .unwrap_or("<missing>");
        if actual_type != PLAN_ARTIFACT_TYPE {
            return Err(PipelineError::ArtifactType {
                expected: PLAN_ARTIFACT_TYPE.to_string(),
                actual: actual_type.to_string(),
            }
            .into());
        }
        log.push("load: artifact type accepted".to_string());

        // Stage 2: validate shape
        let plan: ChangePlan = serde_json::from_value(artifact.clone())
            .map_err(|e| PipelineError::ArtifactSchema(e.to_string()))?;
        validate_shape(&plan)?;
        log.push(format!(
            "validate: plan {} with {} operation(s)",
            plan.plan_id,
            plan.operations.len()
        ));

        // Stage 3: approval - draft plans are always rejected
        if !plan.status.is_executable() {
            return Err(PipelineError::ArtifactNotApproved {
                plan_id: plan.plan_id.clone(),
                status: plan.status.to_string(),
            }
            .into());
        }
        log.push(format!("approval: status {}", plan.status));

        // Stage 4: capability - enumerate every unsupported pair, not just
        // the first
        let unsupported: Vec<_> = plan
            .operations
            .iter()
            .map(|op| (op.operation, plan.language_for(op)))
            .filter(|(op, lang)| !self.registry.check(*op, *lang))
            .collect();
        if !unsupported.is_empty() {
            return Err(PipelineError::UnsupportedOperation { pairs: unsupported }.into());
        }
        log.push("capability: all operations supported".to_string());

        // Stage 5: preconditions
        let requests = self.check_preconditions(&plan)?;
        log.push("preconditions: targets resolve inside repository".to_string());

        // Stage 6: generate diff without touching disk
        let mut results: Vec<RefactorResult> = Vec::new();
        for request in &requests {
            let language = plan.language_for(request);
            let result = self.dispatcher.execute(request, language, true).await?;
            if !result.success {
                // The operation ran and reported a problem (violations,
                // missing symbol); that is an execution failure, not a plan
                // rejection
                return Err(RecastError::Refactor(format!(
                    "{} on {} failed ({}): {}",
                    request.operation,
                    request.target,
                    result.tool_used,
                    result.errors.join("; ")
                )));
            }
            log.push(format!(
                "diff: {} {} via {} ({} change(s))",
                request.operation,
                request.target,
                result.tool_used,
                result.changes.len()
            ));
            results.push(result);
        }

        let mut diff_ids = Vec::new();
        let mut sequence = 0usize;
        for result in &results {
            for change in &result.changes {
                let diff_text = diff::render(change);
                let diff_id = self.audit.store_diff(&plan.plan_id, sequence, &diff_text)?;
                diff_ids.push(diff_id);
                sequence += 1;
            }
        }

        // Stage 7: apply, reusing the exact results from stage 6 so preview
        // and apply can never diverge
        if mode == ExecutionMode::Apply {
            for result in &results {
                for change in &result.changes {
                    apply_change(change)?;
                }
            }
            log.push(format!("apply: {} diff(s) written", diff_ids.len()));
        } else {
            log.push("dry-run: no files modified".to_string());
        }

        // Stages 8 and 9 (audit entry + structured return) happen in
        // execute() so rejection paths share them
        Ok(diff_ids)
    }

    /// Stage 5 checks: path containment and move source/destination rules
    fn check_preconditions(&self, plan: &ChangePlan) -> Result<Vec<RefactorRequest>, RecastError> {
        let root = self
            .repo_root
            .canonicalize()
            .map_err(|e| PipelineError::Precondition(format!("repository root: {}", e)))?;

        let mut requests = Vec::new();
        for op in &plan.operations {
            let mut request = op.clone();

            match op.operation {
                RefactorOp::MoveFile => {
                    let source = self.resolve_existing(&root, &op.target)?;
                    let destination = op.new_value.as_deref().ok_or_else(|| {
                        PipelineError::Precondition(format!(
                            "move_file {} has no destination",
                            op.target
                        ))
                    })?;
                    let destination = self.resolve_new(&root, destination)?;
                    if destination.exists() {
                        return Err(PipelineError::Precondition(format!(
                            "destination already exists: {}",
                            destination.display()
                        ))
                        .into());
                    }
                    request.target = source.display().to_string();
                    request.new_value = Some(destination.display().to_string());
                }
                RefactorOp::ExtractInterface | RefactorOp::EnforceDependency => {
                    let target = self.resolve_existing(&root, &op.target)?;
                    request.target = target.display().to_string();
                }
                RefactorOp::RenameSymbol => {
                    // Target is a symbol; only an explicit file hint is a path
                    if let Some(file) = op.param_str("file") {
                        let file = self.resolve_existing(&root, file)?;
                        request
                            .params
                            .insert("file".to_string(), serde_json::json!(file.display().to_string()));
                    }
                }
            }
            requests.push(request);
        }
        Ok(requests)
    }

    /// Resolve a path that must already exist, after symlinks, inside root
    fn resolve_existing(&self, root: &Path, raw: &str) -> Result<PathBuf, RecastError> {
        let joined = self.join_root(root, raw);
        let resolved = joined.canonicalize().map_err(|_| {
            PipelineError::Precondition(format!("source does not exist: {}", raw))
        })?;
        if !resolved.starts_with(root) {
            return Err(PipelineError::PathEscapesRepo {
                path: raw.to_string(),
                root: root.display().to_string(),
            }
            .into());
        }
        Ok(resolved)
    }

    /// Resolve a path that may not exist yet: its parent must exist, resolve
    /// inside root, and the final component must not traverse upward.
    fn resolve_new(&self, root: &Path, raw: &str) -> Result<PathBuf, RecastError> {
        let joined = self.join_root(root, raw);
        let file_name = joined.file_name().ok_or_else(|| {
            PipelineError::Precondition(format!("invalid destination: {}", raw))
        })?;
        let parent = joined.parent().unwrap_or(root);
        let parent = parent.canonicalize().map_err(|_| {
            PipelineError::Precondition(format!("destination directory does not exist: {}", raw))
        })?;
        if !parent.starts_with(root) {
            return Err(PipelineError::PathEscapesRepo {
                path: raw.to_string(),
                root: root.display().to_string(),
            }
            .into());
        }
        Ok(parent.join(file_name))
    }

    fn join_root(&self, root: &Path, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

fn validate_shape(plan: &ChangePlan) -> Result<(), PipelineError> {
    if plan.plan_id.trim().is_empty() {
        return Err(PipelineError::ArtifactSchema("plan_id is empty".to_string()));
    }
    if plan.operations.is_empty() {
        return Err(PipelineError::ArtifactSchema(
            "plan declares no operations".to_string(),
        ));
    }
    for op in &plan.operations {
        if op.target.trim().is_empty() {
            return Err(PipelineError::ArtifactSchema(format!(
                "{} operation has an empty target",
                op.operation
            )));
        }
        if matches!(
            op.operation,
            RefactorOp::RenameSymbol | RefactorOp::MoveFile
        ) && op.new_value.as_deref().is_none_or(str::is_empty)
        {
            return Err(PipelineError::ArtifactSchema(format!(
                "{} on {} requires a new value",
                op.operation, op.target
            )));
        }
    }
    Ok(())
}

/// Write one change to disk (stage 7 only)
fn apply_change(change: &RefactorChange) -> Result<(), RecastError> {
    match &change.new_path {
        Some(destination) => {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(destination, &change.new_content)?;
            std::fs::remove_file(&change.file)?;
        }
        None => {
            if let Some(parent) = change.file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&change.file, &change.new_content)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::PlanStatus;

    #[test]
    fn test_validate_shape_rejects_empty_operations() {
        let plan = ChangePlan {
            artifact_type: PLAN_ARTIFACT_TYPE.to_string(),
            plan_id: "p1".to_string(),
            status: PlanStatus::Approved,
            language: None,
            operations: vec![],
        };
        let err = validate_shape(&plan).unwrap_err();
        assert!(err.to_string().contains("no operations"));
    }

    #[test]
    fn test_validate_shape_requires_new_value_for_rename() {
        let plan = ChangePlan {
            artifact_type: PLAN_ARTIFACT_TYPE.to_string(),
            plan_id: "p1".to_string(),
            status: PlanStatus::Approved,
            language: None,
            operations: vec![RefactorRequest::new(RefactorOp::RenameSymbol, "OldName")],
        };
        let err = validate_shape(&plan).unwrap_err();
        assert!(err.to_string().contains("requires a new value"));
    }

    #[test]
    fn test_apply_change_move() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, "content").unwrap();
        let dest = dir.path().join("nested/b.txt");

        let change = RefactorChange::moved(&source, &dest, "content", "move");
        apply_change(&change).unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "content");
    }
}
