//! Change-plan artifact and execution outcome models
//!
//! The plan artifact is produced and approved by external collaborators;
//! this crate only consumes it. The executor validates shape and approval
//! state before anything else happens.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::refactor::RefactorRequest;
use crate::models::symbol::Language;

/// Artifact type this executor accepts
pub const PLAN_ARTIFACT_TYPE: &str = "refactor_plan";

/// Approval state of a change plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Approved,
    Locked,
    Rejected,
}

impl PlanStatus {
    /// Only approved or locked plans may be executed
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Approved | Self::Locked)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Locked => "locked",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// An approved change plan, as stored by the artifact collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePlan {
    /// Must equal [`PLAN_ARTIFACT_TYPE`]
    pub artifact_type: String,
    pub plan_id: String,
    pub status: PlanStatus,
    /// Declared target language; absent means detect per target file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub operations: Vec<RefactorRequest>,
}

impl ChangePlan {
    /// Language for one operation: declared, or detected from its target path
    pub fn language_for(&self, request: &RefactorRequest) -> Language {
        self.language
            .unwrap_or_else(|| Language::from_path(std::path::Path::new(&request.target)))
    }
}

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    DryRun,
    Apply,
}

impl ExecutionMode {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry-run" | "dry_run" | "preview" => Ok(Self::DryRun),
            "apply" => Ok(Self::Apply),
            _ => Err(format!("Unknown mode: {} (expected dry-run or apply)", s)),
        }
    }
}

/// Final status of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Rejected,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one executor pipeline run.
///
/// Created once per invocation and never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl ExecutionResult {
    pub fn rejected(error: impl Into<String>, log: Vec<String>) -> Self {
        Self {
            status: ExecutionStatus::Rejected,
            diff_ids: Vec::new(),
            errors: vec![error.into()],
            log,
        }
    }

    pub fn failed(error: impl Into<String>, log: Vec<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            diff_ids: Vec::new(),
            errors: vec![error.into()],
            log,
        }
    }
}
