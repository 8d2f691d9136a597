//! Core data model: submissions, findings, build outcomes, similarity records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;

/// One student's program directory under evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Folder name; used as the submission identifier throughout the report.
    pub id: String,
    pub root: PathBuf,
}

impl Submission {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }
}

/// A source file read for inspection. Raw text only; normalized views are
/// derived on demand and never cached across submissions.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Bare filename.
    pub name: String,
    pub raw: String,
}

/// Result of a single heuristic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Matched,
    NotMatched,
}

/// The line a check matched on, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub file: String,
    pub line: String,
}

impl Evidence {
    pub fn new(file: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: line.into(),
        }
    }
}

/// Structured result of one heuristic inspection check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub outcome: CheckOutcome,
    /// First matching line per sub-check; empty when nothing matched.
    pub evidence: Vec<Evidence>,
    /// Free-form qualifier, e.g. an observed count for count checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Finding {
    pub fn matched(check: impl Into<String>, evidence: Vec<Evidence>) -> Self {
        Self {
            check: check.into(),
            outcome: CheckOutcome::Matched,
            evidence,
            detail: None,
        }
    }

    pub fn not_matched(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            outcome: CheckOutcome::NotMatched,
            evidence: Vec::new(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_matched(&self) -> bool {
        self.outcome == CheckOutcome::Matched
    }
}

/// One `class Derived : public Base` hit in a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceMatch {
    pub derived: String,
    pub base: String,
    pub file: String,
}

/// Everything the inspection pass produced for one submission.
/// Findings are append-only during a single pass, in catalog order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionReport {
    pub findings: Vec<Finding>,
    pub inheritance: Vec<InheritanceMatch>,
}

impl InspectionReport {
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn find(&self, check: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.check == check)
    }
}

/// Classified result of the compile/link/execute sequence. Captured streams
/// are truncated to the configured byte budgets before they land here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    CompileFailure {
        diagnostics: String,
    },
    LinkFailure {
        diagnostics: String,
    },
    /// The program was still running when the budget elapsed. Expected for
    /// interactive programs blocked on input; reported as acceptable.
    RunTimeout {
        stdout: String,
        stderr: String,
    },
    RunCompleted {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    RunCrashed {
        signal: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl BuildOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            BuildOutcome::CompileFailure { .. } => "COMPILE FAILURE",
            BuildOutcome::LinkFailure { .. } => "LINK FAILURE",
            BuildOutcome::RunTimeout { .. } => "RUN TIMEOUT",
            BuildOutcome::RunCompleted { .. } => "RUN COMPLETED",
            BuildOutcome::RunCrashed { .. } => "RUN CRASHED",
        }
    }
}

/// One flagged pair of submissions sharing a filename. The pair is
/// normalized so `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityRecord {
    pub first: String,
    pub second: String,
    pub file: String,
    /// Distinct non-empty lines common to both sides after comment stripping.
    pub identical_lines: usize,
    pub total_lines_first: usize,
    pub total_lines_second: usize,
}

/// Per-submission progress through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Pending,
    Normalizing,
    Inspecting,
    Building,
    Done,
    Failed(FailureKind),
}

impl SubmissionState {
    pub fn is_failed(&self) -> bool {
        matches!(self, SubmissionState::Failed(_))
    }
}
