//! Error types for the grading pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error enum for the grader library.
///
/// Only these conditions abort a batch run; everything that can go wrong
/// inside a single submission is classified as a [`FailureKind`] and
/// recorded in the report instead.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("submission corpus not found: {0}")]
    MissingCorpus(PathBuf),

    #[error("toolchain error: {0}")]
    Toolchain(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GraderResult<T> = Result<T, GraderError>;

/// Why a single submission was abandoned.
///
/// Recorded in the submission's report section; never aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Entry is an archive that was never extracted.
    NeedsExtraction,
    /// Flattening the submission tree failed.
    Normalization,
    /// The inspection pass itself failed (individual checks degrade
    /// without reaching this).
    Inspection,
    /// Compile/link/run machinery failed outside its own classification.
    Build,
    /// The overall per-submission deadline expired.
    DeadlineExpired,
    /// Anything not covered above.
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NeedsExtraction => "needs extraction",
            FailureKind::Normalization => "normalization failed",
            FailureKind::Inspection => "inspection failed",
            FailureKind::Build => "build failed",
            FailureKind::DeadlineExpired => "deadline expired",
            FailureKind::Unexpected => "unexpected error",
        }
    }
}
