//! The batch report: a structured value tree built append-only during the
//! run and serialized only at the boundary, as plain text for the grading
//! log or as JSON for machine consumption.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;
use crate::fixtures::FixtureAction;
use crate::types::{
    BuildOutcome, CheckOutcome, InspectionReport, SimilarityRecord, SubmissionState,
};

/// Why and how a submission was abandoned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureNote {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredFile {
    pub name: String,
    pub present: bool,
}

/// Everything recorded for one submission, in pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub id: String,
    pub state: SubmissionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureNote>,
    pub required_files: Vec<RequiredFile>,
    /// Top-level directory listing after normalization.
    pub file_listing: Vec<String>,
    pub fixture_actions: Vec<FixtureAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection: Option<InspectionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOutcome>,
}

impl SubmissionReport {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SubmissionState::Pending,
            failure: None,
            required_files: Vec::new(),
            file_listing: Vec::new(),
            fixture_actions: Vec::new(),
            inspection: None,
            build: None,
        }
    }

    pub fn fail(mut self, kind: FailureKind, message: impl Into<String>) -> Self {
        self.state = SubmissionState::Failed(kind);
        self.failure = Some(FailureNote {
            kind,
            message: message.into(),
        });
        self
    }
}

/// The whole batch: per-submission sections in enumeration order, then the
/// corpus-wide similarity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub corpus: PathBuf,
    pub similarity_threshold: usize,
    pub submissions: Vec<SubmissionReport>,
    pub similarity: Vec<SimilarityRecord>,
}

impl BatchReport {
    pub fn new(corpus: PathBuf, similarity_threshold: usize) -> Self {
        Self {
            corpus,
            similarity_threshold,
            submissions: Vec::new(),
            similarity: Vec::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render the text log: one section per submission in enumeration
    /// order, then similarity grouped by pair.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);

        for submission in &self.submissions {
            push_line(&mut out, &rule);
            push_line(&mut out, &format!("Processing: {}", submission.id));
            push_line(&mut out, &rule);

            if let Some(failure) = &submission.failure {
                push_line(
                    &mut out,
                    &format!("✗ FAILED ({}): {}", failure.kind.as_str(), failure.message),
                );
            }

            if let Some(inspection) = &submission.inspection {
                push_line(&mut out, "\nINSPECTION FINDINGS");
                push_line(&mut out, &thin);
                for finding in &inspection.findings {
                    let glyph = match finding.outcome {
                        CheckOutcome::Matched => "✓",
                        CheckOutcome::NotMatched => "✗",
                    };
                    let mut line = format!("{} {}", glyph, finding.check);
                    if let Some(detail) = &finding.detail {
                        line.push_str(&format!(" [{}]", detail));
                    }
                    push_line(&mut out, &line);
                    for evidence in &finding.evidence {
                        push_line(
                            &mut out,
                            &format!("    {}: {}", evidence.file, evidence.line),
                        );
                    }
                }
                if !inspection.inheritance.is_empty() {
                    push_line(&mut out, "\nInheritance found:");
                    for hit in &inspection.inheritance {
                        push_line(
                            &mut out,
                            &format!("  {} : public {} ({})", hit.derived, hit.base, hit.file),
                        );
                    }
                }
            }

            if !submission.fixture_actions.is_empty() {
                push_line(&mut out, "\nFIXTURE RECONCILIATION");
                push_line(&mut out, &thin);
                for action in &submission.fixture_actions {
                    match action {
                        FixtureAction::Copied { file } => {
                            push_line(&mut out, &format!("  copied missing {}", file))
                        }
                        FixtureAction::Replaced {
                            file,
                            differing_lines: Some(n),
                        } => push_line(
                            &mut out,
                            &format!("  replaced modified {} ({} differing lines)", file, n),
                        ),
                        FixtureAction::Replaced {
                            file,
                            differing_lines: None,
                        } => push_line(&mut out, &format!("  replaced {}", file)),
                        FixtureAction::Failed { file, error } => {
                            push_line(&mut out, &format!("  ⚠ {}: {}", file, error))
                        }
                    }
                }
            }

            if !submission.required_files.is_empty() {
                push_line(&mut out, "\nFILE STRUCTURE");
                push_line(&mut out, &thin);
                for required in &submission.required_files {
                    let status = if required.present { "SUCCESS" } else { "FAILURE" };
                    push_line(&mut out, &format!("{}: {}", required.name, status));
                }
                if !submission.file_listing.is_empty() {
                    push_line(&mut out, "\nDirectory listing:");
                    for name in &submission.file_listing {
                        push_line(&mut out, &format!("  {}", name));
                    }
                }
            }

            if let Some(build) = &submission.build {
                push_line(&mut out, "\nCOMPILATION AND EXECUTION");
                push_line(&mut out, &thin);
                render_build(&mut out, build);
            }
            out.push('\n');
        }

        push_line(&mut out, &rule);
        push_line(&mut out, "SIMILARITY REPORT");
        push_line(&mut out, &rule);
        push_line(
            &mut out,
            &format!("Threshold: {} identical lines", self.similarity_threshold),
        );
        if self.similarity.is_empty() {
            push_line(&mut out, "No similarities found above threshold.");
        } else {
            push_line(
                &mut out,
                &format!("SIMILARITIES FOUND: {}", self.similarity.len()),
            );
            let mut current_pair: Option<(&str, &str)> = None;
            for record in &self.similarity {
                let pair = (record.first.as_str(), record.second.as_str());
                if current_pair != Some(pair) {
                    push_line(
                        &mut out,
                        &format!("\nStudents: {} <-> {}", record.first, record.second),
                    );
                    push_line(&mut out, &"-".repeat(50));
                    current_pair = Some(pair);
                }
                push_line(&mut out, &format!("  File: {}", record.file));
                push_line(
                    &mut out,
                    &format!("    Identical lines: {}", record.identical_lines),
                );
                push_line(
                    &mut out,
                    &format!(
                        "    {}: {} lines | {}: {} lines",
                        record.first,
                        record.total_lines_first,
                        record.second,
                        record.total_lines_second
                    ),
                );
            }
        }
        out
    }
}

fn render_build(out: &mut String, build: &BuildOutcome) {
    match build {
        BuildOutcome::CompileFailure { diagnostics } => {
            push_line(out, "✗ COMPILE FAILURE");
            push_block(out, diagnostics);
        }
        BuildOutcome::LinkFailure { diagnostics } => {
            push_line(out, "✗ LINK FAILURE");
            push_block(out, diagnostics);
        }
        BuildOutcome::RunTimeout { stdout, stderr } => {
            push_line(
                out,
                "✓ Executable started (timed out waiting for input - this is OK)",
            );
            push_block(out, stdout);
            push_block(out, stderr);
        }
        BuildOutcome::RunCompleted {
            exit_code,
            stdout,
            stderr,
        } => {
            push_line(out, &format!("✓ RUN COMPLETED (exit code {})", exit_code));
            push_block(out, stdout);
            push_block(out, stderr);
        }
        BuildOutcome::RunCrashed {
            signal,
            stdout,
            stderr,
        } => {
            match signal {
                Some(signal) => push_line(out, &format!("✗ RUN CRASHED (signal {})", signal)),
                None => push_line(out, "✗ RUN CRASHED"),
            }
            push_block(out, stdout);
            push_block(out, stderr);
        }
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_block(out: &mut String, text: &str) {
    for line in text.lines() {
        push_line(out, &format!("    {}", line));
    }
}
