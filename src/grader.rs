//! Batch orchestration: enumerate the corpus, drive each submission through
//! normalize → fixtures → inspect → build under its deadline, isolate
//! failures, then run the similarity pass over the whole corpus.

use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::compiler::{LinkOutcome, Toolchain};
use crate::config::GraderConfig;
use crate::deadline::Deadline;
use crate::errors::{FailureKind, GraderError, GraderResult};
use crate::executor;
use crate::fixtures;
use crate::inspect::{Inspector, LexicalInspector};
use crate::normalize::Normalizer;
use crate::report::{BatchReport, RequiredFile, SubmissionReport};
use crate::similarity::SimilarityDetector;
use crate::source::scan_sources;
use crate::types::{Submission, SubmissionState};

/// One corpus entry in enumeration order: a gradable directory or a stray
/// archive that never got extracted.
enum CorpusEntry {
    Directory(Submission),
    Archive(String),
}

pub struct Grader {
    config: GraderConfig,
    jobs: usize,
}

impl Grader {
    pub fn new(config: GraderConfig) -> Self {
        Self { config, jobs: 1 }
    }

    /// Number of submissions processed concurrently. Each worker owns its
    /// submission's directory, so toolchain invocations never collide.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run the whole batch. Only a missing or empty corpus is fatal; every
    /// per-submission problem is recorded in the report and skipped past.
    pub async fn run(&self, corpus: &Path) -> GraderResult<BatchReport> {
        let entries = enumerate_corpus(corpus)?;
        info!(corpus = %corpus.display(), submissions = entries.len(), "starting batch");

        let toolchain = match Toolchain::resolve(&self.config.toolchain) {
            Ok(toolchain) => Some(toolchain),
            Err(e) => {
                warn!(error = %e, "compiler unavailable, build stage will be skipped");
                None
            }
        };
        let toolchain = toolchain.as_ref();

        let mut report = BatchReport::new(corpus.to_path_buf(), self.config.similarity.threshold);
        let submissions: Vec<Submission> = entries
            .iter()
            .filter_map(|entry| match entry {
                CorpusEntry::Directory(submission) => Some(submission.clone()),
                CorpusEntry::Archive(_) => None,
            })
            .collect();

        report.submissions = stream::iter(entries)
            .map(|entry| async move {
                match entry {
                    CorpusEntry::Archive(name) => SubmissionReport::new(&name).fail(
                        FailureKind::NeedsExtraction,
                        "archive was never extracted",
                    ),
                    CorpusEntry::Directory(submission) => {
                        self.process(&submission, toolchain).await
                    }
                }
            })
            .buffered(self.jobs)
            .collect()
            .await;

        // The similarity pass sees every normalized directory, failed
        // submissions included.
        report.similarity = SimilarityDetector::new(&self.config.similarity).detect(&submissions);
        info!(
            flagged = report.similarity.len(),
            "batch complete"
        );
        Ok(report)
    }

    /// Drive one submission through the pipeline. Every stage failure
    /// degrades to a recorded state; nothing here aborts the batch.
    async fn process(&self, submission: &Submission, toolchain: Option<&Toolchain>) -> SubmissionReport {
        let deadline = Deadline::after(Duration::from_secs(
            self.config.limits.submission_deadline_secs,
        ));
        let mut report = SubmissionReport::new(&submission.id);
        info!(submission = %submission.id, "processing");

        report.state = SubmissionState::Normalizing;
        let normalizer = Normalizer::new(&self.config.profile.preserve_dirs);
        if let Err(e) = normalizer.flatten(&submission.root) {
            return report.fail(FailureKind::Normalization, e.to_string());
        }

        if let Some(fixture_config) = &self.config.fixtures {
            report.fixture_actions = fixtures::reconcile(submission, fixture_config);
        }

        if deadline.expired() {
            return report.fail(FailureKind::DeadlineExpired, "deadline expired after normalization");
        }

        report.state = SubmissionState::Inspecting;
        let files = scan_sources(&submission.root, self.config.limits.max_scan_bytes);
        let inspector = LexicalInspector::new(&self.config.profile);
        report.inspection = Some(inspector.inspect(&files));

        report.required_files = self
            .config
            .profile
            .required_files
            .iter()
            .map(|name| RequiredFile {
                name: name.clone(),
                present: submission.root.join(name).exists(),
            })
            .collect();
        report.file_listing = top_level_listing(&submission.root);

        if deadline.expired() {
            return report.fail(FailureKind::DeadlineExpired, "deadline expired after inspection");
        }

        report.state = SubmissionState::Building;
        if let Some(toolchain) = toolchain {
            let built = toolchain
                .compile_and_link(submission, &self.config.limits, deadline)
                .await;
            match built {
                Ok(LinkOutcome::Failed(outcome)) => report.build = Some(outcome),
                Ok(LinkOutcome::Executable(executable)) => {
                    let ran = executor::run(
                        &executable,
                        &submission.root,
                        &self.config.limits,
                        deadline,
                    )
                    .await;
                    match ran {
                        Ok(outcome) => report.build = Some(outcome),
                        Err(e) => return report.fail(FailureKind::Build, e.to_string()),
                    }
                }
                Err(e) => return report.fail(FailureKind::Build, e.to_string()),
            }
        }

        report.state = SubmissionState::Done;
        report
    }
}

/// Sorted corpus entries: one directory per submission, plus any stray
/// archives recorded for the report. Dotted entries are ignored.
fn enumerate_corpus(corpus: &Path) -> GraderResult<Vec<CorpusEntry>> {
    let entries = std::fs::read_dir(corpus)
        .map_err(|_| GraderError::MissingCorpus(corpus.to_path_buf()))?;

    let mut names: Vec<(String, bool)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let is_dir = entry.path().is_dir();
            if is_dir || name.ends_with(".zip") {
                Some((name, is_dir))
            } else {
                None
            }
        })
        .collect();
    names.sort();

    if names.is_empty() {
        return Err(GraderError::MissingCorpus(corpus.to_path_buf()));
    }
    Ok(names
        .into_iter()
        .map(|(name, is_dir)| {
            if is_dir {
                CorpusEntry::Directory(Submission::new(&name, corpus.join(&name)))
            } else {
                CorpusEntry::Archive(name)
            }
        })
        .collect())
}

fn top_level_listing(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .map(|e| {
                let mut name = e.file_name().to_string_lossy().into_owned();
                if e.path().is_dir() {
                    name.push('/');
                }
                name
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_corpus_is_fatal() {
        let result = enumerate_corpus(Path::new("/no/such/corpus"));
        assert!(matches!(result, Err(GraderError::MissingCorpus(_))));
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = enumerate_corpus(tmp.path());
        assert!(matches!(result, Err(GraderError::MissingCorpus(_))));
    }

    #[test]
    fn corpus_enumeration_sorts_and_skips_dotfiles() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("bob")).unwrap();
        std::fs::create_dir(tmp.path().join("alice")).unwrap();
        std::fs::create_dir(tmp.path().join(".hidden")).unwrap();
        std::fs::write(tmp.path().join("carol.zip"), "not really a zip").unwrap();
        std::fs::write(tmp.path().join("notes.pdf"), "").unwrap();

        let entries = enumerate_corpus(tmp.path()).unwrap();
        let names: Vec<String> = entries
            .iter()
            .map(|e| match e {
                CorpusEntry::Directory(s) => s.id.clone(),
                CorpusEntry::Archive(name) => name.clone(),
            })
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol.zip"]);
        assert!(matches!(entries[2], CorpusEntry::Archive(_)));
    }
}
