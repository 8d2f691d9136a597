//! Pairwise similarity detection across the submission corpus.
//!
//! The metric is the intersection of distinct non-empty lines after comment
//! stripping: cheap, tolerant of reordering, and deliberately approximate.
//! It overweights shared boilerplate and never proves plagiarism; it flags
//! pairs for a human to look at. Kept as-is, since a sequence-alignment
//! metric would change which pairs get flagged.
//!
//! The pass scans submission directories as they stand after normalization,
//! best effort: a submission whose earlier stages failed still contributes
//! whatever tree the flatten pass left behind.

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SimilarityConfig;
use crate::source::{nonempty_line_count, strip_comments};
use crate::types::{SimilarityRecord, Submission};

pub struct SimilarityDetector<'a> {
    config: &'a SimilarityConfig,
}

struct ComparisonJob {
    first: String,
    second: String,
    file: String,
    first_path: PathBuf,
    second_path: PathBuf,
}

impl<'a> SimilarityDetector<'a> {
    pub fn new(config: &'a SimilarityConfig) -> Self {
        Self { config }
    }

    /// Compare every unordered submission pair on every filename present in
    /// both, flagging pairs at or above the threshold. Output is sorted by
    /// (first, second, file) regardless of worker scheduling.
    pub fn detect(&self, submissions: &[Submission]) -> Vec<SimilarityRecord> {
        let corpora: Vec<(String, HashMap<String, PathBuf>)> = submissions
            .iter()
            .map(|s| (s.id.clone(), self.collect_files(s)))
            .collect();

        let mut jobs = Vec::new();
        for (i, (first_id, first_files)) in corpora.iter().enumerate() {
            for (second_id, second_files) in corpora.iter().skip(i + 1) {
                for (file, first_path) in first_files {
                    if let Some(second_path) = second_files.get(file) {
                        // Normalize the unordered pair so first < second.
                        let (first, second, first_path, second_path) = if first_id <= second_id {
                            (first_id, second_id, first_path, second_path)
                        } else {
                            (second_id, first_id, second_path, first_path)
                        };
                        jobs.push(ComparisonJob {
                            first: first.clone(),
                            second: second.clone(),
                            file: file.clone(),
                            first_path: first_path.clone(),
                            second_path: second_path.clone(),
                        });
                    }
                }
            }
        }
        info!(
            submissions = submissions.len(),
            comparisons = jobs.len(),
            threshold = self.config.threshold,
            "similarity pass"
        );

        let threshold = self.config.threshold;
        let mut records: Vec<SimilarityRecord> = jobs
            .par_iter()
            .filter_map(|job| compare(job, threshold))
            .collect();
        records.sort_by(|a, b| {
            (&a.first, &a.second, &a.file).cmp(&(&b.first, &b.second, &b.file))
        });
        records
    }

    /// Source files of one submission keyed by bare filename. Later walk
    /// hits win on duplicate names, mirroring a plain recursive scan.
    fn collect_files(&self, submission: &Submission) -> HashMap<String, PathBuf> {
        let mut files = HashMap::new();
        let walker = WalkDir::new(&submission.root).into_iter().filter_entry(|e| {
            !(e.file_type().is_dir() && self.skip_dir(&e.file_name().to_string_lossy()))
        });
        for entry in walker.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.skip_file(&name) {
                continue;
            }
            if self.config.extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                files.insert(name, entry.path().to_path_buf());
            }
        }
        debug!(submission = %submission.id, files = files.len(), "similarity corpus");
        files
    }

    fn skip_dir(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.config.skip_dirs.iter().any(|d| d == &lower)
    }

    fn skip_file(&self, name: &str) -> bool {
        if name.starts_with('.') || name.starts_with("._") {
            return true;
        }
        let lower = name.to_lowercase();
        self.config.skip_patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// One pair+file comparison. Unreadable files degrade to empty content and
/// therefore never flag.
fn compare(job: &ComparisonJob, threshold: usize) -> Option<SimilarityRecord> {
    let first = read_stripped(&job.first_path);
    let second = read_stripped(&job.second_path);

    let first_lines: std::collections::HashSet<&str> = crate::source::distinct_lines(&first);
    let second_lines: std::collections::HashSet<&str> = crate::source::distinct_lines(&second);
    let identical = first_lines.intersection(&second_lines).count();

    if identical < threshold {
        return None;
    }
    Some(SimilarityRecord {
        first: job.first.clone(),
        second: job.second.clone(),
        file: job.file.clone(),
        identical_lines: identical,
        total_lines_first: nonempty_line_count(&first),
        total_lines_second: nonempty_line_count(&second),
    })
}

fn read_stripped(path: &std::path::Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => strip_comments(&String::from_utf8_lossy(&bytes)),
        Err(_) => String::new(),
    }
}
