//! Reference fixture reconciliation: make sure every submission carries the
//! official test harness files before inspection and build.
//!
//! A plain I/O collaborator with no interesting failure semantics: errors
//! degrade to a recorded action, never to a submission failure.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FixtureConfig;
use crate::types::Submission;

/// What reconciliation did to one fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixtureAction {
    /// The submission lacked the file; the reference copy was added.
    Copied { file: String },
    /// The submission's copy differed and was overwritten. The differing
    /// line count is omitted for files configured as silent.
    Replaced {
        file: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        differing_lines: Option<usize>,
    },
    Failed { file: String, error: String },
}

/// Reconcile the configured fixture files into a submission. Returns one
/// action per file that needed attention; untouched files produce nothing.
pub fn reconcile(submission: &Submission, config: &FixtureConfig) -> Vec<FixtureAction> {
    let mut actions = Vec::new();
    for file in &config.files {
        let reference = config.source_dir.join(file);
        let student = submission.root.join(file);

        let reference_bytes = match std::fs::read(&reference) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file, error = %e, "reference fixture unreadable");
                actions.push(FixtureAction::Failed {
                    file: file.clone(),
                    error: format!("reference unreadable: {}", e),
                });
                continue;
            }
        };

        if !student.exists() {
            match std::fs::copy(&reference, &student) {
                Ok(_) => {
                    debug!(submission = %submission.id, file, "fixture copied");
                    actions.push(FixtureAction::Copied { file: file.clone() });
                }
                Err(e) => actions.push(FixtureAction::Failed {
                    file: file.clone(),
                    error: e.to_string(),
                }),
            }
            continue;
        }

        let student_bytes = match std::fs::read(&student) {
            Ok(bytes) => bytes,
            Err(e) => {
                actions.push(FixtureAction::Failed {
                    file: file.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if student_bytes == reference_bytes {
            continue;
        }

        let differing_lines = if config.silent.contains(file) {
            None
        } else {
            Some(differing_line_count(&reference_bytes, &student_bytes))
        };
        match std::fs::write(&student, &reference_bytes) {
            Ok(()) => {
                debug!(submission = %submission.id, file, "fixture replaced");
                actions.push(FixtureAction::Replaced {
                    file: file.clone(),
                    differing_lines,
                });
            }
            Err(e) => actions.push(FixtureAction::Failed {
                file: file.clone(),
                error: e.to_string(),
            }),
        }
    }
    actions
}

/// Size of the symmetric difference between the two files' distinct trimmed
/// non-empty line sets, a coarse stand-in for a unified diff.
fn differing_line_count(reference: &[u8], student: &[u8]) -> usize {
    let reference = String::from_utf8_lossy(reference);
    let student = String::from_utf8_lossy(student);
    let reference_lines: HashSet<&str> = normalized(&reference).collect();
    let student_lines: HashSet<&str> = normalized(&student).collect();
    reference_lines.symmetric_difference(&student_lines).count()
}

fn normalized<'a>(content: &'a str) -> impl Iterator<Item = &'a str> {
    content.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(reference_files: &[(&str, &str)]) -> (TempDir, Submission, FixtureConfig) {
        let tmp = TempDir::new().unwrap();
        let reference_dir = tmp.path().join("testing_files");
        std::fs::create_dir_all(&reference_dir).unwrap();
        for (name, content) in reference_files {
            std::fs::write(reference_dir.join(name), content).unwrap();
        }
        let sub_dir = tmp.path().join("student");
        std::fs::create_dir_all(&sub_dir).unwrap();
        let submission = Submission::new("student", &sub_dir);
        let config = FixtureConfig::new(reference_dir);
        (tmp, submission, config)
    }

    #[test]
    fn missing_fixture_is_copied_in() {
        let (_tmp, submission, config) = setup(&[
            ("mainProgram.cpp", "int main() {}"),
            ("testing.cpp", "void test();"),
            ("testing.hpp", "#pragma once"),
            ("test_cases.txt", "1 2 3"),
        ]);
        let actions = reconcile(&submission, &config);
        assert_eq!(actions.len(), 4);
        assert!(actions.iter().all(|a| matches!(a, FixtureAction::Copied { .. })));
        assert_eq!(
            std::fs::read_to_string(submission.root.join("mainProgram.cpp")).unwrap(),
            "int main() {}"
        );
    }

    #[test]
    fn modified_fixture_is_replaced_with_difference_count() {
        let (_tmp, submission, config) = setup(&[
            ("mainProgram.cpp", "int main() {}\nint helper();"),
            ("testing.cpp", "void test();"),
            ("testing.hpp", "#pragma once"),
            ("test_cases.txt", "1 2 3"),
        ]);
        std::fs::write(
            submission.root.join("mainProgram.cpp"),
            "int main() {}\nint tampered();",
        )
        .unwrap();
        let actions = reconcile(&submission, &config);
        assert!(actions.contains(&FixtureAction::Replaced {
            file: "mainProgram.cpp".to_string(),
            differing_lines: Some(2),
        }));
        assert_eq!(
            std::fs::read_to_string(submission.root.join("mainProgram.cpp")).unwrap(),
            "int main() {}\nint helper();"
        );
    }

    #[test]
    fn silent_fixture_replacement_reports_no_difference() {
        let (_tmp, submission, config) = setup(&[
            ("mainProgram.cpp", "int main() {}"),
            ("testing.cpp", "void test();"),
            ("testing.hpp", "#pragma once"),
            ("test_cases.txt", "1 2 3"),
        ]);
        std::fs::write(submission.root.join("test_cases.txt"), "edited").unwrap();
        let actions = reconcile(&submission, &config);
        assert!(actions.contains(&FixtureAction::Replaced {
            file: "test_cases.txt".to_string(),
            differing_lines: None,
        }));
    }

    #[test]
    fn identical_fixture_is_left_untouched() {
        let (_tmp, submission, config) = setup(&[
            ("mainProgram.cpp", "int main() {}"),
            ("testing.cpp", "void test();"),
            ("testing.hpp", "#pragma once"),
            ("test_cases.txt", "1 2 3"),
        ]);
        for file in &config.files {
            std::fs::copy(config.source_dir.join(file), submission.root.join(file)).unwrap();
        }
        assert!(reconcile(&submission, &config).is_empty());
    }

    #[test]
    fn unreadable_reference_degrades_to_a_recorded_failure() {
        let (_tmp, submission, config) = setup(&[("mainProgram.cpp", "int main() {}")]);
        // testing.cpp and friends are configured but absent from the
        // reference directory.
        let actions = reconcile(&submission, &config);
        assert!(actions
            .iter()
            .any(|a| matches!(a, FixtureAction::Failed { file, .. } if file == "testing.cpp")));
    }
}
