//! Build/run classification and fault isolation. These tests drive a real
//! compiler and skip cleanly when none is installed.

mod common;

use common::{have_compiler, Corpus};
use cpp_grader::config::GraderConfig;
use cpp_grader::types::{BuildOutcome, SubmissionState};
use cpp_grader::Grader;

fn fast_limits(config: &mut GraderConfig) {
    config.limits.compile_timeout_secs = 30;
    config.limits.run_timeout_secs = 2;
}

#[tokio::test]
async fn invalid_source_classifies_as_compile_failure() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    let dir = corpus.submission("frank", &[("main.cpp", "int main( { this is not C++ }")]);

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    match report.submissions[0].build.as_ref().unwrap() {
        BuildOutcome::CompileFailure { diagnostics } => {
            assert!(!diagnostics.is_empty());
        }
        other => panic!("expected compile failure, got {:?}", other),
    }
    // No object files appear on a failed compile.
    let objects: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".o"))
        .collect();
    assert!(objects.is_empty());
}

#[tokio::test]
async fn minimal_program_runs_to_completion_with_captured_output() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    corpus.submission(
        "grace",
        &[(
            "main.cpp",
            "#include <iostream>\nint main() { std::cout << \"hello grader\" << std::endl; return 0; }",
        )],
    );

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    match report.submissions[0].build.as_ref().unwrap() {
        BuildOutcome::RunCompleted {
            exit_code, stdout, ..
        } => {
            assert_eq!(*exit_code, 0);
            assert!(stdout.contains("hello grader"));
        }
        other => panic!("expected completed run, got {:?}", other),
    }
    // The linked artifact carries the submission id plus the suffix.
    assert!(corpus.root.join("grace/grace_output").exists());
}

#[tokio::test]
async fn interactive_program_times_out_acceptably() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    corpus.submission(
        "heidi",
        &[(
            "main.cpp",
            concat!(
                "#include <iostream>\n",
                "#include <string>\n",
                "int main() {\n",
                "  std::cout << \"1. Create Event\" << std::endl;\n",
                "  std::string choice;\n",
                "  std::getline(std::cin, choice);\n",
                "  return 0;\n",
                "}\n",
            ),
        )],
    );

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    // Stdin is held open without input, so the menu program blocks and the
    // timeout classifies as acceptable.
    match report.submissions[0].build.as_ref().unwrap() {
        BuildOutcome::RunTimeout { stdout, .. } => {
            assert!(stdout.contains("1. Create Event"));
        }
        other => panic!("expected run timeout, got {:?}", other),
    }
    assert_eq!(report.submissions[0].state, SubmissionState::Done);
    let text = report.render_text();
    assert!(text.contains("timed out waiting for input - this is OK"));
}

#[tokio::test]
async fn hung_compile_is_classified_and_batch_continues() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    corpus.submission("alice", &[("main.cpp", "int main() { return 0; }")]);
    corpus.submission("bob", &[("main.cpp", "int main() { return 0; }")]);
    corpus.submission("carol", &[("main.cpp", "int main() { return 0; }")]);

    // A zero compile budget elapses before any compiler can finish, so every
    // compile step classifies as a timeout instead of hanging the batch.
    let mut config = GraderConfig::default();
    config.limits.compile_timeout_secs = 0;
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    assert_eq!(report.submissions.len(), 3);
    for submission in &report.submissions {
        assert_eq!(submission.state, SubmissionState::Done, "{}", submission.id);
        match submission.build.as_ref().unwrap() {
            BuildOutcome::CompileFailure { diagnostics } => {
                assert!(diagnostics.contains("timed out"), "{}", diagnostics);
            }
            other => panic!("expected compile timeout, got {:?}", other),
        }
    }
    // Nothing got linked.
    assert!(!corpus.root.join("bob/bob_output").exists());
}

#[tokio::test]
async fn link_failure_is_classified_separately() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    // Declares but never defines a function: compiles, fails to link.
    corpus.submission(
        "ivan",
        &[(
            "main.cpp",
            "int missing();\nint main() { return missing(); }",
        )],
    );

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    assert!(matches!(
        report.submissions[0].build.as_ref().unwrap(),
        BuildOutcome::LinkFailure { .. }
    ));
}

#[tokio::test]
async fn one_broken_submission_does_not_poison_the_batch() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    let corpus = Corpus::new();
    corpus.submission(
        "alice",
        &[("main.cpp", "#include <iostream>\nint main() { std::cout << \"A\"; return 0; }")],
    );
    // Compiles, then spins forever: the run stage has to kill it.
    corpus.submission(
        "bob",
        &[("main.cpp", "int main() { for (;;) {} return 0; }")],
    );
    corpus.submission(
        "carol",
        &[("main.cpp", "#include <iostream>\nint main() { std::cout << \"C\"; return 0; }")],
    );

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    assert_eq!(report.submissions.len(), 3);
    for submission in &report.submissions {
        assert_eq!(submission.state, SubmissionState::Done, "{}", submission.id);
    }
    assert!(matches!(
        report.submissions[0].build.as_ref().unwrap(),
        BuildOutcome::RunCompleted { exit_code: 0, .. }
    ));
    assert!(matches!(
        report.submissions[1].build.as_ref().unwrap(),
        BuildOutcome::RunTimeout { .. }
    ));
    assert!(matches!(
        report.submissions[2].build.as_ref().unwrap(),
        BuildOutcome::RunCompleted { exit_code: 0, .. }
    ));
}

#[tokio::test]
async fn crashing_program_is_classified_as_crashed() {
    if !have_compiler() {
        eprintln!("skipping: g++ not available");
        return;
    }
    if !cfg!(unix) {
        return;
    }
    let corpus = Corpus::new();
    corpus.submission(
        "judy",
        &[(
            "main.cpp",
            "#include <csignal>\nint main() { raise(SIGSEGV); return 0; }",
        )],
    );

    let mut config = GraderConfig::default();
    fast_limits(&mut config);
    let report = Grader::new(config).run(&corpus.root).await.unwrap();

    match report.submissions[0].build.as_ref().unwrap() {
        BuildOutcome::RunCrashed { signal, .. } => {
            assert!(signal.is_some());
        }
        other => panic!("expected crash, got {:?}", other),
    }
}
