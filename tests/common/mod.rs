//! Shared fixture builders: throwaway submission corpora in temp dirs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct Corpus {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl Corpus {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp corpus");
        let root = tmp.path().join("submissions");
        std::fs::create_dir_all(&root).expect("create corpus root");
        Self { _tmp: tmp, root }
    }

    /// Create a submission directory with the given relative files.
    pub fn submission(&self, id: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join(id);
        for (rel, content) in files {
            write_file(&dir, rel, content);
        }
        std::fs::create_dir_all(&dir).expect("create submission dir");
        dir
    }
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create parent dirs");
    std::fs::write(path, content).expect("write fixture file");
}

/// `n` distinct, comment-free C++ lines for similarity fixtures.
pub fn distinct_cpp_lines(n: usize) -> String {
    (0..n)
        .map(|i| format!("int shared_line_{} = {};", i, i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build-stage tests need a real compiler; skip cleanly without one.
pub fn have_compiler() -> bool {
    which::which("g++").is_ok()
}
