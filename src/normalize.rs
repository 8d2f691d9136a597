//! Submission layout normalization: flatten a nested directory tree to a
//! single working level, relocating preserved library subtrees whole and
//! skipping build/IDE artifact directories.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::source::{has_source_extension, is_ignored_dir};

/// Flattens a submission tree in repeated passes until a pass moves nothing.
/// Idempotent: running it again on an already-flat tree is a no-op.
pub struct Normalizer {
    /// Lowercased subtree names relocated whole, never descended into.
    preserve: Vec<String>,
}

impl Normalizer {
    pub fn new(preserve_dirs: &[String]) -> Self {
        Self {
            preserve: preserve_dirs.iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    fn is_preserved(&self, name: &str) -> bool {
        self.preserve.iter().any(|p| p == &name.to_lowercase())
    }

    /// Flatten `root` to its fixed point. Returns the total number of files
    /// and preserved subtrees moved. Missing or unreadable directories are
    /// skipped silently; only failed moves surface as errors.
    pub fn flatten(&self, root: &Path) -> std::io::Result<usize> {
        let mut total = 0;
        loop {
            let moved = self.flatten_pass(root)?;
            self.prune_empty_dirs(root)?;
            if moved == 0 {
                break;
            }
            total += moved;
        }
        Ok(total)
    }

    /// One relocation pass: move source files and preserved subtrees from
    /// nested directories up to the root.
    fn flatten_pass(&self, root: &Path) -> std::io::Result<usize> {
        let mut moved = 0;
        let mut stack: Vec<PathBuf> = subdirectories(root)
            .into_iter()
            .filter(|d| self.enter(d, root, &mut moved))
            .collect();

        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if path.is_dir() {
                    if self.enter(&path, root, &mut moved) {
                        stack.push(path);
                    }
                } else if has_source_extension(&name) {
                    let dst = collision_free(root, &name);
                    std::fs::rename(&path, &dst)?;
                    debug!(from = %path.display(), to = %dst.display(), "moved file");
                    moved += 1;
                }
            }
        }
        Ok(moved)
    }

    /// Decide whether to descend into `dir`. Preserved subtrees are instead
    /// relocated whole to the root when not already there; artifact
    /// directories are never entered.
    fn enter(&self, dir: &Path, root: &Path, moved: &mut usize) -> bool {
        let name = match dir.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => return false,
        };
        if is_ignored_dir(&name) {
            return false;
        }
        if self.is_preserved(&name) {
            let dst = root.join(&name);
            if dir != dst && !dst.exists() {
                if std::fs::rename(dir, &dst).is_ok() {
                    debug!(dir = %name, "relocated preserved subtree");
                    *moved += 1;
                }
            }
            return false;
        }
        true
    }

    /// Remove directories left empty by relocation, deepest first, leaving
    /// preserved and ignored names alone.
    fn prune_empty_dirs(&self, root: &Path) -> std::io::Result<()> {
        for dir in subdirectories(root) {
            let name = dir.file_name().map(|n| n.to_string_lossy().into_owned());
            let name = match name {
                Some(n) => n,
                None => continue,
            };
            if is_ignored_dir(&name) || self.is_preserved(&name) {
                continue;
            }
            self.prune_empty_dirs(&dir)?;
            if std::fs::read_dir(&dir).map(|mut e| e.next().is_none()).unwrap_or(false) {
                std::fs::remove_dir(&dir)?;
                debug!(dir = %name, "removed empty directory");
            }
        }
        Ok(())
    }
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Target path at `root` for `name`, appending `_1`, `_2`, … before the
/// extension until a free name is found. Existing files are never
/// overwritten.
fn collision_free(root: &Path, name: &str) -> PathBuf {
    let dst = root.join(name);
    if !dst.exists() {
        return dst;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    };
    let mut counter = 1;
    loop {
        let candidate = root.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
