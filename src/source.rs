//! Source text utilities shared by the inspection and similarity passes:
//! extension classification, recursive scanning, comment stripping, and
//! normalized line views.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::types::SourceFile;

/// Extensions worth relocating during flattening and reading for inspection.
pub const SOURCE_EXTENSIONS: &[&str] = &["cpp", "h", "hpp", "c", "cc", "cxx", "txt", "md"];

const HEADER_EXTENSIONS: &[&str] = &["h", "hpp"];
const IMPLEMENTATION_EXTENSIONS: &[&str] = &["cpp", "c", "cc", "cxx"];

/// Build/IDE/VCS directories skipped entirely, matched on the lowercased name.
pub const IGNORED_DIRS: &[&str] = &[
    ".vs",
    "x64",
    "debug",
    "release",
    "build",
    "bin",
    "obj",
    "__macosx",
    ".git",
    ".vscode",
    ".idea",
    "cmake-build-debug",
    "cmake-build-release",
    ".gradle",
    "out",
    "target",
];

static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name.to_lowercase().as_str())
}

pub fn has_source_extension(name: &str) -> bool {
    extension_of(name).is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_header(name: &str) -> bool {
    extension_of(name).is_some_and(|e| HEADER_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_implementation(name: &str) -> bool {
    extension_of(name).is_some_and(|e| IMPLEMENTATION_EXTENSIONS.contains(&e.as_str()))
}

/// Read at most `cap` bytes of a file, lossily decoded. Larger files are
/// truncated rather than rejected so one oversized submission cannot stall
/// the inspection pass.
pub fn read_capped(path: &Path, cap: u64) -> std::io::Result<String> {
    let mut bytes = std::fs::read(path)?;
    if bytes.len() as u64 > cap {
        bytes.truncate(cap as usize);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Recursively collect every source-extension file under `root`, skipping
/// artifact directories. Preserved library subtrees are regular directories
/// here and are included. Unreadable entries are skipped silently.
pub fn scan_sources(root: &Path, cap: u64) -> Vec<SourceFile> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir() && is_ignored_dir(&e.file_name().to_string_lossy()))
    });
    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !has_source_extension(&name) {
            continue;
        }
        match read_capped(entry.path(), cap) {
            Ok(raw) => files.push(SourceFile {
                path: entry.path().to_path_buf(),
                name,
                raw,
            }),
            Err(_) => continue,
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

/// Remove `//` and `/* */` comments, trim every line, and drop blanks.
pub fn strip_comments(content: &str) -> String {
    let content = LINE_COMMENT_RE.replace_all(content, "");
    let content = BLOCK_COMMENT_RE.replace_all(&content, "");
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Distinct non-empty lines of already comment-stripped content.
pub fn distinct_lines(stripped: &str) -> HashSet<&str> {
    stripped.lines().filter(|l| !l.is_empty()).collect()
}

/// Non-empty line count of already comment-stripped content (with
/// repetitions, matching the report's per-side totals).
pub fn nonempty_line_count(stripped: &str) -> usize {
    stripped.lines().filter(|l| !l.is_empty()).count()
}
