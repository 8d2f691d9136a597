//! Batch configuration: assignment profile, toolchain, limits, similarity.
//!
//! Defaults reproduce the course profile this grader ships with; every
//! field can be overridden from a JSON file so the same binary serves
//! successive assignment iterations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GraderError, GraderResult};

/// Top-level configuration for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    pub profile: AssignmentProfile,
    pub toolchain: ToolchainConfig,
    pub limits: LimitsConfig,
    pub similarity: SimilarityConfig,
    /// Reference fixture reconciliation; disabled when absent.
    pub fixtures: Option<FixtureConfig>,
}

impl GraderConfig {
    /// Load a configuration overlay from a JSON file.
    pub fn from_file(path: &Path) -> GraderResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GraderError::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| GraderError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// What the assignment requires of each submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentProfile {
    /// Implementation files whose presence is reported (not a hard gate).
    pub required_files: Vec<String>,
    /// Classes that must each have a header and an implementation file.
    pub required_classes: Vec<String>,
    /// Subtree names relocated whole during flattening, never descended into.
    pub preserve_dirs: Vec<String>,
    /// The generic container the assignment builds on.
    pub container: ContainerConfig,
    /// Structural pattern-count checks (e.g. "exactly one list member").
    pub pattern_counts: Vec<PatternCountCheck>,
    /// Menu/keyword detection over name-filtered files.
    pub menu: MenuConfig,
    /// Ownership and polymorphism heuristics.
    pub smart_pointers: SmartPointerConfig,
    /// Friend operator overloads expected per class.
    pub friend_operators: Vec<FriendOperatorCheck>,
    /// Classes expected to implement destructor, copy ctor and operator=.
    pub big3_classes: Vec<String>,
    /// Sample I/O fixture files worth extra credit.
    pub sample_files: Vec<String>,
}

impl Default for AssignmentProfile {
    fn default() -> Self {
        let classes = [
            "EventTicket340",
            "Organizer",
            "Event",
            "VirtualEvent",
            "VenueEvent",
        ];
        Self {
            required_files: classes.iter().map(|c| format!("{}.cpp", c)).collect(),
            required_classes: classes.iter().map(|c| c.to_string()).collect(),
            preserve_dirs: vec!["LinkedBagDS".to_string()],
            container: ContainerConfig::default(),
            pattern_counts: vec![PatternCountCheck {
                label: "single_list".to_string(),
                file_filter: "organizer".to_string(),
                pattern: r"LinkedBag\s*<[^>]+>\s+\w+\s*;".to_string(),
                expected: 1,
            }],
            menu: MenuConfig::default(),
            smart_pointers: SmartPointerConfig::default(),
            friend_operators: vec![
                FriendOperatorCheck::new("EventTicket340", &["<<"]),
                FriendOperatorCheck::new("Organizer", &["<<", ">>"]),
                FriendOperatorCheck::new("VirtualEvent", &["<<", ">>"]),
                FriendOperatorCheck::new("VenueEvent", &["<<", ">>"]),
            ],
            big3_classes: vec![
                "EventTicket340".to_string(),
                "Organizer".to_string(),
                "VirtualEvent".to_string(),
                "VenueEvent".to_string(),
            ],
            sample_files: vec!["input01.txt".to_string(), "output01.txt".to_string()],
        }
    }
}

/// The generic container students extend (file filter is matched against
/// lowercased filenames).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: String,
    pub file_filter: String,
    /// Member functions students must implement in the container.
    pub functions: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "LinkedBag".to_string(),
            file_filter: "linkedbag".to_string(),
            functions: vec!["reverseAppendK".to_string(), "findKthItem".to_string()],
        }
    }
}

/// Count occurrences of `pattern` across files whose lowercased name
/// contains `file_filter`; matched when the count equals `expected`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCountCheck {
    pub label: String,
    pub file_filter: String,
    pub pattern: String,
    pub expected: usize,
}

/// Keyword detection over lowercased file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Lowercased filename filter; all implementation files when nothing matches.
    pub file_filter: String,
    /// Alternate spellings of the menu entry function.
    pub function_names: Vec<String>,
    pub function_label: String,
    /// One keyword pattern per menu option.
    pub options: Vec<MenuKeyword>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuKeyword {
    pub pattern: String,
    pub label: String,
}

impl MenuKeyword {
    fn new(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            file_filter: "main".to_string(),
            function_names: vec![
                "displayorganizermenu".to_string(),
                "display_organizer_menu".to_string(),
            ],
            function_label: "displayOrganizerMenu".to_string(),
            options: vec![
                MenuKeyword::new("create.*organizer", "Create organizer"),
                MenuKeyword::new("display.*information", "Display information"),
                MenuKeyword::new("modify.*password", "Modify password"),
                MenuKeyword::new("create.*event", "Create event"),
                MenuKeyword::new("display.*all.*event", "Display all events"),
                MenuKeyword::new("display.*kth.*event", "Display kth event"),
                MenuKeyword::new("modify.*event", "Modify event"),
                MenuKeyword::new("sell.*ticket", "Sell ticket"),
                MenuKeyword::new("delete.*event", "Delete event"),
            ],
        }
    }
}

/// Smart-pointer and polymorphism detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartPointerConfig {
    /// Smart-pointer type names to look for.
    pub pointer_types: Vec<String>,
    /// Factory functions that create them.
    pub factories: Vec<String>,
    /// Base class held through pointers.
    pub base_class: String,
    /// Derived classes whose presence signals runtime polymorphism.
    pub derived_classes: Vec<String>,
}

impl Default for SmartPointerConfig {
    fn default() -> Self {
        Self {
            pointer_types: vec!["shared_ptr".to_string(), "unique_ptr".to_string()],
            factories: vec!["make_shared".to_string(), "make_unique".to_string()],
            base_class: "Event".to_string(),
            derived_classes: vec!["VirtualEvent".to_string(), "VenueEvent".to_string()],
        }
    }
}

/// Operators a class must overload as friends (or free stream operators).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendOperatorCheck {
    pub class: String,
    pub operators: Vec<String>,
}

impl FriendOperatorCheck {
    fn new(class: &str, operators: &[&str]) -> Self {
        Self {
            class: class.to_string(),
            operators: operators.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Toolchain invocation: one compile-only pass over all sources, one link
/// pass over the objects, executed in the submission directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub compiler: String,
    pub std_flag: String,
    pub compile_flag: String,
    /// Appended to the submission id to name the linked artifact.
    pub executable_suffix: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            std_flag: "-std=c++11".to_string(),
            compile_flag: "-c".to_string(),
            executable_suffix: "_output".to_string(),
        }
    }
}

/// Time budgets and capture caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Overall wall-clock budget per submission, in seconds.
    pub submission_deadline_secs: u64,
    pub compile_timeout_secs: u64,
    pub link_timeout_secs: u64,
    /// Run budget; expiring here is an acceptable outcome.
    pub run_timeout_secs: u64,
    /// Captured stdout budget, in bytes.
    pub stdout_capture_bytes: usize,
    /// Captured stderr budget, in bytes.
    pub stderr_capture_bytes: usize,
    /// Per-file ceiling for inspection reads; larger files are truncated.
    pub max_scan_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            submission_deadline_secs: 300,
            compile_timeout_secs: 60,
            link_timeout_secs: 30,
            run_timeout_secs: 3,
            stdout_capture_bytes: 1000,
            stderr_capture_bytes: 500,
            max_scan_bytes: 512 * 1024,
        }
    }
}

/// Pairwise similarity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Inclusive lower bound of identical lines for flagging a pair+file.
    pub threshold: usize,
    /// File extensions compared across submissions.
    pub extensions: Vec<String>,
    /// Lowercased directory names excluded from the corpus scan.
    pub skip_dirs: Vec<String>,
    /// Lowercased filename substrings excluded from the corpus scan.
    pub skip_patterns: Vec<String>,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            extensions: vec![".cpp".to_string(), ".h".to_string()],
            skip_dirs: vec![
                "linkedbagds".to_string(),
                ".git".to_string(),
                ".vs".to_string(),
                "x64".to_string(),
                "debug".to_string(),
                "release".to_string(),
                "build".to_string(),
                "cmake-build-debug".to_string(),
                "cmake-build-release".to_string(),
                "__macosx".to_string(),
            ],
            skip_patterns: vec![
                "cmake".to_string(),
                ".cmake".to_string(),
                "cmakelist".to_string(),
            ],
        }
    }
}

/// Reference fixture files copied into submissions that lack them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Directory holding the reference copies.
    pub source_dir: PathBuf,
    /// Files to reconcile, in order.
    #[serde(default = "FixtureConfig::default_files")]
    pub files: Vec<String>,
    /// Files replaced without reporting a difference.
    #[serde(default = "FixtureConfig::default_silent")]
    pub silent: Vec<String>,
}

impl FixtureConfig {
    pub fn new(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            files: Self::default_files(),
            silent: Self::default_silent(),
        }
    }

    fn default_files() -> Vec<String> {
        vec![
            "mainProgram.cpp".to_string(),
            "testing.cpp".to_string(),
            "testing.hpp".to_string(),
            "test_cases.txt".to_string(),
        ]
    }

    fn default_silent() -> Vec<String> {
        vec!["test_cases.txt".to_string()]
    }
}
