//! Heuristic inspection of submission source text.
//!
//! Every check here is lexical: pattern search over raw file contents, no
//! parsing, no compilation. That is a deliberate accuracy/cost tradeoff, so
//! the whole battery sits behind the [`Inspector`] trait; a stricter
//! parser-based engine could be swapped in without touching the orchestrator
//! or the report. Checks are independent and side-effect-free, bounded by the
//! per-file read cap applied when files are scanned, and degrade to
//! `NotMatched` when nothing qualifies.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::config::AssignmentProfile;
use crate::source::{is_header, is_implementation};
use crate::types::{Evidence, Finding, InheritanceMatch, InspectionReport, SourceFile};

static INHERITANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+(\w+)\s*:\s*public\s+(\w+)").unwrap()
});

/// The seam between the orchestrator and whatever judges source text.
pub trait Inspector {
    fn inspect(&self, files: &[SourceFile]) -> InspectionReport;
}

/// The default lexical engine: the full check catalog, driven by the
/// assignment profile.
pub struct LexicalInspector<'a> {
    profile: &'a AssignmentProfile,
}

impl<'a> LexicalInspector<'a> {
    pub fn new(profile: &'a AssignmentProfile) -> Self {
        Self { profile }
    }
}

impl Inspector for LexicalInspector<'_> {
    fn inspect(&self, files: &[SourceFile]) -> InspectionReport {
        let mut report = InspectionReport::default();
        self.check_class_files(files, &mut report);
        self.check_inheritance(files, &mut report);
        self.check_container_functions(files, &mut report);
        self.check_function_usage(files, &mut report);
        self.check_pattern_counts(files, &mut report);
        self.check_menu(files, &mut report);
        self.check_smart_pointers(files, &mut report);
        self.check_friend_operators(files, &mut report);
        self.check_big3(files, &mut report);
        self.check_container_assignment(files, &mut report);
        self.check_sample_files(files, &mut report);
        report
    }
}

impl LexicalInspector<'_> {
    /// Check 1: each required class needs a header and an implementation
    /// file whose name starts with the class name.
    fn check_class_files(&self, files: &[SourceFile], report: &mut InspectionReport) {
        for class in &self.profile.required_classes {
            let prefix = class.to_lowercase();
            let header = files
                .iter()
                .find(|f| is_header(&f.name) && f.name.to_lowercase().starts_with(&prefix));
            let implementation = files
                .iter()
                .find(|f| is_implementation(&f.name) && f.name.to_lowercase().starts_with(&prefix));

            let check = format!("class_files.{}", class);
            let finding = match (header, implementation) {
                (Some(h), Some(i)) => Finding::matched(
                    check,
                    vec![
                        Evidence::new(h.name.clone(), "header file"),
                        Evidence::new(i.name.clone(), "implementation file"),
                    ],
                ),
                (Some(h), None) => Finding::not_matched(check)
                    .with_detail(format!("header only ({})", h.name)),
                (None, Some(i)) => Finding::not_matched(check)
                    .with_detail(format!("implementation only ({})", i.name)),
                (None, None) => Finding::not_matched(check),
            };
            report.push(finding);
        }
    }

    /// Check 2: `class Derived : public Base` in header-like files. Unlike
    /// the rest of the catalog, every hit is reported.
    fn check_inheritance(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let mut evidence = Vec::new();
        for file in files.iter().filter(|f| is_header(&f.name)) {
            for line in file.raw.lines() {
                if let Some(caps) = INHERITANCE_RE.captures(line) {
                    report.inheritance.push(InheritanceMatch {
                        derived: caps[1].to_string(),
                        base: caps[2].to_string(),
                        file: file.name.clone(),
                    });
                    if evidence.is_empty() {
                        evidence.push(Evidence::new(file.name.clone(), line.trim()));
                    }
                }
            }
        }
        let finding = if report.inheritance.is_empty() {
            Finding::not_matched("inheritance")
        } else {
            Finding::matched("inheritance", evidence)
                .with_detail(format!("{} instance(s)", report.inheritance.len()))
        };
        report.push(finding);
    }

    /// Check 3: required container functions present as literal substrings
    /// in container-named files.
    fn check_container_functions(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let container = &self.profile.container;
        let selected = filter_by_name(files, &container.file_filter);
        for function in &container.functions {
            let check = format!("container_fn.{}", function);
            match first_line(&selected, |line| line.contains(function.as_str())) {
                Some(evidence) => report.push(Finding::matched(check, vec![evidence])),
                None => report.push(Finding::not_matched(check)),
            }
        }
    }

    /// Check 4: call-site heuristic. The function name followed by an
    /// opening parenthesis in implementation files. Headers are not
    /// consulted, so bare declarations do not count.
    fn check_function_usage(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let implementations: Vec<&SourceFile> =
            files.iter().filter(|f| is_implementation(&f.name)).collect();
        for function in &self.profile.container.functions {
            let check = format!("fn_usage.{}", function);
            let pattern = format!(r"\b{}\s*\(", regex::escape(function));
            report.push(regex_finding(check, &pattern, &implementations));
        }
    }

    /// Check 5: occurrence counts of configured structural patterns, e.g.
    /// "exactly one LinkedBag member" for the single-list design rule.
    fn check_pattern_counts(&self, files: &[SourceFile], report: &mut InspectionReport) {
        for check_config in &self.profile.pattern_counts {
            let check = format!("pattern_count.{}", check_config.label);
            let re = match compile(&check_config.pattern) {
                Some(re) => re,
                None => {
                    report.push(Finding::not_matched(check).with_detail("invalid pattern"));
                    continue;
                }
            };
            let selected = filter_by_name(files, &check_config.file_filter);
            let mut count = 0;
            let mut evidence = Vec::new();
            for file in &selected {
                for line in file.raw.lines() {
                    if re.is_match(line) {
                        count += 1;
                        if evidence.is_empty() {
                            evidence.push(Evidence::new(file.name.clone(), line.trim()));
                        }
                    }
                }
            }
            let detail = format!("found {}, expected {}", count, check_config.expected);
            let finding = if count == check_config.expected {
                Finding::matched(check, evidence)
            } else {
                Finding::not_matched(check)
            };
            report.push(finding.with_detail(detail));
        }
    }

    /// Check 6: keyword detection on lowercased content of name-filtered
    /// files, falling back to all implementation files when none match.
    fn check_menu(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let menu = &self.profile.menu;
        let mut selected = filter_by_name(files, &menu.file_filter);
        if selected.is_empty() {
            selected = files.iter().filter(|f| is_implementation(&f.name)).collect();
        }

        let check = format!("menu.{}", menu.function_label);
        let hit = first_line(&selected, |line| {
            let lower = line.to_lowercase();
            menu.function_names.iter().any(|n| lower.contains(n.as_str()))
        });
        report.push(match hit {
            Some(evidence) => Finding::matched(check, vec![evidence]),
            None => Finding::not_matched(check),
        });

        for option in &menu.options {
            let check = format!("menu.{}", option.label);
            let re = match compile(&option.pattern) {
                Some(re) => re,
                None => {
                    report.push(Finding::not_matched(check).with_detail("invalid pattern"));
                    continue;
                }
            };
            let hit = first_line(&selected, |line| re.is_match(&line.to_lowercase()));
            report.push(match hit {
                Some(evidence) => Finding::matched(check, vec![evidence]),
                None => Finding::not_matched(check),
            });
        }
    }

    /// Check 7: ownership and polymorphism heuristics. Container of
    /// pointers, smart-pointer types, factory calls, and smart-pointer-of-
    /// base co-occurring with derived type names.
    fn check_smart_pointers(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let config = &self.profile.smart_pointers;
        let all: Vec<&SourceFile> = files.iter().collect();
        let pointer_alts = config
            .pointer_types
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        let container_pattern = format!(
            r"{}\s*<[^>]*(?:\*|{})",
            regex::escape(&self.profile.container.name),
            pointer_alts
        );
        report.push(regex_finding(
            "smart_ptr.container_of_pointer",
            &container_pattern,
            &all,
        ));

        let hit = first_line(&all, |line| {
            config.pointer_types.iter().any(|t| line.contains(t.as_str()))
        });
        report.push(match hit {
            Some(evidence) => Finding::matched("smart_ptr.types", vec![evidence]),
            None => Finding::not_matched("smart_ptr.types"),
        });

        let hit = first_line(&all, |line| {
            config.factories.iter().any(|f| line.contains(f.as_str()))
        });
        report.push(match hit {
            Some(evidence) => Finding::matched("smart_ptr.factories", vec![evidence]),
            None => Finding::not_matched("smart_ptr.factories"),
        });

        // Polymorphism: a smart pointer holding the base class somewhere,
        // plus any derived type name in play.
        let base_pattern = format!(
            r"(?:{})\s*<\s*(?:std::)?\s*{}\b",
            pointer_alts,
            regex::escape(&config.base_class)
        );
        let base_hit = compile(&base_pattern).and_then(|re| {
            first_line(&all, |line| re.is_match(line))
        });
        let derived_hit = first_line(&all, |line| {
            config.derived_classes.iter().any(|d| line.contains(d.as_str()))
        });
        let finding = match (base_hit, derived_hit) {
            (Some(base), Some(derived)) => {
                Finding::matched("smart_ptr.polymorphism", vec![base, derived])
            }
            (Some(_), None) => Finding::not_matched("smart_ptr.polymorphism")
                .with_detail("base pointer found, no derived types"),
            _ => Finding::not_matched("smart_ptr.polymorphism"),
        };
        report.push(finding);
    }

    /// Check 8: friend operator overloads. A hit is a friend declaration, an
    /// operator definition mentioning the class in its parameter list, or a
    /// stream insertion/extraction signature, in files named after the class.
    fn check_friend_operators(&self, files: &[SourceFile], report: &mut InspectionReport) {
        for check_config in &self.profile.friend_operators {
            let selected = filter_by_name(files, &check_config.class.to_lowercase());
            for op in &check_config.operators {
                let check = format!("friend_op.{}{}", check_config.class, op);
                let op_escaped = regex::escape(op);
                let mut patterns = vec![
                    format!(r"friend\b.*operator\s*{}", op_escaped),
                    format!(
                        r"operator\s*{}\s*\([^)]*\b{}\b",
                        op_escaped,
                        regex::escape(&check_config.class)
                    ),
                ];
                match op.as_str() {
                    "<<" => patterns.push(r"ostream\s*&\s*operator\s*<<".to_string()),
                    ">>" => patterns.push(r"istream\s*&\s*operator\s*>>".to_string()),
                    _ => {}
                }
                let compiled: Vec<Regex> =
                    patterns.iter().filter_map(|p| compile(p)).collect();
                let hit = first_line(&selected, |line| compiled.iter().any(|re| re.is_match(line)));
                report.push(match hit {
                    Some(evidence) => Finding::matched(check, vec![evidence]),
                    None => Finding::not_matched(check),
                });
            }
        }
    }

    /// Check 9: the Big 3 (destructor, copy constructor, copy assignment)
    /// per class, in files whose name contains the class name.
    fn check_big3(&self, files: &[SourceFile], report: &mut InspectionReport) {
        for class in &self.profile.big3_classes {
            let selected = filter_by_name(files, &class.to_lowercase());
            let escaped = regex::escape(class);
            let members = [
                ("destructor", format!(r"~\s*{}\s*\(", escaped)),
                (
                    "copy_constructor",
                    format!(r"\b{}\s*\(\s*(?:const\s+)?{}\s*&", escaped, escaped),
                ),
                (
                    "copy_assignment",
                    format!(r"operator\s*=\s*\(\s*(?:const\s+)?{}\s*&", escaped),
                ),
            ];
            for (member, pattern) in members {
                let check = format!("big3.{}.{}", class, member);
                report.push(regex_finding(check, &pattern, &selected));
            }
        }
    }

    /// Check 10: assignment operator on the generic container. Prototype in
    /// its header, qualified definition in its implementation file. The
    /// report shows both findings so prototype-only and definition-only fall
    /// out naturally.
    fn check_container_assignment(&self, files: &[SourceFile], report: &mut InspectionReport) {
        let container = &self.profile.container;
        let named = filter_by_name(files, &container.file_filter);
        let headers: Vec<&SourceFile> = named
            .iter()
            .copied()
            .filter(|f| is_header(&f.name))
            .collect();
        let implementations: Vec<&SourceFile> = named
            .iter()
            .copied()
            .filter(|f| is_implementation(&f.name))
            .collect();

        report.push(regex_finding(
            "container_assign.prototype",
            r"operator\s*=\s*\(",
            &headers,
        ));
        let definition_pattern = format!(
            r"{}\s*<[^>]*>\s*::\s*operator\s*=",
            regex::escape(&container.name)
        );
        report.push(regex_finding(
            "container_assign.definition",
            &definition_pattern,
            &implementations,
        ));
    }

    /// Check 11: sample I/O fixtures. The configured names, plus any file
    /// whose name suggests a test fixture.
    fn check_sample_files(&self, files: &[SourceFile], report: &mut InspectionReport) {
        for name in &self.profile.sample_files {
            let check = format!("sample_io.{}", name);
            let lower = name.to_lowercase();
            let hit = files.iter().find(|f| f.name.to_lowercase() == lower);
            report.push(match hit {
                Some(file) => Finding::matched(
                    check,
                    vec![Evidence::new(file.name.clone(), "present")],
                ),
                None => Finding::not_matched(check),
            });
        }

        let suggestive: Vec<Evidence> = files
            .iter()
            .filter(|f| {
                let lower = f.name.to_lowercase();
                ["input", "output", "expected"].iter().any(|s| lower.contains(s))
            })
            .map(|f| Evidence::new(f.name.clone(), "fixture-like name"))
            .collect();
        report.push(if suggestive.is_empty() {
            Finding::not_matched("sample_io.detected")
        } else {
            Finding::matched("sample_io.detected", suggestive)
        });
    }
}

fn filter_by_name<'f>(files: &'f [SourceFile], filter: &str) -> Vec<&'f SourceFile> {
    let filter = filter.to_lowercase();
    files
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&filter))
        .collect()
}

/// First matching line across the selected files; evidence capture stops at
/// one hit to keep report size bounded.
fn first_line(files: &[&SourceFile], predicate: impl Fn(&str) -> bool) -> Option<Evidence> {
    for file in files {
        for line in file.raw.lines() {
            if predicate(line) {
                return Some(Evidence::new(file.name.clone(), line.trim()));
            }
        }
    }
    None
}

fn regex_finding(check: impl Into<String>, pattern: &str, files: &[&SourceFile]) -> Finding {
    let check = check.into();
    let re = match compile(pattern) {
        Some(re) => re,
        None => return Finding::not_matched(check).with_detail("invalid pattern"),
    };
    match first_line(files, |line| re.is_match(line)) {
        Some(evidence) => Finding::matched(check, vec![evidence]),
        None => Finding::not_matched(check),
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "unusable check pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssignmentProfile;
    use std::path::PathBuf;

    fn file(name: &str, raw: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            raw: raw.to_string(),
        }
    }

    fn inspect(files: &[SourceFile]) -> InspectionReport {
        let profile = AssignmentProfile::default();
        LexicalInspector::new(&profile).inspect(files)
    }

    fn outcome(report: &InspectionReport, check: &str) -> bool {
        report
            .find(check)
            .unwrap_or_else(|| panic!("missing finding {check}"))
            .is_matched()
    }

    #[test]
    fn inheritance_detected_with_derived_base_and_file() {
        let files = [file(
            "VirtualEvent.h",
            "#include \"Event.h\"\nclass VirtualEvent : public Event {\n};",
        )];
        let report = inspect(&files);
        assert_eq!(
            report.inheritance,
            vec![InheritanceMatch {
                derived: "VirtualEvent".to_string(),
                base: "Event".to_string(),
                file: "VirtualEvent.h".to_string(),
            }]
        );
        assert!(outcome(&report, "inheritance"));
    }

    #[test]
    fn private_inheritance_is_not_reported() {
        let files = [file("D.h", "class Derived : Base {\n};")];
        let report = inspect(&files);
        assert!(report.inheritance.is_empty());
        assert!(!outcome(&report, "inheritance"));
    }

    #[test]
    fn class_files_need_both_header_and_implementation() {
        let files = [
            file("Organizer.h", "class Organizer;"),
            file("Organizer.cpp", "#include \"Organizer.h\""),
            file("Event.h", "class Event;"),
        ];
        let report = inspect(&files);
        assert!(outcome(&report, "class_files.Organizer"));
        assert!(!outcome(&report, "class_files.Event"));
        assert!(!outcome(&report, "class_files.VenueEvent"));
    }

    #[test]
    fn container_function_existence_and_usage_are_distinct() {
        let files = [
            // Declaration lives in the container header: counts for
            // existence, not for usage.
            file("LinkedBag.h", "void reverseAppendK(int k);"),
            file("main.cpp", "int main() { bag.findKthItem(2); }"),
        ];
        let report = inspect(&files);
        assert!(outcome(&report, "container_fn.reverseAppendK"));
        assert!(!outcome(&report, "container_fn.findKthItem"));
        assert!(outcome(&report, "fn_usage.findKthItem"));
        assert!(!outcome(&report, "fn_usage.reverseAppendK"));
    }

    #[test]
    fn usage_requires_call_parenthesis() {
        let files = [file("main.cpp", "// mentions reverseAppendK in a comment\nint reverseAppendKCount = 0;")];
        let report = inspect(&files);
        assert!(!outcome(&report, "fn_usage.reverseAppendK"));
    }

    #[test]
    fn single_list_pattern_count_matches_exactly_one() {
        let one = [file("Organizer.h", "LinkedBag<Event*> events;")];
        assert!(outcome(&inspect(&one), "pattern_count.single_list"));

        let two = [file(
            "Organizer.h",
            "LinkedBag<VirtualEvent> virtuals;\nLinkedBag<VenueEvent> venues;",
        )];
        let report = inspect(&two);
        assert!(!outcome(&report, "pattern_count.single_list"));
        assert_eq!(
            report.find("pattern_count.single_list").unwrap().detail.as_deref(),
            Some("found 2, expected 1")
        );
    }

    #[test]
    fn menu_keywords_found_in_main_case_insensitively() {
        let files = [file(
            "mainProgram.cpp",
            "void displayOrganizerMenu();\ncout << \"1. Create Event\" << endl;\ncout << \"2. Sell Ticket\";",
        )];
        let report = inspect(&files);
        assert!(outcome(&report, "menu.displayOrganizerMenu"));
        assert!(outcome(&report, "menu.Create event"));
        assert!(outcome(&report, "menu.Sell ticket"));
        assert!(!outcome(&report, "menu.Delete event"));
    }

    #[test]
    fn menu_falls_back_to_implementation_files() {
        // No file named "main": the check scans every implementation file.
        let files = [file("program.cpp", "displayOrganizerMenu();")];
        let report = inspect(&files);
        assert!(outcome(&report, "menu.displayOrganizerMenu"));
    }

    #[test]
    fn smart_pointer_detection() {
        let files = [file(
            "Organizer.h",
            concat!(
                "LinkedBag<shared_ptr<Event>> events;\n",
                "auto e = make_shared<VirtualEvent>();\n",
            ),
        )];
        let report = inspect(&files);
        assert!(outcome(&report, "smart_ptr.container_of_pointer"));
        assert!(outcome(&report, "smart_ptr.types"));
        assert!(outcome(&report, "smart_ptr.factories"));
        assert!(outcome(&report, "smart_ptr.polymorphism"));
    }

    #[test]
    fn raw_pointer_container_counts_without_polymorphism() {
        let files = [file("Organizer.h", "LinkedBag<Event*> events;")];
        let report = inspect(&files);
        assert!(outcome(&report, "smart_ptr.container_of_pointer"));
        assert!(!outcome(&report, "smart_ptr.types"));
        assert!(!outcome(&report, "smart_ptr.polymorphism"));
    }

    #[test]
    fn friend_operator_detected_by_declaration_or_signature() {
        let files = [
            file(
                "Organizer.h",
                "friend ostream& operator<<(ostream& out, const Organizer& o);",
            ),
            file(
                "Organizer.cpp",
                "istream& operator>>(istream& in, Organizer& o) { return in; }",
            ),
        ];
        let report = inspect(&files);
        assert!(outcome(&report, "friend_op.Organizer<<"));
        assert!(outcome(&report, "friend_op.Organizer>>"));
        assert!(!outcome(&report, "friend_op.VenueEvent<<"));
    }

    #[test]
    fn big3_members_detected_individually() {
        let files = [file(
            "Organizer.cpp",
            concat!(
                "Organizer::~Organizer() {}\n",
                "Organizer::Organizer(const Organizer& other) {}\n",
            ),
        )];
        let report = inspect(&files);
        assert!(outcome(&report, "big3.Organizer.destructor"));
        assert!(outcome(&report, "big3.Organizer.copy_constructor"));
        assert!(!outcome(&report, "big3.Organizer.copy_assignment"));
    }

    #[test]
    fn container_assignment_prototype_and_definition() {
        let files = [
            file("LinkedBag.h", "LinkedBag<ItemType>& operator=(const LinkedBag& rhs);"),
            file(
                "LinkedBag.cpp",
                "template<class ItemType>\nLinkedBag<ItemType>& LinkedBag<ItemType>::operator=(const LinkedBag& rhs) {}",
            ),
        ];
        let report = inspect(&files);
        assert!(outcome(&report, "container_assign.prototype"));
        assert!(outcome(&report, "container_assign.definition"));
    }

    #[test]
    fn sample_files_by_name_and_heuristic() {
        let files = [
            file("input01.txt", "1\n2\n"),
            file("expected_results.txt", "ok"),
        ];
        let report = inspect(&files);
        assert!(outcome(&report, "sample_io.input01.txt"));
        assert!(!outcome(&report, "sample_io.output01.txt"));
        let detected = report.find("sample_io.detected").unwrap();
        assert!(detected.is_matched());
        assert_eq!(detected.evidence.len(), 2);
    }

    #[test]
    fn empty_file_set_reports_everything_not_matched() {
        let report = inspect(&[]);
        assert!(!report.findings.is_empty());
        assert!(report.findings.iter().all(|f| !f.is_matched()));
    }
}
