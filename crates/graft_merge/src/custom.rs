//! Custom-section merging.
//!
//! The template owns a tracked file except for blocks the project marks with
//! custom-section sentinels. [`CustomSectionMerger`] walks the line diff of
//! template against project and keeps the template text everywhere, except
//! inside the project's custom sections where the project's lines win.

use tracing::debug;

use crate::diff::{diff_lines, SegmentKind};
use crate::region::MarkerPair;

/// Outcome of a custom-section merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMerge {
    /// The merged text.
    pub text: String,
    /// Project-only lines outside any custom section. They are dropped.
    pub discarded_lines: usize,
    /// The project opened a custom section that never closes. No project
    /// content was kept.
    pub malformed: bool,
}

/// Line-oriented merger for files with custom sections.
#[derive(Debug, Clone)]
pub struct CustomSectionMerger {
    markers: MarkerPair,
}

/// Trailing template-only custom block in the output, by byte offset of its
/// start sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateTail {
    None,
    Open(usize),
    Closed(usize),
}

impl CustomSectionMerger {
    /// Merger for files whose comments start with `delimiter` (`#` or `//`).
    pub fn new(delimiter: &str) -> Self {
        Self {
            markers: MarkerPair::custom_section(delimiter),
        }
    }

    /// Merge the project's custom sections into the template text.
    pub fn merge(&self, template: &str, project: &str) -> CustomMerge {
        if template == project {
            return CustomMerge {
                text: template.to_string(),
                discarded_lines: 0,
                malformed: false,
            };
        }

        if !self.markers.is_balanced(project) {
            debug!(start = self.markers.start_marker(), "Unterminated custom section in project file");
            return CustomMerge {
                text: template.to_string(),
                discarded_lines: 0,
                malformed: true,
            };
        }

        let mut out = Output::default();
        let mut inside = false;
        let mut tail = TemplateTail::None;
        let mut discarded_lines = 0;

        for segment in diff_lines(template, project) {
            for line in segment.lines {
                match segment.kind {
                    SegmentKind::Unchanged => {
                        out.push(line);
                        tail = TemplateTail::None;
                        inside = self.step(inside, line);
                    }
                    SegmentKind::Removed => {
                        if inside {
                            continue;
                        }
                        let at = out.push(line);
                        tail = self.track_tail(tail, line, at);
                    }
                    SegmentKind::Added => {
                        let opens = !inside && self.markers.is_start(line);
                        if !inside && !opens {
                            discarded_lines += 1;
                            continue;
                        }
                        if opens {
                            // the project's marked copy replaces a template block it follows
                            if let TemplateTail::Open(at) | TemplateTail::Closed(at) = tail {
                                out.truncate(at);
                            }
                        }
                        out.push(line);
                        tail = TemplateTail::None;
                        inside = self.step(inside, line);
                    }
                }
            }
        }

        if discarded_lines > 0 {
            debug!(discarded_lines, "Dropped project lines outside custom sections");
        }

        CustomMerge {
            text: out.text,
            discarded_lines,
            malformed: false,
        }
    }

    /// Advance the project-side section state over one emitted line.
    fn step(&self, inside: bool, line: &str) -> bool {
        if inside {
            !self.markers.is_end(line)
        } else {
            self.markers.is_start(line)
        }
    }

    fn track_tail(&self, tail: TemplateTail, line: &str, at: usize) -> TemplateTail {
        if self.markers.is_start(line) {
            match tail {
                // a start inside an open block is content
                TemplateTail::Open(_) => tail,
                _ => TemplateTail::Open(at),
            }
        } else if self.markers.is_end(line) {
            match tail {
                TemplateTail::Open(start) => TemplateTail::Closed(start),
                _ => TemplateTail::None,
            }
        } else if line.trim().is_empty() {
            tail
        } else {
            match tail {
                TemplateTail::Closed(_) => TemplateTail::None,
                _ => tail,
            }
        }
    }
}

/// Merge the project's custom sections into the template text.
pub fn merge_custom_sections(template: &str, project: &str, delimiter: &str) -> String {
    CustomSectionMerger::new(delimiter).merge(template, project).text
}

#[derive(Default)]
struct Output {
    text: String,
}

impl Output {
    /// Append a line, separating it from an unterminated previous line.
    /// Returns the offset the line starts at.
    fn push(&mut self, line: &str) -> usize {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        let at = self.text.len();
        self.text.push_str(line);
        at
    }

    fn truncate(&mut self, at: usize) {
        self.text.truncate(at);
        let kept = self.text.trim_end_matches([' ', '\t']).len();
        self.text.truncate(kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(template: &str, project: &str) -> CustomMerge {
        CustomSectionMerger::new("#").merge(template, project)
    }

    #[test]
    fn test_identical_inputs() {
        let text = "a\n# START CUSTOM SECTION\nb\n# END CUSTOM SECTION\n";
        let merged = merge(text, text);
        assert_eq!(merged.text, text);
        assert_eq!(merged.discarded_lines, 0);
    }

    #[test]
    fn test_template_wins_outside_sections() {
        let template = "FROM base:2\nRUN install\n";
        let project = "FROM base:1\nRUN install\nRUN extra\n";
        let merged = merge(template, project);

        assert_eq!(merged.text, template);
        assert_eq!(merged.discarded_lines, 2);
    }

    #[test]
    fn test_placeholder_replaced_by_project_content() {
        let template = "A\n# START CUSTOM SECTION\n# add your steps here\n# END CUSTOM SECTION\nB\n";
        let project = "A\n# START CUSTOM SECTION\nRUN mine\nRUN yours\n# END CUSTOM SECTION\nB\n";

        assert_eq!(merge(template, project).text, project);
    }

    #[test]
    fn test_template_changes_around_sections_are_applied() {
        let template = "v2\n# START CUSTOM SECTION\n# END CUSTOM SECTION\ntail v2\n";
        let project = "v1\n# START CUSTOM SECTION\nkeep\n# END CUSTOM SECTION\ntail v1\n";

        assert_eq!(
            merge(template, project).text,
            "v2\n# START CUSTOM SECTION\nkeep\n# END CUSTOM SECTION\ntail v2\n"
        );
    }

    #[test]
    fn test_new_project_section_is_kept() {
        let template = "A\nB\n";
        let project = "A\n# START CUSTOM SECTION\nx\n# END CUSTOM SECTION\nB\n";

        assert_eq!(merge(template, project).text, project);
    }

    #[test]
    fn test_template_block_not_duplicated() {
        let template = "A\n# START CUSTOM SECTION\n# END CUSTOM SECTION\nB\n";
        let project = "A\n    # START CUSTOM SECTION\n    x\n    # END CUSTOM SECTION\nB\n";
        let merged = merge(template, project);

        assert_eq!(merged.text, project);
        assert_eq!(merged.text.matches("START CUSTOM SECTION").count(), 1);
    }

    #[test]
    fn test_unterminated_project_section() {
        let template = "A\n# START CUSTOM SECTION\n# END CUSTOM SECTION\n";
        let project = "A\n# START CUSTOM SECTION\nmine\n";
        let merged = merge(template, project);

        assert!(merged.malformed);
        assert_eq!(merged.text, template);
    }

    #[test]
    fn test_nested_start_is_content() {
        let template = "A\n";
        let project = "A\n# START CUSTOM SECTION\n# START CUSTOM SECTION\nx\n# END CUSTOM SECTION\n";

        assert_eq!(merge(template, project).text, project);
    }

    #[test]
    fn test_newline_inserted_after_unterminated_line() {
        let template = "last line";
        let project = "# START CUSTOM SECTION\nx\n# END CUSTOM SECTION\n";
        let merged = merge(template, project);

        assert_eq!(merged.text, "last line\n# START CUSTOM SECTION\nx\n# END CUSTOM SECTION\n");
    }

    #[test]
    fn test_slash_delimiter() {
        let template = "{\n  // START CUSTOM SECTION\n  // END CUSTOM SECTION\n}\n";
        let project = "{\n  // START CUSTOM SECTION\n  \"x\": 1\n  // END CUSTOM SECTION\n}\n";

        assert_eq!(merge_custom_sections(template, project, "//"), project);
        // hash sentinels mean nothing with a slash delimiter
        assert_eq!(merge_custom_sections(template, project, "#"), template);
    }
}
