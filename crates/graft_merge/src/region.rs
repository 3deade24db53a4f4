//! Marked regions.
//!
//! A marked region is a span of text between a start sentinel line and the next
//! end sentinel line. Both the custom-section merger and the transform registry
//! locate and replace regions through [`MarkerPair`].

use std::ops::Range;

/// Start of a custom section, after the comment delimiter.
pub const CUSTOM_SECTION_START: &str = "START CUSTOM SECTION";
/// End of a custom section, after the comment delimiter.
pub const CUSTOM_SECTION_END: &str = "END CUSTOM SECTION";
/// Start of a generated section, followed by an optional label.
pub const SECTION_START: &str = "# START SECTION";
/// End of a generated section.
pub const SECTION_END: &str = "# END SECTION";

/// A pair of sentinels that delimit regions.
///
/// A line is a sentinel when it contains the marker text anywhere, so indented
/// sentinels in YAML files and trailing labels are both recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    start: String,
    end: String,
}

/// Byte ranges of one located region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedRegion {
    /// The start sentinel line, including its terminator.
    pub start_line: Range<usize>,
    /// Everything between the two sentinel lines.
    pub body: Range<usize>,
    /// The end sentinel line, including its terminator if present.
    pub end_line: Range<usize>,
}

impl MarkedRegion {
    /// Whole region, sentinels included.
    pub fn span(&self) -> Range<usize> {
        self.start_line.start..self.end_line.end
    }

    /// Text between the sentinels.
    pub fn body_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body.clone()]
    }
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Custom section sentinels for a comment delimiter such as `#` or `//`.
    pub fn custom_section(delimiter: &str) -> Self {
        Self::new(
            format!("{delimiter} {CUSTOM_SECTION_START}"),
            format!("{delimiter} {CUSTOM_SECTION_END}"),
        )
    }

    /// Generated section sentinels: `# START SECTION <label>` / `# END SECTION`.
    ///
    /// The label is matched as a prefix, so `"optional dependencies (build"`
    /// matches `# START SECTION optional dependencies (build only)`. An empty
    /// label matches the first generated section.
    pub fn section(label: &str) -> Self {
        let start = if label.is_empty() {
            SECTION_START.to_string()
        } else {
            format!("{SECTION_START} {label}")
        };
        Self::new(start, SECTION_END)
    }

    pub fn start_marker(&self) -> &str {
        &self.start
    }

    pub fn end_marker(&self) -> &str {
        &self.end
    }

    pub fn is_start(&self, line: &str) -> bool {
        line.contains(&self.start)
    }

    pub fn is_end(&self, line: &str) -> bool {
        line.contains(&self.end)
    }

    /// Locate the first region in `text`.
    pub fn locate(&self, text: &str) -> Option<MarkedRegion> {
        self.locate_from(text, 0)
    }

    /// Locate every non-overlapping region in `text`, in order.
    pub fn locate_all(&self, text: &str) -> Vec<MarkedRegion> {
        let mut regions = Vec::new();
        let mut from = 0;
        while let Some(region) = self.locate_from(text, from) {
            from = region.end_line.end;
            regions.push(region);
        }
        regions
    }

    /// Whether every start sentinel is eventually followed by an end sentinel.
    ///
    /// Regions do not nest: a start sentinel inside an open region is content.
    /// An end sentinel outside any region is ignored.
    pub fn is_balanced(&self, text: &str) -> bool {
        let mut open = false;
        for line in text.split_inclusive('\n') {
            if !open && self.is_start(line) {
                open = true;
            } else if open && self.is_end(line) {
                open = false;
            }
        }
        !open
    }

    /// Replace the body of the first region with `lines`.
    ///
    /// Each line is written followed by `\n`. Both sentinel lines are kept
    /// verbatim. Returns `None` when no complete region exists.
    pub fn replace_body(&self, text: &str, lines: &[String]) -> Option<String> {
        let region = self.locate(text)?;

        let mut out = String::with_capacity(text.len());
        out.push_str(&text[..region.body.start]);
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&text[region.end_line.start..]);
        Some(out)
    }

    fn locate_from(&self, text: &str, from: usize) -> Option<MarkedRegion> {
        let mut start_line: Option<Range<usize>> = None;

        for (offset, line) in line_spans(&text[from..]) {
            let range = from + offset..from + offset + line.len();
            match &start_line {
                None if self.is_start(line) => {
                    // a start sentinel must end its line for a body to follow
                    if !line.ends_with('\n') {
                        return None;
                    }
                    start_line = Some(range);
                }
                Some(start) if self.is_end(line) => {
                    return Some(MarkedRegion {
                        start_line: start.clone(),
                        body: start.end..range.start,
                        end_line: range,
                    });
                }
                _ => {}
            }
        }

        None
    }
}

/// Iterate lines with their byte offset.
pub(crate) fn line_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}
