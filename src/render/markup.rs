//! Inline slide markup.
//!
//! Two markers are recognised, both non-greedy and confined to one line:
//!
//! | Marker | Result |
//! |---|---|
//! | `++word++` | bold, highlight colour |
//! | `**word**` | bold |
//!
//! Highlights are resolved first. Bold pairs are then matched across the
//! whole line, so a bold span may enclose a highlight. Where both apply the
//! highlight style wins. An unmatched marker is kept as literal text.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Bold,
    Highlight,
}

impl Emphasis {
    pub fn is_bold(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// A stretch of text with one emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub emphasis: Emphasis,
}

impl Run {
    fn new(text: impl Into<String>, emphasis: Emphasis) -> Self {
        Self {
            text: text.into(),
            emphasis,
        }
    }
}

const HIGHLIGHT: &str = "++";
const BOLD: &str = "**";

/// Split `s` on paired `marker`s into `(byte range, inside)` pairs. Text after
/// an unpaired opening marker is returned outside, marker included.
fn paired_ranges(s: &str, marker: &str) -> Vec<(Range<usize>, bool)> {
    let mut out = Vec::new();
    let mut start = 0;
    while let Some(open) = s[start..].find(marker).map(|i| start + i) {
        let content = open + marker.len();
        let Some(close) = s[content..].find(marker).map(|i| content + i) else {
            break;
        };
        out.push((start..open, false));
        out.push((content..close, true));
        start = close + marker.len();
    }
    out.push((start..s.len(), false));
    out
}

/// Parse one line into runs. Adjacent runs with the same emphasis are merged
/// and empty runs dropped.
pub fn parse_line(line: &str) -> Vec<Run> {
    // Highlight markers removed, with one flag per remaining byte.
    let mut text = String::with_capacity(line.len());
    let mut highlighted: Vec<bool> = Vec::with_capacity(line.len());
    for (range, inside) in paired_ranges(line, HIGHLIGHT) {
        text.push_str(&line[range]);
        highlighted.resize(text.len(), inside);
    }

    let mut runs: Vec<Run> = Vec::new();
    let mut push = |piece: &str, emphasis: Emphasis| {
        if piece.is_empty() {
            return;
        }
        match runs.last_mut() {
            Some(last) if last.emphasis == emphasis => last.text.push_str(piece),
            _ => runs.push(Run::new(piece, emphasis)),
        }
    };

    for (range, bold) in paired_ranges(&text, BOLD) {
        // Flags only change at former marker positions, which are char boundaries.
        let mut start = range.start;
        while start < range.end {
            let lit = highlighted[start];
            let end = (start..range.end)
                .find(|&i| highlighted[i] != lit)
                .unwrap_or(range.end);
            let emphasis = match (lit, bold) {
                (true, _) => Emphasis::Highlight,
                (false, true) => Emphasis::Bold,
                (false, false) => Emphasis::Plain,
            };
            push(&text[start..end], emphasis);
            start = end;
        }
    }
    runs
}

/// Text with all recognised markers removed.
pub fn strip_markup(line: &str) -> String {
    parse_line(line).into_iter().map(|r| r.text).collect()
}
