use std::fmt;

use similar::{ChangeTag, TextDiff};

pub const DIFF_CONTEXT_LINES: usize = 3;

/// Unified line diff with `original`/`edited` headers. Empty when the texts are equal.
pub fn unified_diff(original: &str, edited: &str) -> String {
    TextDiff::from_lines(original, edited)
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header("original", "edited")
        .to_string()
}

/// Line and word deltas produced by one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub instruction: String,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub original_words: usize,
    pub edited_words: usize,
}

impl ChangeSummary {
    pub fn compute(original: &str, edited: &str, instruction: &str) -> Self {
        let original_lines: Vec<&str> = original.lines().collect();
        let edited_lines: Vec<&str> = edited.lines().collect();
        let diff = TextDiff::from_slices(&original_lines, &edited_lines);

        let mut lines_added = 0;
        let mut lines_removed = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => lines_added += 1,
                ChangeTag::Delete => lines_removed += 1,
                ChangeTag::Equal => {}
            }
        }

        Self {
            instruction: instruction.to_string(),
            lines_added,
            lines_removed,
            original_words: original.split_whitespace().count(),
            edited_words: edited.split_whitespace().count(),
        }
    }

    pub fn word_delta(&self) -> i64 {
        self.edited_words as i64 - self.original_words as i64
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Applied instruction: '{}'", self.instruction)?;
        writeln!(
            f,
            "Lines added: {}, Lines removed: {}",
            self.lines_added, self.lines_removed
        )?;
        write!(
            f,
            "Word count change: {:+} words ({} → {})",
            self.word_delta(),
            self.original_words,
            self.edited_words
        )
    }
}
