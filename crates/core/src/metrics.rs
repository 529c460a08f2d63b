//! Line-level change counts for an edit directive.

use similar::{DiffTag, TextDiff};

/// How many lines a SEARCH/REPLACE pair adds, removes and rewrites.
///
/// `added` and `deleted` count every inserted and removed line of the line
/// diff. `changed` counts the lines that were removed and re-inserted at the
/// same position, i.e. lines present on both sides with different content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMetrics {
    pub added: usize,
    pub deleted: usize,
    pub changed: usize,
}

impl LineMetrics {
    /// Compute metrics for `before` -> `after`
    pub fn between(before: &str, after: &str) -> Self {
        let diff = TextDiff::from_lines(before, after);
        let mut metrics = LineMetrics::default();
        let mut unpaired_deletes = 0usize;

        for op in diff.ops() {
            let (tag, old, new) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => unpaired_deletes = 0,
                DiffTag::Delete => {
                    metrics.deleted += old.len();
                    unpaired_deletes += old.len();
                }
                DiffTag::Insert => {
                    metrics.added += new.len();
                    let paired = unpaired_deletes.min(new.len());
                    metrics.changed += paired;
                    unpaired_deletes -= paired;
                }
                DiffTag::Replace => {
                    metrics.deleted += old.len();
                    metrics.added += new.len();
                    metrics.changed += old.len().min(new.len());
                    unpaired_deletes = 0;
                }
            }
        }

        metrics
    }

    /// True when the directive would not modify anything
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.deleted == 0
    }
}
