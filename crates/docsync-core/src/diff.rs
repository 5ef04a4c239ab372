//! Line diff based on the longest common subsequence.
//!
//! Both texts are split on `\n`. An empty text is a single empty line, so a
//! diff against empty text always carries at least one entry for that line.
//!
//! The LCS table is computed over suffixes, which lets the walk emit entries
//! front to back without a reversal pass. On ties a deletion is emitted
//! before an insertion.

use serde::{Deserialize, Serialize};

/// Kind of a diff entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

/// 1-based line numbers of an entry on each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNumber {
    /// Line in the left (old) text, absent for insertions.
    pub left: Option<usize>,
    /// Line in the right (new) text, absent for deletions.
    pub right: Option<usize>,
}

/// One entry of a line diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub content: String,
    pub line_number: LineNumber,
}

/// Full diff between two texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    /// Ordered entries.
    pub lines: Vec<DiffLine>,
    /// Number of inserted lines.
    pub additions: usize,
    /// Number of deleted lines.
    pub deletions: usize,
}

impl LineDiff {
    /// True when at least one line was inserted or deleted.
    pub fn has_changes(&self) -> bool {
        self.additions + self.deletions > 0
    }

    /// Counts only, without the entries.
    pub fn stats(&self) -> DiffStats {
        DiffStats {
            additions: self.additions,
            deletions: self.deletions,
            has_changes: self.has_changes(),
        }
    }
}

/// Change summary between two texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub has_changes: bool,
}

/// Split text into lines. Never returns an empty vector.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Compute the line diff from `left` to `right`.
pub fn diff_lines(left: &str, right: &str) -> LineDiff {
    let a = split_lines(left);
    let b = split_lines(right);
    let (m, n) = (a.len(), b.len());

    // table[i * (n + 1) + j] = LCS length of a[i..] and b[j..]
    let width = n + 1;
    let mut table = vec![0u32; (m + 1) * width];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(m.max(n));
    let mut additions = 0;
    let mut deletions = 0;
    let (mut i, mut j) = (0, 0);

    while i < m || j < n {
        if i < m && j < n && a[i] == b[j] {
            lines.push(DiffLine {
                kind: DiffKind::Equal,
                content: a[i].to_string(),
                line_number: LineNumber {
                    left: Some(i + 1),
                    right: Some(j + 1),
                },
            });
            i += 1;
            j += 1;
        } else if i < m && (j >= n || table[(i + 1) * width + j] >= table[i * width + j + 1]) {
            lines.push(DiffLine {
                kind: DiffKind::Delete,
                content: a[i].to_string(),
                line_number: LineNumber {
                    left: Some(i + 1),
                    right: None,
                },
            });
            deletions += 1;
            i += 1;
        } else {
            lines.push(DiffLine {
                kind: DiffKind::Insert,
                content: b[j].to_string(),
                line_number: LineNumber {
                    left: None,
                    right: Some(j + 1),
                },
            });
            additions += 1;
            j += 1;
        }
    }

    LineDiff {
        lines,
        additions,
        deletions,
    }
}

/// Change summary from `left` to `right`.
pub fn diff_stats(left: &str, right: &str) -> DiffStats {
    diff_lines(left, right).stats()
}

/// Replay a diff against `left`.
///
/// Returns `None` if an equal or deleted entry does not match the line of
/// `left` it claims to consume, or if `left` has lines the diff never
/// consumed.
pub fn apply_diff(left: &str, diff: &LineDiff) -> Option<String> {
    let source = split_lines(left);
    let mut cursor = 0;
    let mut out: Vec<&str> = Vec::with_capacity(diff.lines.len());

    for entry in &diff.lines {
        match entry.kind {
            DiffKind::Equal => {
                if source.get(cursor) != Some(&entry.content.as_str()) {
                    return None;
                }
                out.push(&entry.content);
                cursor += 1;
            }
            DiffKind::Delete => {
                if source.get(cursor) != Some(&entry.content.as_str()) {
                    return None;
                }
                cursor += 1;
            }
            DiffKind::Insert => out.push(&entry.content),
        }
    }

    if cursor != source.len() {
        return None;
    }
    Some(out.join("\n"))
}
