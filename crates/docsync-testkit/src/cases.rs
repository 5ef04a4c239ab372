//! Named merge and diff cases with known outcomes.
//!
//! These pin down the line-level behavior of the diff and merge so any
//! change to it shows up as a named failure.

/// A three-way merge input with its expected result.
#[derive(Debug, Clone)]
pub struct MergeCase {
    /// Human-readable name for the case.
    pub name: &'static str,
    pub base: Option<&'static str>,
    pub local: &'static str,
    pub remote: &'static str,
    /// `None` when the merge must fail.
    pub expected: Option<&'static str>,
}

/// A diff input with its expected counts.
#[derive(Debug, Clone)]
pub struct DiffCase {
    /// Human-readable name for the case.
    pub name: &'static str,
    pub left: &'static str,
    pub right: &'static str,
    pub additions: usize,
    pub deletions: usize,
}

/// Get all merge cases.
pub fn merge_cases() -> Vec<MergeCase> {
    vec![
        MergeCase {
            name: "identical sides need no base",
            base: None,
            local: "same\ntext",
            remote: "same\ntext",
            expected: Some("same\ntext"),
        },
        MergeCase {
            name: "differing sides without base fail",
            base: None,
            local: "a",
            remote: "b",
            expected: None,
        },
        MergeCase {
            name: "only local changed",
            base: Some("a\nb\nc"),
            local: "a\nB\nc",
            remote: "a\nb\nc",
            expected: Some("a\nB\nc"),
        },
        MergeCase {
            name: "only remote changed",
            base: Some("a\nb\nc"),
            local: "a\nb\nc",
            remote: "a\nb\nC",
            expected: Some("a\nb\nC"),
        },
        MergeCase {
            name: "different lines changed",
            base: Some("a\nb\nc"),
            local: "A\nb\nc",
            remote: "a\nb\nC",
            expected: Some("A\nb\nC"),
        },
        MergeCase {
            name: "same line changed the same way",
            base: Some("a\nb"),
            local: "a\nX",
            remote: "a\nX",
            expected: Some("a\nX"),
        },
        MergeCase {
            name: "same line changed differently",
            base: Some("a\nb"),
            local: "a\nX",
            remote: "a\nY",
            expected: None,
        },
        MergeCase {
            name: "local appended a line",
            base: Some("a\nb"),
            local: "a\nb\nc",
            remote: "a\nb",
            expected: Some("a\nb\nc"),
        },
        MergeCase {
            name: "remote removed the last line",
            base: Some("a\nb\nc"),
            local: "a\nb\nc",
            remote: "a\nb",
            expected: Some("a\nb"),
        },
        MergeCase {
            name: "both appended different lines",
            base: Some("a"),
            local: "a\nx",
            remote: "a\ny",
            expected: None,
        },
        MergeCase {
            name: "empty line is not a missing line",
            base: Some("a"),
            local: "a\n",
            remote: "a",
            expected: Some("a\n"),
        },
        MergeCase {
            name: "insert shifts lines into a conflict",
            base: Some("a\nb"),
            local: "new\na\nb",
            remote: "a\nB",
            expected: None,
        },
    ]
}

/// Get all diff cases.
pub fn diff_cases() -> Vec<DiffCase> {
    vec![
        DiffCase {
            name: "identical",
            left: "a\nb",
            right: "a\nb",
            additions: 0,
            deletions: 0,
        },
        DiffCase {
            name: "empty to one line",
            left: "",
            right: "a",
            additions: 1,
            deletions: 1,
        },
        DiffCase {
            name: "append",
            left: "a",
            right: "a\nb",
            additions: 1,
            deletions: 0,
        },
        DiffCase {
            name: "remove middle",
            left: "a\nb\nc",
            right: "a\nc",
            additions: 0,
            deletions: 1,
        },
        DiffCase {
            name: "replace one line",
            left: "a\nb\nc",
            right: "a\nx\nc",
            additions: 1,
            deletions: 1,
        },
        DiffCase {
            name: "trailing newline adds an empty line",
            left: "a",
            right: "a\n",
            additions: 1,
            deletions: 0,
        },
        DiffCase {
            name: "disjoint texts",
            left: "a\nb",
            right: "c\nd\ne",
            additions: 3,
            deletions: 2,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_core::{apply_diff, diff_lines, diff_stats, three_way_merge};

    #[test]
    fn test_merge_cases() {
        for case in merge_cases() {
            let merged = three_way_merge(case.base, case.local, case.remote);
            assert_eq!(merged.as_deref(), case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_diff_cases() {
        for case in diff_cases() {
            let stats = diff_stats(case.left, case.right);
            assert_eq!(stats.additions, case.additions, "{}: additions", case.name);
            assert_eq!(stats.deletions, case.deletions, "{}: deletions", case.name);
            assert_eq!(
                stats.has_changes,
                case.additions + case.deletions > 0,
                "{}",
                case.name
            );

            let diff = diff_lines(case.left, case.right);
            assert_eq!(
                apply_diff(case.left, &diff).as_deref(),
                Some(case.right),
                "{}: reconstruct",
                case.name
            );
        }
    }

    #[test]
    fn test_case_names_unique() {
        let mut names: Vec<_> = merge_cases().iter().map(|c| c.name).collect();
        names.extend(diff_cases().iter().map(|c| c.name));
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
