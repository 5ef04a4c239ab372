//! Line-wise three-way merge.
//!
//! The merge walks all three texts by line index, up to the longest of
//! them. At each index a line missing from a shorter text is treated as
//! absent, which is distinct from an empty line. A side whose line matches
//! the base is considered unchanged and yields to the other side.
//!
//! The merge is all-or-nothing: if any index was changed differently by both
//! sides, no result is produced.

use crate::diff::split_lines;

/// Merge `local` and `remote` against their common ancestor `base`.
///
/// Returns `None` when both sides changed the same line differently, or
/// when no base is known and the two sides differ.
pub fn three_way_merge(base: Option<&str>, local: &str, remote: &str) -> Option<String> {
    if local == remote {
        return Some(local.to_string());
    }
    let base = base?;

    let base_lines = split_lines(base);
    let local_lines = split_lines(local);
    let remote_lines = split_lines(remote);
    let len = base_lines
        .len()
        .max(local_lines.len())
        .max(remote_lines.len());

    let mut merged = Vec::with_capacity(len);
    for i in 0..len {
        let b = base_lines.get(i).copied();
        let l = local_lines.get(i).copied();
        let r = remote_lines.get(i).copied();

        let line = if l == r || l == b {
            r
        } else if r == b {
            l
        } else {
            return None;
        };

        if let Some(line) = line {
            merged.push(line);
        }
    }

    Some(merged.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_sides_ignore_base() {
        assert_eq!(three_way_merge(None, "x", "x").as_deref(), Some("x"));
        assert_eq!(three_way_merge(Some("whatever"), "x", "x").as_deref(), Some("x"));
    }

    #[test]
    fn test_no_base_and_divergent_sides_fails() {
        assert_eq!(three_way_merge(None, "a", "b"), None);
    }

    #[test]
    fn test_disjoint_line_edits_merge() {
        let base = "one\ntwo\nthree";
        let local = "ONE\ntwo\nthree";
        let remote = "one\ntwo\nTHREE";
        assert_eq!(
            three_way_merge(Some(base), local, remote).as_deref(),
            Some("ONE\ntwo\nTHREE")
        );
    }

    #[test]
    fn test_same_line_changed_differently_fails() {
        let base = "one\ntwo";
        assert_eq!(three_way_merge(Some(base), "one\nlocal", "one\nremote"), None);
    }

    #[test]
    fn test_appended_line_is_kept() {
        let base = "a\nb";
        let local = "a\nb\nc";
        assert_eq!(three_way_merge(Some(base), local, base).as_deref(), Some(local));
    }

    #[test]
    fn test_truncation_is_kept() {
        let base = "a\nb\nc";
        let remote = "a";
        assert_eq!(three_way_merge(Some(base), base, remote).as_deref(), Some(remote));
    }

    #[test]
    fn test_one_failing_line_fails_whole_merge() {
        let base = "a\nb\nc\nd";
        let local = "A\nb\nlocal\nd";
        let remote = "a\nb\nremote\nD";
        assert_eq!(three_way_merge(Some(base), local, remote), None);
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec("[xyz]{0,2}", 1..6).prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn test_equal_sides_always_merge(base in prop::option::of(text()), side in text()) {
            prop_assert_eq!(three_way_merge(base.as_deref(), &side, &side), Some(side.clone()));
        }

        #[test]
        fn test_one_sided_change_wins(base in text(), changed in text()) {
            prop_assert_eq!(
                three_way_merge(Some(&base), &changed, &base),
                Some(changed.clone())
            );
            prop_assert_eq!(
                three_way_merge(Some(&base), &base, &changed),
                Some(changed.clone())
            );
        }
    }
}
