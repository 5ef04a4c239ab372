//! Proptest generators for property-based testing.

use proptest::prelude::*;

use docsync_core::DocumentId;

/// Generate a single line of text. Never contains a newline.
pub fn line() -> impl Strategy<Value = String> {
    "[a-z ]{0,8}".prop_map(String::from)
}

/// Generate up to `max_lines` lines.
pub fn lines(max_lines: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(line(), 1..=max_lines.max(1))
}

/// Generate a text of up to `max_lines` lines.
pub fn text(max_lines: usize) -> impl Strategy<Value = String> {
    lines(max_lines).prop_map(|lines| lines.join("\n"))
}

/// Generate a document path.
pub fn document_id() -> impl Strategy<Value = DocumentId> {
    "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.md".prop_map(DocumentId::new)
}

/// A single line edit. Positions wrap around the current line count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { at: usize, line: String },
    Delete { at: usize },
    Replace { at: usize, line: String },
}

/// Generate one edit.
pub fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), line()).prop_map(|(at, line)| Edit::Insert { at, line }),
        any::<usize>().prop_map(|at| Edit::Delete { at }),
        (any::<usize>(), line()).prop_map(|(at, line)| Edit::Replace { at, line }),
    ]
}

/// Generate an edit script of up to `max_len` edits.
pub fn edit_script(max_len: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit(), 0..=max_len)
}

/// Apply an edit script to `text`.
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    for edit in edits {
        match edit {
            Edit::Insert { at, line } => {
                let at = at % (lines.len() + 1);
                lines.insert(at, line.clone());
            }
            Edit::Delete { at } => {
                // Text always has at least one line.
                if lines.len() > 1 {
                    let at = at % lines.len();
                    lines.remove(at);
                }
            }
            Edit::Replace { at, line } => {
                let at = at % lines.len();
                lines[at] = line.clone();
            }
        }
    }
    lines.join("\n")
}

/// Two sides that changed different lines of a common base.
///
/// Local rewrites some even lines, remote some odd lines. The line count
/// never changes, so a line-wise merge must produce `expected`.
#[derive(Debug, Clone)]
pub struct DisjointEdits {
    pub base: String,
    pub local: String,
    pub remote: String,
    pub expected: String,
}

impl Arbitrary for DisjointEdits {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        lines(12)
            .prop_flat_map(|base| {
                let n = base.len();
                (
                    Just(base),
                    prop::collection::vec(prop::option::of(line()), n),
                )
            })
            .prop_map(|(base, changes)| {
                let mut local = base.clone();
                let mut remote = base.clone();
                let mut expected = base.clone();
                for (i, change) in changes.into_iter().enumerate() {
                    if let Some(new_line) = change {
                        if i % 2 == 0 {
                            local[i] = new_line.clone();
                        } else {
                            remote[i] = new_line.clone();
                        }
                        expected[i] = new_line;
                    }
                }
                DisjointEdits {
                    base: base.join("\n"),
                    local: local.join("\n"),
                    remote: remote.join("\n"),
                    expected: expected.join("\n"),
                }
            })
            .boxed()
    }
}
