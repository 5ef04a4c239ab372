//! Conflict markers and resolution.
//!
//! Markers wrap the whole document: one local block, one remote block.
//!
//! ```text
//! <<<<<<< LOCAL
//! ...local content...
//! =======
//! ...remote content...
//! >>>>>>> REMOTE
//! ```

use crate::error::{CoreError, Result};
use crate::types::ConflictInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opening marker line.
pub const LOCAL_MARKER: &str = "<<<<<<< LOCAL";
/// Separator line between the two sides.
pub const SEPARATOR: &str = "=======";
/// Closing marker line.
pub const REMOTE_MARKER: &str = ">>>>>>> REMOTE";

const OPEN_PREFIX: &str = "<<<<<<< ";
const CLOSE_PREFIX: &str = ">>>>>>> ";

/// How a conflict is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    KeepLocal,
    KeepRemote,
    Merge,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::KeepLocal => "keep_local",
            ResolutionKind::KeepRemote => "keep_remote",
            ResolutionKind::Merge => "merge",
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep_local" => Ok(ResolutionKind::KeepLocal),
            "keep_remote" => Ok(ResolutionKind::KeepRemote),
            "merge" => Ok(ResolutionKind::Merge),
            other => Err(CoreError::InvalidResolution(other.to_string())),
        }
    }
}

/// Kind of a parsed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Normal,
    Local,
    Remote,
}

/// A run of lines of a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSection {
    pub kind: SectionKind,
    pub content: String,
}

/// Result of scanning text for conflict markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedConflict {
    /// True if at least one marker line was found.
    pub has_markers: bool,
    /// Sections in document order.
    pub sections: Vec<ConflictSection>,
}

impl ParsedConflict {
    /// Content of the first section of `kind`, if any.
    pub fn first(&self, kind: SectionKind) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.content.as_str())
    }
}

/// Render both sides of a conflict as a single marked-up document.
pub fn generate_conflict_markers(info: &ConflictInfo) -> String {
    [
        LOCAL_MARKER,
        info.local_content.as_str(),
        SEPARATOR,
        info.remote_content.as_str(),
        REMOTE_MARKER,
    ]
    .join("\n")
}

/// Split text into normal, local and remote sections.
pub fn parse_conflict_markers(text: &str) -> ParsedConflict {
    let mut parsed = ParsedConflict::default();
    let mut kind = SectionKind::Normal;
    let mut buf: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if line.starts_with(OPEN_PREFIX) {
            flush(&mut parsed.sections, kind, &mut buf);
            parsed.has_markers = true;
            kind = SectionKind::Local;
        } else if line == SEPARATOR && kind == SectionKind::Local {
            flush(&mut parsed.sections, kind, &mut buf);
            parsed.has_markers = true;
            kind = SectionKind::Remote;
        } else if line.starts_with(CLOSE_PREFIX) && kind != SectionKind::Normal {
            flush(&mut parsed.sections, kind, &mut buf);
            parsed.has_markers = true;
            kind = SectionKind::Normal;
        } else {
            buf.push(line);
        }
    }
    flush(&mut parsed.sections, kind, &mut buf);

    parsed
}

// Normal runs are only kept when they hold lines; marked sections are kept
// even when empty so an empty side still round-trips.
fn flush(sections: &mut Vec<ConflictSection>, kind: SectionKind, buf: &mut Vec<&str>) {
    if kind == SectionKind::Normal && buf.is_empty() {
        return;
    }
    sections.push(ConflictSection {
        kind,
        content: buf.join("\n"),
    });
    buf.clear();
}

/// Pick the content a conflict resolves to.
///
/// `merged` is required for [`ResolutionKind::Merge`] and ignored otherwise.
pub fn resolve_conflict(
    info: &ConflictInfo,
    kind: ResolutionKind,
    merged: Option<&str>,
) -> Result<String> {
    match kind {
        ResolutionKind::KeepLocal => Ok(info.local_content.clone()),
        ResolutionKind::KeepRemote => Ok(info.remote_content.clone()),
        ResolutionKind::Merge => merged
            .map(str::to_string)
            .ok_or(CoreError::MissingMergedContent),
    }
}
