//! Issue and edit value types.
//!
//! Analyzers produce [`Issue`]s; each issue optionally carries candidate
//! [`Edit`]s. An edit is the fundamental primitive everything else compiles
//! down to: a byte-span replacement against one file's known content.
//! Intelligence lives in span acquisition (the analyzers), not here.
//!
//! Offsets and lengths are byte-based and authoritative; [`Location`]
//! line/column values are advisory display data and never drive patching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A byte-span replacement instruction against one file's known content.
///
/// `length == 0` is a pure insertion at `offset`; an empty `replacement` is a
/// pure deletion. Offsets are only meaningful against the file snapshot they
/// were computed from; the planner and applier re-check ranges against the
/// content they are actually given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "an Edit does nothing until it is planned and applied"]
pub struct Edit {
    /// Path of the target file. Treated as an opaque grouping key; this
    /// subsystem never canonicalizes it.
    pub file: PathBuf,
    /// Starting byte offset into the file content (inclusive).
    pub offset: usize,
    /// Number of bytes to remove starting at `offset`.
    pub length: usize,
    /// Text inserted in place of the removed span.
    pub replacement: String,
    /// Human-facing description of the fix. Not interpreted by the engine.
    pub note: String,
}

impl Edit {
    pub fn new(
        file: impl Into<PathBuf>,
        offset: usize,
        length: usize,
        replacement: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            offset,
            length,
            replacement: replacement.into(),
            note: note.into(),
        }
    }

    /// End of the replaced span (exclusive). Saturates rather than wrapping
    /// so a hostile `usize::MAX` length cannot sneak past range checks.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    /// True iff the span `[offset, offset + length)` fits within a file of
    /// `content_len` bytes. Overflowing `offset + length` is malformed.
    pub fn is_well_formed(&self, content_len: usize) -> bool {
        match self.offset.checked_add(self.length) {
            Some(end) => end <= content_len,
            None => false,
        }
    }

    /// True iff two edits on the same file have intersecting half-open byte
    /// ranges.
    ///
    /// Two zero-length edits at the same offset count as overlapping even
    /// though their ranges are empty: the insertion order would be ambiguous,
    /// and this subsystem rejects ambiguity instead of guessing. A
    /// zero-length insertion at the boundary of another edit's range does not
    /// overlap.
    pub fn overlaps(&self, other: &Edit) -> bool {
        if self.length == 0 && other.length == 0 {
            return self.offset == other.offset;
        }
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Issue severity, ordered from least to most severe.
///
/// Informational only to the edit engine: severity never gates whether an
/// edit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Human-facing source position. Line and column are 1-based display hints;
/// byte offsets on the edits are the only patching authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// One analyzer finding.
///
/// Owns its candidate edits; edits carry no back-reference. Once the caller
/// selects edits for application they are handed to the batch coordinator as
/// a flat, issue-agnostic collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Short stable category tag, e.g. `LONG_FUNC` or `MISSING_DOC`.
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Zero edits means "detected, not auto-fixable".
    pub edits: Vec<Edit>,
}

impl Issue {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            location,
            edits: Vec::new(),
        }
    }

    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(offset: usize, length: usize) -> Edit {
        Edit::new("a.rs", offset, length, "x", "")
    }

    #[test]
    fn well_formed_within_bounds() {
        assert!(edit(0, 0).is_well_formed(0));
        assert!(edit(4, 3).is_well_formed(7));
        assert!(edit(4, 3).is_well_formed(12));
        assert!(edit(12, 0).is_well_formed(12));
    }

    #[test]
    fn well_formed_rejects_out_of_range() {
        assert!(!edit(4, 3).is_well_formed(6));
        assert!(!edit(100, 1).is_well_formed(50));
        assert!(!edit(13, 0).is_well_formed(12));
    }

    #[test]
    fn well_formed_rejects_offset_length_overflow() {
        assert!(!edit(usize::MAX, 1).is_well_formed(usize::MAX));
        assert!(!edit(1, usize::MAX).is_well_formed(usize::MAX));
    }

    #[test]
    fn overlapping_ranges_intersect() {
        // [4, 7) vs [6, 9)
        assert!(edit(4, 3).overlaps(&edit(6, 3)));
        assert!(edit(6, 3).overlaps(&edit(4, 3)));
        // containment
        assert!(edit(0, 10).overlaps(&edit(3, 2)));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        // [4, 7) vs [7, 9)
        assert!(!edit(4, 3).overlaps(&edit(7, 2)));
        assert!(!edit(7, 2).overlaps(&edit(4, 3)));
    }

    #[test]
    fn identical_insertions_overlap() {
        // Two insertions at the same offset are ambiguous.
        assert!(edit(5, 0).overlaps(&edit(5, 0)));
        assert!(!edit(5, 0).overlaps(&edit(6, 0)));
    }

    #[test]
    fn insertion_at_range_boundary_does_not_overlap() {
        assert!(!edit(4, 0).overlaps(&edit(4, 5)));
        assert!(!edit(9, 0).overlaps(&edit(4, 5)));
    }

    #[test]
    fn insertion_inside_range_overlaps() {
        assert!(edit(6, 0).overlaps(&edit(4, 5)));
        assert!(edit(4, 5).overlaps(&edit(6, 0)));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn issue_json_round_trip() {
        let issue = Issue::new(
            "WEAK_NAME",
            Severity::Info,
            "Variable 'tmp' could be clearer",
            Location {
                file: PathBuf::from("a.rs"),
                line: 1,
                column: 5,
            },
        )
        .with_edit(Edit::new("a.rs", 4, 3, "count", "Rename at declaration"));

        let json = serde_json::to_string(&issue).unwrap();
        let back: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(issue, back);
    }
}
