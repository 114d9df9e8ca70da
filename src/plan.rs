//! Edit batch planning: grouping, validation, and apply ordering.
//!
//! The planner turns a flat, unordered collection of edits (possibly spanning
//! many files, possibly containing conflicts) into one validated, ordered
//! [`FileEditSet`] per file, or a precise per-file [`PlanError`].
//!
//! # Hard rules (never violate)
//!
//! 1. **No guessing between competing edits**: any overlapping pair fails the
//!    whole file's plan. The caller re-selects; the planner never resolves.
//! 2. **Descending apply order**: edits are sorted by descending offset so
//!    that applying one edit can never shift the offsets of edits still
//!    pending (mutation only moves positions *after* the mutated span).
//! 3. **Per-file independence**: one file's validation failure never affects
//!    another file's plan.

use crate::model::Edit;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// A validated, ordered, per-file bundle of edits ready to apply.
///
/// Edits are held in descending-offset order (ties broken by descending
/// length, then arrival order). The ordering is an invariant the applier
/// depends on, so the list is not publicly mutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEditSet {
    file: PathBuf,
    edits: Vec<Edit>,
}

impl FileEditSet {
    pub fn file(&self) -> &PathBuf {
        &self.file
    }

    /// Edits in apply order: highest starting offset first.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Per-file planning failure.
///
/// `OutOfRange` is kept distinct from `Overlap` because it most often means
/// the file changed after offsets were computed (staleness), not that an
/// analyzer produced a conflicting fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(
        "edit range [{offset}, {offset}+{length}) exceeds content length {content_len} ({note})"
    )]
    OutOfRange {
        offset: usize,
        length: usize,
        content_len: usize,
        /// The offending edit's note, for caller-side re-selection.
        note: String,
    },

    #[error(
        "overlapping edits: `{}` at [{}, +{}) vs `{}` at [{}, +{})",
        .first.note, .first.offset, .first.length, .second.note, .second.offset, .second.length
    )]
    Overlap {
        /// The earlier-arriving edit of the conflicting pair.
        first: Edit,
        second: Edit,
    },

    #[error("no content length provided for {file}")]
    UnknownContentLength { file: PathBuf },
}

/// Outcome of planning one batch: a plan per valid file, an error per
/// invalid file. The two maps never share a key.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub plans: BTreeMap<PathBuf, FileEditSet>,
    pub failures: BTreeMap<PathBuf, PlanError>,
}

impl PlanOutcome {
    pub fn is_fully_planned(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Group, validate, and order a flat edit collection.
///
/// `content_lengths` maps each touched file to the byte length of the
/// snapshot the offsets were computed against; the caller is responsible for
/// reading files (offsets are not self-describing). Files with edits but no
/// length entry fail with [`PlanError::UnknownContentLength`].
///
/// Planning is deterministic: the same input yields the same per-file edit
/// ordering, with ties between identical (offset, length) pairs broken by
/// arrival order.
pub fn plan(edits: Vec<Edit>, content_lengths: &HashMap<PathBuf, usize>) -> PlanOutcome {
    // Group by file, preserving arrival order within each group.
    let mut groups: BTreeMap<PathBuf, Vec<Edit>> = BTreeMap::new();
    for edit in edits {
        groups.entry(edit.file.clone()).or_default().push(edit);
    }

    let mut outcome = PlanOutcome::default();

    for (file, group) in groups {
        match plan_file(&file, group, content_lengths) {
            Ok(set) => {
                debug!(file = %file.display(), edits = set.len(), "planned file");
                outcome.plans.insert(file, set);
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "plan rejected file");
                outcome.failures.insert(file, err);
            }
        }
    }

    outcome
}

fn plan_file(
    file: &PathBuf,
    group: Vec<Edit>,
    content_lengths: &HashMap<PathBuf, usize>,
) -> Result<FileEditSet, PlanError> {
    let content_len = *content_lengths
        .get(file)
        .ok_or_else(|| PlanError::UnknownContentLength { file: file.clone() })?;

    for edit in &group {
        if !edit.is_well_formed(content_len) {
            return Err(PlanError::OutOfRange {
                offset: edit.offset,
                length: edit.length,
                content_len,
                note: edit.note.clone(),
            });
        }
    }

    // Pairwise overlap check in arrival order, so the reported pair is the
    // first conflict a caller reading their own edit list would find.
    for (i, a) in group.iter().enumerate() {
        for b in &group[i + 1..] {
            if a.overlaps(b) {
                return Err(PlanError::Overlap {
                    first: a.clone(),
                    second: b.clone(),
                });
            }
        }
    }

    // Highest offset first; ties by descending length, then arrival order
    // (stable sort keeps arrival order for equal keys).
    let mut ordered = group;
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset).then(b.length.cmp(&a.length)));

    Ok(FileEditSet {
        file: file.clone(),
        edits: ordered,
    })
}
