//! Batch coordination: plan then apply across every touched file.
//!
//! One batch is one caller-initiated run of a flat edit collection. The
//! coordinator snapshots each touched file immediately before planning (so a
//! file that changed since analysis fails with a clean range error instead of
//! silently corrupting output), plans the whole collection once, then applies
//! per-file plans in deterministic path order.
//!
//! A multi-file batch is atomic per file, never across files: files written
//! before a failure stay written, and backups are the recovery path. Under
//! [`FailurePolicy::FailFast`] the first failing file stops the batch; under
//! [`FailurePolicy::BestEffort`] every file is attempted and every failure
//! reported.

use crate::apply::{apply, ApplyError};
use crate::model::Edit;
use crate::plan::{plan, PlanError};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// What to do with the rest of the batch after one file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing file. Files already written stay written.
    #[default]
    FailFast,
    /// Attempt every file; report every failure.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Persist a `.bak` copy of each file before mutating it.
    pub backup: bool,
    pub policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            backup: true,
            policy: FailurePolicy::FailFast,
        }
    }
}

/// File-scoped batch failure. Nothing here is fatal to the process; a
/// failing file simply does not get patched, and the caller is told why.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: BatchError,
}

/// Per-file outcomes of one batch run.
#[derive(Debug, Default)]
#[must_use = "a BatchReport carries the per-file failures of the run"]
pub struct BatchReport {
    /// Files fully rewritten, in the order they were patched.
    pub patched: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plan and apply a flat edit collection.
///
/// Touched files are processed in path order, which makes "files written
/// before the failing file" well defined under fail-fast. Each file's
/// snapshot is read exactly once, right before planning, and the same bytes
/// are spliced at apply time; nothing is re-read mid-apply.
pub fn run_batch(edits: Vec<Edit>, options: &BatchOptions) -> BatchReport {
    let mut report = BatchReport::default();
    if edits.is_empty() {
        return report;
    }

    // Snapshot every touched file. Unreadable files are recorded now and
    // their edits withheld from planning so each file surfaces one error.
    let mut snapshots: BTreeMap<PathBuf, Vec<u8>> = BTreeMap::new();
    let mut read_failures: BTreeMap<PathBuf, std::io::Error> = BTreeMap::new();
    for edit in &edits {
        if snapshots.contains_key(&edit.file) || read_failures.contains_key(&edit.file) {
            continue;
        }
        match fs::read(&edit.file) {
            Ok(content) => {
                snapshots.insert(edit.file.clone(), content);
            }
            Err(err) => {
                warn!(file = %edit.file.display(), error = %err, "cannot snapshot file");
                read_failures.insert(edit.file.clone(), err);
            }
        }
    }

    let lengths = snapshots
        .iter()
        .map(|(file, content)| (file.clone(), content.len()))
        .collect();
    let plannable = edits
        .into_iter()
        .filter(|e| snapshots.contains_key(&e.file))
        .collect();
    let mut outcome = plan(plannable, &lengths);

    // Walk every touched file in path order, merging read, plan, and apply
    // outcomes into one sequence of per-file results.
    let files: Vec<PathBuf> = read_failures
        .keys()
        .chain(outcome.plans.keys())
        .chain(outcome.failures.keys())
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    for file in files {
        let result = if let Some(source) = read_failures.remove(&file) {
            Err(BatchError::Read {
                path: file.clone(),
                source,
            })
        } else if let Some(err) = outcome.failures.remove(&file) {
            Err(BatchError::Plan(err))
        } else {
            let set = outcome
                .plans
                .remove(&file)
                .expect("file is either planned or failed");
            let content = &snapshots[&file];
            apply(&set, content, options.backup)
                .map(|_| ())
                .map_err(BatchError::Apply)
        };

        match result {
            Ok(()) => {
                debug!(file = %file.display(), "patched");
                report.patched.push(file);
            }
            Err(error) => {
                warn!(file = %file.display(), error = %error, "batch failure");
                report.failures.push(FileFailure { file, error });
                if options.policy == FailurePolicy::FailFast {
                    break;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::backup_path;
    use tempfile::TempDir;

    fn no_backup(policy: FailurePolicy) -> BatchOptions {
        BatchOptions {
            backup: false,
            policy,
        }
    }

    fn write_files(dir: &TempDir, files: &[(&str, &str)]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, content)| {
                let path = dir.path().join(name);
                fs::write(&path, content).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn patches_multiple_files() {
        let dir = TempDir::new().unwrap();
        let paths = write_files(&dir, &[("a.c", "int tmp = 0;"), ("b.c", "hello world")]);

        let edits = vec![
            Edit::new(&paths[0], 4, 3, "count", ""),
            Edit::new(&paths[1], 0, 5, "HELLO", ""),
            Edit::new(&paths[1], 11, 0, "!", ""),
        ];
        let report = run_batch(edits, &no_backup(FailurePolicy::FailFast));

        assert!(report.is_success());
        assert_eq!(report.patched.len(), 2);
        assert_eq!(fs::read(&paths[0]).unwrap(), b"int count = 0;");
        assert_eq!(fs::read(&paths[1]).unwrap(), b"HELLO world!");
    }

    #[test]
    fn fail_fast_stops_after_first_failing_file() {
        let dir = TempDir::new().unwrap();
        let paths = write_files(
            &dir,
            &[("a.c", "aaaa aaaa"), ("b.c", "bbbb bbbb"), ("c.c", "cccc cccc")],
        );

        let edits = vec![
            Edit::new(&paths[0], 0, 4, "AAAA", ""),
            // Overlapping pair poisons b.c.
            Edit::new(&paths[1], 0, 4, "x", ""),
            Edit::new(&paths[1], 2, 4, "y", ""),
            Edit::new(&paths[2], 0, 4, "CCCC", ""),
        ];
        let report = run_batch(edits, &no_backup(FailurePolicy::FailFast));

        assert!(!report.is_success());
        assert_eq!(report.patched, vec![paths[0].clone()]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            BatchError::Plan(PlanError::Overlap { .. })
        ));
        // a.c was written before the failure and stays written; c.c was
        // never reached.
        assert_eq!(fs::read(&paths[0]).unwrap(), b"AAAA aaaa");
        assert_eq!(fs::read(&paths[1]).unwrap(), b"bbbb bbbb");
        assert_eq!(fs::read(&paths[2]).unwrap(), b"cccc cccc");
    }

    #[test]
    fn best_effort_patches_around_the_failure() {
        let dir = TempDir::new().unwrap();
        let paths = write_files(
            &dir,
            &[("a.c", "aaaa aaaa"), ("b.c", "bbbb bbbb"), ("c.c", "cccc cccc")],
        );

        let edits = vec![
            Edit::new(&paths[0], 0, 4, "AAAA", ""),
            Edit::new(&paths[1], 100, 1, "x", ""),
            Edit::new(&paths[2], 0, 4, "CCCC", ""),
        ];
        let report = run_batch(edits, &no_backup(FailurePolicy::BestEffort));

        assert_eq!(report.patched.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            BatchError::Plan(PlanError::OutOfRange { .. })
        ));
        assert_eq!(fs::read(&paths[2]).unwrap(), b"CCCC cccc");
    }

    #[test]
    fn unreadable_file_is_a_read_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.c");

        let edits = vec![Edit::new(&missing, 0, 1, "x", "")];
        let report = run_batch(edits, &no_backup(FailurePolicy::FailFast));

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, BatchError::Read { .. }));
    }

    #[test]
    fn backup_round_trip() {
        let dir = TempDir::new().unwrap();
        let paths = write_files(&dir, &[("a.c", "int tmp = 0;")]);

        let edits = vec![Edit::new(&paths[0], 4, 3, "count", "")];
        let report = run_batch(edits, &BatchOptions::default());

        assert!(report.is_success());
        assert_eq!(fs::read(&paths[0]).unwrap(), b"int count = 0;");
        assert_eq!(fs::read(backup_path(&paths[0])).unwrap(), b"int tmp = 0;");
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let report = run_batch(vec![], &BatchOptions::default());
        assert!(report.is_success());
        assert!(report.patched.is_empty());
    }
}
