//! Applying a planned edit set to one file.
//!
//! Splicing is pure: original bytes in, new bytes out, built in a single
//! ascending pass over a fresh buffer (copy untouched span, splice
//! replacement, repeat). No in-place shrink/grow bookkeeping, and the
//! original content is never mutated.
//!
//! Disk writes follow the backup-then-atomic-write discipline: when a backup
//! is requested it must land before the live file is touched, and the live
//! file is replaced via tempfile + fsync + rename, so the caller either sees
//! the fully updated file or the original. A partially-written file is a
//! defect, not an acceptable outcome.

use crate::plan::FileEditSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Suffix appended to a patched file's name for its backup artifact.
pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Error, Debug)]
pub enum ApplyError {
    /// An edit no longer fits the content it is being applied to. Most often
    /// staleness: the file changed between offset computation and apply.
    #[error(
        "edit range [{offset}, {offset}+{length}) exceeds content length {content_len}; \
         content may have changed since offsets were computed"
    )]
    Range {
        offset: usize,
        length: usize,
        content_len: usize,
    },

    #[error("failed to write backup {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Backup artifact path for `path`: the same file name with
/// [`BACKUP_SUFFIX`] appended (`src/lib.rs` -> `src/lib.rs.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Compute the new content for one file, without touching disk.
///
/// Every edit range is re-validated against `content` before any byte is
/// produced, so stale offsets surface as [`ApplyError::Range`] with the
/// original content intact, never as silent corruption.
pub fn splice(set: &FileEditSet, content: &[u8]) -> Result<Vec<u8>, ApplyError> {
    for edit in set.edits() {
        if !edit.is_well_formed(content.len()) {
            return Err(ApplyError::Range {
                offset: edit.offset,
                length: edit.length,
                content_len: content.len(),
            });
        }
    }

    let grown: usize = set.edits().iter().map(|e| e.replacement.len()).sum();
    let mut out = Vec::with_capacity(content.len() + grown);

    // The set is ordered highest-offset-first; walk it back-to-front so the
    // output is assembled in one ascending pass.
    let mut cursor = 0;
    for edit in set.edits().iter().rev() {
        debug_assert!(edit.offset >= cursor, "planned edits must not overlap");
        out.extend_from_slice(&content[cursor..edit.offset]);
        out.extend_from_slice(edit.replacement.as_bytes());
        cursor = edit.end();
    }
    out.extend_from_slice(&content[cursor..]);

    Ok(out)
}

/// Apply one file's planned edits to disk.
///
/// `content` is the snapshot the batch read for this file; it is spliced, not
/// re-read. With `backup` set, an exact copy of `content` is persisted at
/// [`backup_path`] before the live file is touched, and a backup failure
/// aborts the apply with the file unmodified. Backups are never deleted by
/// this subsystem, so the caller always keeps a manual recovery path.
///
/// Returns the new content on success.
pub fn apply(set: &FileEditSet, content: &[u8], backup: bool) -> Result<Vec<u8>, ApplyError> {
    let new_content = splice(set, content)?;

    if backup {
        let bak = backup_path(set.file());
        fs::write(&bak, content).map_err(|source| ApplyError::Backup { path: bak.clone(), source })?;
        debug!(backup = %bak.display(), "wrote backup");
    }

    atomic_write(set.file(), &new_content)?;

    // Bump mtime so incremental build tools notice the change. Non-fatal:
    // the rename already landed the new content with a fresh timestamp, and
    // failing the apply here would misreport a fully-written file.
    let now = filetime::FileTime::now();
    let _ = filetime::set_file_mtime(set.file(), now);

    debug!(
        file = %set.file().display(),
        edits = set.len(),
        bytes = new_content.len(),
        "applied edit set"
    );

    Ok(new_content)
}

/// Atomic file write: tempfile in the target's directory + fsync + rename.
///
/// Either the full write succeeds or the original file is left valid.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), ApplyError> {
    let io_err = |source| ApplyError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
        io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edit;
    use crate::plan::plan;
    use std::collections::HashMap;

    fn planned(edits: Vec<Edit>, content_len: usize) -> FileEditSet {
        let file = edits[0].file.clone();
        let lengths: HashMap<_, _> = [(file.clone(), content_len)].into();
        let mut outcome = plan(edits, &lengths);
        outcome.plans.remove(&file).expect("plan should succeed")
    }

    #[test]
    fn single_replacement() {
        // "int tmp = 0;" -> "int count = 0;"
        let content = b"int tmp = 0;";
        let set = planned(
            vec![Edit::new("a.c", 4, 3, "count", "rename")],
            content.len(),
        );
        let out = splice(&set, content).unwrap();
        assert_eq!(out, b"int count = 0;");
    }

    #[test]
    fn insertion_and_replacement_without_offset_drift() {
        // Insertion at 10 plus a different-length replacement at 4: the
        // descending apply order keeps both landing on target.
        let content = b"int tmp = 0;";
        let set = planned(
            vec![
                Edit::new("a.c", 10, 0, "X", "insert"),
                Edit::new("a.c", 4, 3, "count", "rename"),
            ],
            content.len(),
        );
        let out = splice(&set, content).unwrap();
        assert_eq!(out, b"int count = X0;");
    }

    #[test]
    fn pure_deletion_and_insertion_at_end() {
        let content = b"hello world";
        let set = planned(
            vec![
                Edit::new("a.c", 5, 6, "", "drop tail"),
                Edit::new("a.c", 11, 0, "!", "punctuate"),
            ],
            content.len(),
        );
        let out = splice(&set, content).unwrap();
        assert_eq!(out, b"hello!");
    }

    #[test]
    fn empty_batch_plans_nothing() {
        let lengths: HashMap<_, _> = [(PathBuf::from("a.c"), 9usize)].into();
        let outcome = plan(vec![], &lengths);
        assert!(outcome.plans.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn stale_content_yields_range_error() {
        let set = planned(vec![Edit::new("a.c", 8, 4, "zzzz", "")], 20);
        // File shrank after planning.
        let stale = b"short";
        match splice(&set, stale) {
            Err(ApplyError::Range { content_len, .. }) => assert_eq!(content_len, 5),
            other => panic!("expected range error, got {other:?}"),
        }
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("src/lib.rs")),
            PathBuf::from("src/lib.rs.bak")
        );
    }

    #[test]
    fn apply_writes_file_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, b"int tmp = 0;").unwrap();

        let content = fs::read(&file).unwrap();
        let set = planned(
            vec![Edit::new(&file, 4, 3, "count", "rename")],
            content.len(),
        );

        let new_content = apply(&set, &content, true).unwrap();
        assert_eq!(new_content, b"int count = 0;");
        assert_eq!(fs::read(&file).unwrap(), b"int count = 0;");
        // Backup holds the exact pre-apply bytes.
        assert_eq!(fs::read(backup_path(&file)).unwrap(), b"int tmp = 0;");
    }

    #[test]
    fn apply_without_backup_writes_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, b"hello world").unwrap();

        let content = fs::read(&file).unwrap();
        let set = planned(vec![Edit::new(&file, 0, 5, "HELLO", "")], content.len());

        apply(&set, &content, false).unwrap();
        assert_eq!(fs::read(&file).unwrap(), b"HELLO world");
        assert!(!backup_path(&file).exists());
    }

    #[test]
    fn backup_failure_aborts_with_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, b"int tmp = 0;").unwrap();
        // A directory squatting on the backup path makes the backup write
        // fail before the live file is touched.
        fs::create_dir(backup_path(&file)).unwrap();

        let content = fs::read(&file).unwrap();
        let set = planned(
            vec![Edit::new(&file, 4, 3, "count", "rename")],
            content.len(),
        );

        assert!(matches!(
            apply(&set, &content, true),
            Err(ApplyError::Backup { .. })
        ));
        assert_eq!(fs::read(&file).unwrap(), b"int tmp = 0;");
    }

    #[test]
    #[cfg(unix)]
    fn write_failure_leaves_original_valid() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, b"int tmp = 0;").unwrap();

        let content = fs::read(&file).unwrap();
        let set = planned(
            vec![Edit::new(&file, 4, 3, "count", "rename")],
            content.len(),
        );

        // A read-only parent directory blocks the tempfile the atomic write
        // stages in; the original must survive the failed replacement.
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        let result = apply(&set, &content, false);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(ApplyError::Write { .. })));
        assert_eq!(fs::read(&file).unwrap(), b"int tmp = 0;");
    }

    #[test]
    fn range_failure_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        fs::write(&file, b"0123456789").unwrap();

        // Planned against a longer snapshot, applied against the real bytes.
        let set = planned(vec![Edit::new(&file, 40, 2, "xx", "")], 50);
        let content = fs::read(&file).unwrap();

        assert!(matches!(
            apply(&set, &content, true),
            Err(ApplyError::Range { .. })
        ));
        assert_eq!(fs::read(&file).unwrap(), b"0123456789");
        assert!(!backup_path(&file).exists());
    }
}
