//! Srcfix: source analysis with a hardened edit-application core
//!
//! Pluggable analyzers scan source trees and emit structured [`Issue`]s,
//! each optionally carrying candidate [`Edit`]s. A separate engine applies
//! accepted edits back onto the original files.
//!
//! # Architecture
//!
//! Everything compiles down to one primitive: [`Edit`], a byte-span
//! replacement against one file's known content. The hardened path is
//! plan-then-apply:
//!
//! - [`plan`](plan::plan) groups a flat edit collection by file, rejects
//!   out-of-range and overlapping edits per file, and orders survivors by
//!   descending offset so no applied edit can shift a pending edit's offset.
//! - [`apply`](apply::apply) splices a planned set into fresh content and
//!   writes it with backup-then-atomic-write discipline.
//! - [`run_batch`](batch::run_batch) drives both across all touched files
//!   with fail-fast or best-effort policy. Batches are atomic per file,
//!   never across files.
//!
//! # Safety
//!
//! - Overlapping edits are rejected whole-file; competing fixes are never
//!   resolved by guessing
//! - Edit ranges are re-validated against the bytes actually on disk, so
//!   stale offsets become clean range errors instead of corruption
//! - Atomic file writes (tempfile + fsync + rename)
//! - Opt-out `.bak` backups, written before the live file is touched and
//!   never auto-deleted
//!
//! # Example
//!
//! ```no_run
//! use srcfix::{run_batch, BatchOptions, Edit};
//!
//! let edits = vec![Edit::new("src/main.c", 4, 3, "count", "rename tmp")];
//! let report = run_batch(edits, &BatchOptions::default());
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.file.display(), failure.error);
//! }
//! ```

pub mod analyze;
pub mod apply;
pub mod batch;
pub mod model;
pub mod plan;
pub mod suggest;

// Re-exports
pub use analyze::{AnalyzeError, AnalyzeOptions, Analyzer, TextAnalyzer};
pub use apply::{apply, backup_path, splice, ApplyError, BACKUP_SUFFIX};
pub use batch::{run_batch, BatchError, BatchOptions, BatchReport, FailurePolicy, FileFailure};
pub use model::{Edit, Issue, Location, Severity};
pub use plan::{plan, FileEditSet, PlanError, PlanOutcome};
pub use suggest::{HeuristicSuggester, NullSuggester, SuggestionProvider};
