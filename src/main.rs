use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use srcfix::{
    plan, run_batch, splice, AnalyzeOptions, Analyzer, BatchOptions, Edit, FailurePolicy,
    HeuristicSuggester, Issue, TextAnalyzer,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Source file extensions the analyzers understand.
const SOURCE_EXTENSIONS: &[&str] = &["rs", "c", "cc", "cxx", "cpp", "h", "hh", "hpp"];

#[derive(Parser)]
#[command(name = "srcfix")]
#[command(about = "Analyze source trees and apply byte-span fixes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Source files or directories to analyze (directories are recursed)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Long function threshold (lines)
    #[arg(long = "long-fn", default_value_t = 80)]
    long_fn: usize,

    /// Disable doc stub suggestions
    #[arg(long)]
    no_docs: bool,

    /// Disable variable naming suggestions
    #[arg(long)]
    no_names: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze sources and report issues without modifying anything
    Check {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Emit issues as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Analyze sources and apply the available fixes
    Fix {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Do not write .bak backups before patching
        #[arg(long)]
        no_backup: bool,

        /// Plan and splice in memory, but write nothing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Keep patching remaining files after one file fails
        #[arg(long)]
        best_effort: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { analyze, json } => cmd_check(analyze, json),
        Commands::Fix {
            analyze,
            no_backup,
            dry_run,
            diff,
            best_effort,
        } => cmd_fix(analyze, no_backup, dry_run, diff, best_effort),
    }
}

/// Expand files and directories into a sorted list of analyzable sources.
fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && is_source_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();

    if files.is_empty() {
        anyhow::bail!("no source files found under the given paths");
    }

    Ok(files)
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn analyze(args: &AnalyzeArgs) -> Result<Vec<Issue>> {
    let files = expand_paths(&args.paths)?;
    let opts = AnalyzeOptions {
        long_function_line_threshold: args.long_fn,
        suggest_docs: !args.no_docs,
        suggest_names: !args.no_names,
    };

    let issues = TextAnalyzer::new().analyze(&files, &opts, &HeuristicSuggester::new())?;
    Ok(issues)
}

fn severity_tag(issue: &Issue) -> colored::ColoredString {
    match issue.severity {
        srcfix::Severity::Info => issue.severity.to_string().cyan(),
        srcfix::Severity::Warning => issue.severity.to_string().yellow(),
        srcfix::Severity::Error => issue.severity.to_string().red(),
    }
}

fn print_issues(issues: &[Issue]) {
    for issue in issues {
        println!(
            "{}: {} [{}] {}",
            issue.location,
            severity_tag(issue),
            issue.id.bold(),
            issue.message
        );
        for edit in &issue.edits {
            println!(
                "  {} {} (offset {}, len {})",
                "fix:".green(),
                edit.note,
                edit.offset,
                edit.length
            );
        }
    }
}

fn cmd_check(args: AnalyzeArgs, json: bool) -> Result<()> {
    let issues = analyze(&args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(());
    }

    print_issues(&issues);

    let fixable = issues.iter().filter(|i| !i.edits.is_empty()).count();
    println!();
    println!(
        "{} issues ({} auto-fixable). Run `srcfix fix` to apply fixes.",
        issues.len(),
        fixable
    );

    Ok(())
}

fn cmd_fix(
    args: AnalyzeArgs,
    no_backup: bool,
    dry_run: bool,
    show_diff: bool,
    best_effort: bool,
) -> Result<()> {
    let issues = analyze(&args)?;
    print_issues(&issues);
    println!();

    let edits: Vec<Edit> = issues.into_iter().flat_map(|i| i.edits).collect();
    if edits.is_empty() {
        println!("No auto-fixable issues.");
        return Ok(());
    }

    if dry_run {
        return preview(edits, show_diff);
    }

    // Capture pre-apply contents for diff output before anything is written.
    let mut before: HashMap<PathBuf, String> = HashMap::new();
    if show_diff {
        for edit in &edits {
            if !before.contains_key(&edit.file) {
                if let Ok(content) = fs::read_to_string(&edit.file) {
                    before.insert(edit.file.clone(), content);
                }
            }
        }
    }

    let options = BatchOptions {
        backup: !no_backup,
        policy: if best_effort {
            FailurePolicy::BestEffort
        } else {
            FailurePolicy::FailFast
        },
    };
    let report = run_batch(edits, &options);

    for file in &report.patched {
        println!("{} patched {}", "✓".green(), file.display());

        if show_diff {
            if let (Some(old), Ok(new)) = (before.get(file), fs::read_to_string(file)) {
                if old != &new {
                    display_diff(file, old, &new);
                }
            }
        }
    }
    for failure in &report.failures {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            failure.file.display(),
            failure.error
        );
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{}", report.patched.len()).green());
    println!("  {} failed", format!("{}", report.failures.len()).red());

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Dry run: plan and splice in memory, report per-file outcomes, write
/// nothing.
fn preview(edits: Vec<Edit>, show_diff: bool) -> Result<()> {
    println!("{}", "[DRY RUN - no files will be modified]".cyan());

    let mut snapshots: HashMap<PathBuf, Vec<u8>> = HashMap::new();
    for edit in &edits {
        if !snapshots.contains_key(&edit.file) {
            snapshots.insert(edit.file.clone(), fs::read(&edit.file)?);
        }
    }
    let lengths = snapshots
        .iter()
        .map(|(f, c)| (f.clone(), c.len()))
        .collect();

    let outcome = plan(edits, &lengths);
    let mut failed = outcome.failures.len();

    for (file, set) in &outcome.plans {
        match splice(set, &snapshots[file]) {
            Ok(new_content) => {
                println!(
                    "{} would patch {} ({} edits)",
                    "✓".green(),
                    file.display(),
                    set.len()
                );
                if show_diff {
                    let old = String::from_utf8_lossy(&snapshots[file]);
                    let new = String::from_utf8_lossy(&new_content);
                    display_diff(file, &old, &new);
                }
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                failed += 1;
            }
        }
    }
    for (file, error) in &outcome.failures {
        eprintln!("{} {}: {}", "✗".red(), file.display(), error);
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Show unified diff between original and modified content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
