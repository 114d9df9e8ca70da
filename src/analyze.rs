//! Built-in source analyzers.
//!
//! An [`Analyzer`] is anything that yields [`Issue`]s; the edit engine only
//! consumes the producer contract and never cares how findings were made.
//!
//! The built-in [`TextAnalyzer`] is deliberately a line heuristic, not a
//! parser: it tracks brace depth and token shapes on C-like and Rust-like
//! sources, and every fix offset it emits is a byte offset into the exact
//! bytes it read. Braces inside string literals will confuse it; that is an
//! accepted limitation of heuristic scanning.

use crate::model::{Edit, Issue, Location, Severity};
use crate::suggest::SuggestionProvider;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Functions spanning at least this many lines are reported.
    pub long_function_line_threshold: usize,
    /// Emit doc-stub insertion fixes for undocumented functions.
    pub suggest_docs: bool,
    /// Emit rename fixes for weakly named declarations.
    pub suggest_names: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            long_function_line_threshold: 80,
            suggest_docs: true,
            suggest_names: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Producer contract: scan files, emit issues. Zero issues and zero edits
/// per issue are both valid outcomes.
pub trait Analyzer {
    fn analyze(
        &self,
        files: &[PathBuf],
        opts: &AnalyzeOptions,
        suggester: &dyn SuggestionProvider,
    ) -> Result<Vec<Issue>, AnalyzeError>;
}

/// Line-heuristic analyzer with three rules:
///
/// - `LONG_FUNC` — function body spans at least the configured line count
///   (detected, not auto-fixable).
/// - `MISSING_DOC` — function with no comment line directly above; fix is a
///   zero-length insertion of the suggester's doc stub.
/// - `WEAK_NAME` — declaration with a throwaway name; fix replaces the name
///   token at its declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAnalyzer;

impl TextAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for TextAnalyzer {
    fn analyze(
        &self,
        files: &[PathBuf],
        opts: &AnalyzeOptions,
        suggester: &dyn SuggestionProvider,
    ) -> Result<Vec<Issue>, AnalyzeError> {
        let mut issues = Vec::new();

        for path in files {
            let bytes = fs::read(path).map_err(|source| AnalyzeError::Read {
                path: path.clone(),
                source,
            })?;
            let Ok(source) = std::str::from_utf8(&bytes) else {
                warn!(file = %path.display(), "skipping non-UTF-8 file");
                continue;
            };

            let before = issues.len();
            analyze_source(path, source, opts, suggester, &mut issues);
            debug!(
                file = %path.display(),
                issues = issues.len() - before,
                "analyzed file"
            );
        }

        Ok(issues)
    }
}

/// A line of source plus the byte offset of its first character.
struct OffsetLine<'a> {
    offset: usize,
    text: &'a str,
}

fn offset_lines(source: &str) -> Vec<OffsetLine<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for text in source.split_inclusive('\n') {
        let trimmed = text.strip_suffix('\n').unwrap_or(text);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        lines.push(OffsetLine {
            offset,
            text: trimmed,
        });
        offset += text.len();
    }
    lines
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*') || t.starts_with('#')
}

fn first_word(line: &str) -> &str {
    line.trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("")
}

/// A line opens a function if it carries a parameter list and an opening
/// brace and is not a control-flow construct.
fn opens_function(line: &str) -> bool {
    let t = line.trim();
    if !t.ends_with('{') || !t.contains('(') || is_comment_line(t) {
        return false;
    }
    !matches!(
        first_word(t),
        "if" | "else" | "for" | "while" | "switch" | "match" | "loop" | "do" | "return"
    )
}

fn brace_delta(line: &str) -> i64 {
    let opens = line.matches('{').count() as i64;
    let closes = line.matches('}').count() as i64;
    opens - closes
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn analyze_source(
    path: &Path,
    source: &str,
    opts: &AnalyzeOptions,
    suggester: &dyn SuggestionProvider,
    out: &mut Vec<Issue>,
) {
    let lines = offset_lines(source);

    let mut idx = 0;
    while idx < lines.len() {
        let line = &lines[idx];
        if opens_function(line.text) {
            let span = function_span(&lines, idx);
            check_function(path, &lines, idx, span, opts, suggester, out);
        }
        if opts.suggest_names {
            check_declaration(path, line, idx, suggester, out);
        }
        idx += 1;
    }
}

/// Count lines from the signature line to the one that closes its brace.
fn function_span(lines: &[OffsetLine<'_>], start: usize) -> usize {
    let mut depth = 0i64;
    for (i, line) in lines.iter().enumerate().skip(start) {
        depth += brace_delta(line.text);
        if depth <= 0 {
            return i - start + 1;
        }
    }
    lines.len() - start
}

fn check_function(
    path: &Path,
    lines: &[OffsetLine<'_>],
    start: usize,
    span: usize,
    opts: &AnalyzeOptions,
    suggester: &dyn SuggestionProvider,
    out: &mut Vec<Issue>,
) {
    let signature = lines[start].text.trim().trim_end_matches('{').trim();
    let location = Location {
        file: path.to_path_buf(),
        line: start + 1,
        column: 1,
    };

    if span >= opts.long_function_line_threshold {
        out.push(Issue::new(
            "LONG_FUNC",
            Severity::Warning,
            format!(
                "Function `{signature}` is {span} lines (threshold {})",
                opts.long_function_line_threshold
            ),
            location.clone(),
        ));
    }

    // A comment directly above counts as documentation.
    let documented = start > 0 && is_comment_line(lines[start - 1].text);
    if !documented {
        let mut issue = Issue::new(
            "MISSING_DOC",
            Severity::Info,
            format!("Missing API docs for `{signature}`"),
            location,
        );
        if opts.suggest_docs {
            if let Some(stub) = suggester.doc_for_signature(signature) {
                issue = issue.with_edit(Edit::new(
                    path,
                    lines[start].offset,
                    0,
                    stub,
                    "Insert doc stub",
                ));
            }
        }
        out.push(issue);
    }
}

/// Spot `<type> name = ...` / `let name[: ty] = ...` declarations with a
/// weak name and offer a rename at the declaration token only.
fn check_declaration(
    path: &Path,
    line: &OffsetLine<'_>,
    idx: usize,
    suggester: &dyn SuggestionProvider,
    out: &mut Vec<Issue>,
) {
    if is_comment_line(line.text) {
        return;
    }
    let Some(eq) = assignment_eq(line.text) else {
        return;
    };

    let lhs = &line.text[..eq];
    let (name, type_hint) = match split_declaration(lhs) {
        Some(parts) => parts,
        None => return,
    };

    // Conventional loop counters are fine.
    if matches!(name, "i" | "j" | "k") {
        return;
    }

    let Some(suggestion) = suggester.suggest_identifier(name, type_hint, "") else {
        return;
    };

    // The name token is the last occurrence of that word before `=`.
    let Some(pos) = lhs.rfind(name) else {
        return;
    };

    out.push(
        Issue::new(
            "WEAK_NAME",
            Severity::Info,
            format!("Variable `{name}` could be clearer, e.g. `{suggestion}`"),
            Location {
                file: path.to_path_buf(),
                line: idx + 1,
                column: pos + 1,
            },
        )
        .with_edit(Edit::new(
            path,
            line.offset + pos,
            name.len(),
            suggestion,
            "Rename at declaration",
        )),
    );
}

/// Byte index of a plain assignment `=`, rejecting `==`, `<=`, `+=`, `=>`
/// and friends.
fn assignment_eq(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        let compound = |c: Option<u8>| {
            matches!(
                c,
                Some(b'=' | b'<' | b'>' | b'!' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^')
            )
        };
        if compound(prev) || next == Some(b'=') || next == Some(b'>') {
            return None;
        }
        return Some(i);
    }
    None
}

/// Split the left-hand side of a declaration into (name, type hint).
/// Returns `None` for plain re-assignments, which are not declarations.
fn split_declaration(lhs: &str) -> Option<(&str, &str)> {
    if let Some(colon) = lhs.find(':') {
        // `let tmp: i32`
        let name = lhs[..colon].split_whitespace().last()?;
        let name = name.trim_start_matches(['*', '&']);
        let ty = lhs[colon + 1..].trim();
        return is_identifier(name).then_some((name, ty));
    }

    let words: Vec<&str> = lhs.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let name = words[words.len() - 1].trim_start_matches(['*', '&']);
    if !is_identifier(name) {
        return None;
    }

    // `let tmp` / `var tmp`: declaration keyword, type unknown.
    let candidate = words[words.len() - 2];
    let ty = if matches!(candidate, "let" | "var" | "auto" | "mut" | "const" | "static") {
        ""
    } else {
        candidate
    };
    Some((name, ty))
}
