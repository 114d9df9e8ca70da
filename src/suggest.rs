//! Naming and documentation suggestions.
//!
//! A [`SuggestionProvider`] offers two independent, side-effect-free queries;
//! returning `None` is sanctioned, not an error. The built-in
//! [`HeuristicSuggester`] needs no model or network and is always available.

/// Source of replacement text for analyzer fixes.
pub trait SuggestionProvider {
    /// Suggest a clearer identifier given the current name plus lightweight
    /// type/usage hints. `None` means the current name is fine (or no better
    /// idea).
    fn suggest_identifier(
        &self,
        current: &str,
        type_hint: &str,
        usage_hint: &str,
    ) -> Option<String>;

    /// Produce a short documentation stub for a callable signature.
    fn doc_for_signature(&self, signature: &str) -> Option<String>;
}

/// Rule-based suggester: flags throwaway names and maps type keywords to
/// conventional identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSuggester;

impl HeuristicSuggester {
    pub fn new() -> Self {
        Self
    }

    fn is_weak_name(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        matches!(lower.as_str(), "tmp" | "data" | "foo" | "bar") || name.len() <= 2
    }
}

impl SuggestionProvider for HeuristicSuggester {
    fn suggest_identifier(
        &self,
        current: &str,
        type_hint: &str,
        usage_hint: &str,
    ) -> Option<String> {
        if !Self::is_weak_name(current) {
            return None;
        }

        let t = type_hint.to_ascii_lowercase();
        for (keyword, suggestion) in [
            ("bool", "flag"),
            ("str", "text"),
            ("string", "text"),
            ("vec", "values"),
            ("map", "lookup"),
            ("set", "items"),
            ("usize", "count"),
            ("size_t", "count"),
            ("int", "count"),
            ("float", "value"),
            ("double", "value"),
            ("f32", "value"),
            ("f64", "value"),
            ("char", "ch"),
        ] {
            if t.contains(keyword) {
                return Some(suggestion.to_string());
            }
        }

        // Fallback: combine usage and type hints, sanitized down to a valid
        // identifier.
        let base = if usage_hint.is_empty() {
            t
        } else {
            format!("{}_{}", usage_hint.to_ascii_lowercase(), t)
        };
        let base = if base.is_empty() {
            "value".to_string()
        } else {
            base
        };

        let mut out = String::with_capacity(base.len() + 1);
        for c in base.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        let out = out.trim_end_matches('_').to_string();
        let out = if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
            format!("_{out}")
        } else {
            out
        };
        Some(out)
    }

    fn doc_for_signature(&self, signature: &str) -> Option<String> {
        let mut out = String::new();
        out.push_str("/**\n");
        out.push_str(&format!(" * @brief TODO: describe {signature}\n"));
        out.push_str(
            " * @details Auto-generated doc stub. Fill in behavior, edge cases, and invariants.\n",
        );
        out.push_str(" */\n");
        Some(out)
    }
}

/// Provider that never suggests anything. Useful for disabling suggestion
/// passes without branching at every call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSuggester;

impl SuggestionProvider for NullSuggester {
    fn suggest_identifier(&self, _: &str, _: &str, _: &str) -> Option<String> {
        None
    }

    fn doc_for_signature(&self, _: &str) -> Option<String> {
        None
    }
}
