//! Variable expansion for tool homes, exported paths and additional variables.
//!
//! References use the `${NAME}` or `$NAME` forms. A reference whose name is
//! not known is left in the text verbatim. Expansion runs repeatedly so that a
//! value which itself contains a reference gets resolved too, and stops at a
//! fixed point, on a repeated state, or after [`MAX_EXPANSION_PASSES`].

use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Upper bound on substitution passes for a single expansion.
pub const MAX_EXPANSION_PASSES: usize = 8;

#[allow(clippy::expect_used)]
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z0-9_.]+)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable reference pattern is valid")
});

/// Anything variables can be looked up in.
pub trait VariableLookup {
    /// Value of `name`, if defined.
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl VariableLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl VariableLookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl VariableLookup for IndexMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<T: VariableLookup + ?Sized> VariableLookup for &T {
    fn lookup(&self, name: &str) -> Option<&str> {
        (**self).lookup(name)
    }
}

/// Two lookups stacked: `top` shadows `base`.
#[derive(Debug, Clone, Copy)]
pub struct Layered<'a, T: ?Sized, B: ?Sized> {
    /// Consulted first
    pub top: &'a T,
    /// Fallback
    pub base: &'a B,
}

impl<'a, T: ?Sized, B: ?Sized> Layered<'a, T, B> {
    /// Stack `top` over `base`.
    #[must_use]
    pub fn new(top: &'a T, base: &'a B) -> Self {
        Self { top, base }
    }
}

impl<T, B> VariableLookup for Layered<'_, T, B>
where
    T: VariableLookup + ?Sized,
    B: VariableLookup + ?Sized,
{
    fn lookup(&self, name: &str) -> Option<&str> {
        self.top.lookup(name).or_else(|| self.base.lookup(name))
    }
}

/// How an expansion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// Another pass would not change the text.
    FixedPoint,
    /// A pass reproduced an earlier state; references form a cycle.
    Cycle,
    /// [`MAX_EXPANSION_PASSES`] ran out while the text was still changing.
    PassLimit,
}

/// Result of [`expand_with_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Expanded (possibly partially) text
    pub value: String,
    /// Why expansion stopped
    pub outcome: ExpansionOutcome,
    /// Number of passes that changed the text
    pub passes: usize,
}

impl Expansion {
    /// Whether every resolvable reference was substituted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == ExpansionOutcome::FixedPoint
    }
}

fn expand_once(text: &str, env: &(impl VariableLookup + ?Sized)) -> String {
    REFERENCE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            env.lookup(name)
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

/// Expand references in `text` against `env`, reporting how expansion ended.
pub fn expand_with_outcome(text: &str, env: &(impl VariableLookup + ?Sized)) -> Expansion {
    let mut current = text.to_string();
    let mut seen = vec![current.clone()];

    for pass in 0..MAX_EXPANSION_PASSES {
        let next = expand_once(&current, env);
        if next == current {
            return Expansion {
                value: current,
                outcome: ExpansionOutcome::FixedPoint,
                passes: pass,
            };
        }
        if seen.contains(&next) {
            tracing::debug!(text, result = %next, "Variable references form a cycle");
            return Expansion {
                value: next,
                outcome: ExpansionOutcome::Cycle,
                passes: pass + 1,
            };
        }
        seen.push(next.clone());
        current = next;
    }

    tracing::debug!(
        text,
        result = %current,
        passes = MAX_EXPANSION_PASSES,
        "Variable expansion did not settle"
    );
    Expansion {
        value: current,
        outcome: ExpansionOutcome::PassLimit,
        passes: MAX_EXPANSION_PASSES,
    }
}

/// Expand references in `text` against `env`.
///
/// Unknown references are kept verbatim. Never fails: on a cycle or when the
/// pass budget runs out the best-effort text is returned.
#[must_use]
pub fn expand(text: &str, env: &(impl VariableLookup + ?Sized)) -> String {
    expand_with_outcome(text, env).value
}

/// Expand an optional text block; `None` stays `None`.
#[must_use]
pub fn expand_opt(text: Option<&str>, env: &(impl VariableLookup + ?Sized)) -> Option<String> {
    text.map(|t| expand(t, env))
}

/// Names referenced by `text`, in first-seen order, without duplicates.
#[must_use]
pub fn references(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in REFERENCE.captures_iter(text) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2))
            && !names.iter().any(|n| n == m.as_str())
        {
            names.push(m.as_str().to_string());
        }
    }
    names
}

/// Parse an additional-variables block.
///
/// One `KEY=value` per line. Blank lines, lines starting with `#` or `!`, and
/// lines without `=` or with an empty key are skipped. Order is preserved and
/// repeated keys are all returned.
#[must_use]
pub fn parse_variables(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                return None;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(line, "Skipping variable line without '='");
                return None;
            };
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim_start().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_expand_braced_reference() {
        assert_eq!(expand("${X}", &env(&[("X", "v")])), "v");
    }

    #[test]
    fn test_expand_bare_reference() {
        assert_eq!(expand("$X/bin", &env(&[("X", "/opt")])), "/opt/bin");
    }

    #[test]
    fn test_unresolved_reference_left_verbatim() {
        assert_eq!(expand("${Y}", &env(&[])), "${Y}");
        assert_eq!(expand("a $Y b", &env(&[("X", "1")])), "a $Y b");
    }

    #[test]
    fn test_expand_one_level_of_indirection() {
        let vars = env(&[("A", "${B}/lib"), ("B", "/usr")]);
        let result = expand_with_outcome("${A}", &vars);
        assert_eq!(result.value, "/usr/lib");
        assert_eq!(result.outcome, ExpansionOutcome::FixedPoint);
        assert_eq!(result.passes, 2);
    }

    #[test]
    fn test_two_variable_cycle_terminates() {
        let vars = env(&[("X", "${Y}"), ("Y", "${X}")]);
        let result = expand_with_outcome("${X}", &vars);
        assert_eq!(result.outcome, ExpansionOutcome::Cycle);
        assert_eq!(result.value, "${X}");
        assert!(!result.is_complete());
        // Same input, same answer
        assert_eq!(expand("${X}", &vars), expand("${X}", &vars));
    }

    #[test]
    fn test_cycle_keeps_resolved_neighbours() {
        let vars = env(&[("X", "${Y}"), ("Y", "${X}"), ("Z", "z")]);
        let result = expand_with_outcome("${Z}-${X}", &vars);
        assert_eq!(result.outcome, ExpansionOutcome::Cycle);
        assert!(result.value.starts_with("z-"));
    }

    #[test]
    fn test_growing_self_reference_hits_pass_limit() {
        let vars = env(&[("X", "${X}x")]);
        let result = expand_with_outcome("${X}", &vars);
        assert_eq!(result.outcome, ExpansionOutcome::PassLimit);
        assert_eq!(result.passes, MAX_EXPANSION_PASSES);
    }

    #[test]
    fn test_dollar_without_name_is_untouched() {
        assert_eq!(expand("cost: $5 and $", &env(&[])), "cost: $5 and $");
    }

    #[test]
    fn test_layered_lookup_prefers_top() {
        let base = env(&[("A", "base"), ("B", "b")]);
        let top = env(&[("A", "top")]);
        let layered = Layered::new(&top, &base);
        assert_eq!(expand("${A}:${B}", &layered), "top:b");
    }

    #[test]
    fn test_references_in_order() {
        assert_eq!(
            references("${A} $B ${A} ${C.D}"),
            vec!["A".to_string(), "B".to_string(), "C.D".to_string()]
        );
    }

    #[test]
    fn test_parse_variables() {
        let text = "# comment\nFOO=bar\n\n  BAZ = qux=1\n! also comment\nnot a pair\n=orphan\n";
        assert_eq!(
            parse_variables(text),
            vec![
                ("FOO".to_string(), "bar".to_string()),
                ("BAZ".to_string(), "qux=1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_variables_empty() {
        assert!(parse_variables("").is_empty());
        assert!(parse_variables("   \n\n").is_empty());
    }

    proptest! {
        #[test]
        fn prop_text_without_references_is_unchanged(text in "[^$]*") {
            let vars = env(&[("X", "v")]);
            prop_assert_eq!(expand(&text, &vars), text);
        }

        #[test]
        fn prop_expansion_is_idempotent_without_cycles(
            name in "[A-Z][A-Z0-9_]{0,8}",
            value in "[a-z/]{0,12}",
        ) {
            let vars = env(&[(name.as_str(), value.as_str())]);
            let text = format!("pre ${{{name}}} post");
            let once = expand(&text, &vars);
            prop_assert_eq!(expand(&once, &vars), once.clone());
            prop_assert_eq!(once, format!("pre {value} post"));
        }
    }
}
