//! Label-scoped overrides.
//!
//! A [`LabelSpecifics`] adds variables and exported paths for the nodes its
//! label expression matches. Entries without a label apply everywhere.
//! Values are immutable; substitution returns new values.

mod expression;

pub use expression::LabelExpression;

use serde::{Deserialize, Deserializer, Serialize};

use crate::node::NodeContext;
use crate::variables::{self, VariableLookup};

/// Decides whether a node satisfies a label expression.
pub trait LabelMatcher: Send + Sync {
    /// True when `node` satisfies `expression`
    fn matches(&self, expression: &str, node: &dyn NodeContext) -> bool;
}

/// [`LabelMatcher`] that parses the expression and tests node labels.
///
/// An expression that does not parse is treated as one literal label.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelExpressionMatcher;

impl LabelMatcher for LabelExpressionMatcher {
    fn matches(&self, expression: &str, node: &dyn NodeContext) -> bool {
        match LabelExpression::parse(expression) {
            Ok(expr) => expr.evaluate(&|label| node.has_label(label)),
            Err(e) => {
                tracing::warn!(
                    expression,
                    error = %e,
                    "Invalid label expression, matching it as a single label"
                );
                node.has_label(expression.trim())
            }
        }
    }
}

/// Override rule: variables and paths for nodes matching a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpecifics {
    #[serde(
        default,
        deserialize_with = "deserialize_label",
        skip_serializing_if = "Option::is_none"
    )]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_vars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_paths: Option<String>,
}

fn normalize_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_label(Option::<String>::deserialize(deserializer)?))
}

impl LabelSpecifics {
    /// Create an override. A blank label is stored as no label.
    #[must_use]
    pub fn new(
        label: Option<String>,
        additional_vars: Option<String>,
        exported_paths: Option<String>,
    ) -> Self {
        Self {
            label: normalize_label(label),
            additional_vars,
            exported_paths,
        }
    }

    /// Override applying to every node
    #[must_use]
    pub fn everywhere(additional_vars: Option<String>, exported_paths: Option<String>) -> Self {
        Self::new(None, additional_vars, exported_paths)
    }

    /// Label expression, if any
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Raw additional-variables block
    #[must_use]
    pub fn additional_vars(&self) -> Option<&str> {
        self.additional_vars.as_deref()
    }

    /// Raw exported-paths block
    #[must_use]
    pub fn exported_paths(&self) -> Option<&str> {
        self.exported_paths.as_deref()
    }

    /// Parsed `KEY=value` pairs of the additional-variables block
    #[must_use]
    pub fn variables(&self) -> Vec<(String, String)> {
        self.additional_vars
            .as_deref()
            .map(variables::parse_variables)
            .unwrap_or_default()
    }

    /// Whether this override applies to `node`
    pub fn applies_to(&self, node: &dyn NodeContext, matcher: &dyn LabelMatcher) -> bool {
        match self.label() {
            None => true,
            Some(expr) => matcher.matches(expr, node),
        }
    }

    /// New override with both text blocks expanded against `env`.
    #[must_use]
    pub fn substitute(&self, env: &(impl VariableLookup + ?Sized)) -> Self {
        Self {
            label: self.label.clone(),
            additional_vars: variables::expand_opt(self.additional_vars.as_deref(), env),
            exported_paths: variables::expand_opt(self.exported_paths.as_deref(), env),
        }
    }

    /// [`Self::substitute`] applied to every element.
    #[must_use]
    pub fn substitute_all(specifics: &[Self], env: &(impl VariableLookup + ?Sized)) -> Vec<Self> {
        specifics.iter().map(|s| s.substitute(env)).collect()
    }
}

/// Overrides from `overrides` that apply to `node`, in their original order.
///
/// `None` is treated as an empty list.
#[must_use]
pub fn select_applicable(
    overrides: Option<&[LabelSpecifics]>,
    node: &dyn NodeContext,
    matcher: &dyn LabelMatcher,
) -> Vec<LabelSpecifics> {
    let selected: Vec<LabelSpecifics> = overrides
        .unwrap_or_default()
        .iter()
        .filter(|s| s.applies_to(node, matcher))
        .cloned()
        .collect();
    tracing::debug!(
        node = node.name(),
        candidates = overrides.map_or(0, <[LabelSpecifics]>::len),
        selected = selected.len(),
        "Selected label overrides"
    );
    selected
}
