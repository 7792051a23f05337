//! Expression evaluator seam.
//!
//! The condition/parameter mini-language is an injected dependency: the
//! engine only needs `evaluate` over a [`RuleContext`]. A small built-in
//! evaluator covers literals, variables and bracket indexing, which is
//! enough for built-in profiles; richer languages plug in via the trait.

use thiserror::Error;

use crate::context::RuleContext;

/// Errors produced by expression evaluation.
///
/// These are transient-data errors at rule level: the failing rule is
/// skipped with a warning and the translation continues.
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// The expression references a variable or key absent from the
    /// context.
    #[error("unresolved reference '{0}'")]
    Unresolved(String),

    /// The expression could not be evaluated.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// A typed expression result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionValue {
    /// Boolean result (conditions).
    Bool(bool),

    /// Single string result.
    String(String),

    /// Multi-valued result.
    List(Vec<String>),
}

impl ExpressionValue {
    /// Converts the value into a list of strings.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        match self {
            Self::Bool(b) => vec![b.to_string()],
            Self::String(s) => vec![s],
            Self::List(values) => values,
        }
    }

    /// Gets the first string value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::String(s) => Some(s.as_str()),
            Self::List(values) => values.first().map(String::as_str),
        }
    }
}

/// Evaluates condition and parameter expressions against a run context.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates a rule condition. `true` and empty conditions always
    /// match.
    fn evaluate_condition(&self, expr: &str, ctx: &RuleContext) -> Result<bool, ExpressionError>;

    /// Evaluates an action parameter to a typed value.
    fn evaluate(&self, expr: &str, ctx: &RuleContext) -> Result<ExpressionValue, ExpressionError>;
}

/// Built-in evaluator for a deliberately small expression subset:
///
/// - `'...'` and `"..."` quoted string literals
/// - `true` / `false` boolean literals
/// - bare variable names resolving to scalars or lists
/// - bracket indexing into map variables: `attr['email']`
///
/// `attr[...]` yields the first value only; every other map yields the
/// full value list.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEvaluator;

impl SimpleEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for SimpleEvaluator {
    fn evaluate_condition(&self, expr: &str, ctx: &RuleContext) -> Result<bool, ExpressionError> {
        let expr = expr.trim();
        if expr.is_empty() || expr == "true" {
            return Ok(true);
        }
        if expr == "false" {
            return Ok(false);
        }
        match self.evaluate(expr, ctx)? {
            ExpressionValue::Bool(b) => Ok(b),
            ExpressionValue::String(s) => Ok(!s.is_empty()),
            ExpressionValue::List(values) => Ok(!values.is_empty()),
        }
    }

    fn evaluate(&self, expr: &str, ctx: &RuleContext) -> Result<ExpressionValue, ExpressionError> {
        let expr = expr.trim();
        if let Some(literal) = strip_quotes(expr) {
            return Ok(ExpressionValue::String(literal.to_string()));
        }
        if expr == "true" {
            return Ok(ExpressionValue::Bool(true));
        }
        if expr == "false" {
            return Ok(ExpressionValue::Bool(false));
        }
        if let Some((map, key)) = parse_index(expr) {
            let values = ctx
                .map_entry(map, key)
                .ok_or_else(|| ExpressionError::Unresolved(format!("{map}['{key}']")))?;
            if map == "attr" {
                let first = values
                    .first()
                    .ok_or_else(|| ExpressionError::Unresolved(format!("{map}['{key}']")))?;
                return Ok(ExpressionValue::String(first.clone()));
            }
            return Ok(ExpressionValue::List(values.to_vec()));
        }
        if is_identifier(expr) {
            if let Some(value) = ctx.scalar(expr) {
                return Ok(ExpressionValue::String(value.to_string()));
            }
            if let Some(values) = ctx.list(expr) {
                return Ok(ExpressionValue::List(values.to_vec()));
            }
            return Err(ExpressionError::Unresolved(expr.to_string()));
        }
        Err(ExpressionError::Evaluation(format!(
            "unsupported expression '{expr}'"
        )))
    }
}

fn strip_quotes(expr: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
            let inner = &expr[1..expr.len() - 1];
            if !inner.contains(quote) {
                return Some(inner);
            }
        }
    }
    None
}

fn parse_index(expr: &str) -> Option<(&str, &str)> {
    let open = expr.find('[')?;
    if !expr.ends_with(']') {
        return None;
    }
    let map = &expr[..open];
    if !is_identifier(map) {
        return None;
    }
    let key = strip_quotes(expr[open + 1..expr.len() - 1].trim())?;
    Some((map, key))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}
