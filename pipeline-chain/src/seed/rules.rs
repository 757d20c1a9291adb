//! Rule evaluation against a pipeline ref.

use crate::processor::{Rule, When};
use regex::Regex;

/// The outcome of evaluating a rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// The subject takes part, running as given.
    Included(When),
    /// The subject is left out.
    Excluded,
}

/// A pattern that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern(pub String);

/// Evaluates `rules` against `ref_name`.
///
/// No rules means the subject is included with `default_when`. Otherwise the
/// first matching rule decides, and no match excludes the subject. A `never`
/// outcome always excludes.
pub fn evaluate(rules: &[Rule], ref_name: &str, default_when: When) -> Result<Evaluation, InvalidPattern> {
    if rules.is_empty() {
        return Ok(decide(default_when));
    }

    for rule in rules {
        if matches_ref(rule, ref_name)? {
            return Ok(decide(rule.when.unwrap_or(default_when)));
        }
    }

    Ok(Evaluation::Excluded)
}

fn matches_ref(rule: &Rule, ref_name: &str) -> Result<bool, InvalidPattern> {
    match rule.if_ref {
        None => Ok(true),
        Some(ref pattern) => Regex::new(pattern)
            .map(|re| re.is_match(ref_name))
            .map_err(|_| InvalidPattern(pattern.clone())),
    }
}

fn decide(when: When) -> Evaluation {
    if when == When::Never {
        Evaluation::Excluded
    } else {
        Evaluation::Included(when)
    }
}
