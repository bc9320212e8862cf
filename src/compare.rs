//! Column-level change detection.
//!
//! Whether a cell changed is always decided by exact string equality. The
//! multi-value choices column only differs in how a detected change is
//! rendered: as two lists of option labels rather than two scalar values.

use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

const CHOICE_SEPARATOR: char = '|';
const CODE_SEPARATOR: char = ',';

static SEPARATOR_SPACING: OnceLock<Regex> = OnceLock::new();

fn separator_spacing() -> &'static Regex {
    SEPARATOR_SPACING
        .get_or_init(|| Regex::new(r"\s*([|,])\s*").expect("valid separator spacing pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Scalar,
    MultiValueChoice,
}

impl ColumnKind {
    pub fn classify(column: &str, choices_column: &str) -> Self {
        if column == choices_column {
            ColumnKind::MultiValueChoice
        } else {
            ColumnKind::Scalar
        }
    }
}

pub fn values_differ(old: Option<&str>, new: Option<&str>) -> bool {
    old.unwrap_or_default() != new.unwrap_or_default()
}

/// Splits a `code, label | code, label` list into its labels.
///
/// Tokens that are blank after trimming are skipped; a token without a comma
/// is kept whole.
pub fn extract_choice_labels(raw: &str) -> Vec<&str> {
    raw.split(CHOICE_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once(CODE_SEPARATOR) {
            Some((_, label)) => label.trim(),
            None => token,
        })
        .collect()
}

/// Collapses whitespace around `|` and `,` separators, so `1, A | 2, B`
/// becomes `1,A|2,B`.
pub fn normalize_separator_spacing(value: &str) -> Cow<'_, str> {
    separator_spacing().replace_all(value, "$1")
}

/// Equality used by the merged change notes: cosmetic separator spacing is
/// ignored and two nulls are equal.
pub fn values_equivalent(old: Option<&str>, new: Option<&str>) -> bool {
    match (old, new) {
        (None, None) => true,
        (Some(old), Some(new)) => {
            old == new || normalize_separator_spacing(old) == normalize_separator_spacing(new)
        }
        _ => false,
    }
}
