//! Dangerous-drop and important-change rules.
//!
//! Rules are plain configuration. Their defaults reproduce the shape the
//! dictionary owners rely on (`{"Who requested this data?": ["CCDE"]}` and
//! `{"fields": ["Field Type", "Choices, Calculations, OR Slider Labels"]}`),
//! but the evaluator never assumes them: callers hand a [`RuleSet`] to the
//! engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{dataset::Record, engine::ColumnChange};

pub const DEFAULT_REQUESTER_COLUMN: &str = "Who requested this data?";
pub const DEFAULT_OWNER_SENTINEL: &str = "CCDE";
pub const DEFAULT_IMPORTANT_FIELDS: &[&str] =
    &["Field Type", "Choices, Calculations, OR Slider Labels"];

/// Column name → trigger values. A dropped record is dangerous when any
/// configured column holds one of its triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DangerousDropRule {
    triggers: BTreeMap<String, Vec<String>>,
}

impl Default for DangerousDropRule {
    fn default() -> Self {
        Self::new([(DEFAULT_REQUESTER_COLUMN, [DEFAULT_OWNER_SENTINEL])])
    }
}

impl DangerousDropRule {
    pub fn new<I, C, V, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers = triggers
            .into_iter()
            .map(|(column, values)| (column.into(), values.into_iter().map(Into::into).collect()))
            .collect();
        Self { triggers }
    }

    pub fn empty() -> Self {
        Self {
            triggers: BTreeMap::new(),
        }
    }

    pub fn triggers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.triggers
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn matched_columns<'r>(&'r self, record: &Record<'_>) -> Vec<&'r str> {
        self.triggers
            .iter()
            .filter(|(column, values)| {
                record
                    .get(column)
                    .is_some_and(|value| values.iter().any(|trigger| trigger == value))
            })
            .map(|(column, _)| column.as_str())
            .collect()
    }

    pub fn matches(&self, record: &Record<'_>) -> bool {
        self.triggers.iter().any(|(column, values)| {
            record
                .get(column)
                .is_some_and(|value| values.iter().any(|trigger| trigger == value))
        })
    }
}

/// `{"fields": [column, ...]}`: changes to these columns warrant review when
/// the field belongs to the sentinel owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportantChangeRule {
    pub fields: Vec<String>,
}

impl Default for ImportantChangeRule {
    fn default() -> Self {
        Self {
            fields: DEFAULT_IMPORTANT_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ImportantChangeRule {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn lists(&self, column: &str) -> bool {
        self.fields.iter().any(|field| field == column)
    }

    pub fn is_important(&self, change: &ColumnChange, requester: Option<&str>, sentinel: &str) -> bool {
        self.lists(&change.column) && requester == Some(sentinel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    pub dangerous_drop: DangerousDropRule,
    pub important_change: ImportantChangeRule,
    pub requester_column: String,
    pub owner_sentinel: String,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            dangerous_drop: DangerousDropRule::default(),
            important_change: ImportantChangeRule::default(),
            requester_column: DEFAULT_REQUESTER_COLUMN.to_string(),
            owner_sentinel: DEFAULT_OWNER_SENTINEL.to_string(),
        }
    }
}

impl RuleSet {
    pub fn is_dangerous_drop(&self, record: &Record<'_>) -> bool {
        self.dangerous_drop.matches(record)
    }

    pub fn is_important(&self, change: &ColumnChange, requester: Option<&str>) -> bool {
        self.important_change
            .is_important(change, requester, &self.owner_sentinel)
    }

    pub fn requester_of(&self, record: &Record<'_>) -> Option<String> {
        record.get(&self.requester_column).map(str::to_string)
    }
}
