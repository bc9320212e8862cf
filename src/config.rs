//! Diff configuration: column roles, rule sets, and their documented defaults.
//!
//! A configuration file is YAML (JSON parses as YAML too):
//!
//! ```yaml
//! key_column: "Variable / Field Name"
//! required_column_count: 18
//! duplicate_keys: fail
//! dangerous_drop_rules:
//!   "Who requested this data?": ["CCDE"]
//! important_change_rules:
//!   fields: ["Field Type", "Choices, Calculations, OR Slider Labels"]
//! ```
//!
//! Every key is optional.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    compare::ColumnKind,
    dataset::DuplicateKeyPolicy,
    rules::{
        DEFAULT_OWNER_SENTINEL, DEFAULT_REQUESTER_COLUMN, DangerousDropRule, ImportantChangeRule,
        RuleSet,
    },
};

pub const DEFAULT_KEY_COLUMN: &str = "Variable / Field Name";
pub const DEFAULT_CHOICES_COLUMN: &str = "Choices, Calculations, OR Slider Labels";
pub const DEFAULT_GROUP_COLUMN: &str = "Form Name";
pub const DEFAULT_REQUIRED_COLUMN_COUNT: usize = 18;
pub const DEFAULT_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub key_column: String,
    pub choices_column: String,
    pub requester_column: String,
    pub important_owner_sentinel: String,
    /// Column count `new` must have when the schemas differ.
    pub required_column_count: usize,
    pub group_column: String,
    pub placeholder: String,
    pub duplicate_keys: DuplicateKeyPolicy,
    pub dangerous_drop_rules: Option<DangerousDropRule>,
    pub important_change_rules: Option<ImportantChangeRule>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            choices_column: DEFAULT_CHOICES_COLUMN.to_string(),
            requester_column: DEFAULT_REQUESTER_COLUMN.to_string(),
            important_owner_sentinel: DEFAULT_OWNER_SENTINEL.to_string(),
            required_column_count: DEFAULT_REQUIRED_COLUMN_COUNT,
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            duplicate_keys: DuplicateKeyPolicy::default(),
            dangerous_drop_rules: None,
            important_change_rules: None,
        }
    }
}

impl DiffConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn column_kind(&self, column: &str) -> ColumnKind {
        ColumnKind::classify(column, &self.choices_column)
    }

    pub fn has_explicit_rules(&self) -> bool {
        self.explicit_drop_rule().is_some() || self.explicit_important_rule().is_some()
    }

    /// Rules with documented defaults standing in for anything absent or empty.
    pub fn resolved_rules(&self) -> RuleSet {
        RuleSet {
            dangerous_drop: self.explicit_drop_rule().cloned().unwrap_or_default(),
            important_change: self.explicit_important_rule().cloned().unwrap_or_default(),
            requester_column: self.requester_column.clone(),
            owner_sentinel: self.important_owner_sentinel.clone(),
        }
    }

    /// Only what the caller supplied; a rule left out evaluates to nothing.
    pub fn explicit_rules(&self) -> Option<RuleSet> {
        if !self.has_explicit_rules() {
            return None;
        }
        Some(RuleSet {
            dangerous_drop: self
                .explicit_drop_rule()
                .cloned()
                .unwrap_or_else(DangerousDropRule::empty),
            important_change: self
                .explicit_important_rule()
                .cloned()
                .unwrap_or_else(ImportantChangeRule::empty),
            requester_column: self.requester_column.clone(),
            owner_sentinel: self.important_owner_sentinel.clone(),
        })
    }

    fn explicit_drop_rule(&self) -> Option<&DangerousDropRule> {
        self.dangerous_drop_rules
            .as_ref()
            .filter(|rule| !rule.is_empty())
    }

    fn explicit_important_rule(&self) -> Option<&ImportantChangeRule> {
        self.important_change_rules
            .as_ref()
            .filter(|rule| !rule.fields.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: DiffConfig = serde_yaml::from_str(
            "required_column_count: 5\nduplicate_keys: fail\nimportant_change_rules:\n  fields: [\"Field Label\"]\n",
        )
        .unwrap();
        assert_eq!(config.required_column_count, 5);
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Fail);
        assert_eq!(config.key_column, DEFAULT_KEY_COLUMN);
        assert_eq!(config.placeholder, "N/A");

        let rules = config.resolved_rules();
        assert!(rules.important_change.lists("Field Label"));
        assert_eq!(rules.dangerous_drop, DangerousDropRule::default());
    }

    #[test]
    fn explicit_rules_do_not_borrow_defaults() {
        let mut config = DiffConfig::default();
        assert!(config.explicit_rules().is_none());

        config.dangerous_drop_rules = Some(DangerousDropRule::new([("Owner", ["Molly"])]));
        let rules = config.explicit_rules().expect("explicit rules");
        assert!(rules.important_change.fields.is_empty());
        assert!(rules.dangerous_drop.triggers().contains_key("Owner"));
    }

    #[test]
    fn empty_rules_fall_back_to_defaults() {
        let config = DiffConfig {
            dangerous_drop_rules: Some(DangerousDropRule::empty()),
            ..DiffConfig::default()
        };
        assert!(!config.has_explicit_rules());
        assert_eq!(config.resolved_rules(), RuleSet::default());
    }

    #[test]
    fn loads_json_config_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        let mut file = File::create(&path).expect("create config");
        write!(
            file,
            r#"{{"dangerous_drop_rules": {{"Who requested this data?": ["CCDE"]}}, "key_column": "Variable"}}"#
        )
        .expect("write config");

        let config = DiffConfig::load(&path).expect("load config");
        assert_eq!(config.key_column, "Variable");
        assert!(config.has_explicit_rules());
    }

    #[test]
    fn choices_column_drives_column_kind() {
        let config = DiffConfig::default();
        assert_eq!(
            config.column_kind(DEFAULT_CHOICES_COLUMN),
            ColumnKind::MultiValueChoice
        );
        assert_eq!(config.column_kind("Field Type"), ColumnKind::Scalar);
    }
}
