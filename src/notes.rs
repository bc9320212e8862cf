//! Merged change notes: a full outer join of `new` and `old` on the key column.
//!
//! Every field present in either dataset gets one entry carrying, for each
//! compared column, a modified flag plus old and new values. Values of
//! unmodified cells are replaced with a placeholder so only real changes
//! stand out. Unchanged fields are dropped, and the remaining entries are
//! ordered by form (first seen in `new`, then in `old`) and then by their
//! position in the joined table.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;

use crate::{
    compare::values_equivalent,
    config::DiffConfig,
    dataset::{Dataset, Record},
    error::{DiffError, Side},
};

pub const VARIABLE_HEADER: &str = "VARIABLE";
pub const FORM_HEADER: &str = "FORM_NAME";
pub const CHANGE_TYPE_HEADER: &str = "CHANGE_TYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Both,
    NewOnly,
    OldOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeType {
    New,
    Removed,
    Modified,
    Unchanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::New => "New",
            ChangeType::Removed => "Removed",
            ChangeType::Modified => "Modified",
            ChangeType::Unchanged => "Unchanged",
        };
        f.write_str(label)
    }
}

impl ChangeType {
    fn classify(side: JoinSide, any_modified: bool) -> Self {
        match side {
            JoinSide::Both if any_modified => ChangeType::Modified,
            JoinSide::Both => ChangeType::Unchanged,
            JoinSide::NewOnly => ChangeType::New,
            JoinSide::OldOnly => ChangeType::Removed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellNote {
    pub modified: bool,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEntry {
    pub field: String,
    pub form: String,
    pub change_type: ChangeType,
    pub side: JoinSide,
    /// Row index in the joined table before filtering and ordering.
    pub merged_index: usize,
    pub cells: Vec<CellNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedView {
    pub columns: Vec<String>,
    pub entries: Vec<MergedEntry>,
}

impl MergedView {
    pub fn entry(&self, field: &str) -> Option<&MergedEntry> {
        self.entries.iter().find(|entry| entry.field == field)
    }

    pub fn cell(&self, field: &str, column: &str) -> Option<&CellNote> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.entry(field).and_then(|entry| entry.cells.get(idx))
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            VARIABLE_HEADER.to_string(),
            FORM_HEADER.to_string(),
            CHANGE_TYPE_HEADER.to_string(),
        ];
        for column in &self.columns {
            headers.push(format!("MODIFIED: {column}"));
            headers.push(format!("MODIFIED_OLD_VALUE: {column}"));
            headers.push(format!("MODIFIED_NEW_VALUE: {column}"));
        }
        headers
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|entry| {
                let mut row = Vec::with_capacity(3 + entry.cells.len() * 3);
                row.push(entry.field.clone());
                row.push(entry.form.clone());
                row.push(entry.change_type.to_string());
                for cell in &entry.cells {
                    row.push(if cell.modified { "1" } else { "0" }.to_string());
                    row.push(cell.old_value.clone());
                    row.push(cell.new_value.clone());
                }
                row
            })
            .collect()
    }
}

pub struct MergedNotesBuilder<'a> {
    config: &'a DiffConfig,
}

impl<'a> MergedNotesBuilder<'a> {
    pub fn new(config: &'a DiffConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, old: &Dataset, new: &Dataset) -> Result<MergedView, DiffError> {
        let key = self.config.key_column.as_str();
        let policy = self.config.duplicate_keys;
        let new_index = new.key_index(key, Side::New, policy)?;
        let old_index = old.key_index(key, Side::Old, policy)?;

        let columns = new
            .columns()
            .iter()
            .filter(|column| column.as_str() != key)
            .cloned()
            .collect::<Vec<_>>();
        let form_rank = self.form_ranks(old, new);

        // The outer join emits keys in lexicographic order.
        let keys = new
            .records()
            .chain(old.records())
            .map(|record| record.value(key))
            .collect::<BTreeSet<_>>();

        let mut entries = Vec::new();
        for (merged_index, field) in keys.into_iter().enumerate() {
            let new_record = new_index.get(field).and_then(|idx| new.record(idx));
            let old_record = old_index.get(field).and_then(|idx| old.record(idx));
            let side = match (&new_record, &old_record) {
                (Some(_), Some(_)) => JoinSide::Both,
                (Some(_), None) => JoinSide::NewOnly,
                _ => JoinSide::OldOnly,
            };

            let cells = columns
                .iter()
                .map(|column| self.cell_note(column, side, new_record.as_ref(), old_record.as_ref()))
                .collect::<Vec<_>>();
            let change_type = ChangeType::classify(side, cells.iter().any(|cell| cell.modified));
            if change_type == ChangeType::Unchanged {
                continue;
            }
            let form = self.form_of(new_record.as_ref(), old_record.as_ref());
            debug!("Merged note for '{field}': {change_type} (form '{form}')");
            entries.push(MergedEntry {
                field: field.to_string(),
                form,
                change_type,
                side,
                merged_index,
                cells,
            });
        }

        entries.sort_by_key(|entry| {
            (
                form_rank
                    .get(entry.form.as_str())
                    .copied()
                    .unwrap_or(usize::MAX),
                entry.merged_index,
            )
        });
        info!(
            "Merged change notes: {} entr{} across {} column(s)",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            columns.len()
        );
        Ok(MergedView { columns, entries })
    }

    fn form_ranks<'d>(&self, old: &'d Dataset, new: &'d Dataset) -> HashMap<&'d str, usize> {
        let group = self.config.group_column.as_str();
        new.distinct_values(group)
            .into_iter()
            .chain(old.distinct_values(group))
            .unique()
            .enumerate()
            .map(|(rank, form)| (form, rank))
            .collect()
    }

    fn form_of(&self, new_record: Option<&Record<'_>>, old_record: Option<&Record<'_>>) -> String {
        let group = self.config.group_column.as_str();
        new_record
            .map(|record| record.value(group))
            .filter(|form| !form.is_empty())
            .or_else(|| old_record.map(|record| record.value(group)))
            .unwrap_or_default()
            .to_string()
    }

    fn cell_note(
        &self,
        column: &str,
        side: JoinSide,
        new_record: Option<&Record<'_>>,
        old_record: Option<&Record<'_>>,
    ) -> CellNote {
        let new_value = new_record.and_then(|record| record.get(column));
        let old_value = old_record.and_then(|record| record.get(column));
        let modified = side == JoinSide::Both && !values_equivalent(old_value, new_value);
        if modified {
            CellNote {
                modified,
                old_value: old_value.unwrap_or_default().to_string(),
                new_value: new_value.unwrap_or_default().to_string(),
            }
        } else {
            CellNote {
                modified,
                old_value: self.config.placeholder.clone(),
                new_value: self.config.placeholder.clone(),
            }
        }
    }
}

pub fn build_merged_view(
    old: &Dataset,
    new: &Dataset,
    config: &DiffConfig,
) -> Result<MergedView, DiffError> {
    MergedNotesBuilder::new(config).build(old, new)
}
