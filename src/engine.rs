//! Record matching and change-set construction.
//!
//! A diff run is two deterministic passes:
//!
//! 1. **Matched pass** over `new` in row order. Each key is looked up in a
//!    hash index of `old`; absent keys become [`NewRow`]s, present keys are
//!    compared column by column and any differences collected into a
//!    [`ChangeRecord`]. In extended mode the old record's annotation columns
//!    are carried onto the new-side row.
//! 2. **Dropped pass** over `old` in row order. Keys missing from `new` become
//!    [`DroppedRow`]s and their full rows are appended to the merged dataset,
//!    each taking the next tail position. The merged schema is `new`'s columns
//!    followed by every `old` column that `new` lacks.
//!
//! Simple mode applies when both schemas are identical. Otherwise the run is
//! extended mode, which requires `new` to have exactly the configured column
//! count and always evaluates rules (falling back to their defaults).

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::{
    compare::{ColumnKind, extract_choice_labels, values_differ},
    config::DiffConfig,
    dataset::{Dataset, Record},
    error::{DiffError, Side},
    rules::RuleSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    Simple,
    Extended,
}

impl fmt::Display for DiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffMode::Simple => f.write_str("simple"),
            DiffMode::Extended => f.write_str("extended"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnDelta {
    Scalar {
        old_val: String,
        new_val: String,
    },
    Choices {
        old_options: Vec<String>,
        new_options: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnChange {
    pub column: String,
    /// 0-based position of the column in the new schema.
    pub position: usize,
    pub value: String,
    #[serde(flatten)]
    pub delta: ColumnDelta,
}

impl ColumnChange {
    pub fn new(
        column: impl Into<String>,
        position: usize,
        old_value: &str,
        new_value: &str,
        kind: ColumnKind,
    ) -> Self {
        let delta = match kind {
            ColumnKind::Scalar => ColumnDelta::Scalar {
                old_val: old_value.to_string(),
                new_val: new_value.to_string(),
            },
            ColumnKind::MultiValueChoice => ColumnDelta::Choices {
                old_options: owned_labels(old_value),
                new_options: owned_labels(new_value),
            },
        };
        Self {
            column: column.into(),
            position,
            value: new_value.to_string(),
            delta,
        }
    }
}

fn owned_labels(raw: &str) -> Vec<String> {
    extract_choice_labels(raw)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRow {
    pub field: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub field: String,
    pub old_position: usize,
    /// Position of the appended row in the merged dataset.
    pub diff_position: usize,
    pub requester: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub field: String,
    pub position: usize,
    pub old_position: usize,
    pub requester: Option<String>,
    pub changed_columns: Vec<ColumnChange>,
}

impl ChangeRecord {
    pub fn column(&self, name: &str) -> Option<&ColumnChange> {
        self.changed_columns.iter().find(|change| change.column == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportantChange<'a> {
    pub record: &'a ChangeRecord,
    pub columns: Vec<&'a ColumnChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub mode: DiffMode,
    pub rules: Option<RuleSet>,
    pub annotation_columns: Vec<String>,
    pub new_rows: Vec<NewRow>,
    pub dropped_rows: Vec<DroppedRow>,
    pub dangerous_dropped_rows: Vec<DroppedRow>,
    pub changes: Vec<ChangeRecord>,
    /// `new` plus carried annotations, with dropped rows appended. Wider than
    /// `new_final` when `old` has columns `new` lacks below the annotation range.
    #[serde(skip)]
    pub merged_dataset: Dataset,
    #[serde(skip)]
    pub new_final: Dataset,
}

impl ChangeSet {
    pub fn change(&self, field: &str) -> Option<&ChangeRecord> {
        self.changes.iter().find(|record| record.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.new_rows.is_empty() && self.dropped_rows.is_empty() && self.changes.is_empty()
    }

    pub fn is_important(&self, record: &ChangeRecord, change: &ColumnChange) -> bool {
        self.rules
            .as_ref()
            .is_some_and(|rules| rules.is_important(change, record.requester.as_deref()))
    }

    pub fn is_dangerous(&self, dropped: &DroppedRow) -> bool {
        self.dangerous_dropped_rows
            .iter()
            .any(|row| row.diff_position == dropped.diff_position)
    }

    pub fn important_changes(&self) -> Vec<ImportantChange<'_>> {
        self.changes
            .iter()
            .filter_map(|record| {
                let columns = record
                    .changed_columns
                    .iter()
                    .filter(|change| self.is_important(record, change))
                    .collect::<Vec<_>>();
                (!columns.is_empty()).then_some(ImportantChange { record, columns })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TailPositions {
    next: usize,
}

impl TailPositions {
    pub fn after(occupied: usize) -> Self {
        Self {
            next: occupied + 1,
        }
    }

    pub fn take(&mut self) -> usize {
        let position = self.next;
        self.next += 1;
        position
    }
}

pub struct DiffEngine<'a> {
    old: &'a Dataset,
    new: &'a Dataset,
    config: &'a DiffConfig,
}

impl<'a> DiffEngine<'a> {
    pub fn new(old: &'a Dataset, new: &'a Dataset, config: &'a DiffConfig) -> Self {
        Self { old, new, config }
    }

    pub fn mode(&self) -> DiffMode {
        if self.old.same_schema(self.new) {
            DiffMode::Simple
        } else {
            DiffMode::Extended
        }
    }

    pub fn annotation_columns(&self) -> Vec<String> {
        self.old
            .columns()
            .iter()
            .skip(self.config.required_column_count)
            .filter(|column| !self.new.has_column(column))
            .cloned()
            .collect()
    }

    pub fn run(&self) -> Result<ChangeSet, DiffError> {
        let mode = self.mode();
        let (rules, annotation_columns) = match mode {
            DiffMode::Simple => (self.config.explicit_rules(), Vec::new()),
            DiffMode::Extended => {
                let actual = self.new.column_count();
                let required = self.config.required_column_count;
                if actual != required {
                    return Err(DiffError::ColumnCountMismatch { actual, required });
                }
                (Some(self.config.resolved_rules()), self.annotation_columns())
            }
        };
        info!(
            "Diffing {} new row(s) against {} old row(s) in {mode} mode",
            self.new.len(),
            self.old.len()
        );
        if !annotation_columns.is_empty() {
            info!("Carrying annotation column(s) {:?}", annotation_columns);
        }

        let key = self.config.key_column.as_str();
        let policy = self.config.duplicate_keys;
        let old_index = self.old.key_index(key, Side::Old, policy)?;
        let new_index = self.new.key_index(key, Side::New, policy)?;

        let annotation_sources = annotation_columns
            .iter()
            .filter_map(|column| self.old.column_index(column))
            .collect::<Vec<_>>();
        let mut final_columns = self.new.columns().to_vec();
        final_columns.extend(annotation_columns.iter().cloned());
        let width = final_columns.len();
        let base_width = self.new.column_count();
        // Dropped rows keep every old column, so the merged schema is the union.
        let merged_columns = self
            .new
            .columns()
            .iter()
            .chain(
                self.old
                    .columns()
                    .iter()
                    .filter(|column| !self.new.has_column(column)),
            )
            .cloned()
            .collect::<Vec<_>>();
        let mut new_final_rows = self
            .new
            .rows()
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, String::new());
                row
            })
            .collect::<Vec<_>>();

        let kinds = self
            .new
            .columns()
            .iter()
            .map(|column| self.config.column_kind(column))
            .collect::<Vec<_>>();

        // Matched pass
        let mut new_rows = Vec::new();
        let mut changes = Vec::new();
        for record in self.new.records() {
            let field = &record.values()[new_index.column()];
            if new_index.get(field) != Some(record.index()) {
                debug!(
                    "Skipping repeated key '{field}' at new row {}",
                    record.position()
                );
                continue;
            }
            let Some(old_record) = old_index.get(field).and_then(|idx| self.old.record(idx)) else {
                debug!("New field '{field}' at row {}", record.position());
                new_rows.push(NewRow {
                    field: field.clone(),
                    position: record.position(),
                });
                continue;
            };

            let carried = &mut new_final_rows[record.index()];
            for (slot, source) in annotation_sources.iter().enumerate() {
                carried[base_width + slot] = old_record.values()[*source].clone();
            }

            if let Some(change) = self.compare_records(&record, &old_record, &kinds, rules.as_ref()) {
                debug!(
                    "Field '{field}' changed in {} column(s)",
                    change.changed_columns.len()
                );
                changes.push(change);
            }
        }

        // Dropped pass
        let carried_slots = merged_columns[base_width..]
            .iter()
            .map(|column| annotation_columns.iter().position(|carried| carried == column))
            .collect::<Vec<_>>();
        let mut merged_rows = new_final_rows
            .iter()
            .map(|row| {
                let mut merged = row[..base_width].to_vec();
                merged.extend(carried_slots.iter().map(|slot| {
                    slot.map(|slot| row[base_width + slot].clone())
                        .unwrap_or_default()
                }));
                merged
            })
            .collect::<Vec<_>>();
        let mut tail = TailPositions::after(merged_rows.len());
        let mut dropped_rows = Vec::new();
        let mut dangerous_dropped_rows = Vec::new();
        for record in self.old.records() {
            let field = &record.values()[old_index.column()];
            if new_index.contains(field) {
                continue;
            }
            let dropped = DroppedRow {
                field: field.clone(),
                old_position: record.position(),
                diff_position: tail.take(),
                requester: rules.as_ref().and_then(|rules| rules.requester_of(&record)),
            };
            if rules
                .as_ref()
                .is_some_and(|rules| rules.is_dangerous_drop(&record))
            {
                debug!("Dropped field '{field}' matches a dangerous-drop rule");
                dangerous_dropped_rows.push(dropped.clone());
            }
            dropped_rows.push(dropped);
            merged_rows.push(
                merged_columns
                    .iter()
                    .map(|column| record.value(column).to_string())
                    .collect(),
            );
        }

        info!(
            "Diff complete: {} new, {} dropped ({} dangerous), {} changed",
            new_rows.len(),
            dropped_rows.len(),
            dangerous_dropped_rows.len(),
            changes.len()
        );

        Ok(ChangeSet {
            mode,
            rules,
            annotation_columns,
            new_rows,
            dropped_rows,
            dangerous_dropped_rows,
            changes,
            merged_dataset: Dataset::new(merged_columns, merged_rows),
            new_final: Dataset::new(final_columns, new_final_rows),
        })
    }

    fn compare_records(
        &self,
        new_record: &Record<'_>,
        old_record: &Record<'_>,
        kinds: &[ColumnKind],
        rules: Option<&RuleSet>,
    ) -> Option<ChangeRecord> {
        let mut change: Option<ChangeRecord> = None;
        for (position, column) in self.new.columns().iter().enumerate() {
            let new_value = new_record.values()[position].as_str();
            let old_value = old_record.get(column);
            if !values_differ(old_value, Some(new_value)) {
                continue;
            }
            let record = change.get_or_insert_with(|| ChangeRecord {
                field: new_record.value(&self.config.key_column).to_string(),
                position: new_record.position(),
                old_position: old_record.position(),
                requester: rules.and_then(|rules| rules.requester_of(old_record)),
                changed_columns: Vec::new(),
            });
            record.changed_columns.push(ColumnChange::new(
                column.as_str(),
                position,
                old_value.unwrap_or_default(),
                new_value,
                kinds[position],
            ));
        }
        change
    }
}

pub fn diff(old: &Dataset, new: &Dataset, config: &DiffConfig) -> Result<ChangeSet, DiffError> {
    DiffEngine::new(old, new, config).run()
}
