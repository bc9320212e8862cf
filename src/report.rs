//! Renders a [`ChangeSet`] and [`MergedView`] to files and the console.
//!
//! A report directory holds one CSV per "sheet":
//!
//! | File                   | Contents                                              |
//! |------------------------|-------------------------------------------------------|
//! | `DIFF.csv`             | merged dataset (new rows, then dropped rows)          |
//! | `NEW.csv`              | new dataset with carried annotation columns           |
//! | `OLD.csv`              | old dataset as loaded                                 |
//! | `HIGHLIGHTS.csv`       | rows and cells of `DIFF.csv` to highlight, with kind  |
//! | `CHANGE_NOTES.csv`     | sectioned notes: new, dangerous, important, all       |
//! | `NEW_CHANGE_NOTES.csv` | merged change notes, when built                       |
//!
//! Row numbers in `CHANGE_NOTES.csv` are file line numbers (the header is
//! line 1). Rows in `HIGHLIGHTS.csv` count the header as row 0.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use crate::{
    dataset::Dataset,
    engine::{ChangeRecord, ChangeSet, ColumnChange, ColumnDelta},
    io_utils,
    notes::MergedView,
    table,
};

pub const DIFF_FILE: &str = "DIFF.csv";
pub const NEW_FILE: &str = "NEW.csv";
pub const OLD_FILE: &str = "OLD.csv";
pub const HIGHLIGHTS_FILE: &str = "HIGHLIGHTS.csv";
pub const CHANGE_NOTES_FILE: &str = "CHANGE_NOTES.csv";
pub const MERGED_NOTES_FILE: &str = "NEW_CHANGE_NOTES.csv";

/// `DataDictionary_MM-DD-YYYY-HHMMAM`, from the given clock reading.
pub fn default_report_name(now: DateTime<Local>) -> String {
    format!("DataDictionary_{}", now.format("%m-%d-%Y-%I%M%p"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    New,
    Dropped,
    Changed,
    ImportantChanged,
}

impl HighlightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::New => "new",
            HighlightKind::Dropped => "dropped",
            HighlightKind::Changed => "changed",
            HighlightKind::ImportantChanged => "important_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub row: usize,
    pub column: Option<usize>,
    pub column_name: Option<String>,
    pub kind: HighlightKind,
}

pub fn highlights(change_set: &ChangeSet) -> Vec<Highlight> {
    let mut marks = Vec::new();
    for row in &change_set.new_rows {
        marks.push(Highlight {
            row: row.position,
            column: None,
            column_name: None,
            kind: HighlightKind::New,
        });
    }
    for row in &change_set.dropped_rows {
        marks.push(Highlight {
            row: row.diff_position,
            column: None,
            column_name: None,
            kind: HighlightKind::Dropped,
        });
    }
    for record in &change_set.changes {
        for change in &record.changed_columns {
            let kind = if change_set.is_important(record, change) {
                HighlightKind::ImportantChanged
            } else {
                HighlightKind::Changed
            };
            marks.push(Highlight {
                row: record.position,
                column: Some(change.position),
                column_name: Some(change.column.clone()),
                kind,
            });
        }
    }
    marks
}

pub fn change_notes_rows(change_set: &ChangeSet, key_label: &str) -> Result<Vec<Vec<String>>> {
    let mut notes = NotesSheet::default();
    notes.line(["Change Notes"]);
    notes.blank();

    notes.line(["New Rows:"]);
    notes.line([key_label, "Row Number"]);
    for row in &change_set.new_rows {
        notes.line([row.field.clone(), line_number(row.position)]);
    }
    notes.blank();

    let important_json = change_set
        .rules
        .as_ref()
        .map(|rules| serde_json::to_string(&rules.important_change))
        .transpose()
        .context("Serializing important-change rules")?;

    if let Some(rules) = &change_set.rules {
        let drop_json = serde_json::to_string(&rules.dangerous_drop)
            .context("Serializing dangerous-drop rules")?;
        notes.line(["Dangerous Dropped Rows:".to_string(), drop_json]);
        notes.line([key_label, "Old Row Number", "Diff Row Number", "Field Requester"]);
        for row in &change_set.dangerous_dropped_rows {
            notes.line([
                row.field.clone(),
                line_number(row.old_position),
                line_number(row.diff_position),
                row.requester.clone().unwrap_or_default(),
            ]);
        }
        notes.blank();

        notes.line([
            "Important Changes:".to_string(),
            important_json.clone().unwrap_or_default(),
        ]);
        for important in change_set.important_changes() {
            notes.change_block(key_label, important.record, important.columns.into_iter());
        }
        notes.blank();
    }

    notes.line(["All Dropped Rows:"]);
    notes.line([key_label, "Old Row Number", "Diff Row Number", "Field Requester"]);
    for row in &change_set.dropped_rows {
        notes.line([
            row.field.clone(),
            line_number(row.old_position),
            line_number(row.diff_position),
            row.requester.clone().unwrap_or_default(),
        ]);
    }
    notes.blank();

    match important_json {
        Some(json) => notes.line(["All Changes:".to_string(), json]),
        None => notes.line(["All Changes:"]),
    }
    for record in &change_set.changes {
        notes.change_block(key_label, record, record.changed_columns.iter());
    }
    Ok(notes.rows)
}

fn line_number(position: usize) -> String {
    (position + 1).to_string()
}

#[derive(Default)]
struct NotesSheet {
    rows: Vec<Vec<String>>,
}

impl NotesSheet {
    fn line<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    fn blank(&mut self) {
        self.rows.push(vec![String::new()]);
    }

    fn change_block<'c>(
        &mut self,
        key_label: &str,
        record: &ChangeRecord,
        columns: impl Iterator<Item = &'c ColumnChange>,
    ) {
        self.line([key_label, "Old Row Number", "New Row Number", "Field Requester"]);
        self.line([
            record.field.clone(),
            line_number(record.old_position),
            line_number(record.position),
            record.requester.clone().unwrap_or_default(),
        ]);
        for change in columns {
            self.line(["Column Name".to_string(), change.column.clone()]);
            let (old, new) = match &change.delta {
                ColumnDelta::Scalar { old_val, new_val } => {
                    (vec![old_val.clone()], vec![new_val.clone()])
                }
                ColumnDelta::Choices {
                    old_options,
                    new_options,
                } => (old_options.clone(), new_options.clone()),
            };
            self.line(std::iter::once("Old Value".to_string()).chain(old));
            self.line(std::iter::once("New Value".to_string()).chain(new));
        }
    }
}

pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(Some(path), b',', false)?;
    writer
        .write_record(dataset.columns())
        .with_context(|| format!("Writing headers to {path:?}"))?;
    for row in dataset.rows() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row to {path:?}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing {path:?}"))?;
    Ok(())
}

pub fn write_highlights(path: &Path, change_set: &ChangeSet) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(Some(path), b',', false)?;
    writer
        .write_record(["row", "column", "column_name", "kind"])
        .context("Writing highlight headers")?;
    for mark in highlights(change_set) {
        writer
            .write_record([
                mark.row.to_string(),
                mark.column.map(|c| c.to_string()).unwrap_or_default(),
                mark.column_name.unwrap_or_default(),
                mark.kind.as_str().to_string(),
            ])
            .context("Writing highlight row")?;
    }
    writer.flush().context("Flushing highlights")?;
    Ok(())
}

pub fn write_change_notes(path: &Path, change_set: &ChangeSet, key_label: &str) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(Some(path), b',', true)?;
    for row in change_notes_rows(change_set, key_label)? {
        writer.write_record(&row).context("Writing change notes")?;
    }
    writer.flush().context("Flushing change notes")?;
    Ok(())
}

/// Writes the merged view as CSV to `path`, or stdout when `path` is `None`.
pub fn write_merged_view(path: Option<&Path>, view: &MergedView) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, b',', false)?;
    writer
        .write_record(view.headers())
        .context("Writing merged change notes headers")?;
    for row in view.to_rows() {
        writer
            .write_record(&row)
            .context("Writing merged change notes row")?;
    }
    writer.flush().context("Flushing merged change notes")?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ReportFiles {
    pub paths: Vec<PathBuf>,
}

pub fn write_report(
    dir: &Path,
    old: &Dataset,
    change_set: &ChangeSet,
    merged: Option<&MergedView>,
    key_label: &str,
) -> Result<ReportFiles> {
    fs::create_dir_all(dir).with_context(|| format!("Creating report directory {dir:?}"))?;
    let mut files = ReportFiles::default();

    let path = dir.join(DIFF_FILE);
    write_dataset(&path, &change_set.merged_dataset)?;
    files.paths.push(path);

    let path = dir.join(NEW_FILE);
    write_dataset(&path, &change_set.new_final)?;
    files.paths.push(path);

    let path = dir.join(OLD_FILE);
    write_dataset(&path, old)?;
    files.paths.push(path);

    let path = dir.join(HIGHLIGHTS_FILE);
    write_highlights(&path, change_set)?;
    files.paths.push(path);

    let path = dir.join(CHANGE_NOTES_FILE);
    write_change_notes(&path, change_set, key_label)?;
    files.paths.push(path);

    if let Some(view) = merged {
        let path = dir.join(MERGED_NOTES_FILE);
        write_merged_view(Some(&path), view)?;
        files.paths.push(path);
    }

    info!("Wrote {} report file(s) to {dir:?}", files.paths.len());
    Ok(files)
}

pub fn to_json(change_set: &ChangeSet) -> Result<String> {
    serde_json::to_string_pretty(change_set).context("Serializing change set to JSON")
}

pub fn render_summary(change_set: &ChangeSet) -> String {
    let mut output = format!(
        "{} row(s) in merged dataset ({} mode)\n\nNew Rows:\n",
        change_set.merged_dataset.len(),
        change_set.mode
    );
    let rows = change_set
        .new_rows
        .iter()
        .map(|row| vec![row.field.clone(), line_number(row.position)])
        .collect::<Vec<_>>();
    output.push_str(&table::render_table(&headers(&["Field", "Row Number"]), &rows));

    output.push_str("\nDropped Rows:\n");
    let rows = change_set
        .dropped_rows
        .iter()
        .map(|row| {
            vec![
                row.field.clone(),
                line_number(row.diff_position),
                line_number(row.old_position),
                yes_no(change_set.is_dangerous(row)).to_string(),
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&table::render_table(
        &headers(&["Field", "Diff Row Number", "Old Row Number", "Dangerous?"]),
        &rows,
    ));

    output.push_str("\nChanged Rows:\n");
    let rows = change_set
        .changes
        .iter()
        .flat_map(|record| {
            record.changed_columns.iter().map(move |change| {
                vec![
                    record.field.clone(),
                    line_number(record.position),
                    line_number(record.old_position),
                    change.column.clone(),
                    yes_no(change_set.is_important(record, change)).to_string(),
                ]
            })
        })
        .collect::<Vec<_>>();
    output.push_str(&table::render_table(
        &headers(&["Field", "Row Number", "Old Row Number", "Column", "Important?"]),
        &rows,
    ));
    output
}

fn headers(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
