//! Immutable, ordered, keyed tables holding one version of a data dictionary.
//!
//! A [`Dataset`] owns its column names and string cells. Missing cells are
//! normalized to the empty string on construction, so every row has exactly
//! one cell per column. [`Record`] is a borrowed view of one row that resolves
//! cells by column name.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    error::{DiffError, Side},
    io_utils,
};

const INDEX_ARTIFACT_PREFIX: &str = "Unnamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    #[default]
    FirstMatch,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    lookup: HashMap<String, usize>,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl Eq for Dataset {}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        let mut lookup = HashMap::with_capacity(width);
        for (idx, name) in columns.iter().enumerate() {
            lookup.entry(name.clone()).or_insert(idx);
        }
        Self {
            columns,
            rows,
            lookup,
        }
    }

    pub fn from_records<C, S, R, V, T>(columns: C, rows: R) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = V>,
        V: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(columns, rows)
    }

    /// Loads a delimited text file, stripping blank and `Unnamed*` index columns.
    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        io_utils::ensure_supported_input(path)?;
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let kept = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_index_artifact(name))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        if kept.len() != headers.len() {
            debug!(
                "Stripped {} index artifact column(s) from {path:?}",
                headers.len() - kept.len()
            );
        }

        let columns = kept.iter().map(|idx| headers[*idx].clone()).collect();
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} in {path:?}", row_idx + 2))?;
            let row = kept
                .iter()
                .map(|idx| decoded.get(*idx).cloned().unwrap_or_default())
                .collect();
            rows.push(row);
        }
        Ok(Self::new(columns, rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn same_schema(&self, other: &Dataset) -> bool {
        self.columns == other.columns
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.rows.len()).then_some(Record {
            dataset: self,
            index,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.rows.len()).map(move |index| Record {
            dataset: self,
            index,
        })
    }

    pub fn distinct_values(&self, column: &str) -> Vec<&str> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .map(|row| row[idx].as_str())
                .unique()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn key_index(
        &self,
        key_column: &str,
        side: Side,
        policy: DuplicateKeyPolicy,
    ) -> Result<KeyIndex<'_>, DiffError> {
        let column = self
            .column_index(key_column)
            .ok_or_else(|| DiffError::MissingKeyColumn {
                dataset: side,
                column: key_column.to_string(),
            })?;
        let mut positions = HashMap::with_capacity(self.rows.len());
        let mut duplicates = 0usize;
        for (idx, row) in self.rows.iter().enumerate() {
            let key = row[column].as_str();
            if let Some(first) = positions.get(key) {
                match policy {
                    DuplicateKeyPolicy::Fail => {
                        return Err(DiffError::DuplicateKey {
                            dataset: side,
                            key: key.to_string(),
                            first: first + 1,
                            second: idx + 1,
                        });
                    }
                    DuplicateKeyPolicy::FirstMatch => {
                        warn!(
                            "Duplicate key '{key}' in {side} dataset at row {}; matching row {} only",
                            idx + 1,
                            first + 1
                        );
                        duplicates += 1;
                    }
                }
            } else {
                positions.insert(key, idx);
            }
        }
        Ok(KeyIndex {
            column,
            positions,
            duplicates,
        })
    }
}

fn is_index_artifact(name: &str) -> bool {
    name.trim().is_empty() || name.starts_with(INDEX_ARTIFACT_PREFIX)
}

#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> Record<'a> {
    /// 0-based row index within the owning dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based display position.
    pub fn position(&self) -> usize {
        self.index + 1
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.dataset
            .column_index(column)
            .map(|idx| self.dataset.rows[self.index][idx].as_str())
    }

    pub fn value(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or_default()
    }

    pub fn values(&self) -> &'a [String] {
        &self.dataset.rows[self.index]
    }
}

#[derive(Debug, Clone)]
pub struct KeyIndex<'a> {
    column: usize,
    positions: HashMap<&'a str, usize>,
    duplicates: usize,
}

impl KeyIndex<'_> {
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
