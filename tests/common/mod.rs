#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use dictionary_diff::{config::DiffConfig, dataset::Dataset};
use tempfile::{TempDir, tempdir};

pub const KEY: &str = "Variable / Field Name";
pub const FORM: &str = "Form Name";
pub const FIELD_TYPE: &str = "Field Type";
pub const LABEL: &str = "Field Label";
pub const CHOICES: &str = "Choices, Calculations, OR Slider Labels";
pub const REQUESTER: &str = "Who requested this data?";

/// Builds a dataset from string slices.
pub fn dictionary(columns: &[&str], rows: &[&[&str]]) -> Dataset {
    Dataset::from_records(
        columns.iter().copied(),
        rows.iter().map(|row| row.iter().copied()),
    )
}

/// Default configuration with the key column and required column count overridden.
pub fn config_for(key: &str, required_column_count: usize) -> DiffConfig {
    DiffConfig {
        key_column: key.to_string(),
        required_column_count,
        ..DiffConfig::default()
    }
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
