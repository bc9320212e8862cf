use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error(
        "The supplied new data dictionary does not have the required number of columns. It has {actual}, but needs {required}."
    )]
    ColumnCountMismatch { actual: usize, required: usize },

    #[error("Key column '{column}' not found in {dataset} dataset")]
    MissingKeyColumn { dataset: Side, column: String },

    #[error("Duplicate key '{key}' in {dataset} dataset at rows {first} and {second}")]
    DuplicateKey {
        dataset: Side,
        key: String,
        first: usize,
        second: usize,
    },
}
