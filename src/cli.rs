use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Compare two versions of a data dictionary", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Diff a new data dictionary against an old one and write a report directory
    Diff(DiffArgs),
    /// Build only the merged change notes (one row per new, removed, or modified field)
    Notes(NotesArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Previous version of the data dictionary
    #[arg(long = "old")]
    pub old: PathBuf,
    /// Latest version of the data dictionary
    #[arg(long = "new")]
    pub new: PathBuf,
    /// YAML or JSON file with column roles and rule definitions
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Column identifying each field (overrides the config file)
    #[arg(long = "key-column")]
    pub key_column: Option<String>,
    /// Multi-value choices column (overrides the config file)
    #[arg(long = "choices-column")]
    pub choices_column: Option<String>,
    /// Reject datasets with repeated keys instead of matching the first occurrence
    #[arg(long = "strict-keys")]
    pub strict_keys: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Report directory (defaults to DataDictionary_<timestamp>)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Column count the new dictionary must have when the schemas differ
    #[arg(long = "required-columns")]
    pub required_columns: Option<usize>,
    /// Print the change set as JSON to stdout
    #[arg(long)]
    pub json: bool,
    /// Print new, dropped, and changed rows as tables
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct NotesArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render as an aligned table on stdout instead of CSV
    #[arg(long = "table")]
    pub table: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
