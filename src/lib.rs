pub mod cli;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod io_utils;
pub mod notes;
pub mod report;
pub mod rules;
pub mod table;

use std::{env, path::PathBuf, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, DiffArgs, InputArgs, NotesArgs},
    config::DiffConfig,
    dataset::{Dataset, DuplicateKeyPolicy},
    engine::DiffMode,
};

pub use crate::{
    engine::{ChangeSet, DiffEngine, diff},
    error::DiffError,
    notes::{MergedView, build_merged_view},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("dictionary_diff", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Diff(args) => handle_diff(&args),
        Commands::Notes(args) => handle_notes(&args),
    }
}

fn handle_diff(args: &DiffArgs) -> Result<()> {
    let mut config = load_config(&args.input)?;
    if let Some(required) = args.required_columns {
        config.required_column_count = required;
    }
    let (old, new) = load_datasets(&args.input)?;

    let change_set = engine::diff(&old, &new, &config).with_context(|| {
        format!(
            "Diffing {:?} against {:?}",
            args.input.new, args.input.old
        )
    })?;
    let merged = match change_set.mode {
        DiffMode::Simple => Some(
            notes::build_merged_view(&old, &new, &config)
                .context("Building merged change notes")?,
        ),
        DiffMode::Extended => None,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(report::default_report_name(chrono::Local::now())));
    report::write_report(
        &output,
        &old,
        &change_set,
        merged.as_ref(),
        &config.key_column,
    )
    .with_context(|| format!("Writing report to {output:?}"))?;

    if args.json {
        println!("{}", report::to_json(&change_set)?);
    }
    if args.verbose {
        print!("{}", report::render_summary(&change_set));
    }
    Ok(())
}

fn handle_notes(args: &NotesArgs) -> Result<()> {
    let config = load_config(&args.input)?;
    let (old, new) = load_datasets(&args.input)?;
    let view = notes::build_merged_view(&old, &new, &config).with_context(|| {
        format!(
            "Building merged change notes for {:?} against {:?}",
            args.input.new, args.input.old
        )
    })?;
    if args.table {
        table::print_table(&view.headers(), &view.to_rows());
    } else {
        report::write_merged_view(args.output.as_deref(), &view)?;
    }
    info!("Merged change notes list {} field(s)", view.entries.len());
    Ok(())
}

fn load_config(args: &InputArgs) -> Result<DiffConfig> {
    let mut config = match &args.config {
        Some(path) => {
            DiffConfig::load(path).with_context(|| format!("Loading config from {path:?}"))?
        }
        None => DiffConfig::default(),
    };
    if let Some(key) = &args.key_column {
        config.key_column = key.clone();
    }
    if let Some(choices) = &args.choices_column {
        config.choices_column = choices.clone();
    }
    if args.strict_keys {
        config.duplicate_keys = DuplicateKeyPolicy::Fail;
    }
    debug!("Resolved config: {:?}", config);
    Ok(config)
}

fn load_datasets(args: &InputArgs) -> Result<(Dataset, Dataset)> {
    if io_utils::is_dash(&args.old) && io_utils::is_dash(&args.new) {
        bail!("--old and --new cannot both read from stdin ('-')");
    }
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut loaded = Vec::with_capacity(2);
    for path in [&args.old, &args.new] {
        let delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
        info!(
            "Loading '{}' with delimiter '{}'",
            path.display(),
            printable_delimiter(delimiter)
        );
        let dataset = Dataset::load(path, delimiter, encoding)
            .with_context(|| format!("Loading data dictionary {path:?}"))?;
        info!(
            "Loaded {} row(s) across {} column(s) from {:?}",
            dataset.len(),
            dataset.column_count(),
            path
        );
        loaded.push(dataset);
    }
    let new = loaded.pop().context("New dataset missing")?;
    let old = loaded.pop().context("Old dataset missing")?;
    Ok((old, new))
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
