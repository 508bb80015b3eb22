pub mod cli;
pub mod coerce;
pub mod columns;
pub mod config;
pub mod data;
pub mod derive;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod pipeline;
pub mod project;
pub mod records;
pub mod sink;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, LoadArgs, PreviewArgs},
    config::EtlConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("orders_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_logging();
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {path:?}");
    }
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_load(args: &LoadArgs) -> Result<()> {
    let mut config = EtlConfig::load_or_default(args.input.config.as_deref())?;
    config.apply_load_args(args);
    let load_options = config.load_options(&args.input.input)?;
    let sink_options = config.sink_options()?;
    info!(
        "Loading '{}' into table '{}' (delimiter '{}', if_exists {:?})",
        args.input.input.display(),
        sink_options.table,
        printable_delimiter(load_options.delimiter),
        sink_options.if_exists
    );
    let report = pipeline::run_load(&args.input.input, &load_options, &sink_options)
        .with_context(|| format!("Loading {:?}", args.input.input))?;
    if report.load.rows_skipped > 0 {
        warn!("{} malformed row(s) skipped", report.load.rows_skipped);
    }
    info!(
        "Done: {} row(s), {} column(s) written{}",
        report.rows_written,
        report.columns,
        if report.replaced_existing {
            " (previous table replaced)"
        } else {
            ""
        }
    );
    Ok(())
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let mut config = EtlConfig::load_or_default(args.input.config.as_deref())?;
    config.apply_input_args(&args.input);
    let load_options = config.load_options(&args.input.input)?;
    let (table, report) = pipeline::prepare(&args.input.input, &load_options)
        .with_context(|| format!("Previewing {:?}", args.input.input))?;
    print!("{}", table::render_records(&table, args.rows));
    info!(
        "Displayed {} of {} row(s) ({} skipped)",
        table.row_count().min(args.rows),
        report.rows_loaded,
        report.rows_skipped
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
