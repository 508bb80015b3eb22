//! Stage orchestration.
//!
//! A run is load → normalize → derive → project → coerce → write. Each
//! stage consumes the table and returns the next one; an error from any
//! stage is tagged with the [`Stage`] that raised it and ends the run.

use std::{fmt, path::Path};

use log::info;
use thiserror::Error;

use crate::{
    coerce, columns, derive,
    error::{ErrorKind, EtlError},
    load::{self, LoadOptions, LoadReport},
    project,
    records::RecordTable,
    sink::{self, SinkOptions, WriteReport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Derive,
    Project,
    Coerce,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Load => "load",
            Stage::Derive => "derive",
            Stage::Project => "project",
            Stage::Coerce => "coerce",
            Stage::Write => "write",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed ({} error): {source}", .source.kind())]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T, EtlError> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub load: LoadReport,
    pub columns: usize,
    pub rows_written: usize,
    pub replaced_existing: bool,
}

/// Runs every in-memory step after the load. Each step must keep every row.
pub fn transform(table: RecordTable) -> Result<RecordTable, StageError> {
    let rows = table.row_count();
    let table = columns::normalize_columns(table);
    let table = derive::derive_metrics(table)
        .and_then(|t| same_rows(rows, t))
        .at(Stage::Derive)?;
    let table = project::drop_folded_columns(table)
        .and_then(|t| same_rows(rows, t))
        .at(Stage::Project)?;
    coerce::coerce_order_date(table)
        .and_then(|t| same_rows(rows, t))
        .at(Stage::Coerce)
}

fn same_rows(expected: usize, table: RecordTable) -> Result<RecordTable, EtlError> {
    check_row_count(expected, table.row_count())?;
    Ok(table)
}

fn check_row_count(expected: usize, found: usize) -> Result<(), EtlError> {
    if expected == found {
        Ok(())
    } else {
        Err(EtlError::RowCountChanged { expected, found })
    }
}

/// Loads and transforms without touching the database.
pub fn prepare(input: &Path, options: &LoadOptions) -> Result<(RecordTable, LoadReport), StageError> {
    let loaded = load::load_path(input, options).at(Stage::Load)?;
    let table = transform(loaded.table)?;
    Ok((table, loaded.report))
}

pub fn run_load(
    input: &Path,
    load_options: &LoadOptions,
    sink_options: &SinkOptions,
) -> Result<RunReport, StageError> {
    let (table, load_report) = prepare(input, load_options)?;
    let WriteReport {
        rows_written,
        replaced_existing,
    } = sink::write_table(&table, sink_options).at(Stage::Write)?;
    check_row_count(table.row_count(), rows_written).at(Stage::Write)?;
    info!(
        "Wrote {rows_written} of {} loaded row(s) to '{}'",
        load_report.rows_loaded, sink_options.table
    );
    Ok(RunReport {
        load: load_report,
        columns: table.column_count(),
        rows_written,
        replaced_existing,
    })
}
