//! Reads the delimited order file into a [`RecordTable`].
//!
//! Cells that are empty or exactly equal to one of the configured null
//! tokens become nulls. Rows whose field count differs from the header are
//! handled per [`MalformedRowPolicy`]. Column types are inferred once all
//! rows are in memory.

use std::{collections::HashSet, path::Path};

use clap::ValueEnum;
use encoding_rs::Encoding;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::{infer_column_type, typed_value},
    error::{EtlError, Result},
    io_utils,
    records::{ColumnMeta, RecordTable},
};

pub const DEFAULT_NULL_TOKENS: &[&str] = &["Not Available", "unknown"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MalformedRowPolicy {
    /// Abort the whole load on the first row with the wrong field count
    #[default]
    Fail,
    /// Drop the row, log it, and keep going
    Skip,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub null_tokens: Vec<String>,
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: encoding_rs::UTF_8,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
            malformed_rows: MalformedRowPolicy::Fail,
        }
    }
}

impl LoadOptions {
    fn is_null(&self, raw: &str) -> bool {
        raw.is_empty() || self.null_tokens.iter().any(|token| token == raw)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

#[derive(Debug)]
pub struct Loaded {
    pub table: RecordTable,
    pub report: LoadReport,
}

pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Loaded> {
    let mut reader = io_utils::open_csv_reader_from_path(path, options.delimiter)?;
    let loaded = load_reader(&mut reader, options).map_err(|err| match err {
        EtlError::EmptyInput { .. } => EtlError::EmptyInput {
            path: path.to_path_buf(),
        },
        other => other,
    })?;
    info!(
        "Loaded {} row(s) across {} column(s) from {:?}",
        loaded.report.rows_loaded,
        loaded.table.column_count(),
        path
    );
    Ok(loaded)
}

pub fn load_reader<R>(reader: &mut csv::Reader<R>, options: &LoadOptions) -> Result<Loaded>
where
    R: std::io::Read,
{
    let headers = io_utils::reader_headers(reader, options.encoding)?;
    if headers.is_empty() {
        return Err(EtlError::EmptyInput {
            path: Default::default(),
        });
    }
    let mut seen = HashSet::with_capacity(headers.len());
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(EtlError::DuplicateColumn(header.clone()));
        }
    }
    debug!("Raw headers: {headers:?}");

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut report = LoadReport::default();
    let mut record = csv::ByteRecord::new();
    let mut row_idx = 0usize;
    loop {
        let fallback_line = row_idx as u64 + 2;
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|source| EtlError::Csv {
                line: source
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line),
                source,
            })?;
        if !more {
            break;
        }
        row_idx += 1;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_line);
        if record.len() != headers.len() {
            match options.malformed_rows {
                MalformedRowPolicy::Fail => {
                    return Err(EtlError::MalformedRow {
                        line,
                        expected: headers.len(),
                        found: record.len(),
                    });
                }
                MalformedRowPolicy::Skip => {
                    warn!(
                        "Skipping line {line}: {} field(s), expected {}",
                        record.len(),
                        headers.len()
                    );
                    report.rows_skipped += 1;
                    continue;
                }
            }
        }
        let decoded = io_utils::decode_record(&record, options.encoding, line)?;
        raw_rows.push(
            decoded
                .into_iter()
                .map(|cell| (!options.is_null(&cell)).then_some(cell))
                .collect(),
        );
    }
    report.rows_loaded = raw_rows.len();

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let datatype = infer_column_type(
                raw_rows
                    .iter()
                    .filter_map(|row| row[idx].as_deref()),
            );
            debug!("Column '{name}' inferred as {datatype}");
            ColumnMeta::new(name, datatype)
        })
        .collect::<Vec<_>>();

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&columns)
                .map(|(cell, column)| cell.map(|raw| typed_value(raw, column.datatype)))
                .collect()
        })
        .collect();

    Ok(Loaded {
        table: RecordTable::new(columns, rows),
        report,
    })
}
