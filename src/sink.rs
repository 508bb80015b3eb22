//! PostgreSQL writer.
//!
//! The whole write runs inside one transaction on one connection: the
//! existing-table check, the optional `DROP`, `CREATE TABLE`, and batched
//! multi-row `INSERT`s. Any failure rolls everything back, so the target
//! table is never left half written.
//!
//! [`IfExists::Replace`] is destructive: every row already stored in the
//! target table is discarded and only the current run's rows remain. It is
//! never the default and has to be selected explicitly.

use std::{collections::HashSet, time::Duration};

use chrono::NaiveDate;
use clap::ValueEnum;
use itertools::Itertools;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    Connection, PgConnection, Postgres, QueryBuilder,
    query_builder::Separated,
};
use tokio::time::timeout;

use crate::{
    data::{ColumnType, Value},
    error::{EtlError, Result},
    records::{ColumnMeta, RecordTable},
};

pub const DEFAULT_TABLE: &str = "orders";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(300);

/// Postgres caps a single statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum IfExists {
    /// Refuse to write when the target table already exists
    #[default]
    Fail,
    /// Drop the existing table (and all of its rows) and recreate it
    Replace,
    /// Insert into the existing table, creating it when missing
    Append,
}

#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub database_url: String,
    pub table: String,
    pub if_exists: IfExists,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub batch_size: usize,
}

impl SinkOptions {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            table: DEFAULT_TABLE.to_string(),
            if_exists: IfExists::Fail,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub rows_written: usize,
    pub replaced_existing: bool,
}

/// Writes `table` synchronously, driving sqlx on a private current-thread runtime.
pub fn write_table(table: &RecordTable, options: &SinkOptions) -> Result<WriteReport> {
    let target = quote_table_name(&options.table)?;
    ensure_unique_columns(table.columns())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(EtlError::Runtime)?;
    runtime.block_on(write_table_async(table, &target, options))
}

async fn write_table_async(
    table: &RecordTable,
    target: &str,
    options: &SinkOptions,
) -> Result<WriteReport> {
    info!(
        "Connecting to {} (timeout {}s)",
        redact_url(&options.database_url),
        options.connect_timeout.as_secs()
    );
    let mut conn = timeout(
        options.connect_timeout,
        PgConnection::connect(&options.database_url),
    )
    .await
    .map_err(|_| EtlError::Timeout {
        operation: "connect",
        after: options.connect_timeout,
    })?
    .map_err(EtlError::Connect)?;

    let outcome = match timeout(
        options.write_timeout,
        write_in_transaction(&mut conn, table, target, options),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(EtlError::Timeout {
            operation: "write",
            after: options.write_timeout,
        }),
    };

    // Release the connection on both paths. An uncommitted transaction is rolled back.
    match timeout(options.connect_timeout, conn.close()).await {
        Ok(Ok(())) => debug!("Connection closed"),
        Ok(Err(err)) => debug!("Closing connection failed: {err}"),
        Err(_) => debug!("Closing connection timed out"),
    }
    outcome
}

async fn write_in_transaction(
    conn: &mut PgConnection,
    table: &RecordTable,
    target: &str,
    options: &SinkOptions,
) -> Result<WriteReport> {
    let mut tx = conn.begin().await.map_err(EtlError::Write)?;

    let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(target)
        .fetch_one(&mut *tx)
        .await
        .map_err(EtlError::Write)?;
    debug!("Target table {target} exists: {exists}");

    let mut replaced_existing = false;
    let create = match (options.if_exists, exists) {
        (IfExists::Fail, true) => return Err(EtlError::TableExists(options.table.clone())),
        (IfExists::Replace, true) => {
            warn!("Replacing table {target}: all of its existing rows will be discarded");
            sqlx::query(&format!("DROP TABLE {target}"))
                .execute(&mut *tx)
                .await
                .map_err(EtlError::Write)?;
            replaced_existing = true;
            true
        }
        (IfExists::Append, true) => false,
        (_, false) => true,
    };

    if create {
        let ddl = create_table_sql(target, table.columns());
        debug!("{ddl}");
        sqlx::query(&ddl)
            .execute(&mut *tx)
            .await
            .map_err(EtlError::Write)?;
    }

    let per_batch = rows_per_batch(options.batch_size, table.column_count());
    let insert_prefix = insert_prefix_sql(target, table.columns());
    let mut rows_written = 0usize;
    for chunk in table.rows().chunks(per_batch) {
        let mut builder = QueryBuilder::<Postgres>::new(&insert_prefix);
        builder.push_values(chunk, |mut separated, row| {
            for (cell, column) in row.iter().zip(table.columns()) {
                push_cell(&mut separated, column.datatype, cell);
            }
        });
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(EtlError::Write)?;
        rows_written += result.rows_affected() as usize;
        debug!("Inserted batch of {} row(s)", chunk.len());
    }

    tx.commit().await.map_err(EtlError::Write)?;
    info!("Committed {rows_written} row(s) to {target}");
    Ok(WriteReport {
        rows_written,
        replaced_existing,
    })
}

fn push_cell(
    separated: &mut Separated<'_, '_, Postgres, &'static str>,
    column: ColumnType,
    cell: &Option<Value>,
) {
    match cell {
        Some(Value::Text(s)) => separated.push_bind(s.clone()),
        Some(Value::Integer(i)) => separated.push_bind(*i),
        Some(Value::Decimal(d)) => separated.push_bind(*d),
        Some(Value::Date(d)) => separated.push_bind(*d),
        None => match column {
            ColumnType::Text => separated.push_bind(None::<String>),
            ColumnType::Integer => separated.push_bind(None::<i64>),
            ColumnType::Decimal => separated.push_bind(None::<Decimal>),
            ColumnType::Date => separated.push_bind(None::<NaiveDate>),
        },
    };
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Accepts `table` or `schema.table` and returns the quoted form.
pub fn quote_table_name(name: &str) -> Result<String> {
    let parts = name.split('.').collect::<Vec<_>>();
    let valid = (1..=2).contains(&parts.len())
        && parts
            .iter()
            .all(|part| !part.trim().is_empty() && !part.contains('\0'));
    if !valid {
        return Err(EtlError::InvalidTableName(name.to_string()));
    }
    Ok(parts.iter().map(|part| quote_ident(part)).join("."))
}

pub fn ensure_unique_columns(columns: &[ColumnMeta]) -> Result<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(EtlError::DuplicateColumn(column.name.clone()));
        }
    }
    Ok(())
}

pub fn create_table_sql(target: &str, columns: &[ColumnMeta]) -> String {
    let definitions = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.datatype.sql_type()))
        .join(", ");
    format!("CREATE TABLE {target} ({definitions})")
}

fn insert_prefix_sql(target: &str, columns: &[ColumnMeta]) -> String {
    let names = columns.iter().map(|c| quote_ident(&c.name)).join(", ");
    format!("INSERT INTO {target} ({names}) ")
}

pub fn rows_per_batch(batch_size: usize, column_count: usize) -> usize {
    let limit = MAX_BIND_PARAMS / column_count.max(1);
    batch_size.clamp(1, limit.max(1))
}

/// Hides the password portion of a connection URL for logging.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let Some(at) = url[authority_start..].rfind('@').map(|i| i + authority_start) else {
        return url.to_string();
    };
    match url[authority_start..at].find(':') {
        Some(colon) => {
            let user_end = authority_start + colon;
            format!("{}:***{}", &url[..user_end], &url[at..])
        }
        None => url.to_string(),
    }
}
