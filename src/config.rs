//! Run configuration.
//!
//! Settings come from an optional YAML file and are then overridden by
//! command-line flags. A minimal file looks like:
//!
//! ```yaml
//! input:
//!   null_tokens: ["Not Available", "unknown"]
//!   malformed_rows: fail
//! database:
//!   table: orders
//!   if_exists: replace
//! ```
//!
//! The connection string has no default and is usually supplied through the
//! `DATABASE_URL` environment variable rather than the file.

use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{InputArgs, LoadArgs, parse_delimiter},
    io_utils,
    load::{DEFAULT_NULL_TOKENS, LoadOptions, MalformedRowPolicy},
    sink::{self, IfExists, SinkOptions},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EtlConfig {
    pub input: InputConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    pub null_tokens: Vec<String>,
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: None,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub table: String,
    pub if_exists: IfExists,
    pub connect_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: sink::DEFAULT_TABLE.to_string(),
            if_exists: IfExists::default(),
            connect_timeout_secs: sink::DEFAULT_CONNECT_TIMEOUT.as_secs(),
            write_timeout_secs: sink::DEFAULT_WRITE_TIMEOUT.as_secs(),
            batch_size: sink::DEFAULT_BATCH_SIZE,
        }
    }
}

impl EtlConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: EtlConfig = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_input_args(&mut self, args: &InputArgs) {
        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = Some((delimiter as char).to_string());
        }
        if let Some(encoding) = &args.input_encoding {
            self.input.encoding = Some(encoding.clone());
        }
        if !args.null_tokens.is_empty() {
            self.input.null_tokens = args.null_tokens.clone();
        }
        if let Some(policy) = args.malformed_rows {
            self.input.malformed_rows = policy;
        }
    }

    pub fn apply_load_args(&mut self, args: &LoadArgs) {
        self.apply_input_args(&args.input);
        let database = &mut self.database;
        if let Some(url) = &args.database_url {
            database.url = Some(url.clone());
        }
        if let Some(table) = &args.table {
            database.table = table.clone();
        }
        if let Some(if_exists) = args.if_exists {
            database.if_exists = if_exists;
        }
        if let Some(secs) = args.connect_timeout_secs {
            database.connect_timeout_secs = secs;
        }
        if let Some(secs) = args.write_timeout_secs {
            database.write_timeout_secs = secs;
        }
        if let Some(batch_size) = args.batch_size {
            database.batch_size = batch_size;
        }
    }

    pub fn load_options(&self, input: &Path) -> Result<LoadOptions> {
        let provided = self
            .input
            .delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(|err| anyhow!("Invalid delimiter in configuration: {err}"))?;
        let encoding = io_utils::resolve_encoding(self.input.encoding.as_deref())?;
        Ok(LoadOptions {
            delimiter: io_utils::resolve_input_delimiter(input, provided),
            encoding,
            null_tokens: self.input.null_tokens.clone(),
            malformed_rows: self.input.malformed_rows,
        })
    }

    pub fn sink_options(&self) -> Result<SinkOptions> {
        let database = &self.database;
        let Some(url) = database.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            bail!("No database URL configured; pass --database-url or set DATABASE_URL");
        };
        if database.batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        Ok(SinkOptions {
            database_url: url.to_string(),
            table: database.table.clone(),
            if_exists: database.if_exists,
            connect_timeout: Duration::from_secs(database.connect_timeout_secs),
            write_timeout: Duration::from_secs(database.write_timeout_secs),
            batch_size: database.batch_size,
        })
    }
}
