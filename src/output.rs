use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use crate::error::SckanError;
use crate::table::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    /// Header row followed by data rows, nulls as empty strings.
    Rows,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_json<T: Serialize>(value: &T) -> Result<(), SckanError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| SckanError::Output(err.to_string()))?;
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(json.as_bytes())
            .and_then(|_| stdout.write_all(b"\n"))
            .map_err(|err| SckanError::Output(err.to_string()))
    }

    pub fn print_table(table: &Table, format: OutputFormat) -> Result<(), SckanError> {
        match format {
            OutputFormat::Json => Self::print_json(table),
            OutputFormat::Csv => table.write_csv(io::stdout().lock()),
            OutputFormat::Rows => Self::print_json(&table.to_query_result()),
        }
    }
}
