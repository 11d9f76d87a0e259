use std::collections::{BTreeSet, HashSet};
use std::io::Write;

use serde::Serialize;

use crate::domain::{QueryResult, RegionSlot, columns};
use crate::error::SckanError;

/// Tabular view of a query result. Cells are nullable so that unresolved
/// labels stay distinguishable from empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Row 0 of the result becomes the header.
    pub fn from_result(result: &QueryResult) -> Self {
        let Some(header) = result.header() else {
            return Self::default();
        };
        let rows = result
            .records()
            .iter()
            .map(|row| row.iter().cloned().map(Some).collect())
            .collect();
        Self::new(header.to_vec(), rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Option<String>>> {
        &mut self.rows
    }

    /// Keeps rows whose `column` equals `value`; null cells never match.
    pub fn retain_eq(&mut self, column: &str, value: &str) -> Result<(), SckanError> {
        let index = self.require_column(column)?;
        self.rows.retain(|row| row[index].as_deref() == Some(value));
        Ok(())
    }

    /// Drops rows equal in every column to an earlier row.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    pub fn select(&self, names: &[&str]) -> Result<Table, SckanError> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&index| row[index].clone()).collect())
            .collect();
        Ok(Table::new(
            names.iter().map(|name| name.to_string()).collect(),
            rows,
        ))
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), SckanError> {
        let index = self.require_column(from)?;
        self.columns[index] = to.to_string();
        Ok(())
    }

    /// Sorted distinct non-null values across the named columns; columns the
    /// table lacks are skipped.
    pub fn unique_values(&self, names: &[&str]) -> BTreeSet<String> {
        let indices = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect::<Vec<_>>();
        self.rows
            .iter()
            .flat_map(|row| indices.iter().filter_map(|&index| row[index].clone()))
            .collect()
    }

    pub fn connectivity_rows(&self) -> Result<Vec<ConnectivityRow>, SckanError> {
        let neuron = self
            .column_index(columns::NEURON_IRI)
            .or_else(|| self.column_index(columns::NEURON_ID))
            .ok_or_else(|| {
                SckanError::InvalidArgument("table has no neuron id column".to_string())
            })?;
        let label = self.require_column(columns::NEURON_LABEL)?;
        let slots = RegionSlot::ALL.map(|slot| {
            (
                self.column_index(slot.uri_column()),
                self.column_index(slot.label_column()),
            )
        });
        let species_uri = self.column_index(columns::SPECIES_LINK);
        let species_label = self.column_index(columns::SPECIES);
        let cell = |row: &[Option<String>], index: Option<usize>| {
            index.and_then(|index| row[index].clone())
        };

        Ok(self
            .rows
            .iter()
            .map(|row| ConnectivityRow {
                neuron_id: row[neuron].clone().unwrap_or_default(),
                neuron_label: row[label].clone().unwrap_or_default(),
                region_a_uri: cell(row, slots[0].0),
                region_a_label: cell(row, slots[0].1),
                region_b_uri: cell(row, slots[1].0),
                region_b_label: cell(row, slots[1].1),
                region_c_uri: cell(row, slots[2].0),
                region_c_label: cell(row, slots[2].1),
                species_uri: cell(row, species_uri),
                species_label: cell(row, species_label),
            })
            .collect())
    }

    /// Null cells become empty strings.
    pub fn to_query_result(&self) -> QueryResult {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.columns.clone());
        rows.extend(
            self.rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.clone().unwrap_or_default()).collect()),
        );
        QueryResult::new(rows)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SckanError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(&self.columns)
            .map_err(|err| SckanError::Output(err.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|err| SckanError::Output(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| SckanError::Output(err.to_string()))?;
        Ok(())
    }

    fn require_column(&self, name: &str) -> Result<usize, SckanError> {
        self.column_index(name)
            .ok_or_else(|| SckanError::InvalidArgument(format!("unknown column: {name}")))
    }
}

/// One neuron population observation after label resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityRow {
    pub neuron_id: String,
    pub neuron_label: String,
    pub region_a_uri: Option<String>,
    pub region_a_label: Option<String>,
    pub region_b_uri: Option<String>,
    pub region_b_label: Option<String>,
    pub region_c_uri: Option<String>,
    pub region_c_label: Option<String>,
    pub species_uri: Option<String>,
    pub species_label: Option<String>,
}
