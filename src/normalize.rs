use std::collections::BTreeMap;

use crate::domain::{RegionSlot, columns};
use crate::error::SckanError;
use crate::synonyms::canonical_species;
use crate::table::Table;

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn from_parts(
        column: Option<&str>,
        value: Option<&str>,
    ) -> Result<Option<RowFilter>, SckanError> {
        match (column, value) {
            (None, None) => Ok(None),
            (Some(column), Some(value)) => Ok(Some(RowFilter {
                column: column.to_string(),
                value: value.to_string(),
            })),
            (Some(column), None) => Err(SckanError::InvalidArgument(format!(
                "filter column {column} given without a value"
            ))),
            (None, Some(_)) => Err(SckanError::InvalidArgument(
                "filter value given without a column".to_string(),
            )),
        }
    }
}

/// Turns a raw connectivity table into its canonical form for one species.
///
/// Steps, in order: species labels (only when the table declares a
/// `Species` column), restriction to the requested species, region labels
/// for every `A`/`B`/`C` column whose `Region_*` counterpart exists, the
/// optional equality filter, and removal of exact duplicate rows.
#[derive(Debug, Clone)]
pub struct DataFrameNormalizer {
    species: String,
    species_labels: BTreeMap<String, String>,
    region_labels: BTreeMap<String, String>,
}

impl DataFrameNormalizer {
    pub fn new(
        species: impl Into<String>,
        species_labels: BTreeMap<String, String>,
        region_labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            species: species.into(),
            species_labels,
            region_labels,
        }
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn normalize(&self, mut table: Table, filter: Option<&RowFilter>) -> Result<Table, SckanError> {
        if let Some(filter) = filter {
            if !table.has_column(&filter.column) {
                return Err(SckanError::InvalidArgument(format!(
                    "unknown filter column: {}",
                    filter.column
                )));
            }
        }

        if table.has_column(columns::SPECIES) {
            self.resolve_species(&mut table);
            table.retain_eq(columns::SPECIES, &self.species)?;
        }
        self.resolve_regions(&mut table);

        if let Some(filter) = filter {
            table.retain_eq(&filter.column, &filter.value)?;
        }
        table.dedup();
        Ok(table)
    }

    fn resolve_species(&self, table: &mut Table) {
        let Some(species) = table.column_index(columns::SPECIES) else {
            return;
        };
        let link = table.column_index(columns::SPECIES_LINK);
        for row in table.rows_mut() {
            let from_link = link
                .and_then(|index| row[index].as_deref())
                .and_then(|uri| self.species_labels.get(uri))
                .cloned();
            let resolved = from_link.or_else(|| {
                row[species]
                    .as_deref()
                    .map(|label| canonical_species(label).to_string())
            });
            row[species] = resolved;
        }
    }

    fn resolve_regions(&self, table: &mut Table) {
        for slot in RegionSlot::ALL {
            let (Some(uri), Some(label)) = (
                table.column_index(slot.uri_column()),
                table.column_index(slot.label_column()),
            ) else {
                continue;
            };
            for row in table.rows_mut() {
                row[label] = row[uri]
                    .as_deref()
                    .and_then(|value| self.region_labels.get(value))
                    .cloned();
            }
        }
    }
}
