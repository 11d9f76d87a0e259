use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::assets::AssetRegistry;
use crate::cache::ResultCache;
use crate::domain::{QueryResult, Species, columns};
use crate::error::SckanError;
use crate::executor::{QueryExecutor, RawExecutor};
use crate::normalize::{DataFrameNormalizer, RowFilter};
use crate::queries::NamedQuery;
use crate::sparql::SparqlClient;
use crate::synonyms::{SynonymResolver, unique_region_uris};
use crate::table::Table;
use crate::visualize::{ConnectionListAdapter, ConnectionScene, VisualizationAdapter};

pub const START_REGION: &str = "Start Region";
pub const END_REGION: &str = "End Region";
pub const INTERMEDIATE_REGION: &str = "Intermediate Region";

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesEntry {
    pub label: String,
    pub visual: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesResult {
    pub species: Vec<SpeciesEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionsResult {
    pub species: String,
    pub regions: BTreeMap<String, String>,
    /// `rdfs:label` of every region URI on the species' neuron paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesConnections {
    pub species: String,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub start_region: Option<String>,
    pub end_region: Option<String>,
    pub first: SpeciesConnections,
    pub second: SpeciesConnections,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneResult {
    pub species: String,
    pub query: String,
    pub scene: ConnectionScene,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub removed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheInfoResult {
    pub root: String,
    pub entries: usize,
    pub max_cache_days: u32,
}

/// Process-wide context: the checked executor and the reference assets.
/// Built once at startup and borrowed by every command.
pub struct App<C: SparqlClient> {
    executor: QueryExecutor<C>,
    assets: AssetRegistry,
}

impl<C: SparqlClient> App<C> {
    /// Runs the species bootstrap lookup before any checked query.
    pub fn bootstrap(client: C, cache: ResultCache, assets: AssetRegistry) -> Result<Self, SckanError> {
        let executor = QueryExecutor::bootstrap(RawExecutor::new(client, cache))?;
        Ok(Self::new(executor, assets))
    }

    pub fn new(executor: QueryExecutor<C>, assets: AssetRegistry) -> Self {
        Self { executor, assets }
    }

    pub fn executor(&self) -> &QueryExecutor<C> {
        &self.executor
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    fn resolver(&self) -> SynonymResolver<'_, C> {
        SynonymResolver::new(&self.executor, &self.assets)
    }

    pub fn execute(
        &self,
        query: NamedQuery,
        species: Option<&str>,
        use_cache: bool,
    ) -> Result<QueryResult, SckanError> {
        self.executor.execute_named(query, species, use_cache)
    }

    pub fn species(&self) -> SpeciesResult {
        let species = self
            .executor
            .valid_species()
            .iter()
            .map(|label| SpeciesEntry {
                label: label.clone(),
                visual: label
                    .parse::<Species>()
                    .is_ok_and(|species| self.assets.supports(species)),
            })
            .collect();
        SpeciesResult { species }
    }

    pub fn valid_species(&self) -> &BTreeSet<String> {
        self.executor.valid_species()
    }

    pub fn species_label_map(&self) -> Result<BTreeMap<String, String>, SckanError> {
        self.resolver().species_label_map()
    }

    pub fn region_label_map(&self, species: &str) -> Result<BTreeMap<String, String>, SckanError> {
        self.resolver().region_label_map(species)
    }

    /// Region label map of `species`; with `lookup`, also the labels of the
    /// region URIs its neuron paths reference.
    pub fn regions(&self, species: &str, lookup: bool) -> Result<RegionsResult, SckanError> {
        let regions = self.region_label_map(species)?;
        let uri_labels = if lookup {
            let paths = self.execute(NamedQuery::NeuronPath, Some(species), true)?;
            Some(self.region_uri_labels(&Table::from_result(&paths))?)
        } else {
            None
        };
        Ok(RegionsResult {
            species: species.to_string(),
            regions,
            uri_labels,
        })
    }

    pub fn lookup_labels(&self, uris: &[String]) -> Result<BTreeMap<String, String>, SckanError> {
        self.resolver().lookup_labels(uris)
    }

    /// Labels of every region URI the table references.
    pub fn region_uri_labels(&self, table: &Table) -> Result<BTreeMap<String, String>, SckanError> {
        self.lookup_labels(&unique_region_uris(table))
    }

    /// Normalizes a raw result for `species`.
    pub fn filter(
        &self,
        result: &QueryResult,
        species: &str,
        filter_column: Option<&str>,
        filter_value: Option<&str>,
    ) -> Result<Table, SckanError> {
        self.filter_table(Table::from_result(result), species, filter_column, filter_value)
    }

    /// Same as [`App::filter`] on a table, which may already be normalized.
    pub fn filter_table(
        &self,
        table: Table,
        species: &str,
        filter_column: Option<&str>,
        filter_value: Option<&str>,
    ) -> Result<Table, SckanError> {
        let row_filter = RowFilter::from_parts(filter_column, filter_value)?;
        let resolver = self.resolver();
        resolver.visual_species(species)?;
        let normalizer = DataFrameNormalizer::new(
            species,
            resolver.species_label_map()?,
            resolver.region_label_map(species)?,
        );
        normalizer.normalize(table, row_filter.as_ref())
    }

    /// Runs `query` for `species` and normalizes the answer.
    pub fn table(
        &self,
        query: NamedQuery,
        species: &str,
        filter_column: Option<&str>,
        filter_value: Option<&str>,
        use_cache: bool,
    ) -> Result<Table, SckanError> {
        RowFilter::from_parts(filter_column, filter_value)?;
        self.resolver().visual_species(species)?;
        let result = self.execute(query, Some(species), use_cache)?;
        self.filter(&result, species, filter_column, filter_value)
    }

    /// Side-by-side neuron paths of two species, optionally restricted to a
    /// start and an end region.
    pub fn compare(
        &self,
        first: &str,
        second: &str,
        start_region: Option<&str>,
        end_region: Option<&str>,
    ) -> Result<CompareResult, SckanError> {
        info!(first, second, "comparing species");
        Ok(CompareResult {
            start_region: start_region.map(str::to_string),
            end_region: end_region.map(str::to_string),
            first: self.connections(first, start_region, end_region)?,
            second: self.connections(second, start_region, end_region)?,
        })
    }

    fn connections(
        &self,
        species: &str,
        start_region: Option<&str>,
        end_region: Option<&str>,
    ) -> Result<SpeciesConnections, SckanError> {
        let mut table = self.table(NamedQuery::NeuronPath, species, None, None, true)?;
        if let Some(start) = start_region {
            table.retain_eq(columns::REGION_A, start)?;
        }
        if let Some(end) = end_region {
            table.retain_eq(columns::REGION_B, end)?;
        }
        let mut table = table.select(&[
            columns::NEURON_LABEL,
            columns::REGION_A,
            columns::REGION_B,
            columns::REGION_C,
        ])?;
        table.rename_column(columns::REGION_A, START_REGION)?;
        table.rename_column(columns::REGION_B, END_REGION)?;
        table.rename_column(columns::REGION_C, INTERMEDIATE_REGION)?;
        table.dedup();
        Ok(SpeciesConnections {
            species: species.to_string(),
            table,
        })
    }

    pub fn scene(&self, query: NamedQuery, species: &str) -> Result<SceneResult, SckanError> {
        let visual = self.resolver().visual_species(species)?;
        let coordinates = self
            .assets
            .coordinates(visual)
            .ok_or_else(|| SckanError::UnsupportedSpecies(species.to_string()))?;
        let table = self.table(query, species, None, None, true)?;
        let scene = ConnectionListAdapter.render(&table.connectivity_rows()?, &coordinates)?;
        Ok(SceneResult {
            species: species.to_string(),
            query: query.to_string(),
            scene,
        })
    }

    pub fn sweep_cache(&self) -> Result<SweepResult, SckanError> {
        sweep_cache(self.executor.raw().cache())
    }
}

/// Removes expired entries; needs no endpoint access.
pub fn sweep_cache(cache: &ResultCache) -> Result<SweepResult, SckanError> {
    let removed = cache.sweep()?;
    let remaining = cache.len()?;
    info!(removed, remaining, "cache swept");
    Ok(SweepResult { removed, remaining })
}

/// Cache statistics without contacting the endpoint.
pub fn cache_info(cache: &ResultCache) -> Result<CacheInfoResult, SckanError> {
    Ok(CacheInfoResult {
        root: cache.root().to_string(),
        entries: cache.len()?,
        max_cache_days: cache.max_cache_days(),
    })
}
