//! Label normalization for species and anatomical regions.

use std::collections::BTreeMap;

use tracing::debug;

use crate::assets::{AssetRegistry, RegionRecord};
use crate::domain::{QueryResult, RegionSlot, Species};
use crate::error::SckanError;
use crate::executor::QueryExecutor;
use crate::queries::{self, NamedQuery};
use crate::sparql::SparqlClient;
use crate::table::Table;

/// Bumped whenever an entry of [`SPECIES_SYNONYMS`] changes.
pub const SYNONYM_TABLE_VERSION: u32 = 1;

/// Surface form → canonical species label. Matching is on the whole value.
pub const SPECIES_SYNONYMS: &[(&str, &str)] = &[
    ("Mammalia", "Mammal"),
    ("mammals", "Mammal"),
    ("Vertebrata <vertebrates>", "Vertebrata"),
    ("vertebrates", "Vertebrata"),
    ("human", "Homo sapiens"),
    ("Norway rat", "Rattus norvegicus"),
    ("brown rat", "Rattus norvegicus"),
    ("rat", "Rattus norvegicus"),
    ("rats", "Rattus norvegicus"),
    ("mouse", "Mus musculus"),
    ("house mouse", "Mus musculus"),
];

/// URIs per `rdfs:label` lookup query.
pub const LABEL_LOOKUP_CHUNK: usize = 100;

pub fn canonical_species(label: &str) -> &str {
    SPECIES_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == label)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(label)
}

/// Species URI → canonical label. A URI seen twice keeps the label of the
/// later row.
pub fn build_species_label_map(result: &QueryResult) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (uri, label) in result.pairs() {
        map.insert(uri.to_string(), canonical_species(label).to_string());
    }
    map
}

/// Region URI → reference `Name`, restricted to URIs the species lookup
/// returned that also appear in the reference records.
pub fn build_region_label_map(
    result: &QueryResult,
    records: &[RegionRecord],
) -> BTreeMap<String, String> {
    let reference = records
        .iter()
        .filter_map(|record| Some((record.url.as_deref()?, record.name.as_str())))
        .collect::<BTreeMap<_, _>>();
    let mut map = BTreeMap::new();
    for (uri, _) in result.pairs() {
        if let Some(name) = reference.get(uri) {
            map.insert(uri.to_string(), name.to_string());
        }
    }
    map
}

/// Sorted distinct region URIs of the `A`, `B` and `C` columns.
pub fn unique_region_uris(table: &Table) -> Vec<String> {
    let names = RegionSlot::ALL.map(|slot| slot.uri_column());
    table.unique_values(&names).into_iter().collect()
}

pub struct SynonymResolver<'a, C> {
    executor: &'a QueryExecutor<C>,
    assets: &'a AssetRegistry,
}

impl<'a, C: SparqlClient> SynonymResolver<'a, C> {
    pub fn new(executor: &'a QueryExecutor<C>, assets: &'a AssetRegistry) -> Self {
        Self { executor, assets }
    }

    pub fn species_label_map(&self) -> Result<BTreeMap<String, String>, SckanError> {
        let result = self
            .executor
            .execute_named(NamedQuery::SpeciesWithSynonyms, None, true)?;
        let map = build_species_label_map(&result);
        debug!(entries = map.len(), "species label map built");
        Ok(map)
    }

    /// Fails with `InvalidArgument` for a missing or unknown species and with
    /// `UnsupportedSpecies` for a known species without a region asset.
    pub fn region_label_map(&self, species: &str) -> Result<BTreeMap<String, String>, SckanError> {
        let visual = self.visual_species(species)?;
        let records = self
            .assets
            .records(visual)
            .ok_or_else(|| SckanError::UnsupportedSpecies(species.to_string()))?;
        let result =
            self.executor
                .execute_named(NamedQuery::RegionsWithSynonyms, Some(species), true)?;
        let map = build_region_label_map(&result, records);
        debug!(species, entries = map.len(), "region label map built");
        Ok(map)
    }

    /// Checks that `species` is known and ships a region asset.
    pub fn visual_species(&self, species: &str) -> Result<Species, SckanError> {
        let species = self.executor.check_species(Some(species))?;
        let visual = species.parse::<Species>()?;
        if !self.assets.supports(visual) {
            return Err(SckanError::UnsupportedSpecies(species.to_string()));
        }
        Ok(visual)
    }

    /// `rdfs:label` of each URI, queried in chunks; the first label returned
    /// for a URI is kept.
    pub fn lookup_labels(&self, uris: &[String]) -> Result<BTreeMap<String, String>, SckanError> {
        let mut labels = BTreeMap::new();
        for chunk in uris.chunks(LABEL_LOOKUP_CHUNK) {
            let query = queries::labels_for_uris(chunk);
            let result = self.executor.execute(&query, None, true)?;
            for (uri, label) in result.pairs() {
                labels
                    .entry(uri.to_string())
                    .or_insert_with(|| label.to_string());
            }
        }
        Ok(labels)
    }
}
