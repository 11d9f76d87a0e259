use std::collections::BTreeSet;

use tracing::debug;

use crate::cache::ResultCache;
use crate::domain::QueryResult;
use crate::error::SckanError;
use crate::queries::{self, NamedQuery};
use crate::sparql::SparqlClient;
use crate::synonyms::canonical_species;

/// Cache-aware query runner without species validation. Only the bootstrap
/// lookups that build the valid-species set go through it directly.
pub struct RawExecutor<C> {
    client: C,
    cache: ResultCache,
}

impl<C: SparqlClient> RawExecutor<C> {
    pub fn new(client: C, cache: ResultCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache_key(&self, query_text: &str) -> String {
        format!("{query_text}{}", self.client.endpoint())
    }

    /// Runs an already substituted query.
    ///
    /// With `use_cache` a fresh entry is returned without touching the
    /// network; a stale or unparsable one is evicted before refetching.
    /// Without it the endpoint is always queried, but the answer still
    /// refreshes the cache.
    pub fn fetch(&self, query_text: &str, use_cache: bool) -> Result<QueryResult, SckanError> {
        let key = self.cache_key(query_text);
        if use_cache {
            match self.cache.get_or_discard(&key)? {
                Some((cached_at, value)) if !self.cache.is_stale(cached_at) => {
                    debug!(%cached_at, "cache hit");
                    return Ok(value);
                }
                Some((cached_at, _)) => {
                    debug!(%cached_at, "cache entry expired");
                    self.cache.remove(&key)?;
                }
                None => debug!("cache miss"),
            }
        } else {
            debug!("cache bypassed");
        }
        let value = self.client.select(query_text)?;
        self.cache.put(&key, &value)?;
        Ok(value)
    }
}

/// Species-checked query runner, available once the valid-species set is
/// known.
pub struct QueryExecutor<C> {
    raw: RawExecutor<C>,
    valid_species: BTreeSet<String>,
}

impl<C: SparqlClient> QueryExecutor<C> {
    /// Populates the valid-species set from the species lookup query.
    pub fn bootstrap(raw: RawExecutor<C>) -> Result<Self, SckanError> {
        let text = queries::substitute(&NamedQuery::SpeciesWithSynonyms.template(), None)?;
        let result = raw.fetch(&text, true)?;
        let valid_species = result
            .pairs()
            .map(|(_, label)| canonical_species(label).to_string())
            .collect::<BTreeSet<_>>();
        debug!(count = valid_species.len(), "valid species loaded");
        Ok(Self::with_valid_species(raw, valid_species))
    }

    pub fn with_valid_species(raw: RawExecutor<C>, valid_species: BTreeSet<String>) -> Self {
        Self { raw, valid_species }
    }

    pub fn valid_species(&self) -> &BTreeSet<String> {
        &self.valid_species
    }

    pub fn is_valid_species(&self, species: &str) -> bool {
        self.valid_species.contains(species)
    }

    pub fn raw(&self) -> &RawExecutor<C> {
        &self.raw
    }

    pub fn execute(
        &self,
        template: &str,
        species: Option<&str>,
        use_cache: bool,
    ) -> Result<QueryResult, SckanError> {
        let text = if queries::requires_species(template) {
            let species = self.check_species(species)?;
            queries::substitute(template, Some(species))?
        } else {
            if let Some(species) = species {
                debug!(species, "query takes no species; ignoring");
            }
            queries::substitute(template, None)?
        };
        self.raw.fetch(&text, use_cache)
    }

    pub fn execute_named(
        &self,
        query: NamedQuery,
        species: Option<&str>,
        use_cache: bool,
    ) -> Result<QueryResult, SckanError> {
        self.execute(&query.template(), species, use_cache)
    }

    /// Rejects a missing, empty or unknown species.
    pub fn check_species<'s>(&self, species: Option<&'s str>) -> Result<&'s str, SckanError> {
        let species = species
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SckanError::InvalidArgument("species is required".to_string()))?;
        if !self.is_valid_species(species) {
            return Err(SckanError::InvalidArgument(format!(
                "unknown species: {species}"
            )));
        }
        Ok(species)
    }

    pub fn sweep_cache(&self) -> Result<usize, SckanError> {
        self.raw.cache().sweep()
    }
}
