mod common;

use std::collections::BTreeSet;
use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::TimeDelta;
use tempfile::tempdir;

use sckan_compare::cache::{ResultCache, SECONDS_PER_DAY};
use sckan_compare::error::SckanError;
use sckan_compare::executor::{QueryExecutor, RawExecutor};
use sckan_compare::queries::{self, NamedQuery};

use common::{ManualClock, StubSparql};

const MAX_CACHE_DAYS: u32 = 7;

fn cache_root(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap()
}

fn species_query() -> String {
    queries::substitute(&NamedQuery::SpeciesWithSynonyms.template(), None).unwrap()
}

#[test]
fn stale_entry_triggers_refetch() {
    let temp = tempdir().unwrap();
    let clock = ManualClock::new();
    let cache = ResultCache::open_with_clock(cache_root(&temp), MAX_CACHE_DAYS, clock.clone())
        .unwrap();
    let client = StubSparql::default();
    let raw = RawExecutor::new(client.clone(), cache);
    let query = species_query();

    let first = raw.fetch(&query, true).unwrap();
    let second = raw.fetch(&query, true).unwrap();
    assert_eq!(first, second);
    assert_eq!(client.call_count(), 1);

    clock.advance(TimeDelta::seconds(i64::from(MAX_CACHE_DAYS) * SECONDS_PER_DAY));
    raw.fetch(&query, true).unwrap();
    assert_eq!(client.call_count(), 1);

    clock.advance(TimeDelta::seconds(1));
    raw.fetch(&query, true).unwrap();
    assert_eq!(client.call_count(), 2);

    // The refetch stored a fresh timestamp.
    raw.fetch(&query, true).unwrap();
    assert_eq!(client.call_count(), 2);
}

#[test]
fn bypass_still_refreshes_cache() {
    let temp = tempdir().unwrap();
    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    let client = StubSparql::default();
    let raw = RawExecutor::new(client.clone(), cache);
    let query = species_query();

    raw.fetch(&query, false).unwrap();
    raw.fetch(&query, false).unwrap();
    assert_eq!(client.call_count(), 2);

    let key = raw.cache_key(&query);
    assert!(raw.cache().get(&key).unwrap().is_some());
    raw.fetch(&query, true).unwrap();
    assert_eq!(client.call_count(), 2);
}

#[test]
fn cache_key_includes_endpoint() {
    let temp = tempdir().unwrap();
    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    let raw = RawExecutor::new(StubSparql::default(), cache);

    let key = raw.cache_key("SELECT 1");
    assert_eq!(key, format!("SELECT 1{}", common::ENDPOINT));
}

#[test]
fn get_returns_value_within_ttl() {
    let temp = tempdir().unwrap();
    let clock = ManualClock::new();
    let cache = ResultCache::open_with_clock(cache_root(&temp), MAX_CACHE_DAYS, clock.clone())
        .unwrap();
    let value = common::region_rows();

    cache.put("key", &value).unwrap();
    clock.advance(TimeDelta::days(3));
    let (cached_at, cached) = cache.get("key").unwrap().unwrap();
    assert_eq!(cached, value);
    assert!(!cache.is_stale(cached_at));
}

#[test]
fn sweep_removes_only_expired_entries() {
    let temp = tempdir().unwrap();
    let clock = ManualClock::new();
    let cache = ResultCache::open_with_clock(cache_root(&temp), MAX_CACHE_DAYS, clock.clone())
        .unwrap();

    cache.put("old", &common::species_rows()).unwrap();
    clock.advance(TimeDelta::days(5));
    cache.put("recent", &common::region_rows()).unwrap();
    clock.advance(TimeDelta::days(3));

    assert_eq!(cache.sweep().unwrap(), 1);
    assert!(cache.get("old").unwrap().is_none());
    assert!(cache.get("recent").unwrap().is_some());
    assert_eq!(cache.len().unwrap(), 1);
}

#[test]
fn unwritable_cache_root_fails_fast() {
    let temp = tempdir().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let root = Utf8PathBuf::from_path_buf(blocker).unwrap();

    let err = ResultCache::open(root, MAX_CACHE_DAYS).unwrap_err();
    assert_matches!(err, SckanError::Storage(_));
}

#[test]
fn sweep_continues_past_corrupt_entry() {
    let temp = tempdir().unwrap();
    let clock = ManualClock::new();
    let cache = ResultCache::open_with_clock(cache_root(&temp), MAX_CACHE_DAYS, clock.clone())
        .unwrap();

    for index in 0..5 {
        cache.put(&format!("query-{index}"), &common::region_rows()).unwrap();
    }
    fs::write(cache.entry_path("query-2"), br#"{"key": "query-2", "cached_at": "2024"#).unwrap();
    clock.advance(TimeDelta::days(30));

    assert_eq!(cache.sweep().unwrap(), 5);
    assert_eq!(cache.len().unwrap(), 0);
}

#[test]
fn corrupt_entry_is_refetched_and_replaced() {
    let temp = tempdir().unwrap();
    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    let client = StubSparql::default();
    let raw = RawExecutor::new(client.clone(), cache);
    let query = species_query();
    let key = raw.cache_key(&query);

    fs::write(raw.cache().entry_path(&key), b"{\"key\": ").unwrap();
    let fetched = raw.fetch(&query, true).unwrap();
    assert_eq!(fetched, common::species_rows());
    assert_eq!(client.call_count(), 1);

    raw.fetch(&query, true).unwrap();
    assert_eq!(client.call_count(), 1);
    assert!(raw.cache().get(&key).unwrap().is_some());
}

#[test]
fn species_is_checked_only_for_templates_that_need_it() {
    let temp = tempdir().unwrap();
    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    let client = StubSparql::default();
    let executor = QueryExecutor::bootstrap(RawExecutor::new(client.clone(), cache)).unwrap();
    assert_eq!(client.call_count(), 1);

    assert_matches!(
        executor.execute_named(NamedQuery::RegionsWithSynonyms, None, true),
        Err(SckanError::InvalidArgument(_))
    );
    assert_matches!(
        executor.execute_named(NamedQuery::RegionsWithSynonyms, Some("Felis catus"), true),
        Err(SckanError::InvalidArgument(_))
    );
    assert_eq!(client.call_count(), 1);

    executor
        .execute_named(NamedQuery::SpeciesWithoutSynonyms, Some("Homo sapiens"), true)
        .unwrap();
    executor
        .execute_named(NamedQuery::RegionsWithSynonyms, Some("Homo sapiens"), true)
        .unwrap();
    assert_eq!(client.call_count(), 3);
}

#[test]
fn bootstrap_reuses_cached_species_lookup() {
    let temp = tempdir().unwrap();
    let client = StubSparql::default();

    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    QueryExecutor::bootstrap(RawExecutor::new(client.clone(), cache)).unwrap();
    let cache = ResultCache::open(cache_root(&temp), MAX_CACHE_DAYS).unwrap();
    let executor = QueryExecutor::bootstrap(RawExecutor::new(client.clone(), cache)).unwrap();

    assert_eq!(client.call_count(), 1);
    let expected = ["Canis familiaris", "Homo sapiens", "Mus musculus", "Rattus norvegicus"]
        .into_iter()
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    assert_eq!(executor.valid_species(), &expected);
}
