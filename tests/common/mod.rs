#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use sckan_compare::cache::Clock;
use sckan_compare::domain::QueryResult;
use sckan_compare::error::SckanError;
use sckan_compare::sparql::SparqlClient;

pub const ENDPOINT: &str = "http://sparql.test/blazegraph";

pub const BRAINSTEM: &str = "http://purl.obolibrary.org/obo/UBERON_0002298";
pub const HEART: &str = "http://purl.obolibrary.org/obo/UBERON_0000948";
pub const VAGUS: &str = "http://purl.obolibrary.org/obo/UBERON_0000010";
pub const LUNG: &str = "http://purl.obolibrary.org/obo/UBERON_0002048";

pub fn fixtures_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Answers each query family with canned rows and records every request.
#[derive(Clone, Default)]
pub struct StubSparql {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_neuron_queries: bool,
}

impl StubSparql {
    pub fn failing() -> Self {
        Self {
            fail_neuron_queries: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|query| query.contains(needle))
            .count()
    }
}

impl SparqlClient for StubSparql {
    fn endpoint(&self) -> &str {
        ENDPOINT
    }

    fn select(&self, query: &str) -> Result<QueryResult, SckanError> {
        self.calls.lock().unwrap().push(query.to_string());
        if query.contains("SELECT DISTINCT ?Species_link ?Species") {
            return Ok(species_rows());
        }
        if query.contains("SELECT DISTINCT ?Region_URI ?Region") {
            return Ok(region_rows());
        }
        if query.contains("SELECT DISTINCT ?annotation ?label") {
            return Ok(QueryResult::from_rows([
                vec!["annotation", "label"],
                vec![HEART, "heart"],
                vec![HEART, "cardiac"],
            ]));
        }
        if query.contains("?Neuron_IRI") {
            if self.fail_neuron_queries {
                return Err(SckanError::RemoteStatus {
                    status: 503,
                    message: "service unavailable".to_string(),
                });
            }
            return Ok(neuron_path_rows());
        }
        Err(SckanError::MalformedResponse("unexpected query".to_string()))
    }
}

pub fn species_rows() -> QueryResult {
    QueryResult::from_rows([
        vec!["Species_link", "Species"],
        vec!["http://taxon/9606", "human"],
        vec!["http://taxon/9606", "Homo sapiens"],
        vec!["http://taxon/10116", "Rattus norvegicus"],
        vec!["http://taxon/10116", "rat"],
        vec!["http://taxon/10090", "Mus musculus"],
        vec!["http://taxon/9615", "Canis familiaris"],
    ])
}

pub fn region_rows() -> QueryResult {
    QueryResult::from_rows([
        vec!["Region_URI", "Region"],
        vec![BRAINSTEM, "brainstem"],
        vec![HEART, "heart"],
        vec![HEART, "cardiac"],
        vec![VAGUS, "vagus nerve"],
        vec![LUNG, "lung"],
    ])
}

pub fn neuron_path_rows() -> QueryResult {
    let header = vec![
        "Neuron_IRI",
        "Neuron_Label",
        "A",
        "Region_A",
        "B",
        "Region_B",
        "C",
        "Region_C",
        "Species",
        "Species_link",
    ];
    QueryResult::from_rows([
        header,
        vec![
            "http://neuron/1",
            "vagal efferent",
            BRAINSTEM,
            "brainstem",
            HEART,
            "heart",
            VAGUS,
            "vagus nerve",
            "human",
            "http://taxon/9606",
        ],
        vec![
            "http://neuron/1",
            "vagal efferent",
            BRAINSTEM,
            "brain stem",
            HEART,
            "cardiac",
            VAGUS,
            "vagus nerve",
            "Homo sapiens",
            "http://taxon/9606",
        ],
        vec![
            "http://neuron/2",
            "pulmonary efferent",
            BRAINSTEM,
            "brainstem",
            LUNG,
            "lung",
            VAGUS,
            "vagus nerve",
            "human",
            "http://taxon/9606",
        ],
        vec![
            "http://neuron/3",
            "cardiac vagal",
            BRAINSTEM,
            "brainstem",
            HEART,
            "heart",
            VAGUS,
            "vagus nerve",
            "rat",
            "http://taxon/10116",
        ],
    ])
}
