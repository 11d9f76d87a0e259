use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::domain::QueryResult;
use crate::error::SckanError;

pub const DEFAULT_ENDPOINT: &str = "https://blazegraph.scicrunch.io/blazegraph/sparql";

pub trait SparqlClient: Send + Sync {
    /// Identifier of the backend, used to segregate cache entries.
    fn endpoint(&self) -> &str;
    fn select(&self, query: &str) -> Result<QueryResult, SckanError>;
}

#[derive(Clone)]
pub struct SparqlHttpClient {
    client: Client,
    endpoint: String,
}

impl SparqlHttpClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, SckanError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sckan-compare/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SckanError::RemoteHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("text/csv"));
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| SckanError::RemoteHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SckanError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "SPARQL request failed".to_string());
        Err(SckanError::RemoteStatus { status, message })
    }
}

impl SparqlClient for SparqlHttpClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn select(&self, query: &str) -> Result<QueryResult, SckanError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query)])
            .send()
            .map_err(|err| SckanError::RemoteHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .bytes()
            .map_err(|err| SckanError::RemoteHttp(err.to_string()))?;
        let result = parse_csv_result(&body)?;
        info!(
            endpoint = %self.endpoint,
            rows = result.rows().len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "sparql select"
        );
        Ok(result)
    }
}

/// Parses a `text/csv` SELECT payload. The header row is kept as row 0.
pub fn parse_csv_result(body: &[u8]) -> Result<QueryResult, SckanError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(body);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| SckanError::MalformedResponse(err.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if rows.is_empty() {
        return Err(SckanError::MalformedResponse(
            "response has no header row".to_string(),
        ));
    }
    Ok(QueryResult::new(rows))
}
