//! HTTP-backed [`IndexerAdaptor`]: frames a batch as a newline-delimited
//! bulk request and parses the per-item result array back out.

use relay_core::message::BulkItem;
use relay_core::{IndexerAdaptor, IndexerError, ItemOutcome};
use serde::Deserialize;
use serde_json::json;

use crate::config::IndexerConfig;

const EVENTS_INDEX: &str = "events";
const BULK_PATH: &str = "_bulk";

pub struct HttpBulkAdaptor {
    client: reqwest::Client,
    config: IndexerConfig,
}

impl HttpBulkAdaptor {
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn bulk_url(&self) -> String {
        format!("{}/{BULK_PATH}", self.config.host.trim_end_matches('/'))
    }

    /// One `{"create": {...}}` action line followed by one document line,
    /// per item, newline-delimited as the bulk API expects.
    fn frame(&self, items: &[BulkItem]) -> String {
        let mut body = String::new();
        for item in items {
            let action = json!({ "create": { "_index": EVENTS_INDEX, "_id": serde_json::Value::Null } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&item.doc.to_string());
            body.push('\n');
        }
        body
    }
}

impl IndexerAdaptor for HttpBulkAdaptor {
    async fn bulk(&self, items: Vec<BulkItem>) -> Result<Vec<ItemOutcome>, IndexerError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.frame(&items);

        let mut request = self
            .client
            .post(self.bulk_url())
            .header("content-type", "application/x-ndjson")
            .body(body);
        if !self.config.user.is_empty() {
            request = request.basic_auth(&self.config.user, Some(&self.config.password));
        }

        let response = request.send().await.map_err(|e| IndexerError::BulkFailure {
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(IndexerError::BulkFailure {
                reason: format!("indexer responded with status {}", response.status()),
            });
        }

        let parsed: BulkResponse = response.json().await.map_err(|e| IndexerError::BulkFailure {
            reason: format!("malformed bulk response: {e}"),
        })?;

        if parsed.items.len() != items.len() {
            return Err(IndexerError::CountMismatch {
                expected: items.len(),
                got: parsed.items.len(),
            });
        }

        Ok(parsed.items.into_iter().map(|item| item.create.into()).collect())
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    create: BulkItemResult,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
struct BulkItemError {
    reason: String,
}

impl From<BulkItemResult> for ItemOutcome {
    fn from(result: BulkItemResult) -> Self {
        match result.error {
            Some(err) => ItemOutcome::Failure {
                status: result.status,
                reason: err.reason,
            },
            None => ItemOutcome::Success {
                status: result.status,
            },
        }
    }
}
