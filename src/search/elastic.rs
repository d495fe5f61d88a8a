//! Remote full-text search over an Elasticsearch-compatible HTTP API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | health | `GET /_cluster/health` |
//! | bootstrap | `PUT /{index}` with the configured schema |
//! | add | `PUT /{index}/_doc/{id}` |
//! | remove | `DELETE /{index}/_doc/{id}` |
//! | query | `POST /{index}/_search` (`multi_match` + body highlighting) |
//!
//! Every request shares one client with a bounded timeout, so a hung
//! backend costs at most `search.timeout_secs` per call.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ClusterHealth, SearchEngine};
use crate::config::{SearchConfig, ANALYZER};
use crate::error::{Error, SearchError};
use crate::models::{SearchDocument, SearchHit};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

pub struct ElasticSearch {
    client: reqwest::Client,
    base_url: String,
    index: String,
    schema: Value,
    refresh: bool,
}

impl ElasticSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidInput(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index_name.clone(),
            schema: config.schema.clone(),
            refresh: config.refresh,
        })
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    fn doc_url(&self, id: u64) -> String {
        let mut url = format!("{}/_doc/{}", self.index_url(), id);
        if self.refresh {
            url.push_str("?refresh=true");
        }
        url
    }

    /// `PUT /{index}`. An existing index is reported as
    /// [`SearchError::IndexAlreadyExists`].
    pub async fn create_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.index_url())
            .json(&self.schema)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains(ALREADY_EXISTS) {
            return Err(SearchError::IndexAlreadyExists(self.index.clone()));
        }
        Err(SearchError::Backend {
            status: status.as_u16(),
            body,
        })
    }

    /// Whether the schema declares the custom analyzer queries should use.
    fn has_custom_analyzer(&self) -> bool {
        self.schema
            .pointer("/settings/analysis/analyzer")
            .and_then(|a| a.get(ANALYZER))
            .is_some()
    }

    fn query_body(&self, text: &str) -> Value {
        let mut multi_match = json!({
            "query": text,
            "fields": ["*"],
            "lenient": true,
        });
        if self.has_custom_analyzer() {
            multi_match["analyzer"] = json!(ANALYZER);
        }
        json!({
            "query": { "multi_match": multi_match },
            "_source": ["title"],
            "highlight": {
                "fragment_size": 0,
                "fields": { "body": {} }
            }
        })
    }

    async fn try_query(&self, text: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&self.query_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Query(format!("{}: {}", status, body)));
        }
        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Query(format!("unreadable response: {}", e)))?;
        parse_hits(&json)
    }
}

/// Extract `{id, title, snippet}` from a `_search` response, keeping order.
fn parse_hits(json: &Value) -> Result<Vec<SearchHit>, SearchError> {
    let hits = json
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Query("response has no hits array".to_string()))?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(id) = hit
            .get("_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
        else {
            debug!(hit = %hit, "skipping hit without a numeric id");
            continue;
        };
        let title = hit
            .pointer("/_source/title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let snippet = hit
            .pointer("/highlight/body")
            .and_then(Value::as_array)
            .map(|fragments| {
                fragments
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" … ")
            })
            .unwrap_or_default();
        results.push(SearchHit { id, title, snippet });
    }
    Ok(results)
}

#[async_trait]
impl SearchEngine for ElasticSearch {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn health(&self) -> Result<ClusterHealth, SearchError> {
        let response = self
            .client
            .get(format!("{}/_cluster/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::ConnectionFailure(format!("unreadable health: {}", e)))?;
        let reported = json.get("status").and_then(Value::as_str).unwrap_or("");
        ClusterHealth::parse(reported).ok_or_else(|| SearchError::Backend {
            status: status.as_u16(),
            body: json.to_string(),
        })
    }

    async fn bootstrap(&self) -> Result<(), SearchError> {
        match self.create_index().await {
            Ok(()) => {
                info!(index = %self.index, "created search index");
                Ok(())
            }
            Err(SearchError::IndexAlreadyExists(index)) => {
                info!(index = %index, "search index already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn add(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.doc_url(doc.id))
            .json(doc)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(id = doc.id, "indexed document");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Backend {
            status: status.as_u16(),
            body,
        })
    }

    async fn remove(&self, id: u64) -> Result<(), SearchError> {
        let response = self.client.delete(self.doc_url(id)).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(id, "removed document from index");
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            debug!(error = %SearchError::DocumentNotFound(id), "nothing to remove");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Backend {
            status: status.as_u16(),
            body,
        })
    }

    async fn query(&self, text: &str) -> Vec<SearchHit> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.try_query(text).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, query = text, "search query failed; returning no results");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(schema: Value) -> ElasticSearch {
        ElasticSearch::new(&SearchConfig {
            enabled: true,
            url: "http://localhost:9200/".to_string(),
            schema,
            ..SearchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let es = engine(crate::config::default_schema());
        assert_eq!(es.url(), "http://localhost:9200");
        assert_eq!(es.index_url(), "http://localhost:9200/dataobj");
        assert_eq!(
            es.doc_url(42),
            "http://localhost:9200/dataobj/_doc/42?refresh=true"
        );
    }

    #[test]
    fn test_query_body_uses_analyzer_only_when_declared() {
        let es = engine(crate::config::default_schema());
        let body = es.query_body("roadmap");
        assert_eq!(body["query"]["multi_match"]["analyzer"], json!(ANALYZER));
        assert_eq!(body["query"]["multi_match"]["fields"], json!(["*"]));
        assert_eq!(body["highlight"]["fragment_size"], json!(0));

        let plain = engine(json!({ "mappings": {} }));
        assert!(plain.query_body("roadmap")["query"]["multi_match"]
            .get("analyzer")
            .is_none());
    }

    #[test]
    fn test_parse_hits_keeps_order_and_skips_bad_ids() {
        let response = json!({
            "hits": { "hits": [
                { "_id": "7", "_source": { "title": "B" }, "highlight": { "body": ["a <em>x</em>", "b"] } },
                { "_id": "not-a-number", "_source": { "title": "junk" } },
                { "_id": "3", "_source": { "title": "A" } }
            ]}
        });
        let hits = parse_hits(&response).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 7);
        assert_eq!(hits[0].snippet, "a <em>x</em> … b");
        assert_eq!(hits[1].id, 3);
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_hits_rejects_garbage() {
        assert!(parse_hits(&json!({ "error": "boom" })).is_err());
    }
}
