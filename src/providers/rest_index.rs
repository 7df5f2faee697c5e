//! Hosted vector index client (REST, auto-embedding)
//!
//! Talks to an Upstash-style index that computes embeddings from raw text:
//! upserts carry `{id, data, metadata}` and queries carry
//! `{data, topK, includeMetadata, filter}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorConfig;
use crate::error::{Error, Result};
use crate::providers::vector_index::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};

/// REST client for a hosted auto-embedding vector index
pub struct RestVectorIndex {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    id: &'a str,
    data: &'a str,
    metadata: &'a VectorMetadata,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    data: &'a str,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(rename = "includeData")]
    include_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    id: String,
    score: f32,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    metadata: Option<VectorMetadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

impl RestVectorIndex {
    /// Create a client from configuration
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_ref()
            .ok_or_else(|| Error::Config("hosted backend selected but vector.url is empty".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::Config("hosted backend selected but vector.token is empty".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Index(format!("vector index request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Index(format!(
                "vector index returned {}: {}",
                status, text
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for RestVectorIndex {
    async fn upsert(&self, record: &VectorRecord) -> Result<()> {
        self.post(
            "upsert",
            &UpsertRequest {
                id: &record.id,
                data: &record.text,
                metadata: &record.metadata,
            },
        )
        .await
        .map(|_| ())
    }

    async fn query(
        &self,
        text: &str,
        top_k: usize,
        owner_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>> {
        let filter = owner_filter.map(|owner| format!("owner_id = '{}'", owner.replace('\'', "")));

        let response = self
            .post(
                "query",
                &QueryRequest {
                    data: text,
                    top_k,
                    include_metadata: true,
                    include_data: true,
                    filter,
                },
            )
            .await
            .map_err(|e| match e {
                Error::Index(msg) => Error::Retrieval(msg),
                other => other,
            })?;

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::Retrieval(format!("failed to parse query response: {}", e)))?;

        let mut matches = Vec::with_capacity(parsed.result.len());
        for result in parsed.result {
            // Entries without metadata cannot be attributed to an owner and
            // are never returned to a caller.
            let Some(metadata) = result.metadata else {
                tracing::warn!("dropping vector match {} without metadata", result.id);
                continue;
            };
            matches.push(VectorMatch {
                id: result.id,
                score: result.score,
                text: result.data.unwrap_or_default(),
                metadata,
            });
        }
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post("delete", &DeleteRequest { ids }).await.map(|_| ())
    }

    async fn health_check(&self) -> Result<bool> {
        self.post("info", &serde_json::json!({})).await.map(|_| true)
    }

    fn name(&self) -> &str {
        "rest"
    }
}
