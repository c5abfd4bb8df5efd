use crate::config::MemoryConfig;
use crate::error::ServiceError;
use crate::providers::openai::http_client;
use crate::traits::{Embedder, Memory, MemoryEntry, select_relevant};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "memory store";

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f64,
    match_count: usize,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    #[serde(default)]
    id: Value,
    content: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    similarity: Option<f64>,
}

impl From<MatchRow> for MemoryEntry {
    fn from(row: MatchRow) -> Self {
        let id = match row.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        MemoryEntry {
            id,
            content: row.content,
            created_at: row.created_at,
            similarity: row.similarity,
        }
    }
}

/// Long-term memory in a Supabase (PostgREST + pgvector) table.
///
/// Entries are `Question: ...\nAnswer: ...` text with an embedding; search
/// goes through a similarity RPC.
pub struct SupabaseMemory {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    embedder: Arc<dyn Embedder>,
    config: MemoryConfig,
}

pub fn format_content(question: &str, answer: &str) -> String {
    format!("Question: {}\nAnswer: {}", question, answer)
}

impl SupabaseMemory {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            client: http_client(Duration::from_secs(30)),
            base_url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedder,
            config,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(ServiceError::from_status(SERVICE, status, error_text).into())
    }

    /// Raw similarity search; the store applies `threshold` and `count`.
    pub async fn search(
        &self,
        query: &str,
        threshold: f64,
        count: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let embedding = self.embedder.embed(query).await?;
        let request = MatchRequest {
            query_embedding: &embedding,
            match_threshold: threshold,
            match_count: count,
        };

        let response = self
            .authorized(
                self.client
                    .post(self.rest_url(&format!("rpc/{}", self.config.match_function))),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        let rows: Option<Vec<MatchRow>> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .map(MemoryEntry::from)
            .collect())
    }

    async fn insert(&self, question: &str, content: &str) -> Result<()> {
        let embedding = self.embedder.embed(content).await?;
        let row = json!({
            "content": content,
            "metadata": {"type": "conversation", "question": question},
            "embedding": embedding,
        });

        let response = self
            .authorized(self.client.post(self.rest_url(&self.config.table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Memory for SupabaseMemory {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn remember(&self, question: &str, answer: &str) -> Result<bool> {
        let threshold = self.config.duplicate_threshold;
        let existing = self.search(question, threshold, 1).await?;
        if !select_relevant(existing, 1, threshold).is_empty() {
            debug!(question = %question, "Similar memory exists, skipping");
            return Ok(false);
        }

        self.insert(question, &format_content(question, answer))
            .await?;
        info!(question = %question, "Memory stored");
        Ok(true)
    }

    async fn recall(&self, query: &str, limit: usize, threshold: f64) -> Vec<MemoryEntry> {
        match self.search(query, threshold, limit).await {
            Ok(entries) => select_relevant(entries, limit, threshold),
            Err(e) => {
                warn!(error = %e, "Memory search failed, continuing without memories");
                Vec::new()
            }
        }
    }

    async fn health_check(&self) -> bool {
        let response = self
            .authorized(self.client.get(self.rest_url(&self.config.table)))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await;

        match response {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Memory store unreachable");
                false
            }
        }
    }
}
