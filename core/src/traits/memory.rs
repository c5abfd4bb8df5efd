use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    pub created_at: Option<String>,
    pub similarity: Option<f64>,
}

/// Long-term question/answer memory backed by an external store.
///
/// Implementations only append and query. `recall` never fails: an
/// unreachable store degrades to "nothing remembered".
#[async_trait]
pub trait Memory: Send + Sync {
    fn name(&self) -> &str;

    /// Stores a question/answer pair. Returns `false` when a near-identical
    /// entry already exists and nothing was written.
    async fn remember(&self, question: &str, answer: &str) -> anyhow::Result<bool>;

    /// At most `limit` entries with similarity `>= threshold`, most similar first.
    async fn recall(&self, query: &str, limit: usize, threshold: f64) -> Vec<MemoryEntry>;

    async fn health_check(&self) -> bool;
}

/// Drops entries under `threshold`, orders the rest by descending similarity
/// and keeps the first `limit`.
pub fn select_relevant(
    entries: Vec<MemoryEntry>,
    limit: usize,
    threshold: f64,
) -> Vec<MemoryEntry> {
    let mut relevant: Vec<MemoryEntry> = entries
        .into_iter()
        .filter(|e| e.similarity.is_some_and(|s| s >= threshold))
        .collect();

    relevant.sort_by(|a, b| {
        b.similarity
            .unwrap_or_default()
            .total_cmp(&a.similarity.unwrap_or_default())
    });
    relevant.truncate(limit);
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, similarity: Option<f64>) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            content: format!("Question: {id}\nAnswer: {id}"),
            created_at: None,
            similarity,
        }
    }

    #[test]
    fn keeps_entries_at_or_above_threshold() {
        let entries = vec![
            entry("a", Some(0.9)),
            entry("b", Some(0.75)),
            entry("c", Some(0.6)),
            entry("d", None),
        ];
        let ids: Vec<String> = select_relevant(entries, 10, 0.75)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn orders_by_similarity_and_truncates() {
        let entries = vec![
            entry("low", Some(0.8)),
            entry("high", Some(0.95)),
            entry("mid", Some(0.85)),
        ];
        let ids: Vec<String> = select_relevant(entries, 2, 0.5)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["high", "mid"]);
    }
}
