use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

const MAX_RESULTS: usize = 3;
const MIN_WORD_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
}

/// Keyword search over a small JSON document set.
pub struct KnowledgeBaseTool {
    documents: Vec<Document>,
}

impl KnowledgeBaseTool {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Reads `[{title, content}, ...]` from `path`. A missing file is an
    /// empty knowledge base; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Knowledge base not found, starting empty");
            return Ok(Self::from_documents(Vec::new()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base: {}", path.display()))?;
        let documents: Vec<Document> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse knowledge base: {}", path.display()))?;
        debug!(path = %path.display(), count = documents.len(), "Knowledge base loaded");
        Ok(Self::from_documents(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents whose title or content contains any query word longer than
    /// two characters, in file order, at most three.
    pub fn search(&self, query: &str) -> String {
        let query = query.to_lowercase();
        let words: Vec<&str> = query
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_WORD_LEN)
            .collect();

        if words.is_empty() {
            return "No relevant documents found in the internal knowledge base.".to_string();
        }

        let matches: Vec<String> = self
            .documents
            .iter()
            .filter(|doc| {
                let title = doc.title.to_lowercase();
                let content = doc.content.to_lowercase();
                words
                    .iter()
                    .any(|w| title.contains(w) || content.contains(w))
            })
            .take(MAX_RESULTS)
            .map(|doc| format!("Title: {}\nContent: {}", doc.title, doc.content))
            .collect();

        if matches.is_empty() {
            format!(
                "No relevant documents found for query: '{}'. Try simpler or different keywords.",
                query
            )
        } else {
            matches.join("\n\n")
        }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "Search internal company documents (policies, how-to guides). Use this for 'how to', 'what is', or policy questions"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A few simple keywords"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = extract_string_arg(&args, "query")?;
        Ok(ToolResult::success(self.search(&query)))
    }
}
