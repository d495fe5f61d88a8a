//! In-process [`SearchEngine`] for tests and search-service-free setups.
//!
//! Documents live in a `BTreeMap` behind `std::sync::RwLock`. Queries are
//! case-insensitive token matches over title, tags, and body; hits are
//! ranked by the number of matching query tokens (title matches count
//! double), ties broken by id.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{tokenize, ClusterHealth, SearchEngine};
use crate::error::SearchError;
use crate::models::{SearchDocument, SearchHit};

#[derive(Default)]
pub struct MemorySearch {
    docs: RwLock<BTreeMap<u64, SearchDocument>>,
}

impl MemorySearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: u64) -> Option<SearchDocument> {
        self.docs.read().ok()?.get(&id).cloned()
    }
}

fn poisoned() -> SearchError {
    SearchError::Backend {
        status: 500,
        body: "in-memory index lock poisoned".to_string(),
    }
}

fn score(doc: &SearchDocument, terms: &HashSet<String>) -> usize {
    let count = |text: &str| tokenize(text).iter().filter(|t| terms.contains(*t)).count();
    let tags: usize = doc.tags.iter().map(|t| count(t)).sum();
    2 * count(&doc.title) + tags + count(&doc.body)
}

/// Wrap the first body word matching `terms` in `<em>` tags.
fn highlight(body: &str, terms: &HashSet<String>) -> String {
    let mut start = None;
    for (i, c) in body.char_indices().chain(std::iter::once((body.len(), ' '))) {
        if c.is_alphanumeric() {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            if terms.contains(&body[s..i].to_lowercase()) {
                return format!("{}<em>{}</em>{}", &body[..s], &body[s..i], &body[i..]);
            }
        }
    }
    String::new()
}

#[async_trait]
impl SearchEngine for MemorySearch {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health(&self) -> Result<ClusterHealth, SearchError> {
        Ok(ClusterHealth::Green)
    }

    async fn bootstrap(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn add(&self, doc: &SearchDocument) -> Result<(), SearchError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        docs.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn remove(&self, id: u64) -> Result<(), SearchError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        docs.remove(&id);
        Ok(())
    }

    async fn query(&self, text: &str) -> Vec<SearchHit> {
        let terms: HashSet<String> = tokenize(text).into_iter().collect();
        if terms.is_empty() {
            return Vec::new();
        }
        let Ok(docs) = self.docs.read() else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, &SearchDocument)> = docs
            .values()
            .map(|d| (score(d, &terms), d))
            .filter(|(s, _)| *s > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));

        scored
            .into_iter()
            .map(|(_, d)| SearchHit {
                id: d.id,
                title: d.title.clone(),
                snippet: highlight(&d.body, &terms),
            })
            .collect()
    }

    async fn cleanup(&self) {
        if let Ok(mut docs) = self.docs.write() {
            docs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u64, title: &str, body: &str) -> SearchDocument {
        SearchDocument {
            id,
            title: title.to_string(),
            tags: Vec::new(),
            body: body.to_string(),
            kind: "note".to_string(),
            url: None,
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let engine = MemorySearch::new();
        let d = doc(1, "Meeting Notes", "Discuss roadmap");
        engine.add(&d).await.unwrap();
        engine.add(&d).await.unwrap();
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.query("roadmap").await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let engine = MemorySearch::new();
        engine.remove(99).await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_ranking_and_highlight() {
        let engine = MemorySearch::new();
        engine.add(&doc(1, "Groceries", "buy Rust-colored paint")).await.unwrap();
        engine.add(&doc(2, "Rust notes", "ownership and borrowing")).await.unwrap();

        let hits = engine.query("rust").await;
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(hits[1].snippet, "buy <em>Rust</em>-colored paint");
        assert_eq!(hits[0].snippet, "");
        assert!(engine.query("   ").await.is_empty());
    }
}
