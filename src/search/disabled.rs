use async_trait::async_trait;

use super::{ClusterHealth, SearchEngine};
use crate::error::SearchError;
use crate::models::{SearchDocument, SearchHit};

/// Stand-in used when search is turned off in the configuration.
pub struct DisabledSearch;

#[async_trait]
impl SearchEngine for DisabledSearch {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn health(&self) -> Result<ClusterHealth, SearchError> {
        Ok(ClusterHealth::Green)
    }

    async fn bootstrap(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn add(&self, _doc: &SearchDocument) -> Result<(), SearchError> {
        Ok(())
    }

    async fn remove(&self, _id: u64) -> Result<(), SearchError> {
        Ok(())
    }

    async fn query(&self, _text: &str) -> Vec<SearchHit> {
        Vec::new()
    }
}
