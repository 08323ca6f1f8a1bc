//! Retrieval seam
//!
//! `search(query, k)` returns at most `k` snippets by descending
//! relevance; an empty list is a valid, non-error result. Callers must
//! tolerate both emptiness and outright retrieval failure (the
//! corrective-action stage degrades to general guidance).

use ehs_types::PolicySnippet;

/// Retrieval errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrievalError {
    /// The backing store could not serve the query
    #[error("retrieval backend failed: {0}")]
    Backend(String),
}

/// Policy retrieval boundary
#[async_trait::async_trait]
pub trait PolicyRetriever: Send + Sync {
    /// Return the top `k` snippets for `query`, descending relevance
    ///
    /// # Errors
    /// `RetrievalError` when the backend cannot be queried at all;
    /// "nothing relevant" is the empty list, not an error.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<PolicySnippet>, RetrievalError>;
}
