use crate::{Chunk, CompletionError, CompletionRequest, ScoredChunk, SearchError};
use async_trait::async_trait;

/// A vector store that embeds on both write and read.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds and writes every chunk in one batch.
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<(), SearchError>;

    /// Returns up to `k` chunks ranked by similarity to `query`, best first.
    async fn similarity_search(&self, query: &str, k: usize)
        -> Result<Vec<ScoredChunk>, SearchError>;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
