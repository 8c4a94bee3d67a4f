//! In-memory [`VectorStore`] for tests and local runs.
//!
//! Search is brute-force cosine similarity over every stored vector.

use crate::embeddings::Embedder;
use crate::traits::VectorStore;
use crate::{Chunk, ScoredChunk, SearchError};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct InMemoryStore {
    embedder: Arc<dyn Embedder>,
    rows: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.rows
            .read()
            .map(|rows| rows.iter().map(|row| row.chunk.clone()).collect())
            .unwrap_or_default()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

fn poisoned() -> SearchError {
    SearchError::Request("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.extend(
            chunks
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| StoredChunk { chunk, vector }),
        );
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let query_vector = self.embedder.embed(query).await?;
        let rows = self.rows.read().map_err(|_| poisoned())?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                Ok(ScoredChunk {
                    text: row.chunk.text.clone(),
                    metadata: serde_json::to_value(&row.chunk.metadata)?,
                    score: f64::from(cosine_sim(&query_vector, &row.vector)),
                })
            })
            .collect::<Result<_, SearchError>>()?;

        // Stable sort keeps insertion order among ties.
        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(k);
        Ok(scored)
    }
}
