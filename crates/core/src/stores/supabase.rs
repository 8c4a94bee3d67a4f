use crate::embeddings::Embedder;
use crate::traits::VectorStore;
use crate::{Chunk, ScoredChunk, SearchError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

pub const DEFAULT_TABLE: &str = "documents";
pub const DEFAULT_QUERY_NAME: &str = "match_documents";

/// Supabase (PostgREST + pgvector) store.
///
/// Rows live in `table` as `(id, content, metadata, embedding)`; search goes
/// through the `query_name` stored function.
pub struct SupabaseStore {
    rest_base: Url,
    api_key: String,
    table: String,
    query_name: String,
    client: Client,
    embedder: Arc<dyn Embedder>,
}

#[derive(Serialize)]
struct DocumentRow<'a> {
    id: Uuid,
    content: &'a str,
    metadata: &'a crate::ChunkMetadata,
    embedding: &'a [f32],
}

#[derive(Deserialize)]
struct MatchRow {
    content: String,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    similarity: f64,
}

impl SupabaseStore {
    pub fn new(
        project_url: &str,
        api_key: impl Into<String>,
        table: impl Into<String>,
        query_name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, SearchError> {
        let base = if project_url.ends_with('/') {
            Url::parse(project_url)?
        } else {
            Url::parse(&format!("{project_url}/"))?
        };

        Ok(Self {
            rest_base: base.join("rest/v1/")?,
            api_key: api_key.into(),
            table: table.into(),
            query_name: query_name.into(),
            client: Client::new(),
            embedder,
        })
    }

    pub fn table_url(&self) -> Result<Url, SearchError> {
        Ok(self.rest_base.join(&self.table)?)
    }

    pub fn rpc_url(&self, k: usize) -> Result<Url, SearchError> {
        let mut url = self.rest_base.join(&format!("rpc/{}", self.query_name))?;
        url.query_pairs_mut().append_pair("limit", &k.to_string());
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// The table's `id` column has no default, so every row carries a fresh one.
fn document_rows<'a>(chunks: &'a [Chunk], embeddings: &'a [Vec<f32>]) -> Vec<DocumentRow<'a>> {
    chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| DocumentRow {
            id: Uuid::new_v4(),
            content: &chunk.text,
            metadata: &chunk.metadata,
            embedding,
        })
        .collect()
}

async fn ensure_success(response: Response) -> Result<Response, SearchError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(SearchError::BackendResponse {
        backend: "supabase".to_string(),
        details: format!("{status}: {body}"),
    })
}

#[async_trait]
impl VectorStore for SupabaseStore {
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let rows = document_rows(chunks, &embeddings);
        debug!(table = %self.table, rows = rows.len(), "inserting rows");
        let response = self
            .authorized(self.client.post(self.table_url()?))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let query_embedding = self.embedder.embed(query).await?;

        let response = self
            .authorized(self.client.post(self.rpc_url(k)?))
            .json(&json!({
                "query_embedding": query_embedding,
                "filter": {},
            }))
            .send()
            .await?;
        let rows: Vec<MatchRow> = ensure_success(response).await?.json().await?;
        debug!(query_name = %self.query_name, hits = rows.len(), "similarity search");

        Ok(rows
            .into_iter()
            .take(k)
            .map(|row| ScoredChunk {
                text: row.content,
                metadata: row.metadata,
                score: row.similarity,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterNgramEmbedder;

    fn store(project_url: &str) -> Result<SupabaseStore, SearchError> {
        SupabaseStore::new(
            project_url,
            "service-key",
            DEFAULT_TABLE,
            DEFAULT_QUERY_NAME,
            Arc::new(CharacterNgramEmbedder::default()),
        )
    }

    #[test]
    fn rest_urls_are_built_from_project_url() -> Result<(), SearchError> {
        for project_url in ["https://abc.supabase.co", "https://abc.supabase.co/"] {
            let store = store(project_url)?;
            assert_eq!(
                store.table_url()?.as_str(),
                "https://abc.supabase.co/rest/v1/documents"
            );
            assert_eq!(
                store.rpc_url(4)?.as_str(),
                "https://abc.supabase.co/rest/v1/rpc/match_documents?limit=4"
            );
        }
        Ok(())
    }

    #[test]
    fn invalid_project_url_is_rejected() {
        assert!(matches!(store("not a url"), Err(SearchError::Url(_))));
    }

    #[test]
    fn rows_serialize_with_id_and_metadata_object() -> Result<(), serde_json::Error> {
        let metadata = crate::ChunkMetadata {
            category: "general".to_string(),
            tags: vec!["a".to_string()],
            filename: "f.pdf".to_string(),
        };
        let chunks = vec![
            Chunk {
                text: "first".to_string(),
                metadata: metadata.clone(),
            },
            Chunk {
                text: "second".to_string(),
                metadata,
            },
        ];
        let embeddings = vec![vec![0.5, 0.25], vec![0.125, 1.0]];

        let rows = serde_json::to_value(document_rows(&chunks, &embeddings))?;
        let rows = rows.as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 2);

        let ids: Vec<&str> = rows.iter().filter_map(|row| row["id"].as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));

        assert_eq!(rows[0]["content"], "first");
        assert_eq!(
            rows[0]["metadata"],
            json!({"category": "general", "tags": ["a"], "filename": "f.pdf"})
        );
        assert_eq!(rows[1]["embedding"], json!([0.125, 1.0]));
        Ok(())
    }

    #[test]
    fn match_rows_tolerate_missing_score() -> Result<(), serde_json::Error> {
        let rows: Vec<MatchRow> = serde_json::from_value(json!([
            {"id": 1, "content": "a", "metadata": {"filename": "x.pdf"}, "similarity": 0.9},
            {"id": 2, "content": "b"},
        ]))?;
        assert_eq!(rows[0].similarity, 0.9);
        assert_eq!(rows[1].metadata, Value::Null);
        Ok(())
    }
}
