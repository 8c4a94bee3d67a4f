use crate::chunking::build_chunks;
use crate::completion::DEFAULT_COMPLETION_MODEL;
use crate::extractor::PdfExtractor;
use crate::ingest::{
    digest_bytes, discover_pdf_files, sanitize_filename, IngestionReport, SkippedPdf,
    UploadStaging,
};
use crate::traits::{CompletionProvider, VectorStore};
use crate::{
    Answer, AskRequest, ChatMessage, ChunkMetadata, CompletionRequest, DocumentUpload,
    IngestError, IngestionOptions, IngestionOutcome, RagError, Role, ScoredChunk,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const SYSTEM_PROMPT: &str = "You are DocuAI, a helpful assistant that answers questions \
using the provided company knowledge base. Use the supplied context snippets when they are \
relevant. If the answer is not in the context, say you do not have that information.";

pub const DEFAULT_TOP_K: usize = 4;
pub const HISTORY_LIMIT: usize = 10;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// How a failed similarity search affects an ask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetrievalPolicy {
    /// Log the failure and answer without context.
    #[default]
    BestEffort,
    /// Fail the ask.
    Strict,
}

#[derive(Debug, Clone)]
pub struct RagOptions {
    pub top_k: usize,
    pub history_limit: usize,
    pub model: String,
    pub temperature: f32,
    pub retrieval: RetrievalPolicy,
    pub ingestion: IngestionOptions,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            history_limit: HISTORY_LIMIT,
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            retrieval: RetrievalPolicy::default(),
            ingestion: IngestionOptions::default(),
        }
    }
}

/// Upload and ask pipelines over injected providers.
pub struct RagService {
    extractor: Arc<dyn PdfExtractor>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionProvider>,
    staging: UploadStaging,
    options: RagOptions,
}

impl RagService {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionProvider>,
        staging: UploadStaging,
        options: RagOptions,
    ) -> Self {
        Self {
            extractor,
            store,
            completion,
            staging,
            options,
        }
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    /// Stages, extracts, chunks and stores one document.
    ///
    /// Returns only after the store has accepted the whole batch.
    pub async fn ingest(&self, upload: DocumentUpload) -> Result<IngestionOutcome, RagError> {
        let filename = sanitize_filename(&upload.filename)
            .ok_or_else(|| RagError::Validation("Uploaded file must have a name".to_string()))?;
        let category = upload.resolved_category();
        let tags = upload.parsed_tags();
        let checksum = digest_bytes(&upload.bytes);

        let staged = self.staging.stage(&filename, &upload.bytes).await?;
        let extracted = self.extract(staged.path()).await;
        staged.discard().await;
        let text = extracted?;

        let metadata = ChunkMetadata {
            category: category.clone(),
            tags: tags.clone(),
            filename: filename.clone(),
        };
        let chunks = build_chunks(&text, &metadata, &self.options.ingestion)?;
        info!(
            filename = %filename,
            checksum = %checksum,
            chars = text.chars().count(),
            chunk_count = chunks.len(),
            "document chunked"
        );

        self.store.add_chunks(&chunks).await?;

        Ok(IngestionOutcome {
            filename,
            category,
            tags,
            chunk_count: chunks.len(),
            checksum,
        })
    }

    /// Ingests every PDF under `folder`, skipping files that fail to read or parse.
    pub async fn ingest_folder(
        &self,
        folder: &Path,
        category: Option<String>,
        tags: Option<String>,
    ) -> Result<IngestionReport, RagError> {
        let files = discover_pdf_files(folder);
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no pdf files found in {}",
                folder.display()
            ))
            .into());
        }

        let mut documents = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(error) => {
                    skipped_files.push(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            let upload = DocumentUpload {
                filename: path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
                bytes,
                category: category.clone(),
                tags: tags.clone(),
            };

            match self.ingest(upload).await {
                Ok(outcome) => documents.push(outcome),
                Err(error @ (RagError::Ingest(_) | RagError::Validation(_))) => {
                    skipped_files.push(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    })
                }
                Err(error) => return Err(error),
            }
        }

        Ok(IngestionReport {
            documents,
            skipped_files,
        })
    }

    /// Answers a question from retrieved context plus recent history.
    pub async fn ask(&self, request: AskRequest) -> Result<Answer, RagError> {
        if request.question.is_empty() {
            return Err(RagError::Validation("Question is required".to_string()));
        }

        let hits = self.retrieve(&request.question).await?;
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources = hits.into_iter().map(|hit| hit.metadata).collect::<Vec<_>>();

        let messages = build_messages(
            &request.question,
            &context,
            &request.history,
            self.options.history_limit,
        );

        let answer = self
            .completion
            .complete(&CompletionRequest {
                model: self.options.model.clone(),
                messages,
                temperature: self.options.temperature,
            })
            .await?;

        info!(sources = sources.len(), "question answered");
        Ok(Answer { answer, sources })
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, RagError> {
        match self.store.similarity_search(question, self.options.top_k).await {
            Ok(hits) => Ok(hits),
            Err(error) => match self.options.retrieval {
                RetrievalPolicy::BestEffort => {
                    warn!(%error, "similarity search failed; answering without context");
                    Ok(Vec::new())
                }
                RetrievalPolicy::Strict => Err(error.into()),
            },
        }
    }

    async fn extract(&self, path: &Path) -> Result<String, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        Ok(tokio::task::spawn_blocking(move || extractor.extract_text(&path)).await??)
    }
}

/// Assembles the completion prompt.
///
/// System persona, then the context block when there is one, then the last
/// `history_limit` turns with every non-assistant role sent as `user`, then
/// the question.
pub fn build_messages(
    question: &str,
    context: &str,
    history: &[ChatMessage],
    history_limit: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];

    if !context.is_empty() {
        messages.push(ChatMessage::system(format!("Context:\n---\n{context}\n---")));
    }

    let recent = &history[history.len().saturating_sub(history_limit)..];
    messages.extend(recent.iter().map(|entry| match entry.role {
        Role::Assistant => ChatMessage::assistant(entry.content.clone()),
        Role::User | Role::System => ChatMessage::user(entry.content.clone()),
    }));

    messages.push(ChatMessage::user(question));
    messages
}
