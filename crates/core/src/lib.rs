pub mod chunking;
pub mod completion;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use completion::{GroqProvider, DEFAULT_COMPLETION_MODEL, DEFAULT_GROQ_BASE_URL};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HuggingFaceEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HF_ENDPOINT,
};
pub use error::{CompletionError, EmbeddingError, IngestError, RagError, SearchError};
pub use extractor::{LopdfExtractor, PageTextPolicy, PdfExtractor};
pub use ingest::{
    digest_bytes, discover_pdf_files, sanitize_filename, IngestionReport, SkippedPdf,
    StagedUpload, UploadStaging,
};
pub use models::{
    parse_tags, Answer, AskRequest, ChatMessage, Chunk, ChunkMetadata, CompletionRequest,
    DocumentUpload, IngestionOptions, IngestionOutcome, Role, ScoredChunk, DEFAULT_CATEGORY,
};
pub use orchestrator::{
    build_messages, RagOptions, RagService, RetrievalPolicy, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
    HISTORY_LIMIT, SYSTEM_PROMPT,
};
pub use stores::{InMemoryStore, SupabaseStore, DEFAULT_QUERY_NAME, DEFAULT_TABLE};
pub use traits::{CompletionProvider, VectorStore};
