//! HTTP surface.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `GET`  | `/` | – | `{status}` |
//! | `POST` | `/upload` | multipart `file`, `category`, `tags` | `{message, category, tags}` |
//! | `POST` | `/ask` | JSON `{question, history}` | `{answer, sources}` |
//!
//! Validation failures are `400 {"detail": ...}`. Any downstream failure is a
//! `500` with a generic detail; the cause goes to the log only.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docuai_core::{Answer, AskRequest, DocumentUpload, RagError, RagService};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub const UPLOAD_MESSAGE: &str = "✅ Document processed and embedded";

#[derive(Clone)]
struct AppState {
    service: Arc<RagService>,
    status: Arc<str>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    category: String,
    tags: Vec<String>,
}

pub fn router(service: Arc<RagService>, max_upload_bytes: usize) -> Router {
    let status = format!("AI service running with Groq {}", service.options().model);
    let state = AppState {
        service,
        status: Arc::from(status),
    };

    Router::new()
        .route("/", get(handle_status))
        .route("/upload", post(handle_upload))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<RagError> for AppError {
    fn from(value: RagError) -> Self {
        match value {
            RagError::Validation(detail) => Self::bad_request(detail),
            other => {
                error!(error = %other, "request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "Internal Server Error".to_string(),
                }
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(value: MultipartError) -> Self {
        Self {
            status: value.status(),
            detail: format!("invalid multipart body: {}", value.body_text()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.status.to_string(),
    })
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut category = None;
    let mut tags = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("category") => category = Some(field.text().await?),
            Some("tags") => tags = Some(field.text().await?),
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::bad_request("Uploaded file must have a name"))?;
    info!(filename = %filename, bytes = bytes.len(), "upload received");

    let outcome = state
        .service
        .ingest(DocumentUpload {
            filename,
            bytes,
            category,
            tags,
        })
        .await?;

    Ok(Json(UploadResponse {
        message: UPLOAD_MESSAGE.to_string(),
        category: outcome.category,
        tags: outcome.tags,
    }))
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    Ok(Json(state.service.ask(request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use docuai_core::{
        CharacterNgramEmbedder, Chunk, ChatMessage, CompletionError, CompletionProvider,
        CompletionRequest, IngestError, InMemoryStore, PdfExtractor, RagOptions, ScoredChunk,
        SearchError, UploadStaging, VectorStore,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::Path;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docuai-test-boundary";

    struct FixedTextExtractor(String);

    impl PdfExtractor for FixedTextExtractor {
        fn extract_text(&self, _path: &Path) -> Result<String, IngestError> {
            Ok(self.0.clone())
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl VectorStore for UnavailableStore {
        async fn add_chunks(&self, _chunks: &[Chunk]) -> Result<(), SearchError> {
            Err(SearchError::Request("insert rejected".to_string()))
        }

        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<ScoredChunk>, SearchError> {
            Err(SearchError::Request("rpc unavailable".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingCompletion {
        fail: bool,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingCompletion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            if self.fail {
                return Err(CompletionError::Api {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok("From the handbook: sixteen weeks.".to_string())
        }
    }

    struct TestApp {
        router: Router,
        store: Arc<InMemoryStore>,
        completion: Arc<RecordingCompletion>,
        _staging: tempfile::TempDir,
    }

    fn app_with(
        store: Arc<dyn VectorStore>,
        completion: RecordingCompletion,
    ) -> (Router, Arc<RecordingCompletion>, tempfile::TempDir) {
        let staging = tempfile::tempdir().expect("temp dir");
        let completion = Arc::new(completion);
        let service = RagService::new(
            Arc::new(FixedTextExtractor("Parental leave lasts sixteen weeks. ".repeat(120))),
            store,
            completion.clone(),
            UploadStaging::new(staging.path()),
            RagOptions::default(),
        );
        (router(Arc::new(service), 1024 * 1024), completion, staging)
    }

    fn test_app() -> TestApp {
        let store = Arc::new(InMemoryStore::new(Arc::new(CharacterNgramEmbedder::default())));
        let (router, completion, staging) = app_with(store.clone(), RecordingCompletion::default());
        TestApp {
            router,
            store,
            completion,
            _staging: staging,
        }
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request should build")
    }

    fn ask_request(payload: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request should build")
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn status_endpoint_reports_model() {
        let app = test_app();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let (status, body) = send(app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "AI service running with Groq llama-3.1-8b-instant");
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let app = test_app();

        let (status, body) = send(
            app.router,
            multipart_request(&[("category", None, "hr"), ("tags", None, "a,b")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Uploaded file must have a name");
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn upload_with_empty_filename_is_rejected() {
        let app = test_app();

        let (status, _) = send(
            app.router,
            multipart_request(&[("file", Some(""), "%PDF-1.4")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn upload_parses_tags_onto_every_chunk() {
        let app = test_app();

        let (status, body) = send(
            app.router,
            multipart_request(&[
                ("file", Some("handbook.pdf"), "%PDF-1.4"),
                ("tags", None, "a, b ,c"),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], UPLOAD_MESSAGE);
        assert_eq!(body["category"], "general");
        assert_eq!(body["tags"], json!(["a", "b", "c"]));

        let chunks = app.store.chunks();
        assert!(chunks.len() > 1);
        for chunk in chunks {
            assert_eq!(chunk.metadata.tags, vec!["a", "b", "c"]);
            assert_eq!(chunk.metadata.filename, "handbook.pdf");
        }
    }

    #[tokio::test]
    async fn upload_store_failure_is_internal_error() {
        let (router, _, _staging) =
            app_with(Arc::new(UnavailableStore), RecordingCompletion::default());

        let (status, body) = send(
            router,
            multipart_request(&[("file", Some("handbook.pdf"), "%PDF-1.4")]),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal Server Error");
    }

    #[tokio::test]
    async fn ask_with_empty_question_is_rejected() {
        let app = test_app();

        let (status, body) = send(app.router, ask_request(json!({"question": ""}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Question is required");
        assert!(app.completion.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ask_survives_search_failure() {
        let (router, completion, _staging) =
            app_with(Arc::new(UnavailableStore), RecordingCompletion::default());

        let (status, body) = send(
            router,
            ask_request(json!({"question": "How long is parental leave?"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"], json!([]));
        assert_eq!(body["answer"], "From the handbook: sixteen weeks.");
        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn ask_forwards_last_ten_history_messages() {
        let app = test_app();
        let history: Vec<Value> = (0..12)
            .map(|turn| {
                let role = if turn % 2 == 0 { "user" } else { "assistant" };
                json!({"role": role, "content": format!("turn {turn}")})
            })
            .collect();

        let (status, _) = send(
            app.router,
            ask_request(json!({"question": "and now?", "history": history})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let requests = app.completion.requests.lock().unwrap();
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[1], ChatMessage::user("turn 2"));
        assert_eq!(messages[10], ChatMessage::assistant("turn 11"));
        assert_eq!(messages[11], ChatMessage::user("and now?"));
    }

    #[tokio::test]
    async fn ask_returns_sources_after_upload() {
        let app = test_app();
        let (status, _) = send(
            app.router.clone(),
            multipart_request(&[
                ("file", Some("handbook.pdf"), "%PDF-1.4"),
                ("category", None, "hr"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let question = json!({"question": "How long is parental leave?"});
        let (first_status, first) = send(app.router.clone(), ask_request(question.clone())).await;
        let (_, second) = send(app.router, ask_request(question)).await;

        assert_eq!(first_status, StatusCode::OK);
        let sources = first["sources"].as_array().cloned().unwrap_or_default();
        assert_eq!(sources.len(), 4);
        assert!(sources.iter().all(|source| source["category"] == "hr"));
        assert_eq!(first["sources"], second["sources"]);
    }

    #[tokio::test]
    async fn completion_failure_is_internal_error() {
        let store = Arc::new(InMemoryStore::new(Arc::new(CharacterNgramEmbedder::default())));
        let (router, _, _staging) = app_with(
            store,
            RecordingCompletion {
                fail: true,
                ..RecordingCompletion::default()
            },
        );

        let (status, body) = send(router, ask_request(json!({"question": "hello"}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal Server Error");
    }
}
