pub mod error;

pub use error::ApiError;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analysis::Pipeline;
use crate::storage::DocumentRecord;

/// Multipart field expected to carry the PDF
const FILE_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "upload.pdf";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: i64,
    ai_configured: bool,
}

pub fn router(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload-resume/", post(upload_resume))
        .route("/history/", get(history))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Bind `addr` and serve until ctrl-c
pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "doc-insights listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")
}

async fn upload_resume(
    State(pipeline): State<Arc<Pipeline>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentRecord>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    // Prefer the `file` field; otherwise take the first field carrying a filename
    while let Some(field) = multipart.next_field().await? {
        let named = field.name() == Some(FILE_FIELD);
        if !named && (upload.is_some() || field.file_name().is_none()) {
            continue;
        }

        let filename = field
            .file_name()
            .map(clean_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        let data = field.bytes().await?;
        upload = Some((filename, data.to_vec()));

        if named {
            break;
        }
    }

    let (filename, bytes) = upload.ok_or(ApiError::MissingFile)?;
    info!(%filename, size = bytes.len(), "Received upload");

    let record = pipeline.process_upload(&filename, bytes).await?;
    Ok(Json(record))
}

async fn history(
    State(pipeline): State<Arc<Pipeline>>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(pipeline.history().await?))
}

async fn health(State(pipeline): State<Arc<Pipeline>>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        documents: pipeline.count().await?,
        ai_configured: pipeline.is_ai_configured(),
    }))
}

/// Last path component of a client-supplied filename
fn clean_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::keywords::NO_CONTENT_SUMMARY;
    use crate::config::Config;
    use crate::storage::AnalysisSource;
    use crate::test_support::{
        FakeCompletionApi, blank_pdf, pdf_with_dangling_font, pdf_with_text,
    };
    use axum::http::StatusCode;
    use reqwest::multipart::{Form, Part};
    use serde_json::Value;
    use tempfile::TempDir;

    const TEXT: &str = "Distributed systems engineer: systems design, Rust, Kafka, systems tuning";

    struct TestServer {
        base: String,
        client: reqwest::Client,
        _dir: TempDir,
    }

    impl TestServer {
        async fn start(config: Config) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config {
                data_dir: Some(dir.path().to_path_buf()),
                ..config
            };
            let pipeline = Arc::new(Pipeline::new(&config).unwrap());
            let app = router(pipeline, config.max_upload_bytes);

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                base: format!("http://{}", addr),
                client: reqwest::Client::new(),
                _dir: dir,
            }
        }

        async fn upload(&self, field: &str, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
            let part = Part::bytes(bytes)
                .file_name(filename.to_string())
                .mime_str("application/pdf")
                .unwrap();
            let form = Form::new()
                .percent_encode_noop()
                .part(field.to_string(), part);
            self.client
                .post(format!("{}/upload-resume/", self.base))
                .multipart(form)
                .send()
                .await
                .unwrap()
        }

        async fn history(&self) -> Vec<DocumentRecord> {
            let response = self
                .client
                .get(format!("{}/history/", self.base))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            response.json().await.unwrap()
        }
    }

    fn offline() -> Config {
        Config {
            ai_url: "http://127.0.0.1:1/chat/completions".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_upload_returns_record_json() {
        let server = TestServer::start(offline()).await;

        let response = server.upload("file", "resume.pdf", pdf_with_text(TEXT)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["filename"], "resume.pdf");
        assert_eq!(body["source"], "fallback");
        assert!(!body["summary"].as_str().unwrap().is_empty());
        assert!(body["id"].as_str().is_some());
        assert!(body["uploaded_at"].as_str().unwrap().ends_with('Z'));

        let keywords = body["keywords"].as_array().unwrap();
        assert_eq!(keywords[0]["word"], "systems");
        assert_eq!(keywords[0]["count"], 3);
    }

    #[tokio::test]
    async fn test_upload_appears_in_history() {
        let server = TestServer::start(offline()).await;
        assert!(server.history().await.is_empty());

        let record: DocumentRecord = server
            .upload("file", "a.pdf", pdf_with_text(TEXT))
            .await
            .json()
            .await
            .unwrap();
        let later: DocumentRecord = server
            .upload("file", "b.pdf", pdf_with_text("Kafka pipelines"))
            .await
            .json()
            .await
            .unwrap();

        let history = server.history().await;
        assert_eq!(history, vec![later, record]);
        assert_eq!(server.history().await, history);
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected() {
        let server = TestServer::start(offline()).await;

        let response = server
            .upload("file", "notes.txt", b"meeting notes".to_vec())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("not a PDF"));

        assert!(server.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let server = TestServer::start(offline()).await;
        let response = server.upload("file", "empty.pdf", Vec::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_rejected() {
        let server = TestServer::start(offline()).await;
        let response = server
            .upload(
                "file",
                "broken.pdf",
                pdf_with_dangling_font("Visible first page words"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("Could not extract text"));
        assert!(server.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let server = TestServer::start(offline()).await;
        let form = Form::new().text("comment", "no file here");
        let response = server
            .client
            .post(format!("{}/upload-resume/", server.base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_field_name_with_filename_is_accepted() {
        let server = TestServer::start(offline()).await;
        let response = server
            .upload("document", "../../etc/cv.pdf", pdf_with_text(TEXT))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let record: DocumentRecord = response.json().await.unwrap();
        assert_eq!(record.filename, "cv.pdf");
    }

    #[tokio::test]
    async fn test_blank_pdf_is_ok() {
        let server = TestServer::start(offline()).await;
        let response = server.upload("file", "scan.pdf", blank_pdf()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let record: DocumentRecord = response.json().await.unwrap();
        assert!(record.keywords.is_empty());
        assert_eq!(record.summary, NO_CONTENT_SUMMARY);
    }

    #[tokio::test]
    async fn test_ai_server_error_falls_back() {
        let api = FakeCompletionApi::start(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "overloaded" }),
        )
        .await;
        let server = TestServer::start(Config {
            api_key: Some("key".to_string()),
            ai_url: api.url.clone(),
            ..Config::default()
        })
        .await;

        let response = server.upload("file", "cv.pdf", pdf_with_text(TEXT)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let record: DocumentRecord = response.json().await.unwrap();
        assert_eq!(record.source, AnalysisSource::Fallback);
        assert_eq!(api.hits(), 1);
    }

    #[tokio::test]
    async fn test_ai_summary() {
        let api = FakeCompletionApi::answering("Seasoned distributed systems engineer.").await;
        let server = TestServer::start(Config {
            api_key: Some("key".to_string()),
            ai_url: api.url.clone(),
            ..Config::default()
        })
        .await;

        let record: DocumentRecord = server
            .upload("file", "cv.pdf", pdf_with_text(TEXT))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(record.source, AnalysisSource::Ai);
        assert_eq!(record.summary, "Seasoned distributed systems engineer.");
        assert_eq!(server.history().await, vec![record]);
    }

    #[tokio::test]
    async fn test_oversized_upload() {
        let server = TestServer::start(Config {
            max_upload_bytes: 1024,
            ..offline()
        })
        .await;

        let response = server.upload("file", "big.pdf", vec![b'x'; 8 * 1024]).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(server.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let server = TestServer::start(offline()).await;
        server.upload("file", "cv.pdf", pdf_with_text(TEXT)).await;

        let response = server
            .client
            .get(format!("{}/health", server.base))
            .header("Origin", "http://localhost:3000")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["documents"], 1);
        assert_eq!(body["ai_configured"], false);
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("cv.pdf"), "cv.pdf");
        assert_eq!(clean_filename("C:\\Users\\me\\cv.pdf"), "cv.pdf");
        assert_eq!(clean_filename("../../cv.pdf"), "cv.pdf");
        assert_eq!(clean_filename("dir/"), "");
    }
}
