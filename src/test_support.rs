//! Fixtures shared by the test modules: generated PDFs and fake completion endpoints.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

/// Build a one-page PDF whose text layer holds `text`
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    build_pdf(text_operations(text), None)
}

/// A valid PDF with an empty page, like a scan without OCR
pub fn blank_pdf() -> Vec<u8> {
    build_pdf(vec![], None)
}

/// A PDF that shows `text` in a font pointing at an object that does not exist
pub fn pdf_with_dangling_font(text: &str) -> Vec<u8> {
    build_pdf(text_operations(text), Some((999, 0)))
}

fn text_operations(text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn build_pdf(operations: Vec<Operation>, font: Option<ObjectId>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = font.unwrap_or_else(|| {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        })
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A fake completion endpoint that counts the requests it receives
pub struct FakeCompletionApi {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeCompletionApi {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Answers every request with a completion carrying `summary`
    pub async fn answering(summary: &str) -> Self {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": summary } }]
        });
        Self::start(StatusCode::OK, body).await
    }

    /// Answers every request with `status` and `body`
    pub async fn start(status: StatusCode, body: serde_json::Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = Arc::clone(&counter);
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, Json(body))
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/chat/completions", addr),
            hits,
        }
    }
}
