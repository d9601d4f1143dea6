use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::PUT, MockServer};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfsilo::{
    api, config,
    embedding::{EmbeddingClient, EmbeddingClientError},
    ingest::IngestService,
    logging,
    object_store::ObjectStoreClient,
};
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();

const EMBEDDING_DIMENSION: usize = 4;

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

async fn harness() -> &'static MockServer {
    INIT.get_or_init(|| async {
        let mock_server_owned = MockServer::start_async().await;
        let mock_server = Box::leak(Box::new(mock_server_owned));

        let scratch_dir = std::env::temp_dir().join(format!("pdfsilo-test-{}", std::process::id()));
        std::fs::create_dir_all(&scratch_dir).expect("scratch dir created");

        set_env("OBJECT_STORE_URL", &mock_server.base_url());
        set_env("BUCKET_NAME", "artifacts");
        set_env("EMBEDDING_PROVIDER", "openai");
        set_env("EMBEDDING_URL", "http://127.0.0.1:1");
        set_env("EMBEDDING_MODEL", "test-model");
        set_env("EMBEDDING_DIMENSION", &EMBEDDING_DIMENSION.to_string());
        set_env("CHUNK_SIZE", "40");
        set_env("CHUNK_OVERLAP", "8");
        set_env("SCRATCH_DIR", scratch_dir.to_str().expect("utf-8 path"));

        MOCK_SERVER.set(mock_server).ok();

        config::init_config();
        logging::init_tracing();
    })
    .await;

    MOCK_SERVER.get().expect("mock server initialized")
}

/// Embedding stub producing fixed-dimension vectors without network access.
struct StaticEmbedder;

#[async_trait]
impl EmbeddingClient for StaticEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(position, _)| vec![position as f32; EMBEDDING_DIMENSION])
            .collect())
    }
}

fn build_service() -> Arc<IngestService> {
    let object_store = ObjectStoreClient::new().expect("object store client");
    Arc::new(IngestService::with_clients(
        Box::new(StaticEmbedder),
        object_store,
    ))
}

/// Build a minimal single-page PDF containing the given text.
fn sample_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content stream encodes"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("document serializes");
    buffer
}

fn multipart_request(filename: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--boundary\r\n");
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(b"\r\n--boundary--\r\n");

    Request::builder()
        .method(Method::POST)
        .uri("/ingest")
        .header("content-type", "multipart/form-data; boundary=boundary")
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn ingest_uploads_both_artifacts_and_cleans_scratch() {
    let server = harness().await;

    let vectors_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/artifacts/my_index.vectors")
                .header("content-type", "application/octet-stream");
            then.status(200);
        })
        .await;
    let metadata_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/artifacts/my_index.meta.json")
                .header("content-type", "application/json");
            then.status(200);
        })
        .await;

    let service = build_service();
    let app = api::create_router(service.clone());

    let pdf = sample_pdf("The quick brown fox jumps over the lazy dog, again and again and again.");
    let response = app
        .oneshot(multipart_request("report.pdf", &pdf))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["pages"], 1);
    assert!(json["chunks"].as_u64().expect("chunk count") >= 2);
    assert_eq!(json["chunk_size"], 40);
    assert_eq!(json["chunk_overlap"], 8);
    assert_eq!(json["index_key"], "my_index.vectors");
    assert_eq!(json["metadata_key"], "my_index.meta.json");

    assert_eq!(vectors_mock.hits_async().await, 1);
    assert_eq!(metadata_mock.hits_async().await, 1);

    // scratch files for this request are removed once the upload succeeds
    let request_id = json["request_id"].as_str().expect("request id");
    let scratch = config::get_config().scratch_dir.clone();
    for suffix in ["pdf", "vectors", "meta.json"] {
        let path: PathBuf = scratch.join(format!("{request_id}.{suffix}"));
        assert!(!path.exists(), "scratch file {} should be gone", path.display());
    }

    // re-ingesting overwrites the shared artifact keys instead of failing
    let app = api::create_router(service.clone());
    let response = app
        .oneshot(multipart_request("report.pdf", &pdf))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(vectors_mock.hits_async().await, 2);
    assert_eq!(metadata_mock.hits_async().await, 2);

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.documents_ingested, 2);
    assert!(snapshot.last_chunk_count.is_some());
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_before_any_upload() {
    harness().await;
    let app = api::create_router(build_service());

    let response = app
        .oneshot(multipart_request("notes.txt", b"plain text"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn text_free_pdf_is_unprocessable() {
    harness().await;
    let app = api::create_router(build_service());

    let response = app
        .oneshot(multipart_request("blank.pdf", &sample_pdf("")))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert!(
        json["error"]
            .as_str()
            .expect("error message")
            .contains("no text to index")
    );
}
