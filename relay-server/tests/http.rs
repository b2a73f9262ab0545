use std::io::Cursor;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, GenericImageView, ImageFormat};
use relay_blob::{
    BlobError, BlobResult, BlobStore, GetResult, MemoryBlobStore, ObjectHead, PutResult,
};
use relay_server::{ImageTranscoder, RelayApp, RelayState};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "relay-test-boundary";
const LIMIT: usize = 32 * 1024 * 1024;

fn transcoding_app(store: MemoryBlobStore) -> RelayApp {
    RelayApp::new(RelayState::new(store).with_transcoder(ImageTranscoder::new()), LIMIT)
}

fn passthrough_app(store: MemoryBlobStore) -> RelayApp {
    RelayApp::new(RelayState::new(store), LIMIT)
}

fn sample_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(field, filename, content_type, data)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(res: Response) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

async fn body_text(res: Response) -> String {
    String::from_utf8(body_bytes(res).await.to_vec()).unwrap()
}

/// Upload and return the `url` from the JSON response
async fn upload(app: &RelayApp, filename: &str, content_type: &str, data: &[u8]) -> String {
    let res = app
        .router
        .clone()
        .oneshot(upload_request("image", filename, content_type, data))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(res).await).unwrap();
    json["url"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn index_renders_upload_form() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let res = app.router.clone().oneshot(get("/")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
    let html = body_text(res).await;
    assert!(html.contains("name=\"image\""));
    assert!(html.contains("/upload"));
}

#[tokio::test]
async fn health_ok_and_sets_request_id() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let res = app.router.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(body_text(res).await, "ok");
}

#[tokio::test]
async fn png_round_trip_keeps_format_and_dimensions() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let url = upload(&app, "cat.png", "image/png", &sample_image(120, 80, ImageFormat::Png)).await;
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    let res = app.router.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.headers()["cache-control"], "public, max-age=31536000");
    assert!(res.headers().get("etag").is_some());
    assert!(res.headers()["last-modified"].to_str().unwrap().ends_with(" GMT"));

    let stored = body_bytes(res).await;
    assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Png);
    assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (120, 80));
}

#[tokio::test]
async fn oversized_upload_is_bounded_to_1920() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let url = upload(&app, "wide.jpg", "image/jpeg", &sample_image(2500, 1000, ImageFormat::Jpeg)).await;

    let res = app.router.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(res.headers()["content-type"], "image/jpeg");
    let stored = body_bytes(res).await;
    assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (1920, 768));
}

#[tokio::test]
async fn unrecognized_format_is_stored_as_jpeg() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let url = upload(&app, "anim.gif", "image/gif", &sample_image(40, 30, ImageFormat::Gif)).await;
    assert!(url.ends_with(".gif"));

    let res = app.router.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(res.headers()["content-type"], "image/jpeg");
    let stored = body_bytes(res).await;
    assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
    assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (40, 30));
}

#[tokio::test]
async fn matching_etag_returns_304_without_body() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));
    let url = upload(&app, "a.png", "image/png", &sample_image(16, 16, ImageFormat::Png)).await;

    let first = app.router.clone().oneshot(get(&url)).await.unwrap();
    let etag = first.headers()["etag"].clone();

    let res = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(&url)
                .header("if-none-match", etag.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()["etag"], etag);
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn if_modified_since_is_honoured() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));
    let url = upload(&app, "a.png", "image/png", &sample_image(16, 16, ImageFormat::Png)).await;

    let first = app.router.clone().oneshot(get(&url)).await.unwrap();
    let last_modified = first.headers()["last-modified"].clone();

    let fresh = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(&url)
                .header("if-modified-since", last_modified)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::NOT_MODIFIED);

    let stale = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(&url)
                .header("if-modified-since", "Thu, 01 Jan 1970 00:00:00 GMT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::OK);
    assert!(!body_bytes(stale).await.is_empty());
}

#[tokio::test]
async fn unknown_key_is_404() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let res = app.router.clone().oneshot(get("/uploads/12345.png")).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(res).await, "Image not found");
}

#[tokio::test]
async fn missing_image_field_is_400() {
    let store = MemoryBlobStore::with_bucket("images");
    let app = transcoding_app(store.clone());

    let res = app
        .router
        .clone()
        .oneshot(upload_request("photo", "a.png", "image/png", b"bytes"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.starts_with("get form err: "));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn image_field_without_filename_is_400() {
    let store = MemoryBlobStore::with_bucket("images");
    let app = passthrough_app(store.clone());
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );

    let res = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.starts_with("get form err: "));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn non_multipart_request_is_400() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let res = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.starts_with("get form err: "));
}

#[tokio::test]
async fn undecodable_upload_is_500() {
    let store = MemoryBlobStore::with_bucket("images");
    let app = transcoding_app(store.clone());

    let res = app
        .router
        .clone()
        .oneshot(upload_request("image", "notes.png", "image/png", b"plain text, not pixels"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(res).await.starts_with("process image err: "));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn distinct_uploads_get_distinct_keys() {
    let app = transcoding_app(MemoryBlobStore::with_bucket("images"));

    let small = sample_image(10, 10, ImageFormat::Png);
    let large = sample_image(20, 20, ImageFormat::Png);
    let (a, b) = tokio::join!(
        upload(&app, "a.png", "image/png", &small),
        upload(&app, "b.png", "image/png", &large),
    );
    assert_ne!(a, b);

    for (url, size) in [(a, 10), (b, 20)] {
        let res = app.router.clone().oneshot(get(&url)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let stored = body_bytes(res).await;
        assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (size, size));
    }
}

#[tokio::test]
async fn passthrough_stores_bytes_verbatim() {
    let app = passthrough_app(MemoryBlobStore::with_bucket("images"));
    let original = b"not even an image".to_vec();

    let url = upload(&app, "raw.webp", "image/webp", &original).await;
    assert!(url.ends_with(".webp"));

    let res = app.router.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/webp");
    assert!(res.headers().get("cache-control").is_none());
    assert!(res.headers().get("etag").is_none());
    assert_eq!(body_bytes(res).await.to_vec(), original);
}

#[tokio::test]
async fn passthrough_ignores_conditional_headers() {
    let app = passthrough_app(MemoryBlobStore::with_bucket("images"));
    let url = upload(&app, "raw.bin", "application/octet-stream", b"payload").await;

    let res = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(&url)
                .header("if-modified-since", "Fri, 31 Dec 9999 23:59:59 GMT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_bytes(res).await.as_ref(), b"payload");
}

/// Wraps a memory store and breaks selected operations
#[derive(Clone)]
struct BrokenStore {
    inner: MemoryBlobStore,
    fail_put: bool,
    fail_head: bool,
}

#[async_trait]
impl BlobStore for BrokenStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    async fn ping(&self) -> BlobResult<()> {
        self.inner.ping().await
    }

    async fn bucket_exists(&self) -> BlobResult<bool> {
        self.inner.bucket_exists().await
    }

    async fn create_bucket(&self) -> BlobResult<()> {
        self.inner.create_bucket().await
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> BlobResult<PutResult> {
        if self.fail_put {
            return Err(BlobError::invalid("disk full"));
        }
        self.inner.put(key, content_type, data).await
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        if self.fail_head {
            return Err(BlobError::invalid("stat unavailable"));
        }
        self.inner.head(key).await
    }
}

#[tokio::test]
async fn storage_write_failure_is_500() {
    let store = BrokenStore {
        inner: MemoryBlobStore::with_bucket("images"),
        fail_put: true,
        fail_head: false,
    };
    let app = RelayApp::new(RelayState::new(store), LIMIT);

    let res = app
        .router
        .clone()
        .oneshot(upload_request("image", "a.bin", "application/octet-stream", b"x"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(res).await;
    assert!(text.starts_with("upload file err: "));
    assert!(text.contains("disk full"));
}

#[tokio::test]
async fn metadata_failure_is_500() {
    let inner = MemoryBlobStore::with_bucket("images");
    inner
        .put("1.png", "image/png", Bytes::from_static(b"png"))
        .await
        .unwrap();
    let store = BrokenStore {
        inner,
        fail_put: false,
        fail_head: true,
    };
    let app = RelayApp::new(RelayState::new(store), LIMIT);

    let res = app.router.clone().oneshot(get("/uploads/1.png")).await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(res).await, "Failed to get image stats");
}

#[tokio::test]
async fn body_limit_rejects_large_uploads() {
    let app = RelayApp::new(RelayState::new(MemoryBlobStore::with_bucket("images")), 1024);

    let res = app
        .router
        .clone()
        .oneshot(upload_request("image", "big.bin", "application/octet-stream", &vec![7u8; 4096]))
        .await
        .unwrap();

    assert!(res.status().is_client_error());
}
