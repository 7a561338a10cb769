//! Test helpers: in-memory collaborators and request plumbing for driving
//! the router without a network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use scan_relay::app_state::AppState;
use scan_relay::routes;
use scan_relay::services::lifecycle::JobController;
use scan_relay::services::registry::JobRegistry;
use scan_relay::services::storage::{BlobStore, StorageError};
use scan_relay::services::webhook::{NotifyError, WorkflowDispatch, WorkflowNotifier};

pub const BASE_URL: &str = "https://scan.test";
pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, 4, 5, 6];

/// One object written to the stub bucket.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub name: String,
    pub content_type: String,
    pub len: usize,
}

/// Blob store that keeps object metadata in memory and can be told to fail
/// uploads for one region.
#[derive(Default)]
pub struct StubStore {
    pub objects: Mutex<Vec<StoredObject>>,
    pub fail_region: Option<&'static str>,
}

impl StubStore {
    pub fn failing(region: &'static str) -> Self {
        Self {
            fail_region: Some(region),
            ..Default::default()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    /// Job id embedded in the stored object names (`<region>-<id>.<ext>`).
    pub fn job_id(&self) -> Option<Uuid> {
        let objects = self.objects.lock().unwrap();
        let name = &objects.first()?.name;
        let (_, rest) = name.split_once('-')?;
        let (id, _) = rest.rsplit_once('.')?;
        Uuid::parse_str(id).ok()
    }
}

#[async_trait]
impl BlobStore for StubStore {
    async fn store(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        if let Some(region) = self.fail_region {
            if name.starts_with(region) {
                return Err(StorageError::Status {
                    key: name.to_string(),
                    status: 500,
                });
            }
        }
        self.objects.lock().unwrap().push(StoredObject {
            name: name.to_string(),
            content_type: content_type.to_string(),
            len: data.len(),
        });
        Ok(format!("https://blob.test/{name}?X-Amz-Signature=abc"))
    }
}

/// Forwards every dispatch to a channel the test can read.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<WorkflowDispatch>,
}

#[async_trait]
impl WorkflowNotifier for ChannelNotifier {
    async fn notify(&self, dispatch: &WorkflowDispatch) -> Result<(), NotifyError> {
        let _ = self.tx.send(dispatch.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<StubStore>,
    pub dispatches: mpsc::UnboundedReceiver<WorkflowDispatch>,
}

pub struct TestOptions {
    pub store: StubStore,
    pub public_base_url: Option<String>,
    pub callback_token: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            store: StubStore::default(),
            public_base_url: Some(BASE_URL.to_string()),
            callback_token: None,
        }
    }
}

/// Build the full router (same middleware as production) around stubs.
pub fn build_test_app(options: TestOptions) -> TestApp {
    let store = Arc::new(options.store);
    let (tx, dispatches) = mpsc::unbounded_channel();

    let controller = JobController::new(
        Arc::new(JobRegistry::new()),
        store.clone(),
        Arc::new(ChannelNotifier { tx }),
        Duration::from_secs(5),
        options.callback_token,
    );
    let state = AppState::new(controller, options.public_base_url);

    TestApp {
        router: routes::build_router(state, 50 * 1024 * 1024),
        store,
        dispatches,
    }
}

pub fn test_app() -> TestApp {
    build_test_app(TestOptions::default())
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn submit(&self, body: Value) -> Response {
        self.send(json_request(Method::POST, "/upload", &body)).await
    }

    pub async fn callback(&self, job_id: &str, body: Value) -> Response {
        let uri = format!("/webhook-callback?jobId={job_id}");
        self.send(json_request(Method::POST, &uri, &body)).await
    }

    pub async fn poll(&self, job_id: &str) -> Response {
        self.get(&format!("/status/{job_id}")).await
    }

    /// Wait for the background workflow dispatch.
    pub async fn next_dispatch(&mut self) -> WorkflowDispatch {
        tokio::time::timeout(Duration::from_secs(5), self.dispatches.recv())
            .await
            .expect("timed out waiting for workflow dispatch")
            .expect("dispatch channel closed")
    }

    pub fn no_dispatch_sent(&mut self) -> bool {
        self.dispatches.try_recv().is_err()
    }
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// A valid JSON submission body.
pub fn four_images() -> Value {
    json!({
        "lips": encode(PNG_MAGIC),
        "tongue": encode(b"tongue photo"),
        "eyes": format!("data:image/jpeg;base64,{}", encode(JPEG_MAGIC)),
        "nails": encode(b"nails photo"),
    })
}

/// Build a multipart/form-data body by hand.
pub fn multipart_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    let boundary = "scan-relay-test-boundary";
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
