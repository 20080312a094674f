//! Mock model backends and a failing image service for integration tests
//!
//! Serves an OpenAI-compatible `/v1/images/generations`, a txt2img
//! `/sdapi/v1/txt2img` and an image-service-shaped `/generate`. When started
//! with [`MockBackend::start_failing`] every route answers with the given
//! status and body instead.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Mock backend returning solid green PNGs
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    last_request: Mutex<Option<Value>>,
    failure: Option<(StatusCode, &'static str)>,
}

impl MockBackend {
    /// Start a healthy mock backend
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(None).await
    }

    /// Start a mock that answers every request with `status` and `body`
    pub async fn start_failing(status: u16, body: &'static str) -> anyhow::Result<Self> {
        Self::start_inner(Some((StatusCode::from_u16(status)?, body))).await
    }

    async fn start_inner(failure: Option<(StatusCode, &'static str)>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            request_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
            failure,
        });

        let app = Router::new()
            .route("/v1/images/generations", routing::post(handle_openai))
            .route("/sdapi/v1/txt2img", routing::post(handle_txt2img))
            .route("/generate", routing::post(handle_generate))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for the `openai` model backend, including `/v1`
    pub fn openai_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for the `sdapi` backend, or for the adapter's image service
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received on any route
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// JSON body of the most recent request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockState {
    /// Record the request, returning the canned failure if configured
    fn record(&self, body: Value) -> Result<Value, Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(body.clone());

        match self.failure {
            Some((status, message)) => Err((status, message).into_response()),
            None => Ok(body),
        }
    }
}

async fn handle_openai(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let body = match state.record(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let (width, height) = body["size"]
        .as_str()
        .and_then(|size| size.split_once('x'))
        .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
        .unwrap_or((1, 1));

    Json(json!({
        "created": 0,
        "data": [{ "b64_json": green_png_base64(width, height) }]
    }))
    .into_response()
}

async fn handle_txt2img(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let body = match state.record(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let width = body["width"].as_u64().map_or(1, |w| u32::try_from(w).unwrap());
    let height = body["height"].as_u64().map_or(1, |h| u32::try_from(h).unwrap());

    Json(json!({
        "images": [green_png_base64(width, height)],
        "parameters": {},
        "info": ""
    }))
    .into_response()
}

/// Only meaningful when failing; a healthy mock is not an image service
async fn handle_generate(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    match state.record(body) {
        Ok(_) => StatusCode::NOT_IMPLEMENTED.into_response(),
        Err(response) => response,
    }
}

fn green_png_base64(width: u32, height: u32) -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 200, 0])));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    BASE64.encode(bytes)
}
