//! HTTP surface
//!
//! - `GET /?url=<url>&device=<id>`: framed screenshot as `image/png`
//! - `GET /devices`: JSON array of known device ids
//!
//! Every failure funnels through the `IntoResponse` impl for [`Error`], which
//! picks the status and decides whether the caller sees the message.

use crate::catalog::DeviceCatalog;
use crate::compose::ImageCompositor;
use crate::render::PageRenderer;
use crate::validate::{validate_device, validate_url};
use crate::{Error, ErrorKind, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

const PARAMS_TEMPLATE: &str =
    "Query parameters should be supplied in the form: { url: 'string', device: 'string' }.";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<DeviceCatalog>,
    pub renderer: Arc<dyn PageRenderer>,
    pub compositor: Arc<dyn ImageCompositor>,
}

impl AppState {
    pub fn new(
        catalog: DeviceCatalog,
        renderer: Arc<dyn PageRenderer>,
        compositor: Arc<dyn ImageCompositor>,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            renderer,
            compositor,
        }
    }
}

/// The two inputs of a framing request, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub url: String,
    pub device_id: String,
}

impl GenerationRequest {
    /// Pull `url` and `device` out of decoded query pairs. Each must appear
    /// exactly once; their contents are not checked here.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::BadRequest(format!(
                "No query parameters supplied. {}",
                PARAMS_TEMPLATE
            )));
        }

        let single = |key: &str| -> Option<String> {
            let mut values = pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v);
            match (values.next(), values.next()) {
                (Some(v), None) => Some(v.clone()),
                _ => None,
            }
        };

        match (single("url"), single("device")) {
            (Some(url), Some(device_id)) => Ok(Self { url, device_id }),
            _ => Err(Error::BadRequest(format!(
                "Query parameters incorrect. {}",
                PARAMS_TEMPLATE
            ))),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(generate))
        .route("/devices", get(list_devices))
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

/// Serve `router(state)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Validate, capture, composite. Validation failures return before the
/// renderer is touched.
pub async fn generate_framed(state: &AppState, request: GenerationRequest) -> Result<Vec<u8>> {
    let profile = validate_device(&request.device_id, &state.catalog)?.clone();
    validate_url(&request.url)?;

    debug!("capturing {} as {}", request.url, profile.id);
    let renderer = state.renderer.clone();
    let url = request.url;
    let emulation = profile.emulation;
    let screenshot = tokio::task::spawn_blocking(move || renderer.capture(&url, &emulation))
        .await
        .map_err(|e| Error::Other(format!("Capture task failed: {}", e)))??;

    let compositor = state.compositor.clone();
    let frame = profile.image_uri;
    tokio::task::spawn_blocking(move || compositor.composite(&frame, &screenshot))
        .await
        .map_err(|e| Error::Other(format!("Composite task failed: {}", e)))?
}

async fn generate(
    State(state): State<AppState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response> {
    let Query(pairs) = query.map_err(|e| {
        Error::BadRequest(format!("Query parameters incorrect ({}). {}", e.body_text(), PARAMS_TEMPLATE))
    })?;
    let request = GenerationRequest::from_query(&pairs)?;
    let png = generate_framed(&state, request).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn list_devices(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog.ids().to_vec())
}

async fn access_log(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.kind() {
            ErrorKind::Internal => error!("request failed: {}", self),
            ErrorKind::Upstream => warn!("upstream failure: {}", self),
            ErrorKind::Client => {}
        }
        match self.client_message() {
            Some(body) => (status, body).into_response(),
            None => status.into_response(),
        }
    }
}
